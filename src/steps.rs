use crate::config::Config;
use crate::domain;
use crate::health;
use crate::runner::{CommandSpec, Runner};

/// One named unit of maintenance work. Stateless; each variant either maps to
/// a single external command or drives a small local sequence (domain export
/// and purge) that itself delegates to external commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ExportDomains,
    PurgeDomains,
    ListDomains,
    CheckDomains,
    CullAccounts,
    PruneAccounts,
    RemoveMedia,
    RemoveProfileMedia,
    RemovePreviewCards,
    RemoveStatuses,
    RemoveOrphanMedia,
    MediaStats,
    BuildFeeds,
    ClearCache,
    DeploySearchIndex,
    HealthInfo,
    HealthStats,
    HealthQueue,
    HealthCache,
}

impl Step {
    pub fn description(&self) -> &'static str {
        match self {
            Step::ExportDomains => "Export blocked domains",
            Step::PurgeDomains => "Purge blocked domains",
            Step::ListDomains => "List blocked domains",
            Step::CheckDomains => "Check blocked domains",
            Step::CullAccounts => "Cull accounts from dead servers",
            Step::PruneAccounts => "Prune never-interacting remote accounts",
            Step::RemoveMedia => "Remove aged remote media",
            Step::RemoveProfileMedia => "Remove aged profile media",
            Step::RemovePreviewCards => "Remove aged preview cards",
            Step::RemoveStatuses => "Remove aged remote statuses",
            Step::RemoveOrphanMedia => "Remove orphaned media files",
            Step::MediaStats => "Report media storage usage",
            Step::BuildFeeds => "Rebuild home and list feeds",
            Step::ClearCache => "Clear the application cache",
            Step::DeploySearchIndex => "Rebuild the search index",
            Step::HealthInfo => "Health: instance information",
            Step::HealthStats => "Health: record counters",
            Step::HealthQueue => "Health: background queue backlog",
            Step::HealthCache => "Health: cache ping",
        }
    }

    pub fn is_health_check(&self) -> bool {
        matches!(
            self,
            Step::HealthInfo | Step::HealthStats | Step::HealthQueue | Step::HealthCache
        )
    }

    /// The external command this step maps to, or `None` for the two
    /// composite domain steps that run their own sequences.
    pub fn command(&self, config: &Config) -> Option<CommandSpec> {
        let concurrency = config.concurrency.to_string();
        let spec = match self {
            Step::ExportDomains | Step::PurgeDomains => return None,
            Step::ListDomains => CommandSpec::tootctl(config, ["domains", "list"]),
            Step::CheckDomains => CommandSpec::tootctl(config, ["domains", "check"]),
            Step::CullAccounts => CommandSpec::tootctl(
                config,
                ["accounts", "cull", "--concurrency", concurrency.as_str()],
            ),
            Step::PruneAccounts => CommandSpec::tootctl(config, ["accounts", "prune"]),
            Step::RemoveMedia => {
                let days = config.media_days.to_string();
                CommandSpec::tootctl(
                    config,
                    [
                        "media",
                        "remove",
                        "--days",
                        days.as_str(),
                        "--concurrency",
                        concurrency.as_str(),
                    ],
                )
            }
            Step::RemoveProfileMedia => {
                let days = config.profile_media_days.to_string();
                CommandSpec::tootctl(
                    config,
                    [
                        "media",
                        "remove",
                        "--prune-profiles",
                        "--days",
                        days.as_str(),
                        "--concurrency",
                        concurrency.as_str(),
                    ],
                )
            }
            Step::RemovePreviewCards => {
                let days = config.preview_cards_days.to_string();
                CommandSpec::tootctl(
                    config,
                    [
                        "preview_cards",
                        "remove",
                        "--days",
                        days.as_str(),
                        "--concurrency",
                        concurrency.as_str(),
                    ],
                )
            }
            Step::RemoveStatuses => {
                let days = config.statuses_days.to_string();
                CommandSpec::tootctl(config, ["statuses", "remove", "--days", days.as_str()])
            }
            Step::RemoveOrphanMedia => CommandSpec::tootctl(config, ["media", "remove-orphans"]),
            Step::MediaStats => CommandSpec::tootctl(config, ["media", "usage"]),
            Step::BuildFeeds => CommandSpec::tootctl(
                config,
                ["feeds", "build", "--concurrency", concurrency.as_str()],
            ),
            Step::ClearCache => CommandSpec::tootctl(config, ["cache", "clear"]),
            Step::DeploySearchIndex => CommandSpec::tootctl(
                config,
                ["search", "deploy", "--concurrency", concurrency.as_str()],
            ),
            Step::HealthInfo => CommandSpec::rails_runner(config, health::INFO_SCRIPT),
            Step::HealthStats => CommandSpec::rails_runner(config, health::STATS_SCRIPT),
            Step::HealthQueue => CommandSpec::rails_runner(config, health::QUEUE_SCRIPT),
            Step::HealthCache => CommandSpec::rails_runner(config, health::CACHE_SCRIPT),
        };
        Some(spec)
    }

    pub fn run(&self, runner: &Runner) -> bool {
        match self {
            Step::ExportDomains => domain::export_blocked_domains(runner),
            Step::PurgeDomains => domain::purge_blocked_domains(runner),
            _ => {
                let spec = self
                    .command(runner.config())
                    .expect("composite steps are handled above");
                runner.safe_execute(self.description(), &spec)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> Config {
        Config::for_tests(PathBuf::from("."))
    }

    #[test]
    fn test_composite_steps_have_no_single_command() {
        let config = config();
        assert!(Step::ExportDomains.command(&config).is_none());
        assert!(Step::PurgeDomains.command(&config).is_none());
    }

    #[test]
    fn test_retention_and_concurrency_are_forwarded() {
        let mut config = config();
        config.concurrency = 12;
        config.media_days = 7;

        let spec = Step::RemoveMedia.command(&config).unwrap();
        assert_eq!(spec.program, "tootctl");
        assert_eq!(
            spec.args,
            vec!["media", "remove", "--days", "7", "--concurrency", "12"]
        );
    }

    #[test]
    fn test_profile_media_uses_its_own_retention() {
        let mut config = config();
        config.profile_media_days = 45;
        let spec = Step::RemoveProfileMedia.command(&config).unwrap();
        assert!(spec.args.contains(&"--prune-profiles".to_string()));
        assert!(spec.args.contains(&"45".to_string()));
    }

    #[test]
    fn test_statuses_removal_takes_no_concurrency() {
        let spec = Step::RemoveStatuses.command(&config()).unwrap();
        assert_eq!(spec.args, vec!["statuses", "remove", "--days", "365"]);
    }

    #[test]
    fn test_no_simple_step_is_in_the_dry_run_family() {
        // Only the per-domain purge invocations built inside the purge loop
        // carry the domain_purge marker.
        let config = config();
        let all = [
            Step::ListDomains,
            Step::CheckDomains,
            Step::CullAccounts,
            Step::PruneAccounts,
            Step::RemoveMedia,
            Step::RemoveProfileMedia,
            Step::RemovePreviewCards,
            Step::RemoveStatuses,
            Step::RemoveOrphanMedia,
            Step::MediaStats,
            Step::BuildFeeds,
            Step::ClearCache,
            Step::DeploySearchIndex,
            Step::HealthInfo,
            Step::HealthStats,
            Step::HealthQueue,
            Step::HealthCache,
        ];
        for step in all {
            let spec = step.command(&config).unwrap();
            assert!(!spec.domain_purge, "{step:?} must not be dry-run suppressed");
        }
    }

    #[test]
    fn test_health_checks_go_through_the_rails_runner() {
        let config = config();
        for step in [
            Step::HealthInfo,
            Step::HealthStats,
            Step::HealthQueue,
            Step::HealthCache,
        ] {
            assert!(step.is_health_check());
            let spec = step.command(&config).unwrap();
            assert_eq!(spec.program, "rails");
            assert_eq!(spec.args[0], "runner");
        }
        assert!(!Step::RemoveMedia.is_health_check());
    }
}
