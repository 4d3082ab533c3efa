use anyhow::{bail, Result};

use crate::config::Cli;
use crate::steps::Step;

/// The closed set of user-facing operations. Each variant carries a fixed,
/// ordered step list; the enum makes an unknown operation unrepresentable, so
/// the only fail-closed path left is "no operation selected".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ExportDomains,
    PurgeDomains,
    Domains,
    ListDomains,
    CheckDomains,
    CullAccounts,
    PruneAccounts,
    Accounts,
    Media,
    ProfileMedia,
    PreviewCards,
    Statuses,
    OrphanMedia,
    MediaStats,
    Feeds,
    ClearCache,
    SearchIndex,
    SystemHealth,
    Maintenance,
    Full,
}

impl Operation {
    pub const ALL: [Operation; 20] = [
        Operation::ExportDomains,
        Operation::PurgeDomains,
        Operation::Domains,
        Operation::ListDomains,
        Operation::CheckDomains,
        Operation::CullAccounts,
        Operation::PruneAccounts,
        Operation::Accounts,
        Operation::Media,
        Operation::ProfileMedia,
        Operation::PreviewCards,
        Operation::Statuses,
        Operation::OrphanMedia,
        Operation::MediaStats,
        Operation::Feeds,
        Operation::ClearCache,
        Operation::SearchIndex,
        Operation::SystemHealth,
        Operation::Maintenance,
        Operation::Full,
    ];

    pub fn flag(&self) -> &'static str {
        match self {
            Operation::ExportDomains => "--export-domains",
            Operation::PurgeDomains => "--purge-domains",
            Operation::Domains => "--domains",
            Operation::ListDomains => "--list-domains",
            Operation::CheckDomains => "--check-domains",
            Operation::CullAccounts => "--cull-accounts",
            Operation::PruneAccounts => "--prune-accounts",
            Operation::Accounts => "--accounts",
            Operation::Media => "--media",
            Operation::ProfileMedia => "--profile-media",
            Operation::PreviewCards => "--preview-cards",
            Operation::Statuses => "--statuses",
            Operation::OrphanMedia => "--orphan-media",
            Operation::MediaStats => "--media-stats",
            Operation::Feeds => "--feeds",
            Operation::ClearCache => "--clear-cache",
            Operation::SearchIndex => "--search-index",
            Operation::SystemHealth => "--system-health",
            Operation::Maintenance => "--maintenance",
            Operation::Full => "--full",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Operation::ExportDomains => "Export blocked domains to the hand-off file",
            Operation::PurgeDomains => "Purge every domain listed in the hand-off file",
            Operation::Domains => "Export blocked domains, then purge them",
            Operation::ListDomains => "List blocked domains known to the instance",
            Operation::CheckDomains => "Check blocked domains against the live federation",
            Operation::CullAccounts => "Remove accounts from servers that no longer exist",
            Operation::PruneAccounts => "Prune remote accounts that never interacted locally",
            Operation::Accounts => "Cull and prune accounts",
            Operation::Media => "Remove aged remote media",
            Operation::ProfileMedia => "Remove aged profile media",
            Operation::PreviewCards => "Remove aged preview cards",
            Operation::Statuses => "Remove aged remote statuses",
            Operation::OrphanMedia => "Remove orphaned media files",
            Operation::MediaStats => "Report media storage usage",
            Operation::Feeds => "Rebuild home and list feeds",
            Operation::ClearCache => "Clear the application cache",
            Operation::SearchIndex => "Rebuild the search index",
            Operation::SystemHealth => "Run the four system health inspections",
            Operation::Maintenance => "Aged-data cleanup across media, cards, and statuses",
            Operation::Full => "Every maintenance step in a fixed order",
        }
    }

    pub fn steps(&self) -> &'static [Step] {
        match self {
            Operation::ExportDomains => &[Step::ExportDomains],
            Operation::PurgeDomains => &[Step::PurgeDomains],
            Operation::Domains => &[Step::ExportDomains, Step::PurgeDomains],
            Operation::ListDomains => &[Step::ListDomains],
            Operation::CheckDomains => &[Step::CheckDomains],
            Operation::CullAccounts => &[Step::CullAccounts],
            Operation::PruneAccounts => &[Step::PruneAccounts],
            Operation::Accounts => &[Step::CullAccounts, Step::PruneAccounts],
            Operation::Media => &[Step::RemoveMedia],
            Operation::ProfileMedia => &[Step::RemoveProfileMedia],
            Operation::PreviewCards => &[Step::RemovePreviewCards],
            Operation::Statuses => &[Step::RemoveStatuses],
            Operation::OrphanMedia => &[Step::RemoveOrphanMedia],
            Operation::MediaStats => &[Step::MediaStats],
            Operation::Feeds => &[Step::BuildFeeds],
            Operation::ClearCache => &[Step::ClearCache],
            Operation::SearchIndex => &[Step::DeploySearchIndex],
            Operation::SystemHealth => &[
                Step::HealthInfo,
                Step::HealthStats,
                Step::HealthQueue,
                Step::HealthCache,
            ],
            Operation::Maintenance => &[
                Step::RemoveMedia,
                Step::RemoveProfileMedia,
                Step::RemovePreviewCards,
                Step::RemoveStatuses,
                Step::RemoveOrphanMedia,
            ],
            Operation::Full => &[
                Step::ExportDomains,
                Step::PurgeDomains,
                Step::CullAccounts,
                Step::PruneAccounts,
                Step::RemoveMedia,
                Step::RemoveProfileMedia,
                Step::RemovePreviewCards,
                Step::RemoveStatuses,
                Step::RemoveOrphanMedia,
                Step::BuildFeeds,
                Step::ClearCache,
                Step::HealthInfo,
                Step::HealthStats,
                Step::HealthQueue,
                Step::HealthCache,
            ],
        }
    }
}

/// Resolves the parsed flags to the single selected operation. clap already
/// rejects two operation flags in one invocation; zero flags fails closed
/// here, before any step runs.
pub fn select(cli: &Cli) -> Result<Operation> {
    let flags = [
        (cli.export_domains, Operation::ExportDomains),
        (cli.purge_domains, Operation::PurgeDomains),
        (cli.domains, Operation::Domains),
        (cli.list_domains, Operation::ListDomains),
        (cli.check_domains, Operation::CheckDomains),
        (cli.cull_accounts, Operation::CullAccounts),
        (cli.prune_accounts, Operation::PruneAccounts),
        (cli.accounts, Operation::Accounts),
        (cli.media, Operation::Media),
        (cli.profile_media, Operation::ProfileMedia),
        (cli.preview_cards, Operation::PreviewCards),
        (cli.statuses, Operation::Statuses),
        (cli.orphan_media, Operation::OrphanMedia),
        (cli.media_stats, Operation::MediaStats),
        (cli.feeds, Operation::Feeds),
        (cli.clear_cache, Operation::ClearCache),
        (cli.search_index, Operation::SearchIndex),
        (cli.system_health, Operation::SystemHealth),
        (cli.maintenance, Operation::Maintenance),
        (cli.full, Operation::Full),
    ];

    let selected: Vec<Operation> = flags
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, op)| *op)
        .collect();

    match selected.as_slice() {
        [op] => Ok(*op),
        [] => bail!("no operation selected (see --list-operations)"),
        _ => bail!("multiple operations selected: choose exactly one"),
    }
}

pub fn print_operations() {
    println!("Available operations (select exactly one):");
    println!();
    for op in Operation::ALL {
        println!("  {:<20} {}", op.flag(), op.summary());
    }
    println!();
    println!("Common flags: --dry-run, --include-subdomains, --concurrency N,");
    println!("--media-days N, --profile-media-days N, --preview-cards-days N,");
    println!("--statuses-days N, --verbose, --log-file");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["mastomaint"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_every_operation_has_steps() {
        for op in Operation::ALL {
            assert!(!op.steps().is_empty(), "{op:?} has an empty step list");
        }
    }

    #[test]
    fn test_flags_are_unique() {
        let mut flags: Vec<&str> = Operation::ALL.iter().map(|op| op.flag()).collect();
        flags.sort_unstable();
        flags.dedup();
        assert_eq!(flags.len(), Operation::ALL.len());
    }

    #[test]
    fn test_domains_composition_order() {
        assert_eq!(
            Operation::Domains.steps(),
            &[Step::ExportDomains, Step::PurgeDomains]
        );
    }

    #[test]
    fn test_maintenance_composition_order() {
        assert_eq!(
            Operation::Maintenance.steps(),
            &[
                Step::RemoveMedia,
                Step::RemoveProfileMedia,
                Step::RemovePreviewCards,
                Step::RemoveStatuses,
                Step::RemoveOrphanMedia,
            ]
        );
    }

    #[test]
    fn test_full_starts_with_domains_and_ends_with_health() {
        let steps = Operation::Full.steps();
        assert_eq!(steps[0], Step::ExportDomains);
        assert_eq!(steps[1], Step::PurgeDomains);
        assert!(steps[steps.len() - 4..].iter().all(|s| s.is_health_check()));
    }

    #[test]
    fn test_select_resolves_each_flag() {
        assert_eq!(select(&cli(&["--domains"])).unwrap(), Operation::Domains);
        assert_eq!(select(&cli(&["--full"])).unwrap(), Operation::Full);
        assert_eq!(
            select(&cli(&["--system-health"])).unwrap(),
            Operation::SystemHealth
        );
    }

    #[test]
    fn test_select_fails_closed_without_a_flag() {
        assert!(select(&cli(&[])).is_err());
    }
}
