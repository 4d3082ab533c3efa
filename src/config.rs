use anyhow::{bail, Result};
use clap::{ArgGroup, Parser};
use log::info;
use std::path::PathBuf;

/// Hand-off file between the export and purge steps, relative to `--root`.
pub const BLOCKED_DOMAINS_FILE: &str = "blocked_domains.txt";

/// Environment handed to every external invocation.
pub const RAILS_ENV: &str = "production";

const DEFAULT_CONCURRENCY: u32 = 4;
const DEFAULT_MEDIA_DAYS: u32 = 30;
const DEFAULT_PROFILE_MEDIA_DAYS: u32 = 90;
const DEFAULT_PREVIEW_CARDS_DAYS: u32 = 180;
const DEFAULT_STATUSES_DAYS: u32 = 365;

#[derive(Parser, Debug)]
#[command(name = "mastomaint")]
#[command(version = "1.2.0")]
#[command(about = "Sequenced maintenance runner for a Mastodon instance (tootctl/rails wrapper)")]
#[command(group(ArgGroup::new("operation").multiple(false)))]
pub struct Cli {
    /// Print domain-purge commands instead of executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Forward --include-subdomains to domain-purge calls
    #[arg(long)]
    pub include_subdomains: bool,

    /// Concurrency level forwarded to external calls (1-32)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<u32>,

    /// Remove remote media older than this many days (1-365)
    #[arg(long, value_name = "N")]
    pub media_days: Option<u32>,

    /// Remove profile media older than this many days (1-365)
    #[arg(long, value_name = "N")]
    pub profile_media_days: Option<u32>,

    /// Remove preview cards older than this many days (1-365)
    #[arg(long, value_name = "N")]
    pub preview_cards_days: Option<u32>,

    /// Remove statuses older than this many days (1-365)
    #[arg(long, value_name = "N")]
    pub statuses_days: Option<u32>,

    /// Debug logging; echo command vectors and working directory
    #[arg(short, long)]
    pub verbose: bool,

    /// Mirror log lines to a timestamped file in the working directory
    #[arg(long)]
    pub log_file: bool,

    /// Mastodon live directory (working directory for external invocations)
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,

    /// Program invoked for admin-tool steps
    #[arg(long, default_value = "tootctl", value_name = "PATH")]
    pub tootctl_bin: String,

    /// Program invoked for inline data-layer scripts
    #[arg(long, default_value = "rails", value_name = "PATH")]
    pub rails_bin: String,

    /// List available operations and exit
    #[arg(long)]
    pub list_operations: bool,

    /// Export blocked domains to the hand-off file
    #[arg(long, group = "operation")]
    pub export_domains: bool,

    /// Purge every domain listed in the hand-off file
    #[arg(long, group = "operation")]
    pub purge_domains: bool,

    /// Export blocked domains, then purge them
    #[arg(long, group = "operation")]
    pub domains: bool,

    /// List blocked domains known to the instance
    #[arg(long, group = "operation")]
    pub list_domains: bool,

    /// Check blocked domains against the live federation
    #[arg(long, group = "operation")]
    pub check_domains: bool,

    /// Remove accounts from servers that no longer exist
    #[arg(long, group = "operation")]
    pub cull_accounts: bool,

    /// Prune remote accounts that never interacted locally
    #[arg(long, group = "operation")]
    pub prune_accounts: bool,

    /// Cull and prune accounts
    #[arg(long, group = "operation")]
    pub accounts: bool,

    /// Remove aged remote media
    #[arg(long, group = "operation")]
    pub media: bool,

    /// Remove aged profile media
    #[arg(long, group = "operation")]
    pub profile_media: bool,

    /// Remove aged preview cards
    #[arg(long, group = "operation")]
    pub preview_cards: bool,

    /// Remove aged remote statuses
    #[arg(long, group = "operation")]
    pub statuses: bool,

    /// Remove orphaned media files
    #[arg(long, group = "operation")]
    pub orphan_media: bool,

    /// Report media storage usage
    #[arg(long, group = "operation")]
    pub media_stats: bool,

    /// Rebuild home and list feeds
    #[arg(long, group = "operation")]
    pub feeds: bool,

    /// Clear the application cache
    #[arg(long, group = "operation")]
    pub clear_cache: bool,

    /// Rebuild the search index
    #[arg(long, group = "operation")]
    pub search_index: bool,

    /// Run the four system health inspections
    #[arg(long, group = "operation")]
    pub system_health: bool,

    /// Aged-data cleanup: media, profile media, preview cards, statuses, orphans
    #[arg(long, group = "operation")]
    pub maintenance: bool,

    /// Every maintenance step in a fixed order
    #[arg(long, group = "operation")]
    pub full: bool,
}

/// Settings for one run. Built once from defaults overlaid by parsed flags,
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub tootctl_bin: String,
    pub rails_bin: String,
    pub concurrency: u32,
    pub media_days: u32,
    pub profile_media_days: u32,
    pub preview_cards_days: u32,
    pub statuses_days: u32,
    pub dry_run: bool,
    pub include_subdomains: bool,
    pub verbose: bool,
    pub log_file: bool,
}

impl Config {
    /// Builds the run configuration, logging each recognized flag as it is
    /// applied and rejecting out-of-range values.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.dry_run {
            info!("Dry-run enabled: domain purge commands will be printed, not executed");
        }
        if cli.include_subdomains {
            info!("Subdomain inclusion enabled for domain purges");
        }
        if let Some(n) = cli.concurrency {
            info!("Concurrency set to {n}");
        }
        if let Some(n) = cli.media_days {
            info!("Media retention set to {n} days");
        }
        if let Some(n) = cli.profile_media_days {
            info!("Profile media retention set to {n} days");
        }
        if let Some(n) = cli.preview_cards_days {
            info!("Preview card retention set to {n} days");
        }
        if let Some(n) = cli.statuses_days {
            info!("Status retention set to {n} days");
        }
        if cli.verbose {
            info!("Verbose logging enabled");
        }

        let config = Self {
            root: cli.root.clone(),
            tootctl_bin: cli.tootctl_bin.clone(),
            rails_bin: cli.rails_bin.clone(),
            concurrency: cli.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            media_days: cli.media_days.unwrap_or(DEFAULT_MEDIA_DAYS),
            profile_media_days: cli.profile_media_days.unwrap_or(DEFAULT_PROFILE_MEDIA_DAYS),
            preview_cards_days: cli.preview_cards_days.unwrap_or(DEFAULT_PREVIEW_CARDS_DAYS),
            statuses_days: cli.statuses_days.unwrap_or(DEFAULT_STATUSES_DAYS),
            dry_run: cli.dry_run,
            include_subdomains: cli.include_subdomains,
            verbose: cli.verbose,
            log_file: cli.log_file,
        };

        if !(1..=32).contains(&config.concurrency) {
            bail!(
                "--concurrency must be between 1 and 32, got {}",
                config.concurrency
            );
        }
        let retention = [
            ("--media-days", config.media_days),
            ("--profile-media-days", config.profile_media_days),
            ("--preview-cards-days", config.preview_cards_days),
            ("--statuses-days", config.statuses_days),
        ];
        for (flag, value) in retention {
            if !(1..=365).contains(&value) {
                bail!("{flag} must be between 1 and 365, got {value}");
            }
        }

        Ok(config)
    }

    pub fn domains_file(&self) -> PathBuf {
        self.root.join(BLOCKED_DOMAINS_FILE)
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests(root: PathBuf) -> Self {
        Self {
            root,
            tootctl_bin: "tootctl".to_string(),
            rails_bin: "rails".to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            media_days: DEFAULT_MEDIA_DAYS,
            profile_media_days: DEFAULT_PROFILE_MEDIA_DAYS,
            preview_cards_days: DEFAULT_PREVIEW_CARDS_DAYS,
            statuses_days: DEFAULT_STATUSES_DAYS,
            dry_run: false,
            include_subdomains: false,
            verbose: false,
            log_file: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Config> {
        let mut argv = vec!["mastomaint"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("arguments should parse");
        Config::from_cli(&cli)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--media"]).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.media_days, 30);
        assert_eq!(config.profile_media_days, 90);
        assert_eq!(config.preview_cards_days, 180);
        assert_eq!(config.statuses_days, 365);
        assert!(!config.dry_run);
        assert!(!config.include_subdomains);
    }

    #[test]
    fn test_concurrency_bounds() {
        assert!(parse(&["--media", "--concurrency", "1"]).is_ok());
        assert!(parse(&["--media", "--concurrency", "32"]).is_ok());
        assert!(parse(&["--media", "--concurrency", "0"]).is_err());
        assert!(parse(&["--media", "--concurrency", "33"]).is_err());
    }

    #[test]
    fn test_retention_bounds() {
        for flag in [
            "--media-days",
            "--profile-media-days",
            "--preview-cards-days",
            "--statuses-days",
        ] {
            assert!(parse(&["--media", flag, "1"]).is_ok());
            assert!(parse(&["--media", flag, "365"]).is_ok());
            assert!(parse(&["--media", flag, "0"]).is_err());
            assert!(parse(&["--media", flag, "366"]).is_err());
        }
    }

    #[test]
    fn test_two_operations_rejected_at_parse() {
        let err = Cli::try_parse_from(["mastomaint", "--media", "--domains"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let err = Cli::try_parse_from(["mastomaint", "--media", "--bogus"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_malformed_integer_rejected() {
        assert!(Cli::try_parse_from(["mastomaint", "--media", "--concurrency", "many"]).is_err());
    }

    #[test]
    fn test_help_and_version_are_display_kinds() {
        let err = Cli::try_parse_from(["mastomaint", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        let err = Cli::try_parse_from(["mastomaint", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_domains_file_under_root() {
        let config = parse(&["--media", "--root", "/srv/mastodon"]).unwrap();
        assert_eq!(
            config.domains_file(),
            PathBuf::from("/srv/mastodon/blocked_domains.txt")
        );
    }
}
