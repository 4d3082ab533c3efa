use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use regex::Regex;
use std::sync::LazyLock;

use crate::config::BLOCKED_DOMAINS_FILE;
use crate::runner::{CommandSpec, Runner};

const MAX_DOMAIN_LENGTH: usize = 253;

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z][a-zA-Z0-9-]{0,61}[a-zA-Z0-9]$",
    )
    .unwrap()
});

/// Sanity check only: purge never refuses a non-empty entry, it just warns
/// when the name does not look like a hostname.
pub fn looks_like_domain(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_DOMAIN_LENGTH && DOMAIN_RE.is_match(name)
}

/// Parses one line of the blocked-domains file. `None` means the line carries
/// no entry at all (blank or `#` comment). Otherwise the entry is the first
/// comma-separated field, trimmed; it may reduce to an empty string, which the
/// caller warns about and skips.
pub fn parse_entry(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let name = match line.split_once(',') {
        Some((first, _)) => first,
        None => line,
    };
    Some(name.trim().to_string())
}

fn export_script() -> String {
    format!(
        "names = DomainBlock.pluck(:domain).map(&:to_s).sort; \
         File.open({BLOCKED_DOMAINS_FILE:?}, 'w') {{ |f| names.each {{ |d| f.puts d }} }}; \
         puts \"exported #{{names.size}} domains\""
    )
}

/// Regenerates the hand-off file: removes any stale copy, then has the rails
/// runner write one blocked domain per line, sorted. Reports the count.
pub fn export_blocked_domains(runner: &Runner) -> bool {
    let config = runner.config();
    let path = config.domains_file();

    if path.exists() {
        if let Err(e) = std::fs::remove_file(&path) {
            error!("Failed to remove stale {}: {e}", path.display());
            return false;
        }
    }

    let spec = CommandSpec::rails_runner(config, &export_script());
    if !runner.safe_execute("Blocked-domain export", &spec) {
        return false;
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let count = content.lines().filter(|l| !l.trim().is_empty()).count();
            info!(
                "Exported {} blocked domains to {}",
                format_num(count),
                path.display()
            );
            true
        }
        Err(e) => {
            error!(
                "Export reported success but {} is unreadable: {e}",
                path.display()
            );
            false
        }
    }
}

/// Purges every domain listed in the hand-off file, one external invocation
/// per domain, with running progress and per-domain success/failure tallies.
/// A missing file is a step failure; an empty one is a vacuous success.
pub fn purge_blocked_domains(runner: &Runner) -> bool {
    let config = runner.config();
    let path = config.domains_file();

    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            error!(
                "Domain list {} is missing or unreadable ({e}); run --export-domains first",
                path.display()
            );
            return false;
        }
    };

    let mut domains: Vec<String> = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        match parse_entry(line) {
            None => continue,
            Some(name) if name.is_empty() => {
                warn!("Skipping line {}: empty domain name", line_num + 1);
            }
            Some(name) => {
                if !looks_like_domain(&name) {
                    warn!(
                        "Line {}: '{name}' does not look like a domain name",
                        line_num + 1
                    );
                }
                domains.push(name);
            }
        }
    }

    let total = domains.len();
    if total == 0 {
        warn!("Domain list {} holds no entries; nothing to purge", path.display());
        return true;
    }

    info!("Purging {} blocked domains...", format_num(total));

    let pb = if config.verbose {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        pb
    };

    let concurrency = config.concurrency.to_string();
    let mut purged = 0usize;
    let mut failed = 0usize;

    for (i, name) in domains.iter().enumerate() {
        let processed = i + 1;
        let percent = processed * 100 / total;
        pb.set_message(name.clone());
        info!("[{processed}/{total}] ({percent}%) purging {name}");

        let mut args: Vec<String> = vec![
            "domains".to_string(),
            "purge".to_string(),
            name.clone(),
            "--concurrency".to_string(),
            concurrency.clone(),
        ];
        if config.dry_run {
            args.push("--dry-run".to_string());
        }
        if config.include_subdomains {
            args.push("--include-subdomains".to_string());
        }
        let spec = CommandSpec::tootctl(config, args).domain_purge();

        if runner.safe_execute(&format!("Purge of {name}"), &spec) {
            purged += 1;
        } else {
            failed += 1;
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Domain purge complete: {purged} purged, {failed} failed ({} total)",
        format_num(total)
    );

    failed == 0
}

pub fn format_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
