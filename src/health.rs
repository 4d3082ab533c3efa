//! Inline data-layer inspection scripts handed to `rails runner`.
//!
//! Each script is one independent external invocation; the runner owns the
//! application's data layer and prints human-readable lines. Failure is
//! signalled the same way as any other step, via the process exit status.

pub const INFO_SCRIPT: &str = r##"puts "Instance: #{Rails.configuration.x.local_domain}"; puts "Mastodon #{Mastodon::Version}"; puts "Registered users: #{User.count}""##;

pub const STATS_SCRIPT: &str = r##"puts "Accounts: #{Account.count} (local: #{Account.local.count})"; puts "Statuses: #{Status.count}"; puts "Media attachments: #{MediaAttachment.count}""##;

pub const QUEUE_SCRIPT: &str = r##"require "sidekiq/api"; stats = Sidekiq::Stats.new; puts "Enqueued: #{stats.enqueued}, busy: #{stats.workers_size}, failed: #{stats.failed}"; Sidekiq::Queue.all.each { |q| puts "  #{q.name}: #{q.size} (latency #{q.latency.round(1)}s)" }"##;

pub const CACHE_SCRIPT: &str = r##"puts "Cache ping: #{Rails.cache.redis.with { |c| c.ping }}""##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_are_single_argv_entries() {
        // Each script travels as one argument to `rails runner`.
        for script in [INFO_SCRIPT, STATS_SCRIPT, QUEUE_SCRIPT, CACHE_SCRIPT] {
            assert!(!script.contains('\n'));
            assert!(!script.is_empty());
        }
    }
}
