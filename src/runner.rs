use anyhow::{bail, Context, Result};
use log::{debug, error, info};
use std::io::ErrorKind;
use std::process::Command;

use crate::config::{Config, RAILS_ENV};

/// One external command to run: program, argument vector, and whether the
/// invocation belongs to the domain-purge family (the only family that
/// `--dry-run` suppresses).
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub domain_purge: bool,
}

impl CommandSpec {
    pub fn tootctl<I, S>(config: &Config, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: config.tootctl_bin.clone(),
            args: args.into_iter().map(Into::into).collect(),
            domain_purge: false,
        }
    }

    pub fn rails_runner(config: &Config, script: &str) -> Self {
        Self {
            program: config.rails_bin.clone(),
            args: vec!["runner".to_string(), script.to_string()],
            domain_purge: false,
        }
    }

    pub fn domain_purge(mut self) -> Self {
        self.domain_purge = true;
        self
    }

    fn render(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

pub struct Runner<'a> {
    config: &'a Config,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    /// Runs one external command synchronously with inherited stdio, so its
    /// combined output streams live. Returns whether the process exited 0.
    /// Never propagates an error past the caller; every failure path logs and
    /// returns `false`.
    pub fn safe_execute(&self, description: &str, spec: &CommandSpec) -> bool {
        if self.config.dry_run && spec.domain_purge {
            info!("[DRY RUN] {description}: would run: {}", spec.render());
            return true;
        }

        if self.config.verbose {
            debug!(
                "Executing: {} (cwd: {})",
                spec.render(),
                self.config.root.display()
            );
        }

        let status = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&self.config.root)
            .env("RAILS_ENV", RAILS_ENV)
            .status();

        match status {
            Ok(s) if s.success() => {
                debug!("{description}: completed");
                true
            }
            Ok(s) => {
                match s.code() {
                    Some(code) => error!("{description} failed with exit code {code}"),
                    None => error!("{description} was terminated by a signal"),
                }
                false
            }
            Err(e) => {
                error!("{description} could not start ({}): {e}", spec.program);
                false
            }
        }
    }
}

/// Smoke-checks the external collaborators once at startup: the admin tool
/// must answer `version` and the rails runner must execute a trivial script.
/// Output is captured rather than streamed.
pub fn check_prerequisites(config: &Config) -> Result<()> {
    if !config.root.is_dir() {
        bail!("root directory {} does not exist", config.root.display());
    }
    smoke_check(config, &config.tootctl_bin, &["version"], "tootctl")?;
    smoke_check(
        config,
        &config.rails_bin,
        &["runner", "puts \"ok\""],
        "rails runner",
    )?;
    Ok(())
}

fn smoke_check(config: &Config, program: &str, args: &[&str], what: &str) -> Result<()> {
    let output = Command::new(program)
        .args(args)
        .current_dir(&config.root)
        .env("RAILS_ENV", RAILS_ENV)
        .output();

    match output {
        Ok(o) if o.status.success() => {
            let stdout = String::from_utf8_lossy(&o.stdout);
            if let Some(first) = stdout.lines().next() {
                let first = first.trim();
                if !first.is_empty() {
                    debug!("{what} check: {first}");
                }
            }
            Ok(())
        }
        Ok(o) => bail!("{what} smoke check failed (exit status {})", o.status),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            bail!("'{program}' not found on the search path")
        }
        Err(e) => Err(e).with_context(|| format!("failed to run {what} smoke check")),
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
    fn test_successful_command_reports_success() {
        let config = config();
        let runner = Runner::new(&config);
        let spec = CommandSpec {
            program: "true".to_string(),
            args: vec![],
            domain_purge: false,
        };
        assert!(runner.safe_execute("no-op", &spec));
    }

    #[test]
    fn test_nonzero_exit_reports_failure() {
        let config = config();
        let runner = Runner::new(&config);
        let spec = CommandSpec {
            program: "false".to_string(),
            args: vec![],
            domain_purge: false,
        };
        assert!(!runner.safe_execute("failing step", &spec));
    }

    #[test]
    fn test_missing_program_reports_failure_without_panicking() {
        let config = config();
        let runner = Runner::new(&config);
        let spec = CommandSpec {
            program: "definitely-not-a-real-program-42".to_string(),
            args: vec![],
            domain_purge: false,
        };
        assert!(!runner.safe_execute("missing tool", &spec));
    }

    #[cfg(unix)]
    #[test]
    fn test_dry_run_suppresses_domain_purge_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("stub.sh");
        std::fs::write(&stub, "#!/bin/sh\necho ran >> calls.txt\n").unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = Config::for_tests(dir.path().to_path_buf());
        config.dry_run = true;
        let runner = Runner::new(&config);
        let program = stub.to_string_lossy().into_owned();

        // Domain-purge family: suppressed, still reported as success.
        let spec = CommandSpec {
            program: program.clone(),
            args: vec![],
            domain_purge: true,
        };
        assert!(runner.safe_execute("purge", &spec));
        assert!(!dir.path().join("calls.txt").exists());

        // Any other family: runs for real even under --dry-run.
        let spec = CommandSpec {
            program,
            args: vec![],
            domain_purge: false,
        };
        assert!(runner.safe_execute("media removal", &spec));
        assert!(dir.path().join("calls.txt").exists());
    }

    #[test]
    fn test_prerequisites_fail_for_missing_root() {
        let mut config = config();
        config.root = PathBuf::from("/definitely/not/a/real/dir");
        assert!(check_prerequisites(&config).is_err());
    }

    #[test]
    fn test_prerequisites_fail_for_missing_tools() {
        let mut config = config();
        config.tootctl_bin = "definitely-not-a-real-program-42".to_string();
        let err = check_prerequisites(&config).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
