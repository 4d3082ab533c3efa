use log::{debug, info};
use std::time::Instant;

use crate::catalog::Operation;
use crate::config::Config;
use crate::runner::Runner;

/// Executes the selected operation's steps strictly in order. Steps are
/// independent: a failure is logged and counted, and the run continues with
/// the remaining steps. The final exit code reflects whether any step failed.
pub struct MaintenanceRun {
    config: Config,
    executed: usize,
    succeeded: usize,
    failed: usize,
}

impl MaintenanceRun {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            executed: 0,
            succeeded: 0,
            failed: 0,
        }
    }

    pub fn run(&mut self, operation: Operation) -> bool {
        let start = Instant::now();
        let steps = operation.steps();
        let runner = Runner::new(&self.config);

        info!(
            "Operation {}: {} step(s)",
            operation.flag(),
            steps.len()
        );

        // Non-verbose health checks get one grouped header instead of a
        // banner per sub-check; the four invocations still run independently.
        let health_header = if self.config.verbose {
            None
        } else {
            health_header_position(steps)
        };

        for (i, step) in steps.iter().enumerate() {
            if health_header == Some(i) {
                info!("Running system health checks...");
            }
            if step.is_health_check() && !self.config.verbose {
                debug!("Step: {}", step.description());
            } else {
                info!("Step: {}", step.description());
            }

            self.executed += 1;
            if step.run(&runner) {
                self.succeeded += 1;
            } else {
                self.failed += 1;
            }
        }

        let elapsed = start.elapsed();

        println!();
        println!("{}", "=".repeat(60));
        println!("{:>35}", "SUMMARY");
        println!("{}", "=".repeat(60));
        println!("Steps executed:     {}", self.executed);
        println!("Succeeded:          {}", self.succeeded);
        println!("Failed:             {}", self.failed);
        println!("Runtime:            {:.2} seconds", elapsed.as_secs_f64());
        println!("{}", "=".repeat(60));
        println!();

        self.failed == 0
    }
}

/// Where the grouped health header belongs: immediately before the first
/// health-check step, so it sits next to the output it introduces.
fn health_header_position(steps: &[crate::steps::Step]) -> Option<usize> {
    steps.iter().position(|s| s.is_health_check())
}
