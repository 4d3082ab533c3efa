mod catalog;
mod config;
mod domain;
mod health;
mod pipeline;
mod runner;
mod steps;

use clap::error::ErrorKind;
use clap::Parser;
use config::{Cli, Config};
use log::info;
use std::io::Write;
use std::process;
use std::sync::Mutex;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            // Informational output keeps exit code 0; real parse errors are
            // usage errors and exit 1.
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                return;
            }
            _ => {
                let _ = e.print();
                process::exit(1);
            }
        },
    };

    if cli.list_operations {
        catalog::print_operations();
        return;
    }

    let log_file = if cli.log_file {
        let name = format!(
            "maintenance_{}.log",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        match std::fs::File::create(&name) {
            Ok(f) => Some((name, Mutex::new(f))),
            Err(e) => {
                eprintln!("Failed to create log file {name}: {e}");
                process::exit(1);
            }
        }
    } else {
        None
    };
    let session_log = log_file.as_ref().map(|(name, _)| name.clone());

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format(move |buf, record| {
            let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
            if let Some((_, file)) = &log_file {
                if let Ok(mut f) = file.lock() {
                    let _ = writeln!(f, "{ts} - {} - {}", record.level(), record.args());
                }
            }
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{ts} - {style}{}{style:#} - {}",
                record.level(),
                record.args()
            )
        })
        .init();

    if let Some(name) = session_log {
        info!("Mirroring log output to {name}");
    }

    let config = match Config::from_cli(&cli) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e:#}");
            process::exit(1);
        }
    };

    let operation = match catalog::select(&cli) {
        Ok(op) => op,
        Err(e) => {
            log::error!("{e:#}");
            process::exit(1);
        }
    };

    println!();
    println!("{}", "=".repeat(60));
    println!("{:>38}", "MASTOMAINT INSTANCE MAINTENANCE v1.2");
    println!("{}", "=".repeat(60));
    println!();

    if let Err(e) = runner::check_prerequisites(&config) {
        log::error!("{e:#}");
        process::exit(1);
    }

    let mut run = pipeline::MaintenanceRun::new(config);
    if !run.run(operation) {
        process::exit(1);
    }
}
