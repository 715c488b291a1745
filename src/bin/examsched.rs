//! Command-line front end: reads a scheduling request and prints the
//! response.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use u_examsched::schedule::{ScheduleRequest, ScheduleRunner, SchedulerConfig};

#[derive(Parser)]
#[command(name = "examsched")]
#[command(about = "Exam timetabling with a constraint model.")]
struct CommandLine {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a request and print the response as JSON
    #[command(alias = "s")]
    Solve {
        /// Request file; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the time limit in milliseconds
        #[arg(long)]
        time_limit_ms: Option<u64>,
        /// Pretty-print the response
        #[arg(long)]
        pretty: bool,
    },
    /// Print an example request
    #[command(alias = "f")]
    Format,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_request(input: Option<&PathBuf>) -> anyhow::Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading request from {}", path.display())),
        None => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("reading request from stdin")?;
            Ok(body)
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    match CommandLine::parse().command {
        Commands::Solve {
            input,
            config,
            time_limit_ms,
            pretty,
        } => {
            let mut settings = match config {
                Some(path) => SchedulerConfig::load(&path)
                    .with_context(|| format!("loading config from {}", path.display()))?,
                None => SchedulerConfig::default(),
            };
            if let Some(ms) = time_limit_ms {
                settings = settings.with_time_limit_ms(ms);
            }
            let body = read_request(input.as_ref())?;
            let response = ScheduleRunner::solve_json(&body, &settings);
            let out = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{out}");
            Ok(())
        }
        Commands::Format => {
            println!(
                "{}",
                serde_json::to_string_pretty(&ScheduleRequest::sample())?
            );
            Ok(())
        }
    }
}
