use anyhow::Result;
use clap::Parser;
use colored::*;
use std::time::Duration;

use testing_tools::output::print_test_summary;
use testing_tools::scenarios::{self, Target};

#[derive(Parser)]
#[command(name = "sse-test-client")]
#[command(about = "End-to-end probe for the event stream server")]
struct Cli {
    /// Base URL of the server (e.g., http://localhost:8080)
    #[arg(long)]
    base_url: String,

    /// Shared token to present as `Authorization: Bearer <token>`
    #[arg(long)]
    token: Option<String>,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Seconds to wait for each data event
    #[arg(long, default_value_t = 5)]
    event_timeout_secs: u64,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone)]
enum ScenarioChoice {
    /// Request a bounded stream and check greeting, ids and closure
    Bounded,
    /// Reconnect with Last-Event-ID and compare the replayed payload
    Resume,
    /// Check that an open stream shows up on /status
    Status,
    /// Check that a missing token is refused (needs --token)
    Unauthorized,
    /// Run every scenario
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());
    println!("{} Target: {}", "→".blue(), cli.base_url);

    let target = Target {
        base_url: cli.base_url.trim_end_matches('/').to_string(),
        token: cli.token,
        client: reqwest::Client::new(),
        event_timeout: Duration::from_secs(cli.event_timeout_secs),
    };

    println!("\n{}", "=== TEST PHASE ===".bright_white().bold());

    let mut results = Vec::new();

    match cli.scenario {
        ScenarioChoice::Bounded => results.push(scenarios::test_bounded_stream(&target).await?),
        ScenarioChoice::Resume => results.push(scenarios::test_resume(&target).await?),
        ScenarioChoice::Status => results.push(scenarios::test_status(&target).await?),
        ScenarioChoice::Unauthorized => {
            results.push(scenarios::test_unauthorized(&target).await?)
        }
        ScenarioChoice::All => {
            results.push(scenarios::test_bounded_stream(&target).await?);
            results.push(scenarios::test_resume(&target).await?);
            results.push(scenarios::test_status(&target).await?);
            results.push(scenarios::test_unauthorized(&target).await?);
        }
    }

    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All tests passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some tests failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
