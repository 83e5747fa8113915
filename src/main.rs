// Entrypoint: resolve inputs (arguments first, interactive prompts for
// whatever is missing), then hand the batch to the orchestrator.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use fusara_modify::api::{ApiClient, ApiConfig};
use fusara_modify::batch::BatchOrchestrator;
use fusara_modify::cli::{Cli, RunPlan};
use fusara_modify::config::{config_path, default_out_dir, resolve_api_key};
use fusara_modify::lifecycle::{PollPolicy, ThreadSleep};
use fusara_modify::report::Console;
use fusara_modify::retriever::AssetRetriever;
use fusara_modify::ui;

fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let out_dir = cli.out.clone().unwrap_or_else(default_out_dir);

    ui::banner(&format!(
        "FUSARA {} GENERATOR",
        cli.mode.as_str().to_uppercase()
    ));
    println!("Model: {}", cli.model.display_name());

    let api_key = resolve_api_key(
        cli.api_key.as_deref(),
        Cli::env_api_key().as_deref(),
        &config_path(),
        ui::ask_api_key,
    )?;
    let config = ApiConfig {
        base_url: cli.base_url.clone(),
        api_key,
        insecure: cli.insecure,
    };
    let client = ApiClient::new(&config)?;
    println!("Endpoint: {}\n", client.generate_url());

    let requests = match cli.plan_run(ui::ask_multiline_prompts, ui::ask_presets_interactive)? {
        RunPlan::NoPrompts => {
            println!("No prompts.");
            return Ok(());
        }
        RunPlan::Rejected(e) => {
            println!("{e}");
            return Ok(());
        }
        RunPlan::Ready {
            requests,
            references,
        } => {
            println!("\nPrompts: {}", requests.len());
            println!("References: {references}");
            requests
        }
    };
    if !cli.yes && !ui::confirm_run(cli.mode.as_str())? {
        return Ok(());
    }

    let policy = PollPolicy {
        interval: Duration::from_secs(cli.poll_interval.max(1)),
        ceiling: Duration::from_secs(cli.timeout),
    };
    let retriever = AssetRetriever::new(&out_dir);
    let sleeper = ThreadSleep;
    let orchestrator = BatchOrchestrator::new(&client, &sleeper, policy, &retriever);

    let mut console = Console::new();
    let result = orchestrator.run(&requests, &mut console)?;
    drop(console);

    println!();
    ui::banner(&format!(
        "Done! {} images in {} ({}/{} tasks succeeded)",
        result.saved.len(),
        retriever.out_dir().display(),
        result.succeeded,
        result.submitted
    ));
    Ok(())
}
