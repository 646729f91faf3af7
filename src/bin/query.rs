use clap::Parser;
use game_query_orchestrator::{
    agent::Orchestrator, config::Settings, gemini::GeminiClient, tools::RawgClient,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Answer one natural-language question about video games.
#[derive(Debug, Parser)]
#[command(name = "query", version)]
struct Cli {
    /// The question to answer
    query: String,

    /// Print the full response (steps and display data) as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;
    let model = Arc::new(GeminiClient::new(
        settings.gemini_api_key.clone(),
        &settings.gemini_model,
    ));
    let data_source = Arc::new(RawgClient::from_settings(&settings)?);
    let orchestrator = Orchestrator::with_model(model, data_source);

    let response = orchestrator.run_query(&cli.query).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        for step in &response.steps {
            eprintln!("[{:?}] {}", step.kind, step.summary);
        }
        println!("{}", response.answer);
    }

    if response.success {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
