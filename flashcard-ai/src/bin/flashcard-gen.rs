//! Flashcard generation CLI
//!
//! Reads a source text file, asks the model for flashcard proposals and
//! prints the result as JSON.
//!
//! ```
//! OPENROUTER_API_KEY=your_api_key flashcard-gen notes.txt --user alice
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use dotenv::dotenv;
use log::info;

use flashcard_ai::config::layered_provider;
use flashcard_ai::error::mapping::error_body;
use flashcard_ai::generation::DEFAULT_GENERATION_TIMEOUT_MS;
use flashcard_ai::{
    GenerationConfig, GenerationService, MemoryDatastore, OpenRouterClient, OpenRouterConfig,
    ServiceError,
};

const USAGE: &str = "usage: flashcard-gen <source-text-file> [--user <id>] [--model <name>] \
                     [--timeout-ms <ms>] [--max-retries <n>]";
const DEFAULT_USER: &str = "cli-user";

struct Args {
    path: String,
    user_id: String,
    model: Option<String>,
    /// Config keys given on the command line, taking precedence over the environment
    overrides: HashMap<String, String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut path = None;
    let mut user_id = DEFAULT_USER.to_string();
    let mut model = None;
    let mut overrides = HashMap::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--user" => user_id = args.next().context("--user requires a value")?,
            "--model" => model = Some(args.next().context("--model requires a value")?),
            "--timeout-ms" => {
                let value = args.next().context("--timeout-ms requires a value")?;
                overrides.insert("openrouter_timeout_ms".to_string(), value);
            }
            "--max-retries" => {
                let value = args.next().context("--max-retries requires a value")?;
                overrides.insert("openrouter_max_retries".to_string(), value);
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ if path.is_none() => path = Some(arg),
            other => bail!("unexpected argument: {}", other),
        }
    }

    Ok(Args {
        path: path.context(USAGE)?,
        user_id,
        model,
        overrides,
    })
}

async fn run() -> anyhow::Result<()> {
    let args = parse_args()?;

    let source_text = std::fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path))?;

    let defaults = HashMap::from([(
        "openrouter_timeout_ms".to_string(),
        DEFAULT_GENERATION_TIMEOUT_MS.to_string(),
    )]);
    let config = OpenRouterConfig::from_provider(&layered_provider(args.overrides, defaults))?;
    let client = Arc::new(OpenRouterClient::new(config)?);
    let store = Arc::new(MemoryDatastore::new());

    let mut generation = GenerationConfig::new(args.user_id);
    if let Some(model) = args.model {
        generation = generation.with_model(model);
    }
    let service = GenerationService::new(client, store, generation)?;

    info!("Generating flashcards from {}", args.path);
    let response = service.generate_flashcards(&source_text).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    if let Err(err) = run().await {
        match err.downcast_ref::<ServiceError>() {
            Some(service_err) => eprintln!("{}", error_body(service_err)),
            None => eprintln!("error: {:#}", err),
        }
        std::process::exit(1);
    }
}
