mod loader;

use clap::{Args, Parser, Subcommand};
use condense_common::{logger, AppConfig, CondenseError, Result, ServiceError};
use condense_llm::Summarizer;
use condense_mapreduce::{chunk_documents, estimator_for, summarize_documents, PipelineConfig, SizeEstimator};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use crate::loader::load_documents;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "condense")]
#[command(about = "Condense - map-reduce summarization of long documents", long_about = None)]
struct Cli {
    /// Config file (defaults to ./condense.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize documents into a single summary
    Summarize {
        /// Text files or directories, in order (`-` reads stdin)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// Print the full run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how documents would be chunked, without calling the LLM
    Plan {
        /// Text files or directories, in order (`-` reads stdin)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Check that the configured LLM endpoint is reachable
    Check,
}

/// Command line overrides applied on top of the loaded configuration
#[derive(Args)]
struct Overrides {
    /// Maximum chunk length in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared between consecutive chunks
    #[arg(long)]
    overlap: Option<usize>,

    /// Token budget of one combine call
    #[arg(long)]
    token_budget: Option<usize>,

    /// Maximum reduction rounds
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Maximum concurrent LLM calls
    #[arg(long)]
    concurrency: Option<usize>,

    /// LLM model name
    #[arg(long)]
    model: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(overlap) = self.overlap {
            config.chunk_overlap = overlap;
        }
        if let Some(token_budget) = self.token_budget {
            config.token_budget = token_budget;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(model) = self.model {
            config.llm_model = model;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env early so CONDENSE_* variables reach the config loader
    load_dotenv_from_project_root();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            eprintln!("condense: {}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Summarize { paths, overrides, json } => {
            let config = AppConfig::load_with(cli.config.as_deref(), |c| overrides.apply(c))?;
            logger::setup_logging(config.log_dir.as_deref(), &config.log_level)?;

            summarize(&config, &paths, json).await
        }
        Commands::Plan { paths, overrides } => {
            let config = AppConfig::load_with(cli.config.as_deref(), |c| overrides.apply(c))?;
            logger::setup_logging(config.log_dir.as_deref(), &config.log_level)?;

            plan(&config, &paths).await
        }
        Commands::Check => {
            let config = AppConfig::load(cli.config.as_deref())?;
            logger::setup_logging(config.log_dir.as_deref(), &config.log_level)?;

            check(&config).await
        }
    }
}

async fn summarize(config: &AppConfig, paths: &[PathBuf], json: bool) -> Result<()> {
    tracing::info!("Condense starting...");
    tracing::info!("  Backend: {:?} ({})", config.llm_backend, config.llm_base_url);
    tracing::info!("  Model: {}", config.llm_model);

    let documents = load_documents(paths).await?;
    let summarizer = Summarizer::from_config(config)?;
    let estimator = estimator_for(config.estimator)?;
    let pipeline = PipelineConfig::from_app_config(config);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding calls");
            on_signal.cancel();
        }
    });

    let report = summarize_documents(&summarizer, estimator.as_ref(), &documents, &pipeline, &cancel).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary.text);
    }

    Ok(())
}

async fn plan(config: &AppConfig, paths: &[PathBuf]) -> Result<()> {
    let documents = load_documents(paths).await?;
    let estimator = estimator_for(config.estimator)?;
    let chunker = PipelineConfig::from_app_config(config).chunker()?;

    let chunks = chunk_documents(&documents, &chunker);
    if chunks.is_empty() {
        return Err(CondenseError::invalid_input("no document text to summarize"));
    }

    println!("{:>6}  {:<40} {:>8} {:>8}", "chunk", "document", "chars", "tokens");
    let mut total_tokens = 0;
    for chunk in &chunks {
        let tokens = estimator.estimate(&chunk.text);
        total_tokens += tokens;
        println!(
            "{:>6}  {:<40} {:>8} {:>8}",
            chunk.index,
            documents[chunk.document].label(),
            chunk.char_len(),
            tokens
        );
    }
    println!("{} chunk(s), ~{} tokens", chunks.len(), total_tokens);

    Ok(())
}

async fn check(config: &AppConfig) -> Result<()> {
    let summarizer = Summarizer::from_config(config)?;

    if summarizer.client().test_connection().await? {
        println!("{} is reachable (model {})", config.llm_base_url, summarizer.model());
        Ok(())
    } else {
        Err(ServiceError::Network(format!("LLM endpoint {} is not reachable", config.llm_base_url)).into())
    }
}
