use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sabhalekh_core::config_file::{self, ConfigFile};
use sabhalekh_core::{
    InMemoryStore, MemoryStore, MockModel, ModelClient, ModelPacer, OpenRouterClient, Page,
    RetryPolicy, SqliteStore,
};
use sabhalekh_extract::{DocumentProcessor, ProcessorOptions};
use sabhalekh_parsing::{AnchorPatterns, MatcherConfig};

mod output;

use output::ColorMode;

/// Digitize scanned legislative-session (kramank) documents from OCR output.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a kramank folder containing `ocr_results.json`
    Process {
        /// Folder with the OCR page dump for one kramank
        folder: PathBuf,

        /// Where to write the structured record (default: <folder>/kramank.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// OpenRouter API key (falls back to OPENROUTER_API_KEY, then config)
        #[arg(long)]
        api_key: Option<String>,

        /// Model id (falls back to config, then the built-in default)
        #[arg(long)]
        model: Option<String>,

        /// Segment and classify only; skip every model call
        #[arg(long)]
        dry_run: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Clear the extractors' trailing memory from the configured store
    ClearMemory,
}

const DEFAULT_MODEL: &str = "sarvamai/sarvam-m:free";

const MEMORY_KEYS: &[&str] = &[
    "sabhalekh:memory:members",
    "sabhalekh:memory:resolutions",
    "sabhalekh:memory:index",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config_file::load_config();

    match cli.command {
        Command::Process {
            folder,
            output,
            api_key,
            model,
            dry_run,
            no_color,
        } => process(config, folder, output, api_key, model, dry_run, no_color).await,
        Command::ClearMemory => clear_memory(config),
    }
}

#[allow(clippy::too_many_arguments)]
async fn process(
    config: ConfigFile,
    folder: PathBuf,
    output: Option<PathBuf>,
    api_key: Option<String>,
    model: Option<String>,
    dry_run: bool,
    no_color: bool,
) -> anyhow::Result<()> {
    let pages = read_pages(&folder)?;
    tracing::info!(pages = pages.len(), folder = %folder.display(), "loaded OCR pages");

    let model_cfg = config.model.clone().unwrap_or_default();
    let extraction_cfg = config.extraction.clone().unwrap_or_default();
    let matching_cfg = config.matching.clone().unwrap_or_default();
    let anchor_cfg = config.anchors.clone().unwrap_or_default();

    // Resolve configuration: CLI flags > env vars > config file > defaults.
    let api_key = api_key
        .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
        .or(model_cfg.api_key);
    let model_id = model
        .or(model_cfg.model)
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let client: Box<dyn ModelClient> = if dry_run {
        // Never called on a dry run; a scripted empty model keeps the
        // processor's wiring uniform.
        Box::new(MockModel::replying([]))
    } else {
        let api_key = api_key.ok_or_else(|| {
            anyhow::anyhow!(
                "no API key: pass --api-key, set OPENROUTER_API_KEY, or add [model] api_key to the config"
            )
        })?;
        let mut client = OpenRouterClient::new(api_key, model_id);
        if let Some(base_url) = model_cfg.base_url {
            client = client.with_base_url(base_url);
        }
        if let Some(temperature) = model_cfg.temperature {
            client = client.with_temperature(temperature);
        }
        if let Some(timeout) = model_cfg.timeout_secs {
            client = client.with_timeout(Duration::from_secs(timeout));
        }
        Box::new(client)
    };

    let store = open_store(extraction_cfg.memory_path.as_deref())?;
    let pacer = ModelPacer::new(Duration::from_secs(
        extraction_cfg.pacing_delay_secs.unwrap_or(2),
    ));
    let retry = RetryPolicy {
        max_retries: extraction_cfg.max_retries.unwrap_or(2),
        delay: Duration::from_secs(extraction_cfg.retry_delay_secs.unwrap_or(1)),
    };

    let mut options = ProcessorOptions::from_config(&extraction_cfg);
    options.dry_run = dry_run;

    let processor = DocumentProcessor {
        model: client.as_ref(),
        store: store.as_ref(),
        pacer: &pacer,
        retry,
        anchors: AnchorPatterns::from_config(&anchor_cfg)?,
        matcher: MatcherConfig::from_config(&matching_cfg),
        options,
    };

    let record = processor.process(&pages, Some(&folder)).await?;

    let output_path = output.unwrap_or_else(|| folder.join("kramank.json"));
    let json = serde_json::to_string_pretty(&record)?;
    std::fs::write(&output_path, json)?;
    tracing::info!(path = %output_path.display(), "structured record written");

    let mut stdout = std::io::stdout();
    output::print_summary(&mut stdout, &record, ColorMode(!no_color))?;
    writeln!(stdout, "\nWritten to {}", output_path.display())?;
    Ok(())
}

/// Load the OCR page dump produced by the (external) OCR step.
fn read_pages(folder: &Path) -> anyhow::Result<Vec<Page>> {
    let path = folder.join("ocr_results.json");
    if !path.exists() {
        anyhow::bail!(
            "{} not found; run OCR first to produce the page dump",
            path.display()
        );
    }
    let content = std::fs::read_to_string(&path)?;
    let pages: Vec<Page> = serde_json::from_str(&content)?;
    Ok(pages)
}

fn open_store(memory_path: Option<&str>) -> anyhow::Result<Arc<dyn MemoryStore>> {
    match memory_path {
        Some(path) => {
            let store = SqliteStore::open(Path::new(path))?;
            tracing::info!(path, "opened persistent memory store");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

fn clear_memory(config: ConfigFile) -> anyhow::Result<()> {
    let extraction_cfg = config.extraction.unwrap_or_default();
    let Some(path) = extraction_cfg.memory_path else {
        println!("No persistent memory store configured; nothing to clear.");
        return Ok(());
    };
    let store = SqliteStore::open(Path::new(&path))?;
    for key in MEMORY_KEYS {
        store.delete(key);
    }
    println!("Cleared {} memory keys from {}", MEMORY_KEYS.len(), path);
    Ok(())
}
