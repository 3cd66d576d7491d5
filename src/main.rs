use aging_causes::{Analyzer, Config, LLMClient};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "aging-causes")]
#[command(about = "Extract causes of aging from email threads into a Markdown table")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the configured email threads
    Analyze {
        /// Configuration file path (defaults to ./aging-causes.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Email thread file; repeat to process several, replaces the configured list
        #[arg(short, long = "input", value_name = "PATH")]
        inputs: Vec<PathBuf>,

        /// Markdown output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print LLM request payloads and raw responses
        #[arg(long)]
        debug_llm: bool,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the config file (defaults to ./aging-causes.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze { config, inputs, output, debug_llm } => {
            analyze_threads(config, inputs, output, debug_llm).await?;
        }
        Commands::Config { output } => {
            generate_config(output)?;
        }
    }

    Ok(())
}

async fn analyze_threads(
    config_path: Option<PathBuf>,
    inputs: Vec<PathBuf>,
    output_path: Option<PathBuf>,
    debug_llm: bool,
) -> anyhow::Result<()> {
    println!("🚀 Starting aging-cause extraction");
    println!("==================================");

    let start_time = Instant::now();

    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("loaded environment from {}", path.display());
    }

    let mut config = if let Some(config_path) = config_path {
        Config::from_file(&config_path)?
    } else {
        Config::load()?
    };

    if !inputs.is_empty() {
        config.input_files = inputs;
    }
    if let Some(output_path) = output_path {
        config.output_file = output_path;
    }

    let client = LLMClient::new(config.llm.clone(), debug_llm)?;
    println!("🤖 Provider: {} ({})", client.provider_name(), client.model());
    println!("📤 Output file: {}", config.output_file.display());

    let analyzer = Analyzer::new(config, client);
    let summary = analyzer.run().await;

    println!("\n📊 Results:");
    println!("{}", serde_json::to_string_pretty(&summary.records)?);
    println!(
        "  Threads analyzed: {}, skipped: {}, aging causes: {}",
        summary.files_read,
        summary.files_skipped,
        summary.records.len()
    );

    match &summary.output_file {
        Some(path) => println!(
            "\n✅ Analysis complete in {:.2}s. Results written to {}",
            start_time.elapsed().as_secs_f64(),
            path.display()
        ),
        None if summary.records.is_empty() => println!("\n⚠️  No results were generated from the analysis."),
        None => println!("\n⚠️  Results could not be written; see the error above."),
    }

    Ok(())
}

fn generate_config(output_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = output_path.unwrap_or_else(|| PathBuf::from(aging_causes::config::DEFAULT_CONFIG_FILE));

    println!("📝 Generating configuration file: {}", config_path.display());

    std::fs::write(&config_path, Config::create_documented_config())?;

    println!("✅ Configuration file created successfully!");
    println!("💡 Put OPENAI_API_KEY in .env or your environment, then run 'aging-causes analyze'.");

    Ok(())
}

fn setup_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("aging_causes=info"),
        1 => EnvFilter::new("aging_causes=debug"),
        _ => EnvFilter::new("aging_causes=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stdout))
        .init();
}
