use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use paylog::config::{load_config, PaylogConfig};
use paylog::context::{self, ContextKey, RequestContext};
use paylog::masking::MaskingEngine;
use paylog::propagation::BlockingPropagation;

#[derive(Parser)]
#[command(name = "paylog-cli")]
#[command(about = "Masking and propagation tooling for paylog services", long_about = None)]
struct Cli {
    /// Config file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mask TEXT, or stdin when TEXT is omitted
    Mask { text: Option<String> },
    /// Load and validate a config file
    CheckConfig { path: PathBuf },
    /// Call URL with correlation headers attached
    Probe {
        url: String,
        #[arg(long)]
        correlation_id: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Mask { text } => {
            let config = match &cli.config {
                Some(path) => load_config(path)?,
                None => PaylogConfig::default(),
            };
            let masker = MaskingEngine::from_config(&config.masking)?;
            let input = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            print!("{}", masker.mask(&input));
            if !input.ends_with('\n') {
                println!();
            }
        }
        Commands::CheckConfig { path } => match load_config(&path) {
            Ok(config) => {
                println!("{} is valid", path.display());
                println!("{}", toml::to_string_pretty(&config)?);
            }
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        Commands::Probe {
            url,
            correlation_id,
        } => {
            let correlation_id = correlation_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let ctx = RequestContext::new().with(ContextKey::CorrelationId, correlation_id.as_str());
            let client = reqwest::blocking::Client::new();
            let response = context::sync_scope(ctx, || client.get(&url).with_context().send())?;

            println!("correlation_id: {correlation_id}");
            println!("status: {}", response.status());
            if let Some(echoed) = response.headers().get("x-correlation-id") {
                println!("echoed: {}", echoed.to_str().unwrap_or("<invalid>"));
            }
            println!("{}", response.text()?);
        }
    }

    Ok(())
}
