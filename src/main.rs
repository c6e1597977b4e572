use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pixelsmith::config::{load_config, save_config, ServerConfig, CONFIG_FILENAME};
use pixelsmith::mcp::{CancellationToken, McpServer};

/// MCP server core for image toolkits.
#[derive(Parser)]
#[command(name = "pixelsmith", about = "MCP server core for image toolkits")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the stdio MCP server
    Serve {
        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the prompts a configuration would register
    Prompts {
        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write a default configuration file
    Init {
        /// Destination path (default: ./pixelsmith.json)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Protocol frames own stdout; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> pixelsmith::errors::Result<()> {
    match cli.command {
        Commands::Serve { config } => {
            let config = load(config)?;
            let server = build_server(&config)?;

            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupt received, shutting down");
                    signal_token.cancel();
                }
            });

            server.run(shutdown).await?;
        }
        Commands::Prompts { config } => {
            let config = load(config)?;
            if config.prompts.is_empty() {
                println!("No prompts configured");
            } else {
                for prompt in &config.prompts {
                    println!("{} - {}", prompt.name, prompt.description);
                    for arg in &prompt.arguments {
                        let required = if arg.required { "required" } else { "optional" };
                        println!("  {} ({}): {}", arg.name, required, arg.description);
                    }
                }
            }
        }
        Commands::Init { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
            save_config(&path, &ServerConfig::default())?;
            println!("Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}

fn load(path: Option<PathBuf>) -> pixelsmith::errors::Result<ServerConfig> {
    let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
    load_config(&path)
}

/// Builds a server from the configuration.
///
/// Tool registration is the embedding toolkit's job; the binary serves the
/// configured prompts plus the built-in diagnostics tool.
fn build_server(config: &ServerConfig) -> pixelsmith::errors::Result<McpServer> {
    let mut builder = McpServer::builder(config.server_name.as_str(), config.server_version.as_str())
        .max_response_chars(config.max_response_chars);
    for prompt in &config.prompts {
        builder = builder.prompt(prompt.clone())?;
    }
    Ok(builder.build())
}
