//! Toolbelt MCP Server — entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use toolbelt::{build_envelope, InvocationRequest};
use toolbelt_mcp::config::{ConfigOverrides, ServerConfig};
use toolbelt_mcp::protocol::ProtocolHandler;
use toolbelt_mcp::transport::StdioTransport;
use toolbelt_mcp::types::{InitializeResult, ToolListResult};

#[derive(Parser)]
#[command(
    name = "toolbelt-mcp",
    about = "MCP server for Toolbelt — greeting, arithmetic, time, geocoding, weather, and image tools",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags that override environment configuration.
#[derive(Args)]
struct ConfigArgs {
    /// Geocoding service base URL (env: TOOLBELT_GEOCODE_URL).
    #[arg(long, global = true)]
    geocode_url: Option<String>,

    /// Weather service base URL (env: TOOLBELT_WEATHER_URL).
    #[arg(long, global = true)]
    weather_url: Option<String>,

    /// Image generation endpoint (env: TOOLBELT_IMAGE_URL).
    #[arg(long, global = true)]
    image_url: Option<String>,

    /// Timeout for outbound HTTP calls, in seconds (env: TOOLBELT_HTTP_TIMEOUT_SECS).
    #[arg(long, global = true)]
    http_timeout: Option<u64>,

    /// Reject tool arguments the schema does not declare (env: TOOLBELT_STRICT_ARGS).
    #[arg(long, global = true)]
    strict_args: bool,
}

impl From<ConfigArgs> for ConfigOverrides {
    fn from(args: ConfigArgs) -> Self {
        Self {
            geocode_url: args.geocode_url,
            weather_url: args.weather_url,
            image_url: args.image_url,
            http_timeout_secs: args.http_timeout,
            strict_args: args.strict_args,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Start MCP server over HTTP.
    #[cfg(feature = "http")]
    ServeHttp {
        /// Listen address (host:port).
        #[arg(long, default_value = "127.0.0.1:3100")]
        addr: String,
    },

    /// Print server capabilities as JSON.
    Info,

    /// Call one tool and print the response envelope.
    ///
    /// Example:
    ///   toolbelt-mcp call calculate '{"number1": 10, "number2": 5, "operator": "+"}'
    Call {
        /// Tool name.
        tool: String,

        /// Arguments as a JSON object.
        arguments: Option<String>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   toolbelt-mcp completions bash > ~/.local/share/bash-completion/completions/toolbelt-mcp
    ///   toolbelt-mcp completions zsh > ~/.zfunc/_toolbelt-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = cli.command.unwrap_or(Commands::Serve);
    if let Commands::Completions { shell } = command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "toolbelt-mcp", &mut std::io::stdout());
        return Ok(());
    }

    let config = ServerConfig::resolve(&cli.config.into())?;
    tracing::debug!("Resolved configuration: {config:?}");
    let registry = Arc::new(
        toolbelt_mcp::build_registry(&config).context("Failed to register capabilities")?,
    );
    let handler = ProtocolHandler::new(registry);

    match command {
        Commands::Serve => {
            let transport = StdioTransport::new(handler);
            transport.run().await?;
        }

        #[cfg(feature = "http")]
        Commands::ServeHttp { addr } => {
            let transport = toolbelt_mcp::transport::HttpTransport::new(handler);
            transport.run(&addr).await?;
        }

        Commands::Info => {
            let capabilities = InitializeResult::default_result();
            let tools = ToolListResult::from_registry(handler.dispatcher().registry());
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Call { tool, arguments } => {
            let arguments = arguments
                .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
                .transpose()
                .context("Tool arguments must be valid JSON")?;
            let outcome = handler
                .dispatcher()
                .invoke(InvocationRequest::CallTool {
                    name: tool,
                    arguments,
                })
                .await;
            let envelope = build_envelope(outcome);
            println!("{}", serde_json::to_string_pretty(&envelope.to_value())?);
            if envelope.is_error() {
                std::process::exit(1);
            }
        }

        Commands::Repl => {
            let dispatcher = handler.dispatcher().clone();
            let runtime = tokio::runtime::Handle::current();
            tokio::task::spawn_blocking(move || toolbelt_mcp::repl::run(dispatcher, runtime))
                .await??;
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}
