use clap::{ArgAction, Parser, Subcommand};
use rmcp::{transport::stdio, ServiceExt};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use interbase::config::ServerConfig;
use interbase::error::ToolError;
use interbase::logging::{init_logging, LogLevel, LoggingConfig};
use interbase::mcp::InstrumentedServer;
use interbase::metrics::MetricsRegistry;

#[derive(Parser, Debug)]
#[command(name = "interbase")]
#[command(version)]
#[command(about = "Structured tool errors and call instrumentation for MCP servers")]
struct Cli {
    /// Suppress all output except errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short, action = ArgAction::Count, global = true, conflicts_with = "quiet")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the instrumented MCP server over stdio
    McpServer {
        /// Path to a TOML configuration file
        #[arg(long, short, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Classify a structured tool error payload
    Classify {
        /// JSON payload as returned in a tool error result
        payload: String,
    },
}

mod exit_codes {
    use std::process::ExitCode;

    /// The payload is not a structured tool error
    pub fn invalid_payload() -> ExitCode {
        ExitCode::from(2)
    }
}

/// `-q` and `-v` win over the configured level when given.
fn logging_config(cli: &Cli, config: &ServerConfig) -> LoggingConfig {
    if cli.quiet {
        LoggingConfig::new()
            .with_level(LogLevel::Error)
            .with_timestamps(config.logging.timestamps)
    } else if cli.verbose > 0 {
        LoggingConfig::from_verbosity(cli.verbose).with_timestamps(config.logging.timestamps)
    } else {
        config.logging.to_logging_config()
    }
}

fn classify(payload: &str) -> ExitCode {
    match ToolError::from_json(payload) {
        Ok(err) => {
            println!("kind: {}", err.kind);
            println!("recoverable: {}", err.recoverable);
            println!(
                "advice: {}",
                if err.recoverable { "retry" } else { "do-not-retry" }
            );
            println!("message: {}", err.message);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("not a structured tool error: {}", e);
            exit_codes::invalid_payload()
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::McpServer { config } => {
            let server_config = ServerConfig::load(config.as_deref())?;

            // stdout carries the MCP protocol; logs go to stderr.
            init_logging(logging_config(&cli, &server_config))?;

            let registry = Arc::new(MetricsRegistry::new());
            let server = InstrumentedServer::from_config(&server_config, registry);
            tracing::info!(
                name = %server_config.server.name,
                tools = ?server.tool_names(),
                "starting MCP server"
            );

            let service = server.serve(stdio()).await.map_err(|e| {
                tracing::error!("Error starting MCP server: {}", e);
                e
            })?;
            service.waiting().await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Classify { payload } => {
            if cli.quiet || cli.verbose > 0 {
                init_logging(logging_config(&cli, &ServerConfig::default()))?;
            }
            Ok(classify(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_quiet_still_logs_errors() {
        let cli = parse(&["interbase", "-q", "mcp-server"]);
        let logging = logging_config(&cli, &ServerConfig::default());
        assert_eq!(logging.level, LogLevel::Error);
    }

    #[test]
    fn test_verbose_overrides_configured_level() {
        let mut config = ServerConfig::default();
        config.logging.level = LogLevel::Warn;

        let cli = parse(&["interbase", "-vv", "mcp-server"]);
        assert_eq!(logging_config(&cli, &config).level, LogLevel::Trace);

        let cli = parse(&["interbase", "mcp-server"]);
        assert_eq!(logging_config(&cli, &config).level, LogLevel::Warn);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["interbase", "-q", "-v", "classify", "{}"]).is_err());
    }
}
