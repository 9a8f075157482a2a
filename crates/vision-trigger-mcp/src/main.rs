//! vision-trigger-mcp — entry point.

use std::sync::Arc;
use tokio::sync::Mutex;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use vision_trigger::InMemoryReferenceStore;
use vision_trigger_mcp::config::{load_policy, resolve_policy_path};
use vision_trigger_mcp::protocol::ProtocolHandler;
use vision_trigger_mcp::session::PolicySessionManager;
use vision_trigger_mcp::tools::ToolRegistry;
use vision_trigger_mcp::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "vision-trigger-mcp",
    about = "MCP server deciding per turn whether, and how, an agent should reach for reference images",
    version
)]
struct Cli {
    /// Path to a policy file (.yaml, .yml or .json).
    /// Also reads from VISION_TRIGGER_POLICY.
    #[arg(short, long, global = true)]
    policy: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Load and validate the policy file.
    Check,

    /// Run trigger detection and planning on one utterance and print the result.
    Detect {
        /// The user utterance to evaluate.
        utterance: String,
    },

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   vision-trigger-mcp completions bash > ~/.local/share/bash-completion/completions/vision-trigger-mcp
    ///   vision-trigger-mcp completions zsh > ~/.zfunc/_vision-trigger-mcp
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

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let session = PolicySessionManager::open(cli.policy.as_deref())?;
            let session = Arc::new(Mutex::new(session));
            let handler = ProtocolHandler::new(session);
            let transport = StdioTransport::new(handler);
            transport.run().await?;
        }

        Commands::Check => {
            let path = match resolve_policy_path(cli.policy.as_deref()) {
                Ok(path) => path,
                Err(e) => {
                    eprintln!("Cannot find policy: {e}");
                    std::process::exit(1);
                }
            };
            let source = path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in defaults".to_string());
            match load_policy(path.as_deref()) {
                Ok(policy) => {
                    let compiled = policy.compiled();
                    println!("Valid policy: {source}");
                    println!("  Lexical patterns: {}", compiled.pattern_count());
                    println!("  Concepts:         {}", compiled.concept_count());
                    println!("  Default backend:  {}", compiled.backend_default);
                    println!("  Use saved first:  {}", compiled.use_saved_first);
                    println!("  Lookup timeout:   {:?}", compiled.lookup_timeout);
                }
                Err(e) => {
                    eprintln!("Invalid policy {source}: {e}");
                    std::process::exit(1);
                }
            }
        }

        Commands::Detect { utterance } => {
            let path = resolve_policy_path(cli.policy.as_deref())?;
            let policy = load_policy(path.as_deref())?;
            let store = InMemoryReferenceStore::new();
            let (decision, outcome) = policy.plan_turn(&utterance, &store).await;
            let report = serde_json::json!({
                "decision": decision,
                "plan": outcome.plan,
                "warnings": outcome.warnings,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Info => {
            let capabilities = vision_trigger_mcp::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                shell,
                &mut cmd,
                "vision-trigger-mcp",
                &mut std::io::stdout(),
            );
        }

        Commands::Repl => {
            let session = PolicySessionManager::open(cli.policy.as_deref())?;
            vision_trigger_mcp::repl::run(session).await?;
        }
    }

    Ok(())
}
