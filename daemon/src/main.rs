//! fundrelay daemon: entry point for running a ledger node, a verification
//! relay, or both in one process for local development.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser};
use fundrelay_node::{LedgerNode, NodeConfig};
use fundrelay_relay::{
    build_source, DecisionPolicy, HttpLedgerClient, LocalEventSource, LocalLedgerClient,
    RelayConfig, RelayService, WsEventSource,
};
use fundrelay_types::{Address, SystemClock};
use fundrelay_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "fundrelay-daemon", about = "Milestone crowdfunding ledger and verification relay")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Path to a TOML configuration file. File settings are the base; CLI
    /// flags and env vars override them.
    #[arg(long, global = true, env = "FUNDRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter, e.g. "info" or "debug,fundrelay_relay=trace".
    #[arg(long, global = true, env = "FUNDRELAY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output: "human" or "json".
    #[arg(long, global = true, env = "FUNDRELAY_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Ledger node commands.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Verification relay commands.
    #[command(name = "relay")]
    Relay {
        #[command(subcommand)]
        action: RelayAction,
    },
    /// Node and relay in one process, wired in memory.
    #[command(name = "dev")]
    Dev {
        #[command(subcommand)]
        action: DevAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node.
    Run(NodeArgs),
    /// Print the effective configuration as TOML.
    Config(NodeArgs),
}

#[derive(clap::Subcommand)]
enum RelayAction {
    /// Run the relay against a node.
    Run(RelayArgs),
    /// Print the effective configuration as TOML.
    Config(RelayArgs),
}

#[derive(clap::Subcommand)]
enum DevAction {
    /// Run a dev node with an in-process relay.
    Run(DevArgs),
}

#[derive(Args)]
struct NodeArgs {
    /// Interface for the RPC server.
    #[arg(long, env = "FUNDRELAY_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// RPC server port.
    #[arg(long, env = "FUNDRELAY_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Ledger snapshot file.
    #[arg(long, env = "FUNDRELAY_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Owner of the verification authority.
    #[arg(long, env = "FUNDRELAY_OWNER")]
    owner: Option<Address>,

    /// Enable the faucet endpoint.
    #[arg(long, env = "FUNDRELAY_ENABLE_FAUCET")]
    faucet: bool,

    /// Allowed CORS origins (comma-separated).
    #[arg(long, env = "FUNDRELAY_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,
}

#[derive(Args)]
struct RelayArgs {
    /// Base URL of the node's RPC API.
    #[arg(long, env = "FUNDRELAY_LEDGER_URL")]
    ledger_url: Option<String>,

    /// Account the relay acts as.
    #[arg(long, env = "FUNDRELAY_PROVIDER")]
    provider: Option<Address>,

    /// Port for the relay's /metrics and /health endpoint.
    #[arg(long, env = "FUNDRELAY_RELAY_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Replay verification requests from this event sequence.
    #[arg(long, env = "FUNDRELAY_REPLAY_FROM")]
    replay_from: Option<u64>,

    /// Timeout for calls to the node, in milliseconds.
    #[arg(long, env = "FUNDRELAY_LEDGER_TIMEOUT_MS")]
    ledger_timeout_ms: Option<u64>,

    /// Use this signal instead of calling the data source.
    #[arg(long, env = "FUNDRELAY_FIXED_SIGNAL")]
    fixed_signal: Option<u64>,
}

#[derive(Args)]
struct DevArgs {
    /// RPC server port.
    #[arg(long, default_value_t = 7070, env = "FUNDRELAY_RPC_PORT")]
    rpc_port: u16,

    /// Ledger snapshot file. In-memory when omitted.
    #[arg(long, env = "FUNDRELAY_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Verify every milestone without calling the data source.
    #[arg(long)]
    always_verify: bool,
}

fn load_node_config(path: Option<&PathBuf>) -> anyhow::Result<NodeConfig> {
    match path {
        Some(path) => NodeConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("loading node config from {}", path.display())),
        None => Ok(NodeConfig::default()),
    }
}

fn load_relay_config(path: Option<&PathBuf>) -> anyhow::Result<RelayConfig> {
    match path {
        Some(path) => RelayConfig::from_toml_file(&path.to_string_lossy())
            .with_context(|| format!("loading relay config from {}", path.display())),
        None => Ok(RelayConfig::default()),
    }
}

fn node_config(cli: &GlobalArgs, args: NodeArgs) -> anyhow::Result<NodeConfig> {
    let file = load_node_config(cli.config.as_ref())?;
    Ok(NodeConfig {
        listen_addr: args.listen_addr.unwrap_or(file.listen_addr),
        rpc_port: args.rpc_port.unwrap_or(file.rpc_port),
        snapshot_path: args.snapshot.or(file.snapshot_path),
        owner: args.owner.unwrap_or(file.owner),
        enable_faucet: args.faucet || file.enable_faucet,
        cors_origins: if args.cors_origins.is_empty() {
            file.cors_origins
        } else {
            args.cors_origins
        },
        log_format: cli.log_format.unwrap_or(file.log_format),
        log_level: cli.log_level.clone().unwrap_or(file.log_level),
        ..file
    })
}

fn relay_config(cli: &GlobalArgs, args: RelayArgs) -> anyhow::Result<RelayConfig> {
    let file = load_relay_config(cli.config.as_ref())?;
    let mut config = RelayConfig {
        ledger_url: args.ledger_url.unwrap_or(file.ledger_url),
        provider: args.provider.unwrap_or(file.provider),
        metrics_port: args.metrics_port.or(file.metrics_port),
        replay_from: args.replay_from.or(file.replay_from),
        ledger_timeout_ms: args.ledger_timeout_ms.unwrap_or(file.ledger_timeout_ms),
        log_format: cli.log_format.unwrap_or(file.log_format),
        log_level: cli.log_level.clone().unwrap_or(file.log_level),
        ..file
    };
    if args.fixed_signal.is_some() {
        config.data_source.fixed_signal = args.fixed_signal;
    }
    config.validate()?;
    Ok(config)
}

async fn run_node(config: NodeConfig) -> anyhow::Result<()> {
    init_logging(config.log_format, &config.log_level);
    tracing::info!(
        rpc = %format!("{}:{}", config.listen_addr, config.rpc_port),
        snapshot = ?config.snapshot_path,
        faucet = config.enable_faucet,
        "starting ledger node"
    );

    let mut node = LedgerNode::new(config, Arc::new(SystemClock))?;
    node.start().await?;

    node.shutdown_controller().wait_for_signal().await;
    tracing::info!("shutdown signal received, stopping node");
    node.stop().await?;

    tracing::info!("fundrelay node exited cleanly");
    Ok(())
}

async fn run_relay(config: RelayConfig) -> anyhow::Result<()> {
    init_logging(config.log_format, &config.log_level);
    tracing::info!(
        ledger = %config.ledger_url,
        provider = %config.provider,
        "starting verification relay"
    );

    let ledger = Arc::new(HttpLedgerClient::new(
        &config.ledger_url,
        config.provider,
        config.ledger_timeout(),
    )?);
    let from = match config.replay_from {
        Some(from) => from,
        None => ledger
            .next_sequence()
            .await
            .context("reading the ledger's event position")?,
    };
    let events = WsEventSource::new(config.event_feed_url(), from, config.reconnect_delay());
    let source = build_source(&config.data_source)?;

    let mut service = RelayService::new(config, source, ledger)?;
    service
        .start(Box::new(events))
        .await
        .context("relay startup failed")?;

    service.shutdown_controller().wait_for_signal().await;
    tracing::info!("shutdown signal received, stopping relay");
    service.stop().await?;

    tracing::info!("fundrelay relay exited cleanly");
    Ok(())
}

async fn run_dev(cli: &GlobalArgs, args: DevArgs) -> anyhow::Result<()> {
    let file = load_node_config(cli.config.as_ref())?;
    let node_config = NodeConfig {
        rpc_port: args.rpc_port,
        snapshot_path: args.snapshot.or(file.snapshot_path),
        log_format: cli.log_format.unwrap_or(file.log_format),
        log_level: cli.log_level.clone().unwrap_or(file.log_level),
        ..NodeConfig::dev()
    };
    init_logging(node_config.log_format, &node_config.log_level);

    let owner = node_config.owner;
    let mut node = LedgerNode::new(node_config, Arc::new(SystemClock))?;
    node.start().await?;

    let mut relay_config = RelayConfig {
        provider: owner,
        ..RelayConfig::default()
    };
    if args.always_verify {
        relay_config.policy = DecisionPolicy::Constant { verified: true };
        relay_config.data_source.fixed_signal = Some(0);
    }
    let source = build_source(&relay_config.data_source)?;
    let ledger = Arc::new(LocalLedgerClient::new(node.chain().clone(), owner));
    let events = LocalEventSource::live(node.chain().clone()).await;

    let mut relay = RelayService::new(relay_config, source, ledger)?;
    relay
        .start(Box::new(events))
        .await
        .context("relay startup failed")?;

    tracing::info!(
        addr = ?node.local_addr(),
        %owner,
        "dev ledger and relay running"
    );
    node.shutdown_controller().wait_for_signal().await;

    relay.stop().await?;
    node.stop().await?;
    tracing::info!("fundrelay dev exited cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli { global, command } = Cli::parse();

    match command {
        Command::Node { action } => match action {
            NodeAction::Run(args) => run_node(node_config(&global, args)?).await,
            NodeAction::Config(args) => {
                print!("{}", node_config(&global, args)?.to_toml_string());
                Ok(())
            }
        },
        Command::Relay { action } => match action {
            RelayAction::Run(args) => run_relay(relay_config(&global, args)?).await,
            RelayAction::Config(args) => {
                print!("{}", relay_config(&global, args)?.to_toml_string());
                Ok(())
            }
        },
        Command::Dev { action } => match action {
            DevAction::Run(args) => run_dev(&global, args).await,
        },
    }
}
