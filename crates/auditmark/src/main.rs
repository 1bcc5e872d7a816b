use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use auditmark::{handle_request, initialize_root, rpc_codes, JsonRpcRequest, JsonRpcResponse};
use auditmark::{RootConfig, RootError};
use auditmark_core::{fingerprint_report, Account};

/// Auditmark: soulbound audit badges
///
/// Issues non-transferable certificates bound to the fingerprint of an
/// audit report.
#[derive(Parser, Debug)]
#[command(name = "auditmark", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a configuration with the bootstrap role holders
    Init {
        /// Administrator account (0x-prefixed, 20 bytes hex); repeatable
        #[arg(long = "admin", required = true)]
        admins: Vec<String>,

        /// Issuer account; repeatable
        #[arg(long = "issuer")]
        issuers: Vec<String>,

        /// Reject administrative revocations without a reason
        #[arg(long)]
        require_admin_reason: bool,
    },

    /// Print the fingerprint of an audit report file
    Fingerprint {
        /// Path to the report
        path: PathBuf,
    },

    /// Serve JSON-RPC requests on stdio
    Serve,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("auditmark=debug,auditmark_engine=debug,auditmark_ledger=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("auditmark=info,auditmark_engine=info,auditmark_ledger=info")
        })
    };

    // stdout carries JSON-RPC responses
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RootConfig, RootError> {
    match path {
        Some(p) => RootConfig::load(p),
        None => {
            let default_path = RootConfig::default_config_path();
            RootConfig::load(&default_path)
        }
    }
}

fn parse_accounts(raw: &[String]) -> Result<Vec<Account>, RootError> {
    raw.iter()
        .map(|s| {
            s.parse::<Account>()
                .map_err(|_| RootError::Config(format!("invalid account: {}", s)))
        })
        .collect()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli).await;
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RootError> {
    match cli.command {
        Commands::Init {
            admins,
            issuers,
            require_admin_reason,
        } => cmd_init(cli.config.as_ref(), &admins, &issuers, require_admin_reason).await,
        Commands::Fingerprint { path } => cmd_fingerprint(&path).await,
        Commands::Serve => cmd_serve(cli.config.as_ref()).await,
    }
}

async fn cmd_init(
    config_path: Option<&PathBuf>,
    admins: &[String],
    issuers: &[String],
    require_admin_reason: bool,
) -> Result<(), RootError> {
    let mut config = RootConfig::default();
    config.roles.administrators = parse_accounts(admins)?;
    config.roles.issuers = parse_accounts(issuers)?;
    config.engine.require_admin_reason = require_admin_reason;
    config.validate()?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(RootConfig::default_config_path);
    config.save(&save_path)?;
    info!(path = %save_path.display(), "configuration written");

    println!("Auditmark initialized.");
    println!("  Administrators: {}", config.roles.administrators.len());
    println!("  Issuers:        {}", config.roles.issuers.len());
    println!("  Config:         {}", save_path.display());
    Ok(())
}

async fn cmd_fingerprint(path: &Path) -> Result<(), RootError> {
    let report = tokio::fs::read(path).await?;
    println!("{}", fingerprint_report(&report));
    Ok(())
}

async fn cmd_serve(config_path: Option<&PathBuf>) -> Result<(), RootError> {
    let config = load_config(config_path)?;
    let state = initialize_root(config)?;

    info!("serving JSON-RPC on stdio");

    let stdin = tokio::io::stdin();
    let reader = tokio::io::BufReader::new(stdin);

    use tokio::io::AsyncBufReadExt;
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => handle_request(&state, &request),
            Err(e) => JsonRpcResponse::error(
                serde_json::Value::Null,
                rpc_codes::PARSE_ERROR,
                format!("parse error: {}", e),
            ),
        };
        let response_json = serde_json::to_string(&response).unwrap_or_else(|_| {
            r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"serialization failed"},"id":null}"#
                .to_string()
        });
        println!("{}", response_json);
    }

    info!(
        total_issued = state.engine.total_issued()?,
        "stdin closed, shutting down"
    );
    Ok(())
}
