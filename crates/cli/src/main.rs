//! Command-line client for the Irys storage network.

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use futures::StreamExt;
use irys_client::{
    CancellationToken, ChunkUploadRequest, Client, ClientConfig, SessionId, Tag, U256,
    UploadRequest,
};
use irys_currency::matic::DEFAULT_RPC_URL;
use irys_currency::{Currency, EvmRpc, Matic};
use irys_signer::EthereumSigner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "irysctl")]
#[command(about = "Funded uploads to the Irys storage network")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug, Default)]
struct GlobalArgs {
    /// Config file path
    #[arg(long, env = "IRYS_CONFIG", default_value = "irys.toml", global = true)]
    config: PathBuf,

    /// Node URL or well-known name (node1, node2, devnet)
    #[arg(long, global = true)]
    node: Option<String>,

    /// Gateway URL used for downloads and metadata
    #[arg(long, global = true)]
    gateway: Option<String>,

    /// Chain RPC endpoint for funding transactions
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Hex private key of the paying wallet
    #[arg(long, env = "IRYS_PRIVATE_KEY", hide_env_values = true, global = true)]
    private_key: Option<String>,

    /// Verbose client diagnostics
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Price of storing SIZE bytes, in the currency's smallest unit
    Price { size: u64 },
    /// Prepaid balance of the wallet or of another address
    Balance {
        #[arg(long)]
        address: Option<String>,
    },
    /// Send AMOUNT to the node and register the funding transaction
    Fund { amount: String },
    /// Sign and upload a file in one request
    Upload {
        file: PathBuf,
        /// Tag as NAME=VALUE (repeatable)
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<Tag>,
        /// Skip the price and balance check
        #[arg(long)]
        no_fund: bool,
    },
    /// Upload a file through a resumable chunk session
    ChunkUpload {
        file: PathBuf,
        /// Resume this session instead of creating one
        #[arg(long)]
        session_id: Option<String>,
        /// Tag as NAME=VALUE (repeatable)
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<Tag>,
        /// Chunk size in bytes
        #[arg(long)]
        chunk_size: Option<u64>,
    },
    /// Download a stored payload from the gateway
    Download {
        tx_id: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print transaction metadata from the gateway
    Metadata { tx_id: String },
    /// Print the proof-of-storage receipt for a transaction
    Receipt { tx_id: String },
    /// Print the wallet address derived from the private key
    Address,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { global, command } = Cli::parse();

    let default_filter = if global.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&global)?;
    let currency = build_currency(&global, &config, command.needs_wallet())?;

    if let Commands::Address = command {
        println!("{}", currency.address());
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let client = Client::connect(config, currency)
        .await
        .context("failed to connect to node")?
        .with_cancellation(cancel);
    let result = run(&client, command).await;
    client.close();
    result
}

impl Commands {
    /// Commands that spend from or identify the wallet need a real key.
    fn needs_wallet(&self) -> bool {
        matches!(
            self,
            Self::Balance { address: None }
                | Self::Fund { .. }
                | Self::Upload { .. }
                | Self::ChunkUpload { .. }
                | Self::Address
        )
    }
}

async fn run(client: &Client, command: Commands) -> Result<()> {
    match command {
        Commands::Price { size } => {
            let price = client.get_price(size).await?;
            println!("{price}");
        }
        Commands::Balance { address } => {
            let balance = match address {
                Some(address) => client.get_balance_of(&address).await?,
                None => client.get_balance().await?,
            };
            println!("{balance}");
        }
        Commands::Fund { amount } => {
            let amount: U256 = amount
                .parse()
                .with_context(|| format!("invalid amount: {amount}"))?;
            let tx_id = client.top_up_balance(amount).await?;
            println!("{tx_id}");
        }
        Commands::Upload {
            file,
            tags,
            no_fund,
        } => {
            let data = read_payload(&file).await?;
            let request = UploadRequest::new(data).with_tags(tags);
            let tx = if no_fund {
                client.upload(request).await?
            } else {
                client.basic_upload(request).await?
            };
            print_json(&tx)?;
        }
        Commands::ChunkUpload {
            file,
            session_id,
            tags,
            chunk_size,
        } => {
            let data = read_payload(&file).await?;
            let mut request = ChunkUploadRequest::new(data).with_tags(tags);
            if let Some(id) = session_id {
                request = request.resume(SessionId::new(id));
            }
            if let Some(size) = chunk_size {
                request = request.with_chunk_size(size);
            }
            let tx = client.chunk_upload(request).await?;
            print_json(&tx)?;
        }
        Commands::Download { tx_id, output } => {
            let file = client.download(&tx_id).await?;
            let mut out: Box<dyn AsyncWrite + Unpin> = match &output {
                Some(path) => Box::new(
                    tokio::fs::File::create(path)
                        .await
                        .with_context(|| format!("failed to create {}", path.display()))?,
                ),
                None => Box::new(tokio::io::stdout()),
            };
            let mut written = 0u64;
            let mut stream = file.into_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                out.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            out.flush().await?;
            tracing::info!(tx_id = %tx_id, bytes = written, "Download complete");
        }
        Commands::Metadata { tx_id } => {
            let tx = client.get_metadata(&tx_id).await?;
            print_json(&tx)?;
        }
        Commands::Receipt { tx_id } => {
            let receipt = client.get_receipt(&tx_id).await?;
            if receipt.is_empty() {
                tracing::warn!(tx_id = %tx_id, "No receipt indexed yet");
            }
            print_json(&receipt)?;
        }
        Commands::Address => println!("{}", client.currency().address()),
    }
    Ok(())
}

/// File config merged with `IRYS_` environment variables, then command-line
/// overrides.
fn load_config(global: &GlobalArgs) -> Result<ClientConfig> {
    let mut figment = Figment::new();
    if global.config.exists() {
        tracing::debug!(config_path = %global.config.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(&global.config));
    }

    // IRYS_CONFIG and IRYS_PRIVATE_KEY are read by clap.
    let mut config: ClientConfig = figment
        .merge(
            Env::prefixed("IRYS_")
                .ignore(&["config", "private_key"])
                .split("__"),
        )
        .extract()
        .context("failed to load configuration")?;

    if let Some(node) = &global.node {
        config.node = node.clone();
    }
    if let Some(gateway) = &global.gateway {
        config.gateway = gateway.clone();
    }
    if let Some(rpc_url) = &global.rpc_url {
        config.rpc_url = Some(rpc_url.clone());
    }
    if global.debug {
        config.debug = true;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn build_currency(
    global: &GlobalArgs,
    config: &ClientConfig,
    needs_wallet: bool,
) -> Result<Arc<dyn Currency>> {
    anyhow::ensure!(
        config.currency == "matic",
        "unsupported currency: {}",
        config.currency
    );
    let rpc_url = config.rpc_url.as_deref().unwrap_or(DEFAULT_RPC_URL);
    let timeout = config.funding_timeout();

    let matic = match &global.private_key {
        Some(key) => Matic::from_private_key(key, rpc_url, timeout)
            .context("failed to load private key")?,
        None if needs_wallet => {
            anyhow::bail!("a private key is required: pass --private-key or set IRYS_PRIVATE_KEY")
        }
        // Read-only commands only need an identity to talk to the node.
        None => Matic::new(
            EthereumSigner::random(),
            EvmRpc::new(rpc_url, timeout).context("failed to build RPC client")?,
            timeout,
        ),
    };
    Ok(Arc::new(matic))
}

async fn read_payload(path: &Path) -> Result<Bytes> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Bytes::from(data))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_tag(raw: &str) -> std::result::Result<Tag, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    if name.is_empty() {
        return Err(format!("tag name is empty in '{raw}'"));
    }
    if value.is_empty() {
        return Err(format!("tag value is empty in '{raw}'"));
    }
    Ok(Tag::new(name, value))
}
