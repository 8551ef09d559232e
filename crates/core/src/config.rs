//! Client configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Well-known Irys bundler nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    Node1,
    Node2,
    Devnet,
}

impl Node {
    /// Base URL of the node.
    pub fn url(self) -> &'static str {
        match self {
            Self::Node1 => "https://node1.irys.xyz",
            Self::Node2 => "https://node2.irys.xyz",
            Self::Devnet => "https://devnet.irys.xyz",
        }
    }

    /// Resolve a short name (`node1`, `node2`, `devnet`) to a node.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "node1" => Some(Self::Node1),
            "node2" => Some(Self::Node2),
            "devnet" => Some(Self::Devnet),
            _ => None,
        }
    }
}

/// Default gateway used for downloads and metadata.
pub const DEFAULT_GATEWAY: &str = "https://gateway.irys.xyz";

/// Client configuration.
///
/// Built once and never mutated after the client is constructed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Node base URL or a well-known short name.
    #[serde(default = "default_node")]
    pub node: String,
    /// Gateway base URL for retrieval.
    #[serde(default = "default_gateway")]
    pub gateway: String,
    /// Currency name as the node knows it (e.g., "matic").
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Enable verbose diagnostic logging.
    #[serde(default)]
    pub debug: bool,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retry policy for node and gateway requests.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Chunked upload settings.
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Chain RPC endpoint used by the currency to broadcast funding transactions.
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// How long to wait for a funding transaction to be mined, in seconds.
    #[serde(default = "default_funding_timeout_secs")]
    pub funding_timeout_secs: u64,
}

/// Exponential backoff settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay in milliseconds.
    #[serde(default = "default_wait_min_ms")]
    pub wait_min_ms: u64,
    /// Backoff ceiling in milliseconds.
    #[serde(default = "default_wait_max_ms")]
    pub wait_max_ms: u64,
}

/// Chunked upload settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunk size in bytes. When unset the node-advertised maximum is used.
    #[serde(default)]
    pub chunk_size: Option<u64>,
    /// Maximum chunk requests in flight at once.
    #[serde(default = "default_max_parallel_chunks")]
    pub max_parallel_chunks: u32,
}

fn default_node() -> String {
    Node::Node1.url().to_string()
}

fn default_gateway() -> String {
    DEFAULT_GATEWAY.to_string()
}

fn default_currency() -> String {
    "matic".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_funding_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    5
}

fn default_wait_min_ms() -> u64 {
    1_000
}

fn default_wait_max_ms() -> u64 {
    30_000
}

fn default_max_parallel_chunks() -> u32 {
    5
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            node: default_node(),
            gateway: default_gateway(),
            currency: default_currency(),
            debug: false,
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryConfig::default(),
            chunking: ChunkingConfig::default(),
            rpc_url: None,
            funding_timeout_secs: default_funding_timeout_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            wait_min_ms: default_wait_min_ms(),
            wait_max_ms: default_wait_max_ms(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: None,
            max_parallel_chunks: default_max_parallel_chunks(),
        }
    }
}

impl ClientConfig {
    /// Configuration for a node URL with every other field defaulted.
    pub fn for_node(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            ..Self::default()
        }
    }

    /// Node base URL with short names expanded and no trailing slash.
    pub fn node_url(&self) -> String {
        Node::from_name(&self.node)
            .map(|n| n.url().to_string())
            .unwrap_or_else(|| self.node.trim_end_matches('/').to_string())
    }

    /// Gateway base URL without a trailing slash.
    pub fn gateway_url(&self) -> String {
        self.gateway.trim_end_matches('/').to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn funding_timeout(&self) -> Duration {
        Duration::from_secs(self.funding_timeout_secs)
    }

    pub fn validate(&self) -> crate::Result<()> {
        let node = self.node_url();
        if !(node.starts_with("http://") || node.starts_with("https://")) {
            return Err(crate::Error::Config(format!(
                "node must be an http(s) URL or a known node name, got: {}",
                self.node
            )));
        }
        let gateway = self.gateway_url();
        if !(gateway.starts_with("http://") || gateway.starts_with("https://")) {
            return Err(crate::Error::Config(format!(
                "gateway must be an http(s) URL, got: {}",
                self.gateway
            )));
        }
        if self.currency.is_empty() {
            return Err(crate::Error::Config("currency must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        self.retry.validate()?;
        self.chunking.validate()
    }
}

impl RetryConfig {
    pub fn wait_min(&self) -> Duration {
        Duration::from_millis(self.wait_min_ms)
    }

    pub fn wait_max(&self) -> Duration {
        Duration::from_millis(self.wait_max_ms)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.wait_min_ms > self.wait_max_ms {
            return Err(crate::Error::Config(format!(
                "retry.wait_min_ms ({}) must not exceed retry.wait_max_ms ({})",
                self.wait_min_ms, self.wait_max_ms
            )));
        }
        Ok(())
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_parallel_chunks == 0 {
            return Err(crate::Error::Config(
                "chunking.max_parallel_chunks must be greater than 0".to_string(),
            ));
        }
        if self.chunk_size == Some(0) {
            return Err(crate::Error::Config(
                "chunking.chunk_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
