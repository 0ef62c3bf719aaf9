use fundrelay_chain::ChainError;
use fundrelay_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("ledger error: {0}")]
    Chain(#[from] ChainError),

    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RPC server error: {0}")]
    Rpc(String),

    #[error("node already started")]
    AlreadyStarted,

    #[error("shutdown timeout")]
    ShutdownTimeout,
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Chain(e) => e.kind(),
            Self::Config(_) => ErrorKind::Validation,
            _ => ErrorKind::Fatal,
        }
    }
}
