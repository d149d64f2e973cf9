use thiserror::Error;

/// Failures a node can run into. Protocol rejections carry the exact
/// message shown to operators; everything else wraps the underlying cause.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Firma no válida")]
    InvalidSignature,

    #[error("Dirección errónea o longitud de clave no válida")]
    BadKeyLength,

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Peer request failed: {0}")]
    Peer(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;
