use thiserror::Error;

/// Main error type for the connector
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Module not installed: {0}")]
    NotInstalled(String),

    #[error("Module error: {0}")]
    Module(String),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[error("Trainer error: {0}")]
    Trainer(String),

    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/annotix-connector/config.toml\n- Run with RUST_LOG=debug for more details")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
