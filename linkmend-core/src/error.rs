use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Scan failed: {0}")]
    Scan(#[from] linkmend_scanner::ScanError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown format '{0}'")]
    UnknownFormat(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
