use histree::{ConfigError, HistoryError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("history error: {0}")]
    History(#[from] HistoryError),

    #[error("logging setup failed: {message}")]
    Logging { message: String },
}

impl BoardError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::History(_) => 3,
            _ => 1,
        }
    }
}
