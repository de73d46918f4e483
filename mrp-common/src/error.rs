//! Error type for config loading and logging setup

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Opening the log file or writing a config file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file unreadable, malformed or out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// Global subscriber already installed
    #[error("Internal error: {0}")]
    Internal(String),
}
