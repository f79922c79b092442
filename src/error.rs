//! Error taxonomy

use thiserror::Error;

/// Errors surfaced by the glove decoder
///
/// None of these are fatal to the host: a missing port means running without
/// glove input, a failed feedback write is logged and skipped.
#[derive(Debug, Error)]
pub enum GloveError {
    #[error("serial port {0} is not available")]
    PortUnavailable(String),

    #[error("no serial ports found")]
    NoPortsFound,

    #[error("could not open {port}: {reason}")]
    PortOpen { port: String, reason: String },

    #[error("serial I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not read config {path}: {reason}")]
    ConfigRead { path: String, reason: String },

    #[error("could not parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("feedback write failed: {0}")]
    FeedbackWrite(String),
}

impl From<serialport::Error> for GloveError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::NoDevice => GloveError::PortUnavailable(e.description),
            serialport::ErrorKind::Io(kind) => {
                GloveError::Io(std::io::Error::new(kind, e.description))
            }
            _ => GloveError::PortOpen {
                port: String::new(),
                reason: e.description,
            },
        }
    }
}
