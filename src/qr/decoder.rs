use std::path::Path;
use thiserror::Error;

/// Why a decoder produced no value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The image was read but holds no QR code
    #[error("no QR code found")]
    NotFound,

    /// The image could not be read or the decoder crashed
    #[error("decoder failed: {0}")]
    Failed(String),

    /// The decoder's dependency is not installed
    #[error("decoder unavailable: {0}")]
    Unavailable(String),
}

impl DecodeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DecodeError::NotFound)
    }
}

/// One QR decoding backend
pub trait QrDecoder: Send + Sync {
    /// Key under which this decoder's findings are stored
    fn name(&self) -> &'static str;

    /// Decodes every QR code in the image, in detection order
    fn decode(&self, image: &Path) -> Result<Vec<String>, DecodeError>;
}
