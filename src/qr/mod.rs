//! QR code detection over rendered document previews
//!
//! Two independent decoders run over the same image and each stores its
//! findings under its own key. A decoder failure never fails the module.

mod decoder;
mod module;
mod native;
mod zbar;

pub use decoder::{DecodeError, QrDecoder};
pub use module::{url_ioc, QrModule, QR_INFO};
pub use native::RqrrDecoder;
pub use zbar::ZbarDecoder;
