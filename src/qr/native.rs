//! In-process QR decoder built on `image` and `rqrr`

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::debug;

use super::decoder::{DecodeError, QrDecoder};

#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_luma(&self, gray: &image::GrayImage) -> Result<Vec<String>, DecodeError> {
        let (width, height) = gray.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                gray.get_pixel(x as u32, y as u32)[0]
            });

        let grids = prepared.detect_grids();
        if grids.is_empty() {
            return Err(DecodeError::NotFound);
        }

        let mut values = Vec::new();
        for grid in &grids {
            match grid.decode() {
                Ok((_meta, content)) => values.push(content),
                Err(e) => debug!("rqrr: grid detected but not decodable: {:?}", e),
            }
        }

        if values.is_empty() {
            return Err(DecodeError::Failed(format!(
                "{} grid(s) detected, none decodable",
                grids.len()
            )));
        }
        Ok(values)
    }
}

impl QrDecoder for RqrrDecoder {
    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn decode(&self, image: &Path) -> Result<Vec<String>, DecodeError> {
        let gray = image::open(image)
            .map_err(|e| DecodeError::Failed(format!("cannot read {}: {}", image.display(), e)))?
            .to_luma8();

        // Crafted images must not take the host down with them.
        panic::catch_unwind(AssertUnwindSafe(|| self.decode_luma(&gray)))
            .unwrap_or_else(|_| Err(DecodeError::Failed("rqrr panicked".to_string())))
    }
}
