//! Decoding of browser-captured frames (`data:image/...;base64,<payload>`).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("image payload is empty")]
    Empty,
    #[error("image payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image payload is not a decodable image: {0}")]
    Image(#[from] image::ImageError),
}

/// Strip the data-URL header, if any: everything up to and including the first comma.
pub fn strip_data_url(data: &str) -> &str {
    match data.split_once(',') {
        Some((_, payload)) => payload,
        None => data,
    }
}

/// Decode a data-URL (or bare base64) image into an RGB frame.
pub fn decode_frame(data: &str) -> Result<RgbImage, PayloadError> {
    let encoded = strip_data_url(data).trim();
    if encoded.is_empty() {
        return Err(PayloadError::Empty);
    }
    let bytes = STANDARD.decode(encoded)?;
    let frame = image::load_from_memory(&bytes)?.to_rgb8();
    Ok(frame)
}
