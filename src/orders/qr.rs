//! QR rendering of pickup codes for the order confirmation view.

use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Render a code as a `data:image/png;base64,...` URI
pub fn code_qr_data_uri(code: &str) -> Result<String, QrError> {
    let qr = QrCode::new(code.as_bytes())?;
    let img = qr.render::<Luma<u8>>().min_dimensions(200, 200).build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(img).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&png)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_data_uri() {
        let uri = code_qr_data_uri("482913").unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(uri.len() > 100);
    }
}
