use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageBuffer, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};
use std::io::Cursor;
use thiserror::Error;

const MODULE_SIZE: u32 = 8;
const QUIET_ZONE: u32 = 4;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("QR generation failed: {0}")]
    Qr(String),
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// 将配对令牌渲染为 PNG 二维码
pub fn render_qr_png(token: &str) -> Result<Vec<u8>, RenderError> {
    let code = QrCode::with_error_correction_level(token.as_bytes(), EcLevel::L)
        .map_err(|e| RenderError::Qr(e.to_string()))?;

    let modules = code.width() as u32;
    let img_size = (modules + QUIET_ZONE * 2) * MODULE_SIZE;

    let img = ImageBuffer::from_fn(img_size, img_size, |x, y| {
        let (cx, cy) = (x / MODULE_SIZE, y / MODULE_SIZE);
        if cx < QUIET_ZONE || cy < QUIET_ZONE {
            return Luma([255u8]);
        }
        let (mx, my) = (cx - QUIET_ZONE, cy - QUIET_ZONE);
        if mx >= modules || my >= modules {
            return Luma([255u8]);
        }
        match code[(mx as usize, my as usize)] {
            Color::Dark => Luma([0u8]),
            Color::Light => Luma([255u8]),
        }
    });

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// 渲染为可直接嵌入 `<img>` 的 data URL
pub fn render_qr_data_url(token: &str) -> Result<String, RenderError> {
    let png = render_qr_png(token)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}
