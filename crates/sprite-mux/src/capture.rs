//! Headless capture: PNG screenshots of the TIA framebuffer.

use std::error::Error;
use std::fs;
use std::path::Path;

use atari_tia::Tia;

/// Save the current framebuffer as a PNG file.
///
/// The framebuffer is ARGB32; the encoder wants RGBA bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_screenshot(tia: &Tia, path: &Path) -> Result<(), Box<dyn Error>> {
    let width = tia.framebuffer_width();
    let height = tia.framebuffer_height();

    let file = fs::File::create(path)?;
    let w = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;

    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for &pixel in tia.framebuffer() {
        rgba.extend_from_slice(&[(pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8, 0xFF]);
    }

    writer.write_image_data(&rgba)?;
    Ok(())
}
