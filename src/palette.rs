//! Named color ramps sampled to a requested number of colors.
//!
//! Sequential and diverging ramps are the widest ColorBrewer schemes; the
//! perceptual ramps are Matplotlib's viridis, magma and plasma.

use color_brewery::{ColorRange, Palette, RGBColor};
use rgb::RGB8;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteError {
    #[error("unknown palette: {0}")]
    Unknown(String),
    #[error("invalid hex color: {0}")]
    InvalidHex(String),
}

/// Palette used when none is requested
pub const DEFAULT_PALETTE: &str = "Blues";

/// Palettes offered by the dashboard, in cycling order
const PALETTES: [&str; 14] = [
    "Blues", "Greens", "Greys", "Oranges", "Purples", "Reds", "YlGnBu", "YlOrRd", "RdBu",
    "RdYlBu", "Spectral", "viridis", "magma", "plasma",
];

/// Names of every available palette
pub fn list_palettes() -> Vec<&'static str> {
    PALETTES.to_vec()
}

/// Resolve a palette name. Brewer schemes come in every class count; the
/// widest one anchors the gradient.
fn find_palette(name: &str) -> Result<Palette<RGB8>, PaletteError> {
    let brewer = match name.to_ascii_lowercase().as_str() {
        "viridis" => return Ok(RGB8::viridis()),
        "magma" => return Ok(RGB8::magma()),
        "plasma" => return Ok(RGB8::plasma()),
        "blues" => RGB8::blues(),
        "greens" => RGB8::greens(),
        "greys" => RGB8::greys(),
        "oranges" => RGB8::oranges(),
        "purples" => RGB8::purples(),
        "reds" => RGB8::reds(),
        "ylgnbu" => RGB8::ylgnbu(),
        "ylorrd" => RGB8::ylorrd(),
        "rdbu" => RGB8::rdbu(),
        "rdylbu" => RGB8::rdylbu(),
        "spectral" => RGB8::spectral(),
        _ => return Err(PaletteError::Unknown(name.to_string())),
    };
    brewer
        .last()
        .ok_or_else(|| PaletteError::Unknown(name.to_string()))
}

/// `k` colors from the named palette, evenly spaced along its gradient
pub fn get_rgb_palette(name: &str, k: usize) -> Result<Vec<RGB8>, PaletteError> {
    let palette = find_palette(name)?;
    Ok(palette
        .gradient()
        .range(0., 1., k)
        .map(|(_, color)| color)
        .collect())
}

/// `k` colors from the named palette, as `#rrggbb` strings
pub fn get_palette(name: &str, k: usize) -> Result<Vec<String>, PaletteError> {
    Ok(get_rgb_palette(name, k)?.into_iter().map(rgb_to_hex).collect())
}

/// Parse `#rrggbb` or `rrggbb`
pub fn hex_to_rgb(hex: &str) -> Result<RGB8, PaletteError> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(PaletteError::InvalidHex(hex.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| PaletteError::InvalidHex(hex.to_string()))
    };
    Ok(RGB8 {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}

pub fn rgb_to_hex(color: RGB8) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}
