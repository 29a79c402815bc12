use rgb::RGB8;

/// Braille Unicode canvas for high-resolution terminal graphics.
/// Each character cell represents a 2x4 pixel grid (8 dots) with one color.
/// Unicode Braille patterns: U+2800 to U+28FF
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    dots: Vec<u8>,            // Bit patterns per char, row-major
    colors: Vec<Option<RGB8>>, // Foreground per char, last writer wins
}

/// Bit for a dot inside its character cell.
/// Braille dot layout per character:
/// ```text
/// (0,0) (1,0)   bits: 0x01 0x08
/// (0,1) (1,1)   bits: 0x02 0x10
/// (0,2) (1,2)   bits: 0x04 0x20
/// (0,3) (1,3)   bits: 0x40 0x80
/// ```
#[inline(always)]
fn dot_bit(x: usize, y: usize) -> u8 {
    match (x % 2, y % 4) {
        (0, 0) => 0x01,
        (1, 0) => 0x08,
        (0, 1) => 0x02,
        (1, 1) => 0x10,
        (0, 2) => 0x04,
        (1, 2) => 0x20,
        (0, 3) => 0x40,
        (1, 3) => 0x80,
        _ => 0,
    }
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            dots: vec![0u8; width * height],
            colors: vec![None; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel dimensions (width*2, height*4)
    pub fn pixel_size(&self) -> (usize, usize) {
        (self.width * 2, self.height * 4)
    }

    #[inline(always)]
    fn cell(&self, x: usize, y: usize) -> Option<usize> {
        let cx = x / 2;
        let cy = y / 4;
        (cx < self.width && cy < self.height).then_some(cy * self.width + cx)
    }

    /// Set a dot and paint its character cell with `color`
    pub fn set_pixel(&mut self, x: usize, y: usize, color: RGB8) {
        if let Some(idx) = self.cell(x, y) {
            self.dots[idx] |= dot_bit(x, y);
            self.colors[idx] = Some(color);
        }
    }

    /// Clear a dot, leaving the cell color as is
    pub fn clear_pixel(&mut self, x: usize, y: usize) {
        if let Some(idx) = self.cell(x, y) {
            self.dots[idx] &= !dot_bit(x, y);
        }
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32, color: RGB8) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    /// Clear a pixel using signed coordinates (ignores negative values)
    pub fn clear_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.clear_pixel(x as usize, y as usize);
        }
    }

    /// Character and color at a cell; `None` for empty cells
    pub fn cell_at(&self, col: usize, row: usize) -> Option<(char, Option<RGB8>)> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let idx = row * self.width + col;
        let bits = self.dots[idx];
        if bits == 0 {
            return None;
        }
        let ch = char::from_u32(0x2800 + bits as u32).unwrap_or(' ');
        Some((ch, self.colors[idx]))
    }

    /// Get a specific row as a string (for line-by-line rendering)
    pub fn row_to_string(&self, row: usize) -> String {
        if row >= self.height {
            return String::new();
        }
        self.dots[row * self.width..(row + 1) * self.width]
            .iter()
            .map(|&b| char::from_u32(0x2800 + b as u32).unwrap_or(' '))
            .collect()
    }

    /// Get all rows as an iterator of strings
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.height).map(|i| self.row_to_string(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: RGB8 = RGB8 { r: 255, g: 255, b: 255 };
    const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };

    fn render(canvas: &BrailleCanvas) -> String {
        canvas.rows().collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn test_single_pixel() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0, WHITE);
        assert_eq!(render(&canvas), "⠁"); // U+2801
    }

    #[test]
    fn test_all_dots() {
        let mut canvas = BrailleCanvas::new(1, 1);
        // Set all 8 dots
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y, WHITE);
            }
        }
        assert_eq!(render(&canvas), "⣿"); // U+28FF (all dots)
    }

    #[test]
    fn test_diagonal() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_pixel(0, 0, WHITE);
        canvas.set_pixel(1, 1, WHITE);
        canvas.set_pixel(2, 2, WHITE);
        canvas.set_pixel(3, 3, WHITE);
        // First char: (0,0) and (1,1) = 0x01 | 0x10 = 0x11
        // Second char: (0,2) and (1,3) = 0x04 | 0x80 = 0x84
        assert_eq!(render(&canvas), "⠑⢄");
    }

    #[test]
    fn test_last_color_wins_and_clear_keeps_color() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0, WHITE);
        canvas.set_pixel(1, 0, RED);
        canvas.clear_pixel(1, 0);
        assert_eq!(canvas.cell_at(0, 0), Some(('⠁', Some(RED))));
        canvas.clear_pixel(0, 0);
        assert_eq!(canvas.cell_at(0, 0), None);
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(2, 0, WHITE);
        canvas.set_pixel_signed(-1, 0, WHITE);
        assert_eq!(canvas.cell_at(0, 0), None);
        assert_eq!(canvas.cell_at(1, 0), None);
    }
}
