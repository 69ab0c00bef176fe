#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Grayscale,
    Rgb,
    GrayscaleAlpha,
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Grayscale => 1,
            PixelFormat::GrayscaleAlpha => 2,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, PixelFormat::GrayscaleAlpha | PixelFormat::Rgba)
    }

    pub fn is_grayscale(&self) -> bool {
        matches!(self, PixelFormat::Grayscale | PixelFormat::GrayscaleAlpha)
    }
}

/// Decoded image: 8-bit samples, rows top to bottom, no padding between rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PngData {
    pub pixel_data: Vec<u8>,
    pub pixel_format: PixelFormat,
    pub bytes_per_pixel: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub image_size_in_bytes: u32,
}

impl PngData {
    pub fn width(&self) -> u32 {
        self.image_width
    }

    pub fn height(&self) -> u32 {
        self.image_height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixel_data
    }

    /// Returns the bytes of row `y`, or `None` past the last row.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.image_height {
            return None;
        }

        let stride = (self.image_width * self.bytes_per_pixel) as usize;
        let start = y as usize * stride;

        self.pixel_data.get(start..start + stride)
    }

    /// Color samples of every pixel, with the alpha channel removed.
    pub fn without_alpha(&self) -> Vec<u8> {
        match self.pixel_format {
            PixelFormat::GrayscaleAlpha => self.pixel_data.chunks_exact(2).map(|pixel| pixel[0]).collect(),
            PixelFormat::Rgba => self.pixel_data.chunks_exact(4).flat_map(|pixel| [pixel[0], pixel[1], pixel[2]]).collect(),
            _ => self.pixel_data.clone(),
        }
    }
}
