use std::fmt::{Display, Formatter};

use crate::decoders::png::ColorType;

/// Header fields and chunk statistics gathered while decoding.
#[derive(Debug, Clone, Default)]
pub struct PngInfo {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: Option<ColorType>,
    pub compression_method: u8,
    pub filter_method: u8,
    pub interlace_method: u8,
    pub palette_entries: usize,
    pub idat_chunks: usize,
    pub compressed_size: usize,
    pub skipped_chunks: Vec<String>,
}

impl Display for PngInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Width: {}", self.width)?;
        writeln!(f, "Height: {}", self.height)?;
        writeln!(f, "Bit depth: {}", self.bit_depth)?;

        match self.color_type {
            Some(color_type) => writeln!(f, "Color type: {:?} ({})", color_type, color_type as u8)?,
            None => writeln!(f, "Color type: unknown")?,
        }

        writeln!(f, "Compression method: {}", self.compression_method)?;
        writeln!(f, "Filter method: {}", self.filter_method)?;
        writeln!(f, "Interlace method: {}", self.interlace_method)?;

        if self.color_type == Some(ColorType::Indexed) {
            writeln!(f, "Palette entries: {}", self.palette_entries)?;
        }

        writeln!(f, "IDAT chunks: {} ({} bytes compressed)", self.idat_chunks, self.compressed_size)?;

        if self.skipped_chunks.is_empty() {
            writeln!(f, "Skipped chunks: none")
        } else {
            writeln!(f, "Skipped chunks: {}", self.skipped_chunks.join(", "))
        }
    }
}
