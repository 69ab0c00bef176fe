use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use log::{debug, warn};

use crate::decoders::inflate::inflate;
use crate::decoders::unfilter::unfilter_scanlines;
use crate::utils::bytereader::ByteReader;
use crate::utils::crc::chunk_crc;
use crate::utils::error::{PngError, PngResult};
use crate::utils::image::{PixelFormat, PngData};
use crate::utils::info::PngInfo;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Reader cache used when the caller does not pick one.
pub const DEFAULT_CACHE_SIZE: usize = 4096;

const IHDR_LENGTH: u32 = 13;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PngChunk {
    IHDR, // Image header
    PLTE, // Palette
    IDAT, // Image data
    IEND, // End of image
}

impl PngChunk {
    pub const fn signature(self) -> u32 {
        match self {
            PngChunk::IHDR => u32::from_be_bytes(*b"IHDR"),
            PngChunk::PLTE => u32::from_be_bytes(*b"PLTE"),
            PngChunk::IDAT => u32::from_be_bytes(*b"IDAT"),
            PngChunk::IEND => u32::from_be_bytes(*b"IEND"),
        }
    }

    pub fn from_signature(signature: u32) -> Option<PngChunk> {
        match &signature.to_be_bytes() {
            b"IHDR" => Some(PngChunk::IHDR),
            b"PLTE" => Some(PngChunk::PLTE),
            b"IDAT" => Some(PngChunk::IDAT),
            b"IEND" => Some(PngChunk::IEND),
            _ => None,
        }
    }
}

/// Renders a chunk type as its four ASCII letters, `?` for anything unprintable.
pub fn chunk_name(signature: u32) -> String {
    signature
        .to_be_bytes()
        .iter()
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorType {
    Grayscale = 0,
    RGB = 2,
    Indexed = 3,
    GrayscaleAlpha = 4,
    RGBA = 6,
}

impl ColorType {
    pub fn from_u8(value: u8) -> Option<ColorType> {
        match value {
            0 => Some(ColorType::Grayscale),
            2 => Some(ColorType::RGB),
            3 => Some(ColorType::Indexed),
            4 => Some(ColorType::GrayscaleAlpha),
            6 => Some(ColorType::RGBA),
            _ => None,
        }
    }

    /// Format of the decoded pixels. Indexed images come out as RGB after palette lookup.
    pub fn pixel_format(self) -> PixelFormat {
        match self {
            ColorType::Grayscale => PixelFormat::Grayscale,
            ColorType::RGB | ColorType::Indexed => PixelFormat::Rgb,
            ColorType::GrayscaleAlpha => PixelFormat::GrayscaleAlpha,
            ColorType::RGBA => PixelFormat::Rgba,
        }
    }

    /// Stride of the filtered stream: one palette index per pixel for indexed images.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            ColorType::Indexed => 1,
            other => other.pixel_format().bytes_per_pixel(),
        }
    }
}

pub struct PngDecoder<R: Read + Seek> {
    width: u32,
    height: u32,
    color_type: ColorType,
    palette: Option<Vec<[u8; 3]>>,
    info: PngInfo,
    reader: ByteReader<R>,
}

impl PngDecoder<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> PngResult<Self> {
        Self::open_with_cache_size(path, DEFAULT_CACHE_SIZE)
    }

    /// Opens `path` with a reader cache of at most `cache_size` bytes (`0` caches the whole file).
    pub fn open_with_cache_size<P: AsRef<Path>>(path: P, cache_size: usize) -> PngResult<Self> {
        let mut reader = ByteReader::new();
        reader.open(path, cache_size)?;

        Ok(Self::from_reader(reader))
    }
}

impl<R: Read + Seek> PngDecoder<R> {
    pub fn new(source: R) -> PngResult<Self> {
        Self::with_cache_size(source, DEFAULT_CACHE_SIZE)
    }

    pub fn with_cache_size(source: R, cache_size: usize) -> PngResult<Self> {
        let mut reader = ByteReader::new();
        reader.attach(source, cache_size)?;

        Ok(Self::from_reader(reader))
    }

    fn from_reader(reader: ByteReader<R>) -> Self {
        Self {
            width: 0,
            height: 0,
            color_type: ColorType::RGB,
            palette: None,
            info: PngInfo::default(),
            reader,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get_info(&self) -> PngInfo {
        self.info.clone()
    }

    /// Decodes the whole stream.
    ///
    /// The reader is closed whether decoding succeeds or not, so a decoder can only be
    /// used once; later calls fail with `PngError::NoOpenFile`.
    pub fn decode(&mut self) -> PngResult<PngData> {
        let result = self.decode_stream();

        if self.reader.is_open() {
            self.reader.close()?;
        }

        result
    }

    fn decode_stream(&mut self) -> PngResult<PngData> {
        self.read_signature()?;
        self.read_ihdr()?;

        let filter_bpp = self.color_type.bytes_per_pixel();
        let pixel_format = self.color_type.pixel_format();
        let bytes_per_pixel = pixel_format.bytes_per_pixel();
        let image_size_in_bytes = self.image_size(bytes_per_pixel)?;

        let expected_filtered = (self.height as usize)
            .checked_mul(1 + self.width as usize * filter_bpp as usize)
            .ok_or(PngError::InvalidDimensions { width: self.width, height: self.height })?;

        if self.color_type == ColorType::Indexed {
            self.read_plte()?;
        }

        let compressed = self.read_idat_stream()?;
        let filtered = inflate(&compressed, expected_filtered)?;

        debug!("Inflated {} bytes into {} bytes", compressed.len(), filtered.len());

        if filtered.len() > expected_filtered {
            return Err(PngError::CorruptedFilteredStream(format!(
                "Expected {} bytes after decompression, the stream holds more",
                expected_filtered
            )));
        }

        if filtered.len() < expected_filtered {
            return Err(PngError::CorruptedFilteredStream(format!(
                "Expected {} bytes after decompression, got {}",
                expected_filtered,
                filtered.len()
            )));
        }

        let unfiltered = unfilter_scanlines(&filtered, self.width, self.height, filter_bpp as usize)?;

        let pixel_data = match self.color_type {
            ColorType::Indexed => self.expand_palette(&unfiltered)?,
            _ => unfiltered,
        };

        Ok(PngData {
            pixel_data,
            pixel_format,
            bytes_per_pixel,
            image_width: self.width,
            image_height: self.height,
            image_size_in_bytes,
        })
    }

    fn image_size(&self, bytes_per_pixel: u32) -> PngResult<u32> {
        self.width
            .checked_mul(self.height)
            .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
            .ok_or(PngError::InvalidDimensions { width: self.width, height: self.height })
    }

    fn read_signature(&mut self) -> PngResult<()> {
        if self.reader.remaining()? < PNG_SIGNATURE.len() as u64 {
            return Err(PngError::InvalidSignature);
        }

        let signature = self.reader.read_u64_be()?;
        if signature != u64::from_be_bytes(PNG_SIGNATURE) {
            return Err(PngError::InvalidSignature);
        }

        Ok(())
    }

    fn read_ihdr(&mut self) -> PngResult<()> {
        let length = self.reader.read_u32_be()?;
        let chunk_type = self.reader.read_u32_be()?;

        if chunk_type != PngChunk::IHDR.signature() {
            return Err(PngError::UnexpectedChunkLayout(format!(
                "First chunk is {}, expected IHDR",
                chunk_name(chunk_type)
            )));
        }

        if length != IHDR_LENGTH {
            return Err(PngError::UnexpectedChunkLayout(format!(
                "IHDR length is {}, expected {}",
                length, IHDR_LENGTH
            )));
        }

        let width = self.reader.read_u32_be()?;
        let height = self.reader.read_u32_be()?;
        let bit_depth = self.reader.read_u8()?;
        let color_type = self.reader.read_u8()?;
        let compression_method = self.reader.read_u8()?;
        let filter_method = self.reader.read_u8()?;
        let interlace_method = self.reader.read_u8()?;
        let expected_crc = self.reader.read_u32_be()?;

        let mut body = Vec::with_capacity(IHDR_LENGTH as usize);
        body.extend_from_slice(&width.to_be_bytes());
        body.extend_from_slice(&height.to_be_bytes());
        body.extend_from_slice(&[bit_depth, color_type, compression_method, filter_method, interlace_method]);

        self.check_crc(chunk_type, &body, expected_crc)?;

        self.info.width = width;
        self.info.height = height;
        self.info.bit_depth = bit_depth;
        self.info.color_type = ColorType::from_u8(color_type);
        self.info.compression_method = compression_method;
        self.info.filter_method = filter_method;
        self.info.interlace_method = interlace_method;

        debug!(
            "IHDR: {}x{}, bit depth {}, color type {}, compression {}, filter {}, interlace {}",
            width, height, bit_depth, color_type, compression_method, filter_method, interlace_method
        );

        if bit_depth != 8 {
            return Err(PngError::UnsupportedBitDepth(bit_depth));
        }

        self.color_type = ColorType::from_u8(color_type)
            .ok_or_else(|| PngError::UnsupportedIhdr(format!("Invalid color type: {}", color_type)))?;

        if compression_method != 0 {
            return Err(PngError::UnsupportedIhdr(format!(
                "Invalid compression method: {}",
                compression_method
            )));
        }

        if filter_method != 0 {
            return Err(PngError::UnsupportedIhdr(format!("Invalid filter method: {}", filter_method)));
        }

        match interlace_method {
            0 => {}
            1 => return Err(PngError::Unsupported("Adam7 interlacing".to_string())),
            _ => {
                return Err(PngError::UnsupportedIhdr(format!(
                    "Invalid interlace method: {}",
                    interlace_method
                )))
            }
        }

        if width == 0 || height == 0 {
            return Err(PngError::InvalidDimensions { width, height });
        }

        self.width = width;
        self.height = height;

        Ok(())
    }

    fn read_plte(&mut self) -> PngResult<()> {
        let length = self
            .find_chunk(PngChunk::PLTE, Some(PngChunk::IDAT))?
            .ok_or_else(|| PngError::UnexpectedChunkLayout("Indexed image has no PLTE chunk".to_string()))?;

        if length == 0 || length % 3 != 0 {
            return Err(PngError::UnexpectedChunkLayout(format!(
                "PLTE length {} is not a positive multiple of 3",
                length
            )));
        }

        let mut body = Vec::new();
        self.reader.read_bytes_into(&mut body, length as usize)?;
        let expected_crc = self.reader.read_u32_be()?;

        self.check_crc(PngChunk::PLTE.signature(), &body, expected_crc)?;

        let palette: Vec<[u8; 3]> = body.chunks_exact(3).map(|rgb| [rgb[0], rgb[1], rgb[2]]).collect();

        if palette.len() > 256 {
            warn!("PLTE has {} entries, only the first 256 are addressable", palette.len());
        }

        debug!("PLTE: {} entries", palette.len());

        self.info.palette_entries = palette.len();
        self.palette = Some(palette);

        Ok(())
    }

    /// Collects the bodies of every IDAT chunk, in file order, up to IEND.
    fn read_idat_stream(&mut self) -> PngResult<Vec<u8>> {
        let mut compressed = Vec::new();

        while let Some(length) = self.find_chunk(PngChunk::IDAT, None)? {
            let start = compressed.len();
            self.reader.read_bytes_into(&mut compressed, length as usize)?;
            let expected_crc = self.reader.read_u32_be()?;

            self.check_crc(PngChunk::IDAT.signature(), &compressed[start..], expected_crc)?;

            self.info.idat_chunks += 1;
            debug!("IDAT #{}: {} bytes", self.info.idat_chunks, length);
        }

        if self.info.idat_chunks == 0 {
            return Err(PngError::UnexpectedChunkLayout("No IDAT chunk before IEND".to_string()));
        }

        self.info.compressed_size = compressed.len();

        let trailing = self.reader.remaining()?;
        if trailing > 0 {
            warn!("Ignoring {} bytes after IEND", trailing);
        }

        Ok(compressed)
    }

    /// Walks chunk headers until one of type `target` is found.
    ///
    /// # Returns
    /// - `Some(length)` with the reader at the first data byte of the chunk
    /// - `None` once IEND has been consumed
    /// - `PngError::UnexpectedChunkLayout` if `barrier` shows up before `target`
    /// - `PngError::EndOfStream` if the stream ends before IEND
    fn find_chunk(&mut self, target: PngChunk, barrier: Option<PngChunk>) -> PngResult<Option<u32>> {
        loop {
            let length = self.reader.read_u32_be()?;
            let chunk_type = self.reader.read_u32_be()?;

            if chunk_type == target.signature() {
                return Ok(Some(length));
            }

            match PngChunk::from_signature(chunk_type) {
                Some(PngChunk::IEND) => {
                    self.read_iend(length)?;
                    return Ok(None);
                }
                Some(PngChunk::IHDR) => {
                    return Err(PngError::UnexpectedChunkLayout("Duplicate IHDR chunk".to_string()));
                }
                Some(chunk) if Some(chunk) == barrier => {
                    return Err(PngError::UnexpectedChunkLayout(format!(
                        "{:?} chunk found before {:?}",
                        chunk, target
                    )));
                }
                Some(PngChunk::PLTE) if self.color_type != ColorType::Indexed => {
                    warn!("Ignoring PLTE chunk in a non-indexed image");
                }
                _ => {
                    debug!("Skipping {} chunk ({} bytes)", chunk_name(chunk_type), length);
                }
            }

            self.info.skipped_chunks.push(chunk_name(chunk_type));
            self.reader.skip(length as u64 + 4)?;
        }
    }

    fn read_iend(&mut self, length: u32) -> PngResult<()> {
        if length != 0 {
            warn!("IEND carries {} data bytes", length);
        }

        let mut body = Vec::new();
        self.reader.read_bytes_into(&mut body, length as usize)?;
        let expected_crc = self.reader.read_u32_be()?;

        let calculated = chunk_crc(PngChunk::IEND.signature(), &body);
        if calculated != expected_crc {
            warn!(
                "CRC mismatch for chunk IEND: expected 0x{:08x}, calculated 0x{:08x}",
                expected_crc, calculated
            );
        }

        Ok(())
    }

    fn check_crc(&self, chunk_type: u32, body: &[u8], expected: u32) -> PngResult<()> {
        let calculated = chunk_crc(chunk_type, body);

        if calculated != expected {
            return Err(PngError::CorruptedChunk {
                chunk: chunk_name(chunk_type),
                expected,
                calculated,
            });
        }

        Ok(())
    }

    fn expand_palette(&self, indices: &[u8]) -> PngResult<Vec<u8>> {
        let palette = self
            .palette
            .as_ref()
            .ok_or_else(|| PngError::UnexpectedChunkLayout("Indexed image has no PLTE chunk".to_string()))?;

        let mut output = Vec::with_capacity(indices.len() * 3);

        for &index in indices {
            let entry = palette.get(index as usize).ok_or_else(|| {
                PngError::CorruptedFilteredStream(format!(
                    "Palette index {} out of range ({} entries)",
                    index,
                    palette.len()
                ))
            })?;

            output.extend_from_slice(entry);
        }

        Ok(output)
    }
}

/// Decodes the PNG file at `path` with the default reader cache.
pub fn decode_png<P: AsRef<Path>>(path: P) -> PngResult<PngData> {
    PngDecoder::open(path)?.decode()
}
