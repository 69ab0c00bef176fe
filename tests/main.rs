extern crate core;

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use pngdec::{chunk_crc, decode_png, PixelFormat, PngDecoder, PngError, PNG_SIGNATURE};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const IHDR_BODY_OFFSET: usize = 16;

    struct PngBuilder {
        bytes: Vec<u8>,
    }

    impl PngBuilder {
        fn new() -> Self {
            PngBuilder { bytes: PNG_SIGNATURE.to_vec() }
        }

        fn chunk(mut self, kind: &[u8; 4], body: &[u8]) -> Self {
            self.bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
            self.bytes.extend_from_slice(kind);
            self.bytes.extend_from_slice(body);
            self.bytes
                .extend_from_slice(&chunk_crc(u32::from_be_bytes(*kind), body).to_be_bytes());
            self
        }

        fn ihdr(self, width: u32, height: u32, bit_depth: u8, color_type: u8, interlace: u8) -> Self {
            let mut body = Vec::new();
            body.extend_from_slice(&width.to_be_bytes());
            body.extend_from_slice(&height.to_be_bytes());
            body.extend_from_slice(&[bit_depth, color_type, 0, 0, interlace]);
            self.chunk(b"IHDR", &body)
        }

        fn idat(self, filtered: &[u8]) -> Self {
            let compressed = zlib(filtered);
            self.chunk(b"IDAT", &compressed)
        }

        fn iend(self) -> Self {
            self.chunk(b"IEND", &[])
        }

        fn build(self) -> Vec<u8> {
            self.bytes
        }
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pngdec-{}-{}.png", name, std::process::id()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn decode_bytes(name: &str, bytes: &[u8]) -> Result<pngdec::PngData, PngError> {
        let path = write_temp(name, bytes);
        let result = decode_png(&path);
        std::fs::remove_file(&path).unwrap();
        result
    }

    fn paeth(a: u8, b: u8, c: u8) -> u8 {
        let (ia, ib, ic) = (a as i32, b as i32, c as i32);
        let p = ia + ib - ic;
        let (pa, pb, pc) = ((p - ia).abs(), (p - ib).abs(), (p - ic).abs());

        if pa <= pb && pa <= pc {
            a
        } else if pb <= pc {
            b
        } else {
            c
        }
    }

    // Filters row `y` of `pixels` with the given filter type.
    fn filter_row(pixels: &[u8], y: usize, row: usize, bpp: usize, filter: u8) -> Vec<u8> {
        let line = &pixels[y * row..(y + 1) * row];
        let mut out = vec![filter];

        for i in 0..row {
            let a = if i >= bpp { line[i - bpp] } else { 0 };
            let b = if y > 0 { pixels[(y - 1) * row + i] } else { 0 };
            let c = if y > 0 && i >= bpp { pixels[(y - 1) * row + i - bpp] } else { 0 };

            let predicted = match filter {
                0 => 0,
                1 => a,
                2 => b,
                3 => ((a as u16 + b as u16) / 2) as u8,
                _ => paeth(a, b, c),
            };

            out.push(line[i].wrapping_sub(predicted));
        }

        out
    }

    fn red_pixel_png() -> Vec<u8> {
        PngBuilder::new()
            .ihdr(1, 1, 8, 6, 0)
            .idat(&[0x00, 0xFF, 0x00, 0x00, 0xFF])
            .iend()
            .build()
    }

    #[test]
    fn single_red_rgba_pixel() -> Result<(), Box<dyn std::error::Error>> {
        let data = decode_bytes("red", &red_pixel_png())?;

        assert_eq!(data.pixel_format, PixelFormat::Rgba);
        assert!(data.pixel_format.has_alpha());
        assert_eq!(data.bytes_per_pixel, 4);
        assert_eq!(data.image_width, 1);
        assert_eq!(data.image_height, 1);
        assert_eq!(data.image_size_in_bytes, 4);
        assert_eq!(data.pixel_data, vec![0xFF, 0x00, 0x00, 0xFF]);

        Ok(())
    }

    #[test]
    fn grayscale_sub_and_none_rows() -> Result<(), Box<dyn std::error::Error>> {
        let png = PngBuilder::new()
            .ihdr(2, 2, 8, 0, 0)
            .idat(&[1, 10, 10, 0, 30, 40])
            .iend()
            .build();

        let data = decode_bytes("gray-sub", &png)?;

        assert_eq!(data.pixel_format, PixelFormat::Grayscale);
        assert_eq!(data.bytes_per_pixel, 1);
        assert_eq!(data.pixel_data, vec![10, 20, 30, 40]);
        assert_eq!(data.row(0), Some(&[10u8, 20][..]));
        assert_eq!(data.row(1), Some(&[30u8, 40][..]));
        assert_eq!(data.row(2), None);

        Ok(())
    }

    #[test]
    fn corrupted_ihdr_crc() {
        let mut png = red_pixel_png();
        png[IHDR_BODY_OFFSET + 3] ^= 0x01;

        let path = write_temp("bad-ihdr", &png);
        let mut decoder = PngDecoder::open(&path).unwrap();
        let first = decoder.decode();
        let second = decoder.decode();
        std::fs::remove_file(&path).unwrap();

        match first {
            Err(PngError::CorruptedChunk { chunk, .. }) => assert_eq!(chunk, "IHDR"),
            other => panic!("Expected CorruptedChunk, got {:?}", other),
        }

        // The file was closed on the failed decode
        assert!(matches!(second, Err(PngError::NoOpenFile)));
    }

    #[test]
    fn bad_signature() {
        let mut png = red_pixel_png();
        png[1] = b'Q';

        assert!(matches!(decode_bytes("bad-sig", &png), Err(PngError::InvalidSignature)));
        assert!(matches!(decode_bytes("short", &[0x89, 0x50]), Err(PngError::InvalidSignature)));
    }

    #[test]
    fn truncated_idat() {
        let png = red_pixel_png();
        // Signature + IHDR chunk, then the IDAT length and type plus two body bytes
        let cut = 8 + 25 + 8 + 2;

        let result = decode_bytes("truncated", &png[..cut]);

        assert!(matches!(result, Err(PngError::EndOfStream)));
    }

    #[test]
    fn sixteen_bit_depth_is_unsupported() {
        let png = PngBuilder::new()
            .ihdr(1, 1, 16, 6, 0)
            .idat(&[0; 9])
            .iend()
            .build();

        assert!(matches!(decode_bytes("depth16", &png), Err(PngError::UnsupportedBitDepth(16))));
    }

    #[test]
    fn rejects_unsupported_header_fields() {
        let interlaced = PngBuilder::new().ihdr(1, 1, 8, 0, 1).iend().build();
        assert!(matches!(decode_bytes("adam7", &interlaced), Err(PngError::Unsupported(_))));

        let bad_interlace = PngBuilder::new().ihdr(1, 1, 8, 0, 2).iend().build();
        assert!(matches!(decode_bytes("interlace2", &bad_interlace), Err(PngError::UnsupportedIhdr(_))));

        let bad_color = PngBuilder::new().ihdr(1, 1, 8, 5, 0).iend().build();
        assert!(matches!(decode_bytes("color5", &bad_color), Err(PngError::UnsupportedIhdr(_))));

        let zero_width = PngBuilder::new().ihdr(0, 1, 8, 0, 0).iend().build();
        assert!(matches!(
            decode_bytes("zero-width", &zero_width),
            Err(PngError::InvalidDimensions { width: 0, height: 1 })
        ));
    }

    #[test]
    fn first_chunk_must_be_a_13_byte_ihdr() {
        let wrong_first = PngBuilder::new().chunk(b"gAMA", &[0, 0, 0xB1, 0x8F]).iend().build();
        assert!(matches!(decode_bytes("no-ihdr", &wrong_first), Err(PngError::UnexpectedChunkLayout(_))));

        let short_ihdr = PngBuilder::new().chunk(b"IHDR", &[0; 12]).iend().build();
        assert!(matches!(decode_bytes("short-ihdr", &short_ihdr), Err(PngError::UnexpectedChunkLayout(_))));
    }

    #[test]
    fn corrupted_idat_crc() {
        let mut png = red_pixel_png();
        // First byte of the IDAT body
        png[8 + 25 + 8] ^= 0x80;

        match decode_bytes("bad-idat", &png) {
            Err(PngError::CorruptedChunk { chunk, .. }) => assert_eq!(chunk, "IDAT"),
            other => panic!("Expected CorruptedChunk, got {:?}", other),
        }
    }

    #[test]
    fn missing_idat() {
        let png = PngBuilder::new().ihdr(1, 1, 8, 0, 0).iend().build();

        assert!(matches!(decode_bytes("no-idat", &png), Err(PngError::UnexpectedChunkLayout(_))));
    }

    #[test]
    fn wrong_inflated_size() {
        let png = PngBuilder::new()
            .ihdr(2, 2, 8, 0, 0)
            .idat(&[0, 1, 2, 0, 3])
            .iend()
            .build();

        assert!(matches!(decode_bytes("short-stream", &png), Err(PngError::CorruptedFilteredStream(_))));
    }

    #[test]
    fn oversized_idat_stream() {
        let png = PngBuilder::new()
            .ihdr(1, 1, 8, 0, 0)
            .idat(&vec![0u8; 1000])
            .iend()
            .build();

        assert!(matches!(decode_bytes("oversized", &png), Err(PngError::CorruptedFilteredStream(_))));
    }

    #[test]
    fn unknown_filter_byte() {
        let png = PngBuilder::new()
            .ihdr(1, 2, 8, 0, 0)
            .idat(&[0, 1, 7, 2])
            .iend()
            .build();

        assert!(matches!(decode_bytes("filter7", &png), Err(PngError::CorruptedFilteredStream(_))));
    }

    #[test]
    fn garbage_idat_fails_decompression() {
        let png = PngBuilder::new()
            .ihdr(1, 1, 8, 0, 0)
            .chunk(b"IDAT", &[0xDE, 0xAD, 0xBE, 0xEF])
            .iend()
            .build();

        assert!(matches!(decode_bytes("garbage", &png), Err(PngError::DecompressionFailed(_))));
    }

    #[test]
    fn split_idat_with_ancillary_chunks() -> Result<(), Box<dyn std::error::Error>> {
        let filtered = [0, 1, 2, 3, 0, 4, 5, 6];
        let compressed = zlib(&filtered);
        let (first, second) = compressed.split_at(compressed.len() / 2);

        let png = PngBuilder::new()
            .ihdr(1, 2, 8, 2, 0)
            .chunk(b"gAMA", &[0, 0, 0xB1, 0x8F])
            .chunk(b"IDAT", first)
            .chunk(b"tEXt", b"Title\0split")
            .chunk(b"IDAT", second)
            .iend()
            .build();

        let path = write_temp("split", &png);
        let mut decoder = PngDecoder::open_with_cache_size(&path, 7)?;
        let data = decoder.decode()?;
        let info = decoder.get_info();
        std::fs::remove_file(&path)?;

        assert_eq!(data.pixel_data, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(info.idat_chunks, 2);
        assert_eq!(info.compressed_size, compressed.len());
        assert_eq!(info.skipped_chunks, vec!["gAMA".to_string(), "tEXt".to_string()]);

        Ok(())
    }

    #[test]
    fn indexed_image_expands_through_palette() -> Result<(), Box<dyn std::error::Error>> {
        let palette = [255, 0, 0, 0, 255, 0, 0, 0, 255];
        let png = PngBuilder::new()
            .ihdr(3, 1, 8, 3, 0)
            .chunk(b"PLTE", &palette)
            .idat(&[0, 2, 0, 1])
            .iend()
            .build();

        let data = decode_bytes("indexed", &png)?;

        assert_eq!(data.pixel_format, PixelFormat::Rgb);
        assert_eq!(data.bytes_per_pixel, 3);
        assert_eq!(data.image_size_in_bytes, 9);
        assert_eq!(data.pixel_data, vec![0, 0, 255, 255, 0, 0, 0, 255, 0]);

        Ok(())
    }

    #[test]
    fn indexed_image_layout_errors() {
        let no_palette = PngBuilder::new().ihdr(1, 1, 8, 3, 0).idat(&[0, 0]).iend().build();
        assert!(matches!(decode_bytes("no-plte", &no_palette), Err(PngError::UnexpectedChunkLayout(_))));

        let ragged = PngBuilder::new()
            .ihdr(1, 1, 8, 3, 0)
            .chunk(b"PLTE", &[1, 2, 3, 4])
            .idat(&[0, 0])
            .iend()
            .build();
        assert!(matches!(decode_bytes("ragged-plte", &ragged), Err(PngError::UnexpectedChunkLayout(_))));

        let out_of_range = PngBuilder::new()
            .ihdr(1, 1, 8, 3, 0)
            .chunk(b"PLTE", &[1, 2, 3])
            .idat(&[0, 1])
            .iend()
            .build();
        assert!(matches!(
            decode_bytes("index-range", &out_of_range),
            Err(PngError::CorruptedFilteredStream(_))
        ));
    }

    #[test]
    fn every_filter_every_cache_size() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = StdRng::seed_from_u64(42);
        let formats = [(0u8, 1usize), (2, 3), (4, 2), (6, 4)];
        let (width, height) = (9usize, 7usize);

        for (color_type, bpp) in formats {
            let row = width * bpp;
            let mut pixels = vec![0u8; row * height];
            rng.fill(pixels.as_mut_slice());

            let mut filtered = Vec::new();
            for y in 0..height {
                filtered.extend(filter_row(&pixels, y, row, bpp, (y % 5) as u8));
            }

            let png = PngBuilder::new()
                .ihdr(width as u32, height as u32, 8, color_type, 0)
                .idat(&filtered)
                .iend()
                .build();
            let path = write_temp(&format!("filters-{}", color_type), &png);

            for cache in [1, png.len() / 2, png.len(), png.len() * 2, 0] {
                let data = PngDecoder::open_with_cache_size(&path, cache)?.decode()?;

                assert_eq!(data.bytes_per_pixel as usize, bpp);
                assert_eq!(data.pixel_data.len(), width * height * bpp);
                assert_eq!(data.pixel_data, pixels, "color type {} cache {}", color_type, cache);
            }

            std::fs::remove_file(&path)?;
        }

        Ok(())
    }

    #[test]
    fn missing_file() {
        let result = decode_png("/nonexistent/pngdec/image.png");

        assert!(matches!(result, Err(PngError::FileOpenFailed { .. })));
    }
}
