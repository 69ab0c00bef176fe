use crate::utils::error::{PngError, PngResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl TryFrom<u8> for FilterType {
    type Error = PngError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FilterType::None),
            1 => Ok(FilterType::Sub),
            2 => Ok(FilterType::Up),
            3 => Ok(FilterType::Average),
            4 => Ok(FilterType::Paeth),
            _ => Err(PngError::CorruptedFilteredStream(format!("Invalid filter type: {}", value))),
        }
    }
}

/// Picks whichever of left (`a`), above (`b`) and upper left (`c`) is closest to `a + b - c`.
///
/// Ties go to `a`, then `b`.
pub fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let (a16, b16, c16) = (a as i16, b as i16, c as i16);

    // Distances from a + b - c, with the common terms cancelled
    let to_left = (b16 - c16).abs();
    let to_above = (a16 - c16).abs();
    let to_upper_left = (a16 + b16 - 2 * c16).abs();

    if to_left <= to_above && to_left <= to_upper_left {
        a
    } else if to_above <= to_upper_left {
        b
    } else {
        c
    }
}

/// Rebuilds one scanline into `decoded`. `prior` is the already rebuilt line above.
fn unfilter_row(filter_type: FilterType, filtered: &[u8], decoded: &mut [u8], prior: &[u8], bytes_per_pixel: usize) {
    match filter_type {
        FilterType::None => decoded.copy_from_slice(filtered),
        FilterType::Up => {
            for ((out, &raw), &above) in decoded.iter_mut().zip(filtered).zip(prior) {
                *out = raw.wrapping_add(above);
            }
        }
        FilterType::Sub | FilterType::Average | FilterType::Paeth => {
            for i in 0..filtered.len() {
                // Neighbours left of the first pixel read as zero
                let (left, upper_left) = match i.checked_sub(bytes_per_pixel) {
                    Some(j) => (decoded[j], prior[j]),
                    None => (0, 0),
                };
                let above = prior[i];

                let predicted = match filter_type {
                    FilterType::Sub => left,
                    FilterType::Average => ((left as u16 + above as u16) / 2) as u8,
                    _ => paeth_predictor(left, above, upper_left),
                };

                decoded[i] = filtered[i].wrapping_add(predicted);
            }
        }
    }
}

/// Reverses per-scanline filtering.
///
/// `data` holds `height` scanlines of one filter byte followed by `width * bytes_per_pixel`
/// filtered bytes. The row above the first scanline reads as zeros, so every filter type
/// is accepted on every line.
///
/// # Returns
/// - `width * height * bytes_per_pixel` reconstructed bytes
/// - `PngError::CorruptedFilteredStream` on a size mismatch or an unknown filter byte
pub fn unfilter_scanlines(data: &[u8], width: u32, height: u32, bytes_per_pixel: usize) -> PngResult<Vec<u8>> {
    let bytes_per_row = (width as usize)
        .checked_mul(bytes_per_pixel)
        .ok_or(PngError::InvalidDimensions { width, height })?;
    let scanline_bytes = bytes_per_row + 1;

    let expected = scanline_bytes
        .checked_mul(height as usize)
        .ok_or(PngError::InvalidDimensions { width, height })?;

    if data.len() != expected {
        return Err(PngError::CorruptedFilteredStream(format!(
            "Expected {} bytes of scanlines, got {}",
            expected,
            data.len()
        )));
    }

    let mut unfiltered = vec![0u8; bytes_per_row * height as usize];
    let zero_row = vec![0u8; bytes_per_row];

    for (y, scanline) in data.chunks_exact(scanline_bytes).enumerate() {
        let filter_type = FilterType::try_from(scanline[0]).map_err(|_| {
            PngError::CorruptedFilteredStream(format!("Invalid filter type {} on scanline {}", scanline[0], y))
        })?;

        let (done, rest) = unfiltered.split_at_mut(y * bytes_per_row);
        let prior = if y == 0 { &zero_row[..] } else { &done[(y - 1) * bytes_per_row..] };
        let decoded = &mut rest[..bytes_per_row];
        let filtered = &scanline[1..];

        unfilter_row(filter_type, filtered, decoded, prior, bytes_per_pixel);
    }

    Ok(unfiltered)
}
