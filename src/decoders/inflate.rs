use flate2::{Decompress, FlushDecompress, Status};
use log::debug;

use crate::utils::error::{PngError, PngResult};
use crate::utils::traits::GrowBuffer;

/// Inflates a zlib-wrapped DEFLATE stream into at most `limit + 1` bytes.
///
/// Decompression stops as soon as the output grows past `limit`, so a caller expecting
/// exactly `limit` bytes sees an oversized stream without inflating the rest of it.
/// The output buffer starts at twice the input length and grows on demand, never past
/// `limit + 1`.
pub fn inflate(input: &[u8], limit: usize) -> PngResult<Vec<u8>> {
    let ceiling = limit.saturating_add(1);
    let mut decompressor = Decompress::new(true);
    let mut output = Vec::with_capacity(input.len().saturating_mul(2).max(64).min(ceiling));

    loop {
        let consumed = decompressor.total_in() as usize;
        let produced = decompressor.total_out();

        let status = decompressor
            .decompress_vec(&input[consumed..], &mut output, FlushDecompress::None)
            .map_err(|e| PngError::DecompressionFailed(e.to_string()))?;

        if status == Status::StreamEnd {
            break;
        }

        if output.len() >= ceiling {
            debug!("Stopped inflating at {} bytes, expected at most {}", output.len(), limit);
            output.truncate(ceiling);
            return Ok(output);
        }

        if output.len() == output.capacity() {
            output.grow_to_fit_within(output.len() + 1, ceiling);
            continue;
        }

        let progressed =
            decompressor.total_in() as usize != consumed || decompressor.total_out() != produced;
        if !progressed {
            return Err(PngError::DecompressionFailed(format!(
                "zlib stream ended early after {} of {} input bytes",
                decompressor.total_in(),
                input.len()
            )));
        }
    }

    output.truncate(ceiling);

    let trailing = input.len() - decompressor.total_in() as usize;
    if trailing > 0 {
        debug!("Ignoring {} bytes after the end of the zlib stream", trailing);
    }

    Ok(output)
}
