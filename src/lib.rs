mod decoders;
mod utils;

pub use decoders::inflate::inflate;
pub use decoders::png::{chunk_name, decode_png, ColorType, PngChunk, PngDecoder, DEFAULT_CACHE_SIZE, PNG_SIGNATURE};
pub use decoders::unfilter::{paeth_predictor, unfilter_scanlines, FilterType};
pub use utils::bytereader::ByteReader;
pub use utils::crc::{chunk_crc, crc32, verify_crc, Crc32};
pub use utils::error::{PngError, PngResult};
pub use utils::image::{PixelFormat, PngData};
pub use utils::info::PngInfo;
pub use utils::logger::Logger;
pub use utils::writer::Writer;
