pub mod bytereader;
pub mod crc;
pub mod error;
pub mod image;
pub mod info;
pub mod logger;
pub(crate) mod traits;
pub mod writer;
