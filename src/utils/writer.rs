use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::utils::image::{PixelFormat, PngData};

pub struct Writer {}

impl Writer {
    /// Writes the pixels unchanged as a Netpbm PAM (P7) file.
    pub fn write_pam(output_path: &Path, image: &PngData) -> Result<(), std::io::Error> {
        Writer::validate_pixel_count(image)?;

        let mut file = BufWriter::new(File::create(output_path)?);

        file.write_all(b"P7\n")?;
        file.write_all(format!("WIDTH {}\n", image.width()).as_bytes())?;
        file.write_all(format!("HEIGHT {}\n", image.height()).as_bytes())?;

        match image.pixel_format {
            PixelFormat::Grayscale => file.write_all(b"DEPTH 1\nMAXVAL 255\nTUPLTYPE GRAYSCALE\nENDHDR\n")?,
            PixelFormat::GrayscaleAlpha => {
                file.write_all(b"DEPTH 2\nMAXVAL 255\nTUPLTYPE GRAYSCALE_ALPHA\nENDHDR\n")?
            }
            PixelFormat::Rgb => file.write_all(b"DEPTH 3\nMAXVAL 255\nTUPLTYPE RGB\nENDHDR\n")?,
            PixelFormat::Rgba => file.write_all(b"DEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n")?,
        }

        file.write_all(image.pixels())?;
        file.flush()?;

        Ok(())
    }

    /// Writes a PGM (P5) for gray images or a PPM (P6) for color images. Alpha is dropped.
    pub fn write_ppm(output_path: &Path, image: &PngData) -> Result<(), std::io::Error> {
        Writer::validate_pixel_count(image)?;

        let mut file = BufWriter::new(File::create(output_path)?);
        let magic: &[u8] = if image.pixel_format.is_grayscale() { b"P5\n" } else { b"P6\n" };

        file.write_all(magic)?;
        file.write_all(format!("{} {}\n", image.width(), image.height()).as_bytes())?;
        file.write_all(b"255\n")?;
        if image.pixel_format.has_alpha() {
            file.write_all(&image.without_alpha())?;
        } else {
            file.write_all(image.pixels())?;
        }
        file.flush()?;

        Ok(())
    }

    fn validate_pixel_count(image: &PngData) -> Result<(), std::io::Error> {
        let expected_size = image.width() as u64 * image.height() as u64 * image.bytes_per_pixel as u64;
        let actual_size = image.pixels().len() as u64;

        if expected_size != actual_size {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "Invalid pixel data size for {}x{} {:?} image: expected {} bytes, got {}",
                    image.width(),
                    image.height(),
                    image.pixel_format,
                    expected_size,
                    actual_size
                ),
            ));
        }

        Ok(())
    }
}
