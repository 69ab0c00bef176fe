use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use glob::glob;
use log::{error, info, LevelFilter};
use pngdec::{Logger, PngDecoder, Writer, DEFAULT_CACHE_SIZE};

#[derive(Parser, Debug)]
#[clap(name = "pngdec")]
struct Cli {
    #[arg(required = true, help = "PNG file or glob pattern")]
    path: String,

    #[arg(short, long, value_parser = ["pam", "ppm"], help = "Output format")]
    format: Option<String>,

    #[arg(short = 'o', long = "output-dir", help = "Output directory for converted files")]
    output_dir: Option<String>,

    #[arg(long, help = "Print header and chunk information")]
    info: bool,

    #[arg(long, help = "Decode the image without writing to a file")]
    void: bool,

    #[arg(long, default_value_t = DEFAULT_CACHE_SIZE, help = "Reader cache in bytes, 0 reads the whole file")]
    cache_size: usize,

    #[arg(short, long, help = "Log chunk traversal details")]
    verbose: bool,
}

/// Expands `pattern` against the working directory and keeps regular files only.
fn get_files(pattern: &str) -> Result<Vec<PathBuf>, glob::PatternError> {
    let pattern = match std::env::current_dir() {
        Ok(cwd) => cwd.join(pattern),
        Err(_) => PathBuf::from(pattern),
    };

    let files = glob(&pattern.to_string_lossy())?
        .filter_map(|entry| entry.map_err(|e| error!("{}", e)).ok())
        .filter(|path| path.is_file())
        .collect();

    Ok(files)
}

/// `<dir>/<stem>.<extension>`, where `dir` is `output_dir` or the input's own directory.
fn get_output_path(file: &Path, output_dir: Option<&str>, extension: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let stem = file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| format!("Cannot derive an output name from {}", file.display()))?;

    let dir = match output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            PathBuf::from(dir)
        }
        None => file.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    Ok(dir.join(format!("{}.{}", stem, extension)))
}

fn process_file(file: &Path, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("File: {}", file.display());

    let mut decoder = PngDecoder::open_with_cache_size(file, cli.cache_size)?;
    let result = decoder.decode();

    if cli.info {
        print!("{}", decoder.get_info());
    }

    let image = result?;

    info!(
        "Decoded {}x{} {:?} ({} bytes)",
        image.width(),
        image.height(),
        image.pixel_format,
        image.image_size_in_bytes
    );

    if cli.void || (cli.info && cli.format.is_none()) {
        return Ok(());
    }

    let format = cli.format.as_deref().unwrap_or("pam");
    let output_path = get_output_path(file, cli.output_dir.as_deref(), format)?;

    info!("Writing to: {}", output_path.display());

    match format {
        "ppm" => Writer::write_ppm(&output_path, &image)?,
        _ => Writer::write_pam(&output_path, &image)?,
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(e) = Logger::init(level) {
        eprintln!("Could not install logger: {}", e);
    }

    let files = match get_files(&cli.path) {
        Ok(files) => files,
        Err(e) => {
            error!("Invalid glob pattern {}: {}", cli.path, e);
            return ExitCode::FAILURE;
        }
    };

    if files.is_empty() {
        error!("No files found matching pattern: {}", cli.path);
        return ExitCode::FAILURE;
    }

    let mut failures = 0;
    for file in &files {
        if let Err(err) = process_file(file, &cli) {
            error!("Error processing {}: {}", file.display(), err);
            failures += 1;
        }
    }

    if failures > 0 {
        error!("{} of {} files failed", failures, files.len());
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
