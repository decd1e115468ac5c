//! pngopt CLI - PNG optimizer
//!
//! Re-encodes PNG files (or any image the `image` crate can read) with the
//! smallest parameters the trial search finds.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use pngopt::color::argb_from_rgba8;
use pngopt::png::{self, OptimizationLevel, PngOptions};

/// Creates optimized PNG files.
///
/// The input can be a file or a directory. A directory is searched
/// recursively for PNG files. If no output is given the input is
/// overwritten.
#[derive(Parser, Debug)]
#[command(name = "pngopt")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image file or directory
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file or directory (defaults to INPUT)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Optimization level (0-5, higher = smaller file, slower)
    #[arg(short = 'o', long = "level", default_value = "2", value_parser = clap::value_parser!(u8).range(0..=5))]
    level: u8,

    /// Optimize for display with premultiplied alpha
    #[arg(short = 'p', long = "premultiplied-alpha")]
    premultiplied_alpha: bool,

    /// Worker threads for the trial search (defaults to all cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Quiet mode
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show per-trial log output
    #[arg(short, long)]
    verbose: bool,
}

/// One file to convert.
struct Task {
    src: PathBuf,
    dest: PathBuf,
    pixels: u64,
    src_size: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(args: &Args) {
    let default = if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let options = PngOptions {
        optimization_level: OptimizationLevel::new(args.level)?,
        flatten_translucent: args.premultiplied_alpha,
        threads: args.threads,
        trial_set: None,
    };

    let mut tasks = collect_tasks(&args.input, args.output.as_deref())?;
    if tasks.is_empty() {
        warn!("no PNG files found in {}", args.input.display());
        return Ok(());
    }
    // Largest images first so the long jobs are not left for last.
    tasks.sort_by(|a, b| b.pixels.cmp(&a.pixels));

    let start = Instant::now();
    let mut original_total = 0u64;
    let mut new_total = 0u64;
    let mut failures = 0usize;

    for task in &tasks {
        match convert(task, &options, args.quiet) {
            Ok(size) => {
                original_total += task.src_size;
                new_total += size;
            }
            Err(e) => {
                error!("{}: {}", task.src.display(), e);
                failures += 1;
            }
        }
    }

    if !args.quiet && tasks.len() > 1 {
        if new_total > 0 {
            println!("Total size: {}", size_difference(original_total, new_total));
        }
        println!("{:.3}s.", start.elapsed().as_secs_f64());
    }

    if failures > 0 {
        return Err(format!("{} of {} files failed", failures, tasks.len()).into());
    }
    Ok(())
}

fn collect_tasks(input: &Path, output: Option<&Path>) -> Result<Vec<Task>, Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input not found: {}", input.display()).into());
    }

    if input.is_dir() {
        let dest_root = output.unwrap_or(input);
        if dest_root.is_file() || has_png_extension(dest_root) {
            return Err(format!(
                "Cannot convert from directory {} to file {}",
                input.display(),
                dest_root.display()
            )
            .into());
        }

        let mut tasks = Vec::new();
        for entry in WalkDir::new(input).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() || !has_png_extension(entry.path()) {
                continue;
            }
            let relative = entry.path().strip_prefix(input)?;
            tasks.push(task(entry.path(), &dest_root.join(relative))?);
        }
        Ok(tasks)
    } else {
        let dest = match output {
            Some(out) if out.is_dir() => out.join(input.file_name().unwrap_or_default()),
            Some(out) => out.to_path_buf(),
            None => input.to_path_buf(),
        };
        Ok(vec![task(input, &dest)?])
    }
}

fn task(src: &Path, dest: &Path) -> Result<Task, Box<dyn std::error::Error>> {
    let (width, height) = image::image_dimensions(src)?;
    Ok(Task {
        src: src.to_path_buf(),
        dest: dest.to_path_buf(),
        pixels: width as u64 * height as u64,
        // Read before writing, since the destination may be the source.
        src_size: fs::metadata(src)?.len(),
    })
}

fn has_png_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// Encode one file and return the new file size.
fn convert(task: &Task, options: &PngOptions, quiet: bool) -> Result<u64, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let img = image::open(&task.src)?.to_rgba8();
    let (width, height) = img.dimensions();
    let pixels = argb_from_rgba8(img.as_raw());
    drop(img);

    let mut output = Vec::new();
    let summary = png::encode_into(&mut output, &pixels, width, height, options)?;

    if let Some(parent) = task.dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(&task.dest, &output)?;
    let size = output.len() as u64;
    debug!(
        src = %task.src.display(),
        trials = summary.trials,
        aborted = summary.aborted_trials,
        "file written"
    );

    if !quiet {
        println!("Created: {}", task.dest.display());
        println!("  {}", summary);
        println!("  Size: {}", size_difference(task.src_size, size));
        println!("  {:.3}s.", start.elapsed().as_secs_f64());
    }
    Ok(size)
}

fn size_difference(original: u64, new: u64) -> String {
    if original == 0 {
        return format!("{} bytes", new);
    }
    let percentage = 100.0 * new as f64 / original as f64;
    let diff = new as i64 - original as i64;
    let sign = if diff > 0 { "+" } else { "" };
    format!(
        "{} bytes ({}{} bytes change, {:.1}% of original size.)",
        new, sign, diff, percentage
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_difference_format() {
        assert_eq!(
            size_difference(1000, 750),
            "750 bytes (-250 bytes change, 75.0% of original size.)"
        );
        assert_eq!(
            size_difference(100, 120),
            "120 bytes (+20 bytes change, 120.0% of original size.)"
        );
        assert_eq!(size_difference(0, 42), "42 bytes");
    }

    #[test]
    fn test_png_extension_check() {
        assert!(has_png_extension(Path::new("a/b.PNG")));
        assert!(has_png_extension(Path::new("b.png")));
        assert!(!has_png_extension(Path::new("b.jpg")));
        assert!(!has_png_extension(Path::new("png")));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["pngopt", "-o", "5", "-p", "in.png", "out.png"]).unwrap();
        assert_eq!(args.level, 5);
        assert!(args.premultiplied_alpha);
        assert_eq!(args.output, Some(PathBuf::from("out.png")));
        assert!(Args::try_parse_from(["pngopt", "-o", "6", "in.png"]).is_err());
    }
}
