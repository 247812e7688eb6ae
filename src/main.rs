//! Main entry point for the sunzip CLI application.
//!
//! This binary streams ZIP archives from local files, stdin or HTTP URLs
//! and lists or extracts them without seeking.

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use sunzip::{
    Action, Cli, EntryMetadata, ExtractOptions, HttpStreamReader, LocalFileReader, Overwrite,
    ZipExtractor, ZipStreamReader,
};

/// Application entry point.
///
/// Parses command-line arguments and dispatches on the kind of input.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.is_very_quiet() {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };
    env_logger::builder()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    if cli.is_http_url() {
        // Remote archive streamed from a single GET
        let reader = HttpStreamReader::new(&cli.file)?;
        let transferred = reader.transfer_counter();
        match reader.content_length() {
            Some(length) => info!("remote archive is {}", format_size(length)),
            None => info!("remote archive length not announced"),
        }

        process_input(reader, &cli)?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(transferred.load(Ordering::Relaxed))
            );
        }
    } else {
        // Local file, or stdin for "-"
        let reader = LocalFileReader::open(&cli.file)?;
        if cli.is_stdin() {
            info!("reading archive from stdin");
        } else if let Some(size) = reader.size() {
            info!("{} is {}", cli.file, format_size(size));
        }
        process_input(reader, &cli)?;
    }

    Ok(())
}

/// Process every archive in the input based on CLI options.
///
/// - List mode (`-l` or `-v`): Display archive contents
/// - Extract mode: Extract files matching the specified filters
///
/// With `-c` archives concatenated after the first are processed too.
/// Whatever is left afterwards goes to the `--remainder` file, if given.
///
/// # Arguments
///
/// * `input` - The raw byte stream
/// * `cli` - Parsed command-line arguments
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if processing fails.
fn process_input<R: Read>(input: R, cli: &Cli) -> Result<()> {
    let mut archive = ZipStreamReader::new(input);
    let mut count = 0usize;

    loop {
        if cli.list || cli.verbose {
            list_files(&mut archive, cli.verbose)?;
        } else {
            extract_archive(&mut archive, cli)?;
        }
        count += 1;

        if !cli.concatenated || !archive.archive_follows()? {
            break;
        }
        info!("archive {} done, another one follows", count);
    }

    if let Some(ref path) = cli.remainder {
        let mut out =
            File::create(path).with_context(|| format!("cannot create {}", path))?;
        let copied = io::copy(&mut archive.remainder(), &mut out)?;
        if !cli.is_quiet() {
            eprintln!("Wrote {} of trailing data to {}", format_size(copied), path);
        }
    }

    Ok(())
}

/// List the entries of one archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just file names, one per line
/// - Verbose format (`-v`): Detailed table with size, compression ratio, and timestamps
///
/// Each entry is read to its end before it is printed, so sizes carried in
/// a data descriptor are known.
///
/// # Arguments
///
/// * `archive` - The stream positioned at the start of an archive
/// * `verbose` - If true, display detailed information in table format
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if listing fails.
fn list_files(archive: &mut ZipStreamReader<'_>, verbose: bool) -> Result<()> {
    if verbose {
        // Print table header for verbose output
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    // Track totals for summary line
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    while let Some(header) = archive.next_entry()? {
        io::copy(archive, &mut io::sink())?;
        let entry = archive.entry().cloned().unwrap_or(header);

        if verbose {
            println!(
                "{:>10}  {:>10}  {}  {}  {}",
                entry.uncompressed_size,
                entry.compressed_size,
                ratio(entry.compressed_size, entry.uncompressed_size),
                entry.modified.format("%Y-%m-%d  %H:%M"),
                display_name(&entry)
            );

            // Accumulate totals (excluding directories)
            if !entry.is_dir() {
                total_uncompressed += entry.uncompressed_size;
                total_compressed += entry.compressed_size;
                file_count += 1;
            }
        } else {
            println!("{}", display_name(&entry));
        }
    }

    // Print summary line in verbose mode
    if verbose {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>18}  {} files",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            file_count
        );
    }

    Ok(())
}

/// Extract one archive according to the CLI options.
///
/// - Pipe mode (`-p`): Write file contents to stdout
/// - Custom output directory (`-d`): Extract to specified directory
/// - Junk paths (`-j`): Ignore directory structure in archive
/// - Overwrite control (`-n`, `-o`): Handle existing files
///
/// # Arguments
///
/// * `archive` - The stream positioned at the start of an archive
/// * `cli` - Parsed command-line arguments
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if extraction fails.
fn extract_archive(archive: &mut ZipStreamReader<'_>, cli: &Cli) -> Result<()> {
    let extractor = ZipExtractor::new(ExtractOptions {
        include: cli.files.clone(),
        exclude: cli.exclude.clone(),
        junk_paths: cli.junk_paths,
        overwrite: if cli.overwrite && !cli.never_overwrite {
            Overwrite::Always
        } else {
            Overwrite::Never
        },
    });

    if cli.pipe {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        extractor.extract_to_writer(archive, &mut out, |_, _| {})?;
        return Ok(());
    }

    let dest = cli
        .extract_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_default();
    let summary = extractor.extract_to_dir(archive, &dest, |entry, action| {
        report(cli, entry, action)
    })?;
    info!(
        "{} files, {} directories, {} skipped, {}",
        summary.files,
        summary.dirs,
        summary.skipped,
        format_size(summary.bytes)
    );

    Ok(())
}

/// Print what happened to one entry, unzip style.
fn report(cli: &Cli, entry: &EntryMetadata, action: &Action) {
    if cli.is_quiet() {
        return;
    }
    match action {
        Action::Extracted(path) => println!("  extracting: {}", path.display()),
        Action::CreatedDir(path) => println!("   creating: {}", path.display()),
        Action::Exists(_) if cli.never_overwrite => {
            eprintln!("Skipping: {} (file exists)", entry.name())
        }
        Action::Exists(_) => eprintln!("Skipping: {} (use -o to overwrite)", entry.name()),
        Action::UnsafePath => eprintln!("Skipping: {} (unsafe path)", entry.name()),
        Action::Filtered | Action::Piped => {}
    }
}

/// Entry name for display, marked when it is probably not UTF-8.
fn display_name(entry: &EntryMetadata) -> String {
    if entry.non_utf8 {
        format!("{} (non-UTF-8 name)", entry.name())
    } else {
        entry.name().into_owned()
    }
}

/// Compression ratio as percentage saved.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
///
/// # Arguments
///
/// * `size` - The size in bytes to format
///
/// # Returns
///
/// A formatted string with the size and appropriate unit.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// assert_eq!(format_size(1048576), "1.00 MB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(500), "500 bytes");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }

    #[test]
    fn ratios() {
        assert_eq!(ratio(25, 100), "  75%");
        assert_eq!(ratio(0, 0), "  0%");
        // Stored entries with overhead do not underflow
        assert_eq!(ratio(110, 100), "  0%");
    }
}
