use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};

use crate::error::Result;

use super::stream::ZipStreamReader;
use super::structures::EntryMetadata;

/// What to do when an output file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overwrite {
    #[default]
    Never,
    Always,
}

/// Entry selection and output layout.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Names or glob patterns to extract; empty means everything.
    pub include: Vec<String>,
    /// Names, substrings or glob patterns to leave out.
    pub exclude: Vec<String>,
    /// Drop directory components and write every file into one directory.
    pub junk_paths: bool,
    pub overwrite: Overwrite,
}

/// What happened to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Extracted(PathBuf),
    CreatedDir(PathBuf),
    /// Written to the output stream.
    Piped,
    /// Not selected by the include/exclude lists.
    Filtered,
    /// The output file exists and overwriting is off.
    Exists(PathBuf),
    /// Absolute name or one that climbs out of the destination.
    UnsafePath,
}

/// Totals for one archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub dirs: usize,
    pub skipped: usize,
    pub bytes: u64,
}

/// Streams every entry of an archive to disk or to a writer.
///
/// Entries are handled in archive order as they arrive; there is no second
/// pass, so filters are applied to each local header on its own.
#[derive(Debug, Clone, Default)]
pub struct ZipExtractor {
    options: ExtractOptions,
}

impl ZipExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Whether an entry name passes the include and exclude lists.
    pub fn selects(&self, name: &str) -> bool {
        if !self.options.include.is_empty() {
            let matches = self.options.include.iter().any(|f| {
                if has_glob_chars(f) {
                    glob_match(f, name)
                } else {
                    // No wildcards: exact match on full name or base name
                    name == f || base_name(name) == f
                }
            });
            if !matches {
                return false;
            }
        }
        !self
            .options
            .exclude
            .iter()
            .any(|x| name.contains(x.as_str()) || glob_match(x, name))
    }

    /// Where `entry` goes under `dest`, or `None` if its name is unsafe.
    pub fn output_path(&self, dest: &Path, entry: &EntryMetadata) -> Option<PathBuf> {
        let relative = sanitize_name(&entry.name())?;
        if self.options.junk_paths {
            return relative.file_name().map(|name| dest.join(name));
        }
        Some(dest.join(relative))
    }

    /// Extracts the rest of the current archive into `dest`.
    ///
    /// `report` is called once per entry, after the entry has been handled.
    pub fn extract_to_dir<F>(
        &self,
        archive: &mut ZipStreamReader<'_>,
        dest: &Path,
        mut report: F,
    ) -> Result<ExtractSummary>
    where
        F: FnMut(&EntryMetadata, &Action),
    {
        let mut summary = ExtractSummary::default();
        while let Some(entry) = archive.next_entry()? {
            let action = self.extract_entry(archive, &entry, dest, &mut summary)?;
            // Descriptor sizes are known once the entry has been read
            let entry = archive.entry().unwrap_or(&entry);
            report(entry, &action);
        }
        Ok(summary)
    }

    /// Writes the content of every selected file in the rest of the
    /// current archive to `out`, back to back.
    pub fn extract_to_writer<W, F>(
        &self,
        archive: &mut ZipStreamReader<'_>,
        out: &mut W,
        mut report: F,
    ) -> Result<ExtractSummary>
    where
        W: Write + ?Sized,
        F: FnMut(&EntryMetadata, &Action),
    {
        let mut summary = ExtractSummary::default();
        while let Some(entry) = archive.next_entry()? {
            let action = if entry.is_dir() || !self.selects(&entry.name()) {
                summary.skipped += 1;
                Action::Filtered
            } else {
                summary.bytes += io::copy(archive, out)?;
                summary.files += 1;
                Action::Piped
            };
            report(archive.entry().unwrap_or(&entry), &action);
        }
        out.flush()?;
        Ok(summary)
    }

    fn extract_entry(
        &self,
        archive: &mut ZipStreamReader<'_>,
        entry: &EntryMetadata,
        dest: &Path,
        summary: &mut ExtractSummary,
    ) -> Result<Action> {
        let name = entry.name();
        if !self.selects(&name) {
            summary.skipped += 1;
            return Ok(Action::Filtered);
        }
        let Some(path) = self.output_path(dest, entry) else {
            warn!("skipping unsafe entry name: {}", name);
            summary.skipped += 1;
            return Ok(Action::UnsafePath);
        };

        if entry.is_dir() {
            // Directories are created on demand when paths are junked
            if self.options.junk_paths {
                summary.skipped += 1;
                return Ok(Action::Filtered);
            }
            fs::create_dir_all(&path)?;
            summary.dirs += 1;
            return Ok(Action::CreatedDir(path));
        }

        if path.exists() && self.options.overwrite == Overwrite::Never {
            summary.skipped += 1;
            return Ok(Action::Exists(path));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(&path)?;
        let written = io::copy(archive, &mut file)?;
        debug!("wrote {} bytes to {}", written, path.display());
        summary.files += 1;
        summary.bytes += written;
        Ok(Action::Extracted(path))
    }
}

/// Turns an entry name into a relative path, refusing absolute names and
/// `..` components.
pub fn sanitize_name(name: &str) -> Option<PathBuf> {
    let normalized = name.replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if out.as_os_str().is_empty() {
        return None;
    }
    Some(out)
}

fn base_name(name: &str) -> &str {
    name.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(name)
}

/// Check if a pattern contains glob wildcard characters.
pub fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
///
/// # Examples
///
/// ```
/// use sunzip::glob_match;
///
/// assert!(glob_match("*.txt", "readme.txt"));
/// assert!(glob_match("file?.dat", "file1.dat"));
/// assert!(!glob_match("*.txt", "readme.md"));
/// ```
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            // Star matches nothing, or one character and stays
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}
