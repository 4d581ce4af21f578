//! Facilities for discovering input files and loading text corpora.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use log::{debug, warn};
use walkdir::WalkDir;

use crate::config::IngestConfig;
use crate::error::{BpeError, Result};

/// Discovers files rooted at the provided input paths according to the ingest configuration.
///
/// Explicit file inputs keep their command-line order; files found inside a directory are sorted
/// by path so repeated runs read the corpus in the same order.
pub fn collect_paths<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(BpeError::io(
                std::io::Error::new(std::io::ErrorKind::NotFound, "input path does not exist"),
                Some(path.to_path_buf()),
            ));
        }
        let metadata = path
            .metadata()
            .map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
        if metadata.is_dir() {
            let mut found = Vec::new();
            let depth = if cfg.recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(path)
                .max_depth(depth)
                .follow_links(cfg.follow_symlinks);
            for entry in walker {
                let entry = entry.map_err(|err| {
                    let entry_path = err.path().map(Path::to_path_buf);
                    match err.into_io_error() {
                        Some(io) => BpeError::io(io, entry_path),
                        None => BpeError::Internal("directory walk failed".into()),
                    }
                })?;
                if entry.file_type().is_file() {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            files.extend(found);
        } else if metadata.is_file() {
            files.push(path.to_path_buf());
        }
    }
    if files.is_empty() {
        return Err(BpeError::InvalidConfig(
            "no files discovered in provided inputs".into(),
        ));
    }
    Ok(files)
}

/// Loads and concatenates the text of every discovered file, applying the configured caps.
///
/// Files are separated by a newline so the last word of one file never joins the first word of
/// the next. The byte cap never splits a UTF-8 character; the line cap is applied afterwards.
pub fn load_text_corpus<P: AsRef<Path>>(inputs: &[P], cfg: &IngestConfig) -> Result<String> {
    let file_paths = collect_paths(inputs, cfg)?;
    let mut corpus = String::new();
    let mut remaining = cfg.max_bytes;
    let mut capped = false;
    for file_path in &file_paths {
        if remaining == Some(0) {
            capped = true;
            break;
        }
        let (bytes, truncated) = read_capped(file_path, remaining)?;
        if let Some(left) = remaining.as_mut() {
            *left -= bytes.len();
            if truncated {
                *left = 0;
                capped = true;
            }
        }
        let text = decode(bytes, truncated, file_path, cfg.lossy_utf8)?;
        debug!("read {} bytes from {}", text.len(), file_path.display());
        corpus.push_str(&text);
        if !corpus.is_empty() && !corpus.ends_with('\n') {
            corpus.push('\n');
        }
    }
    if capped {
        warn!("corpus capped at {} bytes", cfg.max_bytes.unwrap_or(0));
    }
    if let Some(limit) = cfg.max_lines {
        let kept = first_lines(&corpus, limit).len();
        if kept < corpus.len() {
            warn!("corpus capped at {limit} lines");
            corpus.truncate(kept);
        }
    }
    Ok(corpus)
}

/// Reads up to `limit` bytes from `path`, reporting whether the file had more.
fn read_capped(path: &Path, limit: Option<usize>) -> Result<(Vec<u8>, bool)> {
    let file = File::open(path).map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
    let mut buffer = Vec::new();
    let truncated = match limit {
        None => {
            let mut file = file;
            file.read_to_end(&mut buffer)
                .map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
            false
        }
        Some(limit) => {
            // One extra byte tells a file of exactly `limit` bytes apart from a longer one.
            let budget = u64::try_from(limit).map_or(u64::MAX, |limit| limit.saturating_add(1));
            file.take(budget)
                .read_to_end(&mut buffer)
                .map_err(|err| BpeError::io(err, Some(path.to_path_buf())))?;
            let truncated = buffer.len() > limit;
            buffer.truncate(limit);
            truncated
        }
    };
    Ok((buffer, truncated))
}

fn decode(mut bytes: Vec<u8>, truncated: bool, path: &Path, lossy: bool) -> Result<String> {
    if truncated {
        trim_partial_char(&mut bytes);
    }
    if lossy {
        return Ok(bytes.to_str_lossy().into_owned());
    }
    String::from_utf8(bytes).map_err(|err| BpeError::InvalidCorpus {
        path: path.to_path_buf(),
        message: err.utf8_error().to_string(),
    })
}

/// Drops a trailing UTF-8 sequence that was cut short by the byte cap.
fn trim_partial_char(bytes: &mut Vec<u8>) {
    let len = bytes.len();
    for back in 1..=len.min(4) {
        let byte = bytes[len - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        if width > back {
            bytes.truncate(len - back);
        }
        return;
    }
}

fn first_lines(text: &str, limit: usize) -> &str {
    let end = text
        .split_inclusive('\n')
        .take(limit)
        .map(str::len)
        .sum::<usize>();
    &text[..end]
}
