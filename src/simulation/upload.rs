use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const TEXT_CSV: &str = "text/csv";
pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_X_EMPTY: &str = "application/x-empty";
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

const FALLBACK_FILE_NAME: &str = "upload.csv";
const CSV_SAMPLE_LINES: usize = 20;

/// A `file` part read from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    /// Content type the client declared; informational only
    pub declared_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn detected_type(&self) -> &'static str {
        sniff_mime(&self.bytes)
    }

    pub fn is_accepted_type(&self) -> bool {
        matches!(self.detected_type(), TEXT_CSV | TEXT_PLAIN)
    }
}

/// An upload written to the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    /// Location on disk, under `working_dir`
    pub path: PathBuf,
    /// `{timestamp}_{basename}`
    pub file_name: String,
}

impl StagedUpload {
    /// Path as the simulator sees it from its working directory.
    pub fn relative_to(&self, uploads_dir: &Path) -> PathBuf {
        uploads_dir.join(&self.file_name)
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to create uploads directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write staged file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Guess the MIME type from content, ignoring whatever the client claimed.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.is_empty() {
        return APPLICATION_X_EMPTY;
    }
    if bytes.iter().any(|b| is_binary_byte(*b)) {
        return APPLICATION_OCTET_STREAM;
    }
    if looks_like_csv(&String::from_utf8_lossy(bytes)) {
        TEXT_CSV
    } else {
        TEXT_PLAIN
    }
}

fn is_binary_byte(b: u8) -> bool {
    // tab, LF, VT, FF, CR and ESC show up in plain text files
    (b < 0x20 && !matches!(b, b'\t' | b'\n' | 0x0b | 0x0c | b'\r' | 0x1b)) || b == 0x7f
}

fn looks_like_csv(text: &str) -> bool {
    let sample: Vec<&str> = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .take(CSV_SAMPLE_LINES)
        .collect();
    if sample.len() < 2 {
        return false;
    }

    [',', ';'].iter().any(|sep| {
        let first = sample[0].matches(*sep).count();
        first > 0 && sample.iter().all(|line| line.matches(*sep).count() == first)
    })
}

/// Final path component of a client-supplied name.
pub fn basename(file_name: &str) -> &str {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => FALLBACK_FILE_NAME,
        name => name,
    }
}

pub fn staged_file_name(timestamp: i64, original: &str) -> String {
    format!("{}_{}", timestamp, basename(original))
}

/// Write the upload to `{dir}/{timestamp}_{basename}`, creating `dir` if needed.
///
/// An existing file with the same name is overwritten.
pub async fn stage_upload(
    dir: &Path,
    upload: &UploadedFile,
    timestamp: i64,
) -> Result<StagedUpload, StageError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| StageError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

    let file_name = staged_file_name(timestamp, &upload.file_name);
    let path = dir.join(&file_name);
    tokio::fs::write(&path, &upload.bytes)
        .await
        .map_err(|source| StageError::Write {
            path: path.clone(),
            source,
        })?;

    tracing::debug!(path = %path.display(), bytes = upload.bytes.len(), "Upload staged");
    Ok(StagedUpload { path, file_name })
}
