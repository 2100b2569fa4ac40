use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use thiserror::Error;

use tally_domain::LedgerBook;

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("book file is not valid JSON: {0}")]
    Serde(String),
}

/// Filesystem-backed JSON persistence for a ledger book.
///
/// Saves go through a sibling temp file followed by a rename, so a crash
/// mid-write leaves the previous book intact.
#[derive(Debug, Clone)]
pub struct BookStorage {
    path: PathBuf,
}

impl BookStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the book, or an empty one when the file does not exist yet.
    pub fn load(&self) -> Result<LedgerBook, StorageError> {
        if !self.path.exists() {
            return Ok(LedgerBook::new());
        }
        load_book_from_path(&self.path)
    }

    pub fn save(&self, book: &LedgerBook) -> Result<(), StorageError> {
        save_book_to_path(book, &self.path)
    }
}

/// Saves a book to an arbitrary path on disk.
pub fn save_book_to_path(book: &LedgerBook, path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    write_all(&tmp, &serialize_book(book)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Loads a book from the provided filesystem path.
pub fn load_book_from_path(path: &Path) -> Result<LedgerBook, StorageError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| StorageError::Serde(err.to_string()))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_all(path: &Path, data: &str) -> Result<(), StorageError> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}

fn serialize_book(book: &LedgerBook) -> Result<String, StorageError> {
    serde_json::to_string_pretty(book).map_err(|err| StorageError::Serde(err.to_string()))
}
