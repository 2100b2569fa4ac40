use std::path::PathBuf;

const APP_DIR: &str = "tally";
const BOOK_FILE: &str = "book.json";

/// Resolves the on-disk book location: an explicit override wins, then the
/// platform data directory, then the working directory.
pub fn book_path(override_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = override_path {
        return path;
    }
    dirs::data_dir()
        .map(|base| base.join(APP_DIR).join(BOOK_FILE))
        .unwrap_or_else(|| PathBuf::from(BOOK_FILE))
}
