use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Open an existing regular file for reading.
///
/// Directories and other special files are rejected up front so callers get
/// a clear error instead of a confusing read failure later.
pub fn safe_open_file(path: &Path) -> io::Result<File> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        ));
    }

    OpenOptions::new().read(true).open(path)
}
