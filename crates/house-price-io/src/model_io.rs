use crate::error::{IoError, IoResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Serialize `value` to `path` with bincode, creating parent directories.
///
/// The bytes go to a sibling temporary file first and are renamed into
/// place, so a reader never sees a half-written artifact.
pub fn save_bincode<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> IoResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IoError::io(parent, e))?;
    }

    let tmp = path.with_extension("bin.tmp");
    if let Err(e) = write_then_rename(value, path, &tmp) {
        // Report the write error even if cleanup fails too.
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    debug!(path = %path.display(), "saved artifact");
    Ok(())
}

fn write_then_rename<T: Serialize + ?Sized>(value: &T, path: &Path, tmp: &Path) -> IoResult<()> {
    let file = fs::File::create(tmp).map_err(|e| IoError::io(tmp, e))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, value).map_err(|source| IoError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|e| IoError::io(tmp, e))?;
    drop(writer);
    fs::rename(tmp, path).map_err(|e| IoError::io(path, e))
}

/// Deserialize a bincode artifact written by [`save_bincode`].
pub fn load_bincode<T: DeserializeOwned>(path: impl AsRef<Path>) -> IoResult<T> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|e| IoError::io(path, e))?;
    let value = bincode::deserialize_from(BufReader::new(file)).map_err(|source| IoError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded artifact");
    Ok(value)
}

/// Delete a file if it exists. Returns whether something was removed.
pub fn remove_if_exists(path: impl AsRef<Path>) -> IoResult<bool> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed file");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(IoError::io(path, e)),
    }
}
