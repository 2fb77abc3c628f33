//! Entry naming and writing
//!
//! Entry names inside a container are percent-encoded. They are decoded
//! before use and must stay inside the extraction root.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Component, Path, PathBuf};

use appxtract_errors::PlatformError;
use zip::ZipArchive;

/// Entries that describe the archive itself and are never written out
pub(crate) const CONTENT_TYPES: &str = "[Content_Types].xml";
pub(crate) const SIGNATURE: &str = "AppxSignature.p7x";

fn archive_error(err: &zip::result::ZipError) -> PlatformError {
    PlatformError::ArchiveReadFailed {
        message: err.to_string(),
    }
}

fn io_error(operation: &str, path: &Path, err: &std::io::Error) -> PlatformError {
    PlatformError::FilesystemOperationFailed {
        operation: format!("{operation} {}", path.display()),
        message: err.to_string(),
    }
}

/// Decode `%XX` escapes in an entry name
pub(crate) fn decode_entry_name(raw: &str) -> Result<String, PlatformError> {
    let bytes = raw.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = raw
                .get(i + 1..i + 3)
                .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| PlatformError::ArchiveReadFailed {
                    message: format!("invalid escape in entry name {raw}"),
                })?;
            decoded.push(hex);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).map_err(|_| PlatformError::ArchiveReadFailed {
        message: format!("entry name {raw} is not valid UTF-8 once decoded"),
    })
}

/// Relative path for a decoded entry name, rejecting anything that would
/// leave the extraction root
pub(crate) fn safe_relative_path(name: &str) -> Result<PathBuf, PlatformError> {
    let normalized = name.replace('\\', "/");
    let mut path = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PlatformError::UnsafeEntryPath {
                    entry: name.to_string(),
                });
            }
        }
    }
    if path.as_os_str().is_empty() {
        return Err(PlatformError::UnsafeEntryPath {
            entry: name.to_string(),
        });
    }
    Ok(path)
}

/// Map of lower-cased decoded entry name to archive index
pub(crate) fn entry_index<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<HashMap<String, usize>, PlatformError> {
    let mut index = HashMap::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive.by_index(i).map_err(|e| archive_error(&e))?;
        index.insert(decode_entry_name(file.name())?.to_ascii_lowercase(), i);
    }
    Ok(index)
}

/// Read one entry fully, looked up by decoded name (case-insensitive)
pub(crate) fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    index: &HashMap<String, usize>,
    name: &str,
) -> Result<Option<Vec<u8>>, PlatformError> {
    let Some(&i) = index.get(&name.to_ascii_lowercase()) else {
        return Ok(None);
    };
    let mut file = archive.by_index(i).map_err(|e| archive_error(&e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| PlatformError::ArchiveReadFailed {
            message: format!("failed to read {name}: {e}"),
        })?;
    Ok(Some(bytes))
}

/// Write every entry accepted by `keep` under `destination`
///
/// Returns the number of files written.
pub(crate) fn write_entries<R, F>(
    archive: &mut ZipArchive<R>,
    destination: &Path,
    keep: F,
) -> Result<usize, PlatformError>
where
    R: Read + Seek,
    F: Fn(&str) -> bool,
{
    std::fs::create_dir_all(destination).map_err(|e| io_error("create", destination, &e))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| archive_error(&e))?;
        let name = decode_entry_name(file.name())?;
        if name.eq_ignore_ascii_case(CONTENT_TYPES) || !keep(&name) {
            continue;
        }

        let outpath = destination.join(safe_relative_path(&name)?);
        if file.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| io_error("create", &outpath, &e))?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error("create", parent, &e))?;
        }
        let mut outfile = File::create(&outpath).map_err(|e| io_error("write", &outpath, &e))?;
        std::io::copy(&mut file, &mut outfile).map_err(|e| io_error("write", &outpath, &e))?;
        written += 1;
    }
    Ok(written)
}
