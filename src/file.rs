//! File helpers: atomic writes and default output paths.

use crate::types::TicketCryptError;
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Extension of encrypted sidecar files.
pub const SIDECAR_EXT: &str = "encrypted";

/// Atomically write data to a file using a temporary file.
///
/// The data is written to a temporary file next to `path`, synced, and then
/// renamed over the target. An existing target is only replaced when `force`
/// is set.
///
/// # Errors
///
/// Returns `TicketCryptError::Io` for I/O failures or `TicketCryptError::Invalid`
/// for an existing target without `force` or a path without a parent.
pub fn write_all_atomic(
    path: &Path,
    data: &[u8],
    mode_600: bool,
    force: bool,
) -> Result<(), TicketCryptError> {
    if path.exists() && !force {
        return Err(TicketCryptError::Invalid(
            "output exists; use --force to overwrite",
        ));
    }
    let parent = match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => return Err(TicketCryptError::Invalid("output path has no parent")),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    if mode_600 {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))?;
        }
    }
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| TicketCryptError::Io(e.error))?;
    Ok(())
}

/// Default sidecar path for an input file: `<input>.encrypted`.
pub fn default_sidecar_path(input: &Path) -> PathBuf {
    let mut os = input.as_os_str().to_os_string();
    os.push(".");
    os.push(SIDECAR_EXT);
    PathBuf::from(os)
}

/// Determine the default output path for decryption.
///
/// - If the sidecar name ends with ".encrypted", that suffix is stripped
/// - Otherwise, ".dec" is appended
pub fn default_decrypt_output_path(in_path: &Path) -> PathBuf {
    let parent = in_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = in_path.file_name().unwrap_or_else(|| OsStr::new("out"));

    if let Some(name) = file_name.to_str() {
        if let Some(stripped) = name.strip_suffix(".encrypted")
            && !stripped.is_empty()
        {
            return parent.join(stripped);
        }
        return parent.join(format!("{name}.dec"));
    }

    // Non-UTF-8 file name: just append ".dec"
    let mut os = file_name.to_os_string();
    os.push(".dec");
    parent.join(os)
}
