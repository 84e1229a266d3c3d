//! Filename extraction and implicit-destination derivation.

use std::ffi::OsString;
use std::path::{Path, PathBuf, is_separator};

use crate::conf::{C_NATIVE_SEPARATOR, TUP_PATH_SEPARATORS};
use crate::spec::{ResolutionFailure, SpecDispatchContext};
use crate::util::calculate_native_len;

/// Substring after the last `/` or `\`, or the whole input when neither occurs.
///
/// Mixed separators are tolerated: `x/y\z.txt` yields `z.txt`.
pub fn filename_of(path: &str) -> &str {
    match path.rfind(TUP_PATH_SEPARATORS) {
        Some(n_idx) => &path[n_idx + 1..],
        None => path,
    }
}

/// Destination used when a copy command names none.
///
/// - single-file copy: `cwd` + separator (unless `cwd` already ends with one) + filename of `source`
/// - tree copy: `cwd` itself
///
/// Fails when the working directory is unknown/empty or has `n_len_path_max` or
/// more native units.
pub fn derive_destination(
    source: &Path,
    if_single_file_copy: bool,
    spec_ctx: &SpecDispatchContext,
    n_len_path_max: usize,
) -> Result<PathBuf, ResolutionFailure> {
    let path_dir_cwd = spec_ctx
        .path_dir_cwd
        .as_deref()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or(ResolutionFailure::WorkingDirectoryUnavailable)?;

    let n_len = calculate_native_len(path_dir_cwd);
    if n_len >= n_len_path_max {
        return Err(ResolutionFailure::WorkingDirectoryTooLong {
            n_len,
            n_len_max: n_len_path_max,
        });
    }

    if !if_single_file_copy {
        return Ok(path_dir_cwd.to_path_buf());
    }

    let name_file = match source.to_str() {
        Some(c_source) => OsString::from(filename_of(c_source)),
        None => source.file_name().map(OsString::from).unwrap_or_default(),
    };
    if name_file.is_empty() {
        return Err(ResolutionFailure::MissingFilename(source.to_path_buf()));
    }

    let mut c_dest = path_dir_cwd.as_os_str().to_os_string();
    let b_ends_with_separator = path_dir_cwd
        .to_str()
        .and_then(|c| c.chars().last())
        .is_some_and(is_separator);
    if !b_ends_with_separator {
        c_dest.push(C_NATIVE_SEPARATOR.to_string());
    }
    c_dest.push(&name_file);
    Ok(PathBuf::from(c_dest))
}
