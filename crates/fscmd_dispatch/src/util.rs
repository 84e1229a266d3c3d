use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::report::ReportCopyBuilder;

////////////////////////////////////////////////////////////////////////////////
// #region NativeEncoding

/// Convert one command token into a native path.
///
/// Empty tokens and tokens carrying a NUL unit have no native representation
/// and yield `None`.
pub(crate) fn convert_to_native_path(token: &str) -> Option<PathBuf> {
    if token.is_empty() || token.contains('\0') {
        return None;
    }
    Some(PathBuf::from(OsString::from(token)))
}

/// Length of `path` in native units (UTF-16 units on Windows, bytes elsewhere).
pub(crate) fn calculate_native_len(path: &Path) -> usize {
    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        path.as_os_str().encode_wide().count()
    }
    #[cfg(not(windows))]
    {
        path.as_os_str().as_encoded_bytes().len()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Join a relative `path` onto `path_dir_cwd`. Absolute paths pass through.
///
/// Returns `None` when `path` is relative and no working directory is known.
pub fn absolutize_path(path: &Path, path_dir_cwd: Option<&Path>) -> Option<PathBuf> {
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    let path_dir_cwd = path_dir_cwd.filter(|p| !p.as_os_str().is_empty())?;
    Some(path_dir_cwd.join(path))
}

/// Fully-qualified lexical form of `path`: absolute, `.` removed, `..` collapsed.
///
/// The filesystem is never consulted, so paths that do not exist yet resolve too.
/// `..` above the root stays at the root.
pub fn canonicalize_path(path: &Path, path_dir_cwd: Option<&Path>) -> Option<PathBuf> {
    let path_abs = absolutize_path(path, path_dir_cwd)?;

    let mut path_out = PathBuf::new();
    let mut n_normal_depth = 0_usize;
    for component in path_abs.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => path_out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if n_normal_depth > 0 {
                    path_out.pop();
                    n_normal_depth -= 1;
                }
            }
            Component::Normal(name) => {
                path_out.push(name);
                n_normal_depth += 1;
            }
        }
    }
    if !path_out.is_absolute() {
        return None;
    }
    Some(path_out)
}

/// Resolve the deepest existing ancestor on disk and append the missing tail.
///
/// `path` must be absolute; the process working directory is never consulted.
fn _normalize_existing_path(path: &Path) -> PathBuf {
    let path_lexical = canonicalize_path(path, None).unwrap_or_else(|| path.to_path_buf());

    let mut l_tail = Vec::new();
    let mut path_cursor = path_lexical.as_path();
    loop {
        if let Ok(mut resolved) = fs::canonicalize(path_cursor) {
            resolved.extend(l_tail.iter().rev());
            return resolved;
        }
        match (path_cursor.parent(), path_cursor.file_name()) {
            (Some(path_parent), Some(name)) => {
                l_tail.push(name);
                path_cursor = path_parent;
            }
            _ => return path_lexical.clone(),
        }
    }
}

/// `true` when `dst` lies inside (or is) `src`.
pub(crate) fn is_destination_inside_source(src: &Path, dst: &Path) -> bool {
    _normalize_existing_path(dst).starts_with(_normalize_existing_path(src))
}

/// `true` when both paths exist and name the same filesystem object.
pub(crate) fn is_same_file(path_a: &Path, path_b: &Path) -> bool {
    match (fs::canonicalize(path_a), fs::canonicalize(path_b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ConflictHandling

/// `true` when an existing destination directory entry must not be merged into.
///
/// A symlink is refused rather than followed, so nothing is written outside the
/// destination tree.
pub(crate) fn should_skip_dir_conflict(
    path_dst: &Path,
    builder_cp_report: &mut ReportCopyBuilder,
) -> bool {
    let Ok(meta_dst) = fs::symlink_metadata(path_dst) else {
        return false;
    };
    if meta_dst.file_type().is_symlink() {
        builder_cp_report.add_error(
            path_dst.to_path_buf(),
            format!(
                "Destination directory is a symlink, refusing to merge through it: {}",
                path_dst.display()
            ),
        );
        return true;
    }
    if !meta_dst.is_dir() {
        builder_cp_report.add_error(
            path_dst.to_path_buf(),
            format!(
                "Destination is a file, expected directory: {}",
                path_dst.display()
            ),
        );
        return true;
    }
    false
}

/// Make room for an overwriting file copy; `true` means skip this entry.
pub(crate) fn should_skip_file_conflict(
    path_dst: &Path,
    builder_cp_report: &mut ReportCopyBuilder,
) -> bool {
    let Ok(meta_dst) = fs::symlink_metadata(path_dst) else {
        return false;
    };
    if meta_dst.file_type().is_symlink() {
        // Replaced, never written through.
        if let Err(e) = fs::remove_file(path_dst) {
            builder_cp_report.add_error(path_dst.to_path_buf(), e.to_string());
            return true;
        }
        return false;
    }
    if meta_dst.is_dir() {
        builder_cp_report.add_error(
            path_dst.to_path_buf(),
            format!("Destination is a directory: {}", path_dst.display()),
        );
        return true;
    }
    false
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileCopy

pub(crate) fn create_symbolic_link(
    path_src: &Path,
    path_dst: &Path,
    builder_cp_report: &mut ReportCopyBuilder,
) {
    let target = match fs::read_link(path_src) {
        Ok(v) => v,
        Err(e) => {
            builder_cp_report.add_error(path_dst.to_path_buf(), e.to_string());
            return;
        }
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::symlink;
        match symlink(&target, path_dst) {
            Ok(_) => builder_cp_report.add_copied(),
            Err(e) => builder_cp_report.add_error(path_dst.to_path_buf(), e.to_string()),
        }
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        let res = if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        };
        match res {
            Ok(_) => builder_cp_report.add_copied(),
            Err(e) => builder_cp_report.add_error(path_dst.to_path_buf(), e.to_string()),
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = target;
        builder_cp_report.add_error(
            path_dst.to_path_buf(),
            "Symbolic links are unsupported on this platform".to_string(),
        );
    }
}

/// Copy bytes and metadata, replacing an existing destination file.
pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    fs::copy(path_file_src, path_file_dst)?;
    apply_metadata(path_file_src, path_file_dst)
}

/// Copy bytes and metadata; fails with `AlreadyExists` if the destination exists.
///
/// The destination is created exclusively, so a file appearing between check and
/// write is never clobbered.
pub(crate) fn copy_file_exclusive(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    let mut file_src = fs::File::open(path_file_src)?;
    if !file_src.metadata()?.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Source is not a regular file: {}", path_file_src.display()),
        ));
    }
    let mut file_dst = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path_file_dst)?;
    if let Err(e) = io::copy(&mut file_src, &mut file_dst) {
        drop(file_dst);
        let _ = fs::remove_file(path_file_dst);
        return Err(e);
    }
    drop(file_dst);
    apply_metadata(path_file_src, path_file_dst)
}

fn apply_metadata(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        let _ = xattr::set(path_file_dst, &name, &raw_value);
    }
}

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
