//! Filesystem primitives consumed by the dispatcher, and their host implementation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::buffer::SpecNativePathBuffer;
use crate::copy::copy_tree;
use crate::spec::{SpecBatchCopyFlags, SpecTreeCopyOptions};
use crate::util::{copy_file_exclusive, copy_file_with_metadata, is_same_file};

/// One submission to the batch tree-copy primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBatchCopyRequest {
    /// Source path list (double-terminator shape).
    pub buffer_source: SpecNativePathBuffer,
    /// Destination path list (double-terminator shape).
    pub buffer_destination: SpecNativePathBuffer,
    /// Unattended-operation flags.
    pub spec_flags: SpecBatchCopyFlags,
}

/// Opaque filesystem services. Results are reported, never retried.
pub trait FsPrimitives {
    /// Copy one file. With `if_fail_if_exists`, an existing destination is left
    /// untouched and `AlreadyExists` is returned.
    fn copy_file(
        &self,
        path_src: &Path,
        path_dst: &Path,
        if_fail_if_exists: bool,
    ) -> io::Result<()>;

    /// Copy a file or directory tree, recursively, as described by `request`.
    fn copy_tree_batch(&self, request: &SpecBatchCopyRequest) -> io::Result<()>;

    /// Create exactly one directory. Fails if it exists or its parent is missing.
    fn create_dir(&self, path_dir: &Path) -> io::Result<()>;
}

/// Host filesystem implementation.
#[derive(Debug, Clone, Default)]
pub struct SystemFsPrimitives {
    /// Options for directory sources of the batch copy.
    pub spec_tree_options: SpecTreeCopyOptions,
}

impl FsPrimitives for SystemFsPrimitives {
    fn copy_file(
        &self,
        path_src: &Path,
        path_dst: &Path,
        if_fail_if_exists: bool,
    ) -> io::Result<()> {
        if if_fail_if_exists {
            return copy_file_exclusive(path_src, path_dst);
        }
        if is_same_file(path_src, path_dst) {
            return Err(_same_file_error(path_src));
        }
        copy_file_with_metadata(path_src, path_dst)
    }

    fn copy_tree_batch(&self, request: &SpecBatchCopyRequest) -> io::Result<()> {
        let l_sources = request.buffer_source.paths();
        let Some(path_dst) = request.buffer_destination.paths().into_iter().next() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Batch copy request has no destination path",
            ));
        };
        if l_sources.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Batch copy request has no source path",
            ));
        }

        let mut l_failures: Vec<String> = Vec::new();
        for path_src in &l_sources {
            if let Err(e) = self.copy_one_source(path_src, &path_dst, request.spec_flags) {
                tracing::debug!(
                    source = %path_src.display(),
                    destination = %path_dst.display(),
                    error = %e,
                    "batch copy entry failed"
                );
                l_failures.push(format!("{}: {e}", path_src.display()));
            }
        }
        if l_failures.is_empty() {
            return Ok(());
        }
        Err(io::Error::other(l_failures.join("; ")))
    }

    fn create_dir(&self, path_dir: &Path) -> io::Result<()> {
        fs::create_dir(path_dir)
    }
}

impl SystemFsPrimitives {
    /// Shell copy placement: into `path_dst` when it is an existing directory,
    /// onto `path_dst` otherwise.
    fn copy_one_source(
        &self,
        path_src: &Path,
        path_dst: &Path,
        spec_flags: SpecBatchCopyFlags,
    ) -> io::Result<()> {
        let meta_src = fs::metadata(path_src)?;
        let path_target = _derive_batch_target(path_src, path_dst)?;

        if let Some(path_parent) = path_target.parent()
            && !path_parent.as_os_str().is_empty()
            && !path_parent.exists()
        {
            if !spec_flags.if_no_confirm_mkdir {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "Destination parent is missing and creation was not allowed: {}",
                        path_parent.display()
                    ),
                ));
            }
            fs::create_dir_all(path_parent)?;
        }

        if meta_src.is_dir() {
            let report_copy = copy_tree(path_src, &path_target, self.spec_tree_options.clone())
                .map_err(io::Error::other)?;
            tracing::debug!(report = %report_copy, "tree copy finished");
            if report_copy.error_count() > 0 {
                return Err(io::Error::other(report_copy.to_string()));
            }
            return Ok(());
        }

        if is_same_file(path_src, &path_target) {
            return Err(_same_file_error(path_src));
        }
        if !spec_flags.if_no_confirmation && fs::symlink_metadata(&path_target).is_ok() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!(
                    "Destination exists and overwrite was not confirmed: {}",
                    path_target.display()
                ),
            ));
        }
        copy_file_with_metadata(path_src, &path_target)
    }
}

fn _derive_batch_target(path_src: &Path, path_dst: &Path) -> io::Result<PathBuf> {
    if !path_dst.is_dir() {
        return Ok(path_dst.to_path_buf());
    }
    let name_src = path_src.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Source has no filename component: {}", path_src.display()),
        )
    })?;
    Ok(path_dst.join(name_src))
}

fn _same_file_error(path_src: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!(
            "Source and destination are the same file: {}",
            path_src.display()
        ),
    )
}
