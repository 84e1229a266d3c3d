//! Best-effort recursive directory creation.

use std::path::{Component, Path, PathBuf};

use crate::primitive::FsPrimitives;
use crate::spec::{EnumFolderOutcome, SpecDispatchContext};
use crate::util::canonicalize_path;

/// Create every segment of `path_operand`, root excluded, then the full path.
///
/// Each segment is requested through [`FsPrimitives::create_dir`]; failures,
/// including "already exists", are counted and otherwise ignored, so later
/// segments are still attempted. An operand that cannot be resolved to a full
/// path is skipped without touching the filesystem.
pub fn ensure_directory_tree<F>(
    path_operand: &Path,
    spec_ctx: &SpecDispatchContext,
    primitives: &F,
) -> EnumFolderOutcome
where
    F: FsPrimitives + ?Sized,
{
    let Some(path_dir) = canonicalize_path(path_operand, spec_ctx.path_dir_cwd.as_deref()) else {
        tracing::debug!(
            operand = %path_operand.display(),
            "skipping unresolvable folder"
        );
        return EnumFolderOutcome::Skipped {
            path_operand: path_operand.to_path_buf(),
        };
    };

    let mut n_attempts = 0_usize;
    let mut n_failures = 0_usize;
    let mut request_create = |path_segment: &Path| {
        n_attempts += 1;
        if let Err(e) = primitives.create_dir(path_segment) {
            n_failures += 1;
            tracing::trace!(path = %path_segment.display(), error = %e, "create_dir ignored");
        }
    };

    let mut path_prefix = PathBuf::new();
    let mut l_segments = Vec::new();
    for component in path_dir.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => path_prefix.push(component.as_os_str()),
            _ => l_segments.push(component.as_os_str()),
        }
    }
    if let Some((_, l_ancestors)) = l_segments.split_last() {
        for name_segment in l_ancestors {
            path_prefix.push(name_segment);
            request_create(&path_prefix);
        }
    }
    request_create(&path_dir);

    tracing::debug!(
        path = %path_dir.display(),
        n_attempts,
        n_failures,
        "folder materialized"
    );
    EnumFolderOutcome::Attempted {
        path_dir,
        n_attempts,
        n_failures,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::io;
    use std::path::{Path, PathBuf};

    use super::ensure_directory_tree;
    use crate::primitive::{FsPrimitives, SpecBatchCopyRequest, SystemFsPrimitives};
    use crate::spec::{EnumFolderOutcome, SpecDispatchContext};

    /// Records create requests against an in-memory set of directories.
    #[derive(Default)]
    struct RecordingPrimitives {
        l_created: RefCell<Vec<PathBuf>>,
        set_existing: RefCell<HashSet<PathBuf>>,
    }

    impl FsPrimitives for RecordingPrimitives {
        fn copy_file(&self, _: &Path, _: &Path, _: bool) -> io::Result<()> {
            unreachable!("mkdir never copies")
        }

        fn copy_tree_batch(&self, _: &SpecBatchCopyRequest) -> io::Result<()> {
            unreachable!("mkdir never copies")
        }

        fn create_dir(&self, path_dir: &Path) -> io::Result<()> {
            self.l_created.borrow_mut().push(path_dir.to_path_buf());
            if !self.set_existing.borrow_mut().insert(path_dir.to_path_buf()) {
                return Err(io::Error::from(io::ErrorKind::AlreadyExists));
            }
            Ok(())
        }
    }

    #[cfg(unix)]
    #[test]
    fn segments_are_requested_root_first_and_root_is_skipped() {
        let primitives = RecordingPrimitives::default();
        let spec_ctx = SpecDispatchContext::with_cwd("/work");

        let outcome = ensure_directory_tree(Path::new("a/b/c"), &spec_ctx, &primitives);
        assert_eq!(
            *primitives.l_created.borrow(),
            vec![
                PathBuf::from("/work"),
                PathBuf::from("/work/a"),
                PathBuf::from("/work/a/b"),
                PathBuf::from("/work/a/b/c"),
            ]
        );
        assert_eq!(
            outcome,
            EnumFolderOutcome::Attempted {
                path_dir: PathBuf::from("/work/a/b/c"),
                n_attempts: 4,
                n_failures: 0,
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn rerun_only_reports_already_existing_segments() {
        let primitives = RecordingPrimitives::default();
        let spec_ctx = SpecDispatchContext::with_cwd("/");

        ensure_directory_tree(Path::new("x/y"), &spec_ctx, &primitives);
        let outcome = ensure_directory_tree(Path::new("/x/./y/"), &spec_ctx, &primitives);
        assert_eq!(
            outcome,
            EnumFolderOutcome::Attempted {
                path_dir: PathBuf::from("/x/y"),
                n_attempts: 2,
                n_failures: 2,
            }
        );
    }

    #[test]
    fn unresolvable_operand_is_skipped() {
        let primitives = RecordingPrimitives::default();
        let outcome =
            ensure_directory_tree(Path::new("rel"), &SpecDispatchContext::default(), &primitives);
        assert_eq!(
            outcome,
            EnumFolderOutcome::Skipped {
                path_operand: PathBuf::from("rel")
            }
        );
        assert!(primitives.l_created.borrow().is_empty());
    }

    #[test]
    fn creates_nested_tree_on_disk_idempotently() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let spec_ctx = SpecDispatchContext::with_cwd(tmp.path());
        let primitives = SystemFsPrimitives::default();

        for _ in 0..2 {
            let outcome = ensure_directory_tree(Path::new("a/b/c"), &spec_ctx, &primitives);
            assert!(matches!(outcome, EnumFolderOutcome::Attempted { .. }));
            assert!(tmp.path().join("a/b/c").is_dir());
        }
    }
}
