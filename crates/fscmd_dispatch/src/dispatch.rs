//! Operation dispatch: parse, resolve, execute.
//!
//! Every buffer and path acquired during one dispatch is owned by that call and
//! dropped on return, including every early `?` exit.

use std::io;
use std::path::{Path, PathBuf};

use crate::buffer::SpecNativePathBuffer;
use crate::mkdir::ensure_directory_tree;
use crate::parse::parse_command;
use crate::primitive::{FsPrimitives, SpecBatchCopyRequest, SystemFsPrimitives};
use crate::report::{ReportDispatch, ReportDispatchBuilder};
use crate::resolve::derive_destination;
use crate::spec::{
    DispatchError, EnumOperation, ParseFailure, SpecCommand, SpecDispatchContext,
    SpecDispatchOptions,
};
use crate::util::{absolutize_path, canonicalize_path};

/// Run one command against the process working directory and host filesystem.
///
/// Nothing is returned and nothing is raised; see [`dispatch`] for the outcome.
pub fn execute(raw: Option<&str>) {
    execute_with(
        raw,
        &SpecDispatchContext::from_process(),
        &SpecDispatchOptions::default(),
        &SystemFsPrimitives::default(),
    );
}

/// [`execute`] with explicit context, options and primitives.
pub fn execute_with<F>(
    raw: Option<&str>,
    spec_ctx: &SpecDispatchContext,
    spec_dispatch_options: &SpecDispatchOptions,
    primitives: &F,
) where
    F: FsPrimitives + ?Sized,
{
    match dispatch(raw, spec_ctx, spec_dispatch_options, primitives) {
        Ok(report) => tracing::debug!(report = %report, "command finished"),
        Err(e) => tracing::debug!(error = %e, "command aborted"),
    }
}

/// Parse and execute one command, returning what happened.
pub fn dispatch<F>(
    raw: Option<&str>,
    spec_ctx: &SpecDispatchContext,
    spec_dispatch_options: &SpecDispatchOptions,
    primitives: &F,
) -> Result<ReportDispatch, DispatchError>
where
    F: FsPrimitives + ?Sized,
{
    let spec_command = parse_command(raw)?;
    tracing::debug!(operation = spec_command.operation.keyword(), "command parsed");

    let mut builder_report = ReportDispatchBuilder::new(spec_command.operation);
    match spec_command.operation {
        EnumOperation::MakeDirectories => {
            run_mkdir(&spec_command, spec_ctx, primitives, &mut builder_report)
        }
        EnumOperation::Copy => run_copy(
            spec_command,
            spec_ctx,
            spec_dispatch_options,
            primitives,
            &mut builder_report,
        )?,
        EnumOperation::RecursiveCopy => run_xcopy(
            spec_command,
            spec_ctx,
            spec_dispatch_options,
            primitives,
            &mut builder_report,
        )?,
    }
    Ok(builder_report.build())
}

fn run_mkdir<F>(
    spec_command: &SpecCommand,
    spec_ctx: &SpecDispatchContext,
    primitives: &F,
    builder_report: &mut ReportDispatchBuilder,
) where
    F: FsPrimitives + ?Sized,
{
    for path_operand in spec_command
        .extra_operands
        .iter()
        .filter(|p| !p.as_os_str().is_empty())
    {
        builder_report.add_folder(ensure_directory_tree(path_operand, spec_ctx, primitives));
    }
}

/// Source plus explicit-or-derived destination.
fn resolve_copy_pair(
    spec_command: SpecCommand,
    if_single_file_copy: bool,
    spec_ctx: &SpecDispatchContext,
    spec_dispatch_options: &SpecDispatchOptions,
) -> Result<(PathBuf, PathBuf), DispatchError> {
    let source = spec_command.source.ok_or(ParseFailure::MissingSource)?;
    let destination = match spec_command.destination {
        Some(destination) => destination,
        None => derive_destination(
            &source,
            if_single_file_copy,
            spec_ctx,
            spec_dispatch_options.n_len_path_max,
        )?,
    };
    Ok((source, destination))
}

fn run_copy<F>(
    spec_command: SpecCommand,
    spec_ctx: &SpecDispatchContext,
    spec_dispatch_options: &SpecDispatchOptions,
    primitives: &F,
    builder_report: &mut ReportDispatchBuilder,
) -> Result<(), DispatchError>
where
    F: FsPrimitives + ?Sized,
{
    let (source, destination) =
        resolve_copy_pair(spec_command, true, spec_ctx, spec_dispatch_options)?;
    let path_dir_cwd = spec_ctx.path_dir_cwd.as_deref();
    let path_src = absolutize_path(&source, path_dir_cwd).unwrap_or(source);
    let path_dst = absolutize_path(&destination, path_dir_cwd).unwrap_or(destination);

    builder_report.add_primitive_call();
    let res_copy = primitives.copy_file(&path_src, &path_dst, true);
    builder_report.set_paths(path_src, path_dst.clone());
    match res_copy {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(
                destination = %path_dst.display(),
                "destination exists; copy treated as satisfied"
            );
            builder_report.add_skipped();
            Ok(())
        }
        Err(e) => Err(primitive_failure(&path_dst, e)),
    }
}

fn run_xcopy<F>(
    spec_command: SpecCommand,
    spec_ctx: &SpecDispatchContext,
    spec_dispatch_options: &SpecDispatchOptions,
    primitives: &F,
    builder_report: &mut ReportDispatchBuilder,
) -> Result<(), DispatchError>
where
    F: FsPrimitives + ?Sized,
{
    let (source, destination) =
        resolve_copy_pair(spec_command, false, spec_ctx, spec_dispatch_options)?;
    let path_dir_cwd = spec_ctx.path_dir_cwd.as_deref();
    let path_src = canonicalize_path(&source, path_dir_cwd).unwrap_or(source);
    let path_dst = canonicalize_path(&destination, path_dir_cwd).unwrap_or(destination);

    let request = SpecBatchCopyRequest {
        buffer_source: SpecNativePathBuffer::from_path(&path_src)?,
        buffer_destination: SpecNativePathBuffer::from_path(&path_dst)?,
        spec_flags: spec_dispatch_options.spec_batch_flags,
    };

    builder_report.add_primitive_call();
    let res_copy = primitives.copy_tree_batch(&request);
    builder_report.set_paths(path_src, path_dst.clone());
    res_copy.map_err(|e| primitive_failure(&path_dst, e))
}

fn primitive_failure(path: &Path, source: io::Error) -> DispatchError {
    tracing::warn!(path = %path.display(), error = %source, "filesystem primitive failed");
    DispatchError::Primitive {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io;
    use std::path::{Path, PathBuf};

    use super::{dispatch, execute_with};
    use crate::buffer::NativeUnit;
    use crate::conf::C_NATIVE_SEPARATOR;
    use crate::primitive::{FsPrimitives, SpecBatchCopyRequest, SystemFsPrimitives};
    use crate::spec::{
        DispatchError, EnumFolderOutcome, EnumOperation, ParseFailure, ResolutionFailure,
        SpecBatchCopyFlags, SpecDispatchContext, SpecDispatchOptions,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum EnumCall {
        CopyFile {
            path_src: PathBuf,
            path_dst: PathBuf,
            if_fail_if_exists: bool,
        },
        CopyTree(SpecBatchCopyRequest),
        CreateDir(PathBuf),
    }

    #[derive(Default)]
    struct RecordingPrimitives {
        l_calls: RefCell<Vec<EnumCall>>,
        if_fail_copy: bool,
    }

    impl FsPrimitives for RecordingPrimitives {
        fn copy_file(
            &self,
            path_src: &Path,
            path_dst: &Path,
            if_fail_if_exists: bool,
        ) -> io::Result<()> {
            self.l_calls.borrow_mut().push(EnumCall::CopyFile {
                path_src: path_src.to_path_buf(),
                path_dst: path_dst.to_path_buf(),
                if_fail_if_exists,
            });
            if self.if_fail_copy {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            Ok(())
        }

        fn copy_tree_batch(&self, request: &SpecBatchCopyRequest) -> io::Result<()> {
            self.l_calls
                .borrow_mut()
                .push(EnumCall::CopyTree(request.clone()));
            Ok(())
        }

        fn create_dir(&self, path_dir: &Path) -> io::Result<()> {
            self.l_calls
                .borrow_mut()
                .push(EnumCall::CreateDir(path_dir.to_path_buf()));
            Ok(())
        }
    }

    fn run(
        raw: Option<&str>,
        spec_ctx: &SpecDispatchContext,
        primitives: &RecordingPrimitives,
    ) -> Result<crate::report::ReportDispatch, DispatchError> {
        crate::test_utils::init_test_logging();
        dispatch(raw, spec_ctx, &SpecDispatchOptions::default(), primitives)
    }

    fn units_of(c_path: &str) -> Vec<NativeUnit> {
        #[cfg(windows)]
        let l_units: Vec<NativeUnit> = c_path.encode_utf16().collect();
        #[cfg(not(windows))]
        let l_units: Vec<NativeUnit> = c_path.as_bytes().to_vec();
        l_units.into_iter().chain([0, 0]).collect()
    }

    #[test]
    fn malformed_commands_have_no_side_effects() {
        let primitives = RecordingPrimitives::default();
        let spec_ctx = SpecDispatchContext::with_cwd("/work");
        for raw in [None, Some(""), Some("bogus|x"), Some("copy"), Some("xcopy|")] {
            let err = run(raw, &spec_ctx, &primitives).expect_err("must fail");
            assert!(matches!(err, DispatchError::Parse(_)), "{raw:?}");
        }
        assert!(primitives.l_calls.borrow().is_empty());
    }

    #[test]
    fn copy_uses_explicit_destination_without_overwrite() {
        let primitives = RecordingPrimitives::default();
        let spec_ctx = SpecDispatchContext::with_cwd("/work");
        let path_cwd = PathBuf::from("/work");

        let report = run(Some("copy|a.txt|b.txt"), &spec_ctx, &primitives).expect("dispatch");
        assert_eq!(report.operation, EnumOperation::Copy);
        assert_eq!(
            *primitives.l_calls.borrow(),
            vec![EnumCall::CopyFile {
                path_src: path_cwd.join("a.txt"),
                path_dst: path_cwd.join("b.txt"),
                if_fail_if_exists: true,
            }]
        );
    }

    #[test]
    fn copy_without_destination_targets_cwd_filename() {
        let primitives = RecordingPrimitives::default();
        let tmp = tempfile::tempdir().expect("tempdir");
        let spec_ctx = SpecDispatchContext::with_cwd(tmp.path());

        let report = run(Some("copy|in/a.txt"), &spec_ctx, &primitives).expect("dispatch");
        let mut c_expected = tmp.path().as_os_str().to_os_string();
        c_expected.push(format!("{C_NATIVE_SEPARATOR}a.txt"));
        assert_eq!(report.path_destination, Some(PathBuf::from(c_expected)));
    }

    #[test]
    fn copy_aborts_when_cwd_is_unavailable_or_too_long() {
        let primitives = RecordingPrimitives::default();
        let err = run(
            Some("copy|a.txt"),
            &SpecDispatchContext::default(),
            &primitives,
        )
        .expect_err("no cwd");
        assert!(matches!(
            err,
            DispatchError::Resolution(ResolutionFailure::WorkingDirectoryUnavailable)
        ));

        let spec_dispatch_options = SpecDispatchOptions {
            n_len_path_max: 4,
            ..SpecDispatchOptions::default()
        };
        let err = dispatch(
            Some("xcopy|tree"),
            &SpecDispatchContext::with_cwd("/abc"),
            &spec_dispatch_options,
            &primitives,
        )
        .expect_err("cwd too long");
        assert!(matches!(
            err,
            DispatchError::Resolution(ResolutionFailure::WorkingDirectoryTooLong { .. })
        ));
        assert!(primitives.l_calls.borrow().is_empty());
    }

    #[test]
    fn copy_primitive_failure_is_reported_internally_only() {
        let primitives = RecordingPrimitives {
            if_fail_copy: true,
            ..RecordingPrimitives::default()
        };
        let spec_ctx = SpecDispatchContext::with_cwd("/work");
        let err = run(Some("copy|a.txt|b.txt"), &spec_ctx, &primitives).expect_err("fails");
        assert!(matches!(err, DispatchError::Primitive { .. }));

        // The boundary swallows the same failure.
        execute_with(
            Some("copy|a.txt|b.txt"),
            &spec_ctx,
            &SpecDispatchOptions::default(),
            &primitives,
        );
        assert_eq!(primitives.l_calls.borrow().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn xcopy_submits_double_terminated_canonical_buffers() {
        let primitives = RecordingPrimitives::default();
        let spec_ctx = SpecDispatchContext::with_cwd("/work/dir");

        run(Some("xcopy|../src/./tree"), &spec_ctx, &primitives).expect("dispatch");
        let l_calls = primitives.l_calls.borrow();
        let [EnumCall::CopyTree(request)] = l_calls.as_slice() else {
            panic!("expected one batch call, got {l_calls:?}");
        };
        assert_eq!(
            request.buffer_source.as_units(),
            units_of("/work/src/tree").as_slice()
        );
        assert_eq!(
            request.buffer_destination.as_units(),
            units_of("/work/dir").as_slice()
        );
        assert_eq!(request.spec_flags, SpecBatchCopyFlags::silent());
    }

    #[test]
    fn xcopy_submits_operands_as_given_when_they_cannot_be_canonicalized() {
        let primitives = RecordingPrimitives::default();

        run(
            Some("xcopy|rel|dst"),
            &SpecDispatchContext::default(),
            &primitives,
        )
        .expect("dispatch");
        let l_calls = primitives.l_calls.borrow();
        let [EnumCall::CopyTree(request)] = l_calls.as_slice() else {
            panic!("expected one batch call, got {l_calls:?}");
        };
        assert_eq!(request.buffer_source.as_units(), units_of("rel").as_slice());
        assert_eq!(
            request.buffer_destination.as_units(),
            units_of("dst").as_slice()
        );
    }

    #[test]
    fn mkdir_creates_each_segment_in_order() {
        let primitives = RecordingPrimitives::default();
        let tmp = tempfile::tempdir().expect("tempdir");
        let spec_ctx = SpecDispatchContext::with_cwd(tmp.path());

        let report = run(Some("mkdir|a|a/b/c"), &spec_ctx, &primitives).expect("dispatch");
        assert_eq!(report.folders.len(), 2);

        let l_created: Vec<PathBuf> = primitives
            .l_calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                EnumCall::CreateDir(p) => p.strip_prefix(tmp.path()).ok().map(Path::to_path_buf),
                _ => None,
            })
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        assert_eq!(
            l_created,
            vec![
                PathBuf::from("a"),
                PathBuf::from("a"),
                PathBuf::from("a/b"),
                PathBuf::from("a/b/c"),
            ]
        );
    }

    #[test]
    fn mkdir_skips_unresolvable_folder_and_continues() {
        let primitives = RecordingPrimitives::default();
        let report = run(
            Some("mkdir|rel|/abs"),
            &SpecDispatchContext::default(),
            &primitives,
        );
        #[cfg(unix)]
        {
            let report = report.expect("dispatch");
            assert!(matches!(report.folders[0], EnumFolderOutcome::Skipped { .. }));
            assert!(matches!(
                report.folders[1],
                EnumFolderOutcome::Attempted { .. }
            ));
        }
        #[cfg(not(unix))]
        let _ = report;
    }

    #[test]
    fn mkdir_without_operands_is_noop() {
        let primitives = RecordingPrimitives::default();
        let report = run(Some("MKDIR||"), &SpecDispatchContext::default(), &primitives)
            .expect("dispatch");
        assert!(report.folders.is_empty());
        assert!(primitives.l_calls.borrow().is_empty());
    }

    #[test]
    fn end_to_end_copy_never_overwrites_and_mkdir_is_idempotent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let spec_ctx = SpecDispatchContext::with_cwd(tmp.path());
        let spec_dispatch_options = SpecDispatchOptions::default();
        let primitives = SystemFsPrimitives::default();

        std::fs::write(tmp.path().join("a.txt"), "first").expect("write a");
        let report = dispatch(
            Some("copy|a.txt|b.txt"),
            &spec_ctx,
            &spec_dispatch_options,
            &primitives,
        )
        .expect("first copy");
        assert_eq!(report.cnt_skipped, 0);

        std::fs::write(tmp.path().join("a.txt"), "second").expect("rewrite a");
        let report = dispatch(
            Some("copy|a.txt|b.txt"),
            &spec_ctx,
            &spec_dispatch_options,
            &primitives,
        )
        .expect("second copy");
        assert_eq!(report.cnt_skipped, 1);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("b.txt")).expect("read b"),
            "first"
        );

        for _ in 0..2 {
            dispatch(
                Some("mkdir|x|x/y/z"),
                &spec_ctx,
                &spec_dispatch_options,
                &primitives,
            )
            .expect("mkdir");
            assert!(tmp.path().join("x/y/z").is_dir());
        }
    }

    #[test]
    fn end_to_end_xcopy_copies_tree_into_destination() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let spec_ctx = SpecDispatchContext::with_cwd(tmp.path());
        std::fs::create_dir_all(tmp.path().join("tree/sub")).expect("create tree");
        std::fs::write(tmp.path().join("tree/sub/f.txt"), "f").expect("write f");
        std::fs::create_dir_all(tmp.path().join("out")).expect("create out");

        dispatch(
            Some("xcopy|tree|out"),
            &spec_ctx,
            &SpecDispatchOptions::default(),
            &SystemFsPrimitives::default(),
        )
        .expect("xcopy");
        assert!(tmp.path().join("out/tree/sub/f.txt").exists());
    }

    #[test]
    fn parse_failure_variant_is_preserved() {
        let primitives = RecordingPrimitives::default();
        let err = run(Some("move|a"), &SpecDispatchContext::default(), &primitives)
            .expect_err("unknown op");
        assert!(matches!(
            err,
            DispatchError::Parse(ParseFailure::UnknownOperation(ref op)) if op == "move"
        ));
    }
}
