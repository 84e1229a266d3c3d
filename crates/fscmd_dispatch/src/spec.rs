//! Command models, dispatch/copy options and top-level error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::conf::{C_OP_COPY, C_OP_MKDIR, C_OP_XCOPY, N_LEN_PATH_MAX};

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Operation selected by the command keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumOperation {
    /// `copy`: one file to one destination, never overwriting.
    Copy,
    /// `xcopy`: a file or directory tree, recursively, via the batch primitive.
    RecursiveCopy,
    /// `mkdir`: one or more directory hierarchies.
    MakeDirectories,
}

impl EnumOperation {
    /// Match a keyword case-insensitively (ASCII, no trimming).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case(C_OP_COPY) {
            Some(Self::Copy)
        } else if keyword.eq_ignore_ascii_case(C_OP_XCOPY) {
            Some(Self::RecursiveCopy)
        } else if keyword.eq_ignore_ascii_case(C_OP_MKDIR) {
            Some(Self::MakeDirectories)
        } else {
            None
        }
    }

    /// Canonical lower-case keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Copy => C_OP_COPY,
            Self::RecursiveCopy => C_OP_XCOPY,
            Self::MakeDirectories => C_OP_MKDIR,
        }
    }
}

/// Result of materializing one `mkdir` operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumFolderOutcome {
    /// The operand could not be resolved to a full path; nothing was attempted.
    Skipped {
        /// Operand as given in the command.
        path_operand: PathBuf,
    },
    /// Creation was requested for every segment of the full path.
    Attempted {
        /// Fully-qualified directory path.
        path_dir: PathBuf,
        /// Number of single-directory creation requests.
        n_attempts: usize,
        /// Requests that reported failure (including "already exists").
        n_failures: usize,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CommandAndContext

/// One parsed command. Owns copies of every token it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCommand {
    /// Selected operation.
    pub operation: EnumOperation,
    /// Copy source; always `Some` and non-empty for `copy`/`xcopy`.
    pub source: Option<PathBuf>,
    /// Explicit destination; `None` means derive it from the working directory.
    pub destination: Option<PathBuf>,
    /// Folder operands of `mkdir`, in command order, empty tokens removed.
    pub extra_operands: Vec<PathBuf>,
}

impl SpecCommand {
    /// `true` when executing this command has no side effects.
    pub fn is_noop(&self) -> bool {
        self.operation == EnumOperation::MakeDirectories && self.extra_operands.is_empty()
    }
}

/// Working-directory context used for every relative path of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecDispatchContext {
    /// Working directory, or `None` when it could not be read.
    pub path_dir_cwd: Option<PathBuf>,
}

impl SpecDispatchContext {
    /// Snapshot the process working directory.
    pub fn from_process() -> Self {
        Self {
            path_dir_cwd: std::env::current_dir().ok(),
        }
    }

    /// Use an explicit working directory.
    pub fn with_cwd(path_dir_cwd: impl Into<PathBuf>) -> Self {
        Self {
            path_dir_cwd: Some(path_dir_cwd.into()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Flag set submitted with every batch tree-copy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecBatchCopyFlags {
    /// No progress UI.
    pub if_silent: bool,
    /// Answer "yes to all" for every overwrite prompt.
    pub if_no_confirmation: bool,
    /// Never show an error UI.
    pub if_no_error_ui: bool,
    /// Create missing destination directories without asking.
    pub if_no_confirm_mkdir: bool,
}

impl SpecBatchCopyFlags {
    /// Fully unattended operation.
    pub fn silent() -> Self {
        Self {
            if_silent: true,
            if_no_confirmation: true,
            if_no_error_ui: true,
            if_no_confirm_mkdir: true,
        }
    }
}

impl Default for SpecBatchCopyFlags {
    fn default() -> Self {
        Self::silent()
    }
}

/// Input options for [`crate::dispatch::dispatch`].
#[derive(Debug, Clone)]
pub struct SpecDispatchOptions {
    /// Working directories with at least this many native units are rejected.
    pub n_len_path_max: usize,
    /// Flags passed to the batch tree-copy primitive.
    pub spec_batch_flags: SpecBatchCopyFlags,
}

impl Default for SpecDispatchOptions {
    fn default() -> Self {
        Self {
            n_len_path_max: N_LEN_PATH_MAX,
            spec_batch_flags: SpecBatchCopyFlags::silent(),
        }
    }
}

/// Input options for [`crate::copy::copy_tree`].
///
/// Trees always merge into existing directories, overwrite existing files and
/// recreate symlinks as links.
#[derive(Debug, Clone, Default)]
pub struct SpecTreeCopyOptions {
    /// Maximum worker threads for file-copy stage.
    pub num_workers_max: Option<usize>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// One copy failure item with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCopyError {
    /// Failed source or destination path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// Malformed command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// No command string was supplied.
    #[error("no command supplied")]
    MissingInput,
    /// The keyword token is empty.
    #[error("missing operation keyword")]
    MissingOperation,
    /// The keyword is not one of `copy`, `xcopy`, `mkdir`.
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    /// `copy`/`xcopy` without a non-empty source token.
    #[error("missing source operand")]
    MissingSource,
    /// An operand could not be converted to a native path.
    #[error("operand cannot be converted to a native path: `{0}`")]
    InvalidEncoding(String),
}

/// Implicit destination could not be derived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    /// The working directory is unknown or empty.
    #[error("current working directory is unavailable")]
    WorkingDirectoryUnavailable,
    /// The working directory does not fit the supported path length.
    #[error("current working directory is {n_len} units long (limit {n_len_max})")]
    WorkingDirectoryTooLong {
        /// Length in native units.
        n_len: usize,
        /// Exclusive limit.
        n_len_max: usize,
    },
    /// The source has no filename component to copy onto.
    #[error("source has no filename component: {}", .0.display())]
    MissingFilename(PathBuf),
}

/// Any failure that aborts one command.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// See [`ParseFailure`].
    #[error("Failed to parse command: {0}")]
    Parse(#[from] ParseFailure),
    /// See [`ResolutionFailure`].
    #[error("Failed to resolve destination: {0}")]
    Resolution(#[from] ResolutionFailure),
    /// A native path buffer could not be reserved.
    #[error("Failed to allocate a path buffer of {n_units} units")]
    Allocation {
        /// Requested capacity in native units.
        n_units: usize,
    },
    /// A filesystem primitive reported failure.
    #[error("Filesystem primitive failed on {}: {source}", path.display())]
    Primitive {
        /// Path the primitive was invoked on.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// "Top-level call failed" errors of the tree-copy engine.
#[derive(Debug, Error)]
pub enum CopyTreeError {
    /// Source or destination is not an absolute path.
    #[error("Tree copy requires absolute paths: {}", .0.display())]
    RelativePath(PathBuf),
    /// Source path is not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// Existing destination root is a symlink.
    #[error("Destination root is a symlink: {}", .0.display())]
    DestinationIsSymlink(PathBuf),
    /// Source and destination overlap (`dst` lies inside `src`).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        path_source.display(),
        path_destination.display()
    )]
    SourceDestinationOverlap {
        /// Normalized source directory.
        path_source: PathBuf,
        /// Normalized destination directory.
        path_destination: PathBuf,
    },
    /// Destination directory initialization failed.
    #[error("Failed to initialize destination {}: {message}", path.display())]
    DestinationInitFailed {
        /// Destination path that failed initialization.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
