//! `fscmd_dispatch` v1:
//! Rust-side filesystem command dispatcher.
//!
//! One `|`-delimited command (`copy`, `xcopy`, `mkdir`) is parsed and executed
//! against pluggable filesystem primitives. The boundary ([`execute`]) never
//! reports an outcome; [`dispatch`] exposes it for tests and bindings.
//!
//! Modules:
//! - `conf`      : wire-format constants and platform limits
//! - `spec`      : enums/options/errors
//! - `parse`     : command parsing
//! - `resolve`   : filename extraction and implicit destinations
//! - `mkdir`     : best-effort recursive directory creation
//! - `buffer`    : double-terminator native path buffers
//! - `primitive` : filesystem primitive trait and host implementation
//! - `copy`      : recursive tree copy behind the batch primitive
//! - `dispatch`  : orchestration and the void boundary
//! - `report`    : run-time report models
//! - `util`      : shared helper functions

pub mod buffer;
pub mod conf;
pub mod copy;
pub mod dispatch;
pub mod mkdir;
pub mod parse;
pub mod primitive;
pub mod report;
pub mod resolve;
pub mod spec;
mod util;

#[cfg(test)]
pub(crate) mod test_utils;

pub use buffer::{NativeUnit, SpecNativePathBuffer};
pub use copy::copy_tree;
pub use dispatch::{dispatch, execute, execute_with};
pub use mkdir::ensure_directory_tree;
pub use parse::parse_command;
pub use primitive::{FsPrimitives, SpecBatchCopyRequest, SystemFsPrimitives};
pub use report::{ReportCopy, ReportDispatch};
pub use resolve::{derive_destination, filename_of};
pub use spec::{
    CopyTreeError, DispatchError, EnumFolderOutcome, EnumOperation, ParseFailure, ResolutionFailure,
    SpecBatchCopyFlags, SpecCommand, SpecCopyError, SpecDispatchContext, SpecDispatchOptions,
    SpecTreeCopyOptions,
};
pub use util::{absolutize_path, canonicalize_path};
