//! Command wire-format constants and platform limits.

/// Delimiter between the operation keyword and its operands.
pub const C_COMMAND_DELIMITER: char = '|';

/// Keyword selecting a single-file copy.
pub const C_OP_COPY: &str = "copy";
/// Keyword selecting a recursive tree copy.
pub const C_OP_XCOPY: &str = "xcopy";
/// Keyword selecting directory-hierarchy creation.
pub const C_OP_MKDIR: &str = "mkdir";
/// All recognized operation keywords.
pub const TUP_OPERATION_KEYWORDS: [&str; 3] = [C_OP_COPY, C_OP_XCOPY, C_OP_MKDIR];

/// Separators recognized when extracting a filename, on every platform.
pub const TUP_PATH_SEPARATORS: [char; 2] = ['/', '\\'];

/// Separator inserted when joining the working directory and a filename.
pub const C_NATIVE_SEPARATOR: char = std::path::MAIN_SEPARATOR;

/// Maximum supported path length, counted in native units.
#[cfg(windows)]
pub const N_LEN_PATH_MAX: usize = 260;
/// Maximum supported path length, counted in native units.
#[cfg(not(windows))]
pub const N_LEN_PATH_MAX: usize = 4096;

/// Number of terminator units closing a batch-copy path buffer.
pub const N_BUFFER_TERMINATORS: usize = 2;

/// Environment variable holding the `tracing` filter for the FFI boundary.
pub const C_ENV_LOG_FILTER: &str = "FSCMD_LOG";
