//! Double-terminator native path buffers for the batch tree-copy primitive.
//!
//! A buffer holds one or more native paths, each closed by one terminator unit,
//! with one extra terminator closing the list. A single path therefore ends with
//! exactly two terminators.

use std::path::{Path, PathBuf};

use crate::conf::N_BUFFER_TERMINATORS;
use crate::spec::{DispatchError, ParseFailure};

/// One native path unit.
#[cfg(windows)]
pub type NativeUnit = u16;
/// One native path unit.
#[cfg(not(windows))]
pub type NativeUnit = u8;

const N_TERMINATOR: NativeUnit = 0;

/// Owned double-terminator path buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecNativePathBuffer {
    units: Vec<NativeUnit>,
}

impl SpecNativePathBuffer {
    /// Encode `path` followed by two terminators.
    ///
    /// Capacity is reserved up front and fallibly; failure is an allocation error.
    pub fn from_path(path: &Path) -> Result<Self, DispatchError> {
        let l_payload = _encode_native(path);
        if l_payload.contains(&N_TERMINATOR) {
            return Err(ParseFailure::InvalidEncoding(path.display().to_string()).into());
        }

        let n_units = l_payload.len() + N_BUFFER_TERMINATORS;
        let mut units = Vec::new();
        units
            .try_reserve_exact(n_units)
            .map_err(|_| DispatchError::Allocation { n_units })?;
        units.extend_from_slice(&l_payload);
        units.extend(std::iter::repeat_n(N_TERMINATOR, N_BUFFER_TERMINATORS));
        Ok(Self { units })
    }

    /// Raw units including terminators, as handed to the primitive.
    pub fn as_units(&self) -> &[NativeUnit] {
        &self.units
    }

    /// Decode every path in the list, stopping at the first empty entry.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.units
            .split(|u| *u == N_TERMINATOR)
            .take_while(|segment| !segment.is_empty())
            .map(_decode_native)
            .collect()
    }
}

fn _encode_native(path: &Path) -> Vec<NativeUnit> {
    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        path.as_os_str().encode_wide().collect()
    }
    #[cfg(not(windows))]
    {
        path.as_os_str().as_encoded_bytes().to_vec()
    }
}

fn _decode_native(segment: &[NativeUnit]) -> PathBuf {
    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStringExt;
        PathBuf::from(std::ffi::OsString::from_wide(segment))
    }
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        PathBuf::from(std::ffi::OsStr::from_bytes(segment))
    }
    #[cfg(not(any(unix, windows)))]
    {
        PathBuf::from(String::from_utf8_lossy(segment).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{NativeUnit, SpecNativePathBuffer};
    use crate::spec::DispatchError;

    #[test]
    fn buffer_is_payload_followed_by_two_terminators() {
        let buffer = SpecNativePathBuffer::from_path(Path::new("/data/tree")).expect("buffer");
        let l_expected: Vec<NativeUnit> = "/data/tree"
            .chars()
            .map(|c| c as NativeUnit)
            .chain([0, 0])
            .collect();
        assert_eq!(buffer.as_units(), l_expected.as_slice());
        assert_eq!(buffer.paths(), vec![PathBuf::from("/data/tree")]);
    }

    #[test]
    fn empty_path_decodes_to_empty_list() {
        let buffer = SpecNativePathBuffer::from_path(Path::new("")).expect("buffer");
        assert_eq!(buffer.as_units(), &[0, 0]);
        assert!(buffer.paths().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn embedded_terminator_is_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let err = SpecNativePathBuffer::from_path(Path::new(OsStr::from_bytes(b"a\0b")))
            .expect_err("NUL must be rejected");
        assert!(matches!(err, DispatchError::Parse(_)));
    }
}
