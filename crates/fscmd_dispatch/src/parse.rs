//! `|`-delimited command parsing.

use crate::conf::C_COMMAND_DELIMITER;
use crate::spec::{EnumOperation, ParseFailure, SpecCommand};
use crate::util::convert_to_native_path;

/// Parse one raw command into an owned [`SpecCommand`].
///
/// Wire format:
/// - `copy|<source>[|<destination>]`
/// - `xcopy|<source>[|<destination>]`
/// - `mkdir|<folder1>[|<folder2>|...]`
///
/// `raw` is only borrowed; every operand is copied into the command.
pub fn parse_command(raw: Option<&str>) -> Result<SpecCommand, ParseFailure> {
    let raw = raw.ok_or(ParseFailure::MissingInput)?;
    let mut iter_tokens = raw.split(C_COMMAND_DELIMITER);

    let c_keyword = iter_tokens.next().unwrap_or_default();
    if c_keyword.is_empty() {
        return Err(ParseFailure::MissingOperation);
    }
    let operation = EnumOperation::from_keyword(c_keyword)
        .ok_or_else(|| ParseFailure::UnknownOperation(c_keyword.to_string()))?;

    match operation {
        EnumOperation::MakeDirectories => {
            let mut l_folders = Vec::new();
            for c_token in iter_tokens.filter(|t| !t.is_empty()) {
                let path_folder = convert_to_native_path(c_token)
                    .ok_or_else(|| ParseFailure::InvalidEncoding(c_token.to_string()))?;
                l_folders.push(path_folder);
            }
            Ok(SpecCommand {
                operation,
                source: None,
                destination: None,
                extra_operands: l_folders,
            })
        }
        EnumOperation::Copy | EnumOperation::RecursiveCopy => {
            let c_source = iter_tokens
                .next()
                .filter(|t| !t.is_empty())
                .ok_or(ParseFailure::MissingSource)?;
            let source = convert_to_native_path(c_source)
                .ok_or_else(|| ParseFailure::InvalidEncoding(c_source.to_string()))?;

            let destination = match iter_tokens.next().filter(|t| !t.is_empty()) {
                Some(c_dest) => Some(
                    convert_to_native_path(c_dest)
                        .ok_or_else(|| ParseFailure::InvalidEncoding(c_dest.to_string()))?,
                ),
                None => None,
            };

            let n_ignored = iter_tokens.count();
            if n_ignored > 0 {
                tracing::debug!(
                    operation = operation.keyword(),
                    n_ignored,
                    "ignoring trailing operands"
                );
            }

            Ok(SpecCommand {
                operation,
                source: Some(source),
                destination,
                extra_operands: Vec::new(),
            })
        }
    }
}
