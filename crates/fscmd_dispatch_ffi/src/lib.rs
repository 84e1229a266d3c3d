//! Native boundary for installers and other native drivers.
//!
//! ```c
//! void __stdcall fscmd_silent_copy(const char *params);
//! ```
//!
//! The export uses the platform system ABI: `stdcall` on 32-bit Windows, the C
//! convention everywhere else.
//!
//! The call is fire-and-forget: no status is returned, no error is raised, and a
//! panic inside the dispatcher never unwinds into the caller.

use std::ffi::{CStr, c_char};
use std::panic;
use std::sync::Once;

use fscmd_dispatch::conf::C_ENV_LOG_FILTER;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Install a stderr subscriber when `FSCMD_LOG` is set. Runs at most once.
fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let Ok(c_filter) = std::env::var(C_ENV_LOG_FILTER) else {
            return;
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(c_filter))
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

/// Decode the caller's narrow string. Non-UTF-8 input has no conversion.
fn convert_narrow(params: &CStr) -> Option<&str> {
    match params.to_str() {
        Ok(c_params) => Some(c_params),
        Err(e) => {
            tracing::debug!(error = %e, "command is not valid UTF-8; ignored");
            None
        }
    }
}

/// Execute one `|`-delimited filesystem command.
///
/// # Safety
/// `params` must be null or point to a NUL-terminated string that stays valid
/// and unmodified for the duration of the call. The string is only read.
#[unsafe(no_mangle)]
pub unsafe extern "system" fn fscmd_silent_copy(params: *const c_char) {
    init_logging();
    let params = if params.is_null() {
        None
    } else {
        // SAFETY: non-null and NUL-terminated per the caller contract above.
        Some(unsafe { CStr::from_ptr(params) })
    };

    let res_run = panic::catch_unwind(|| match params {
        None => fscmd_dispatch::execute(None),
        Some(params) => {
            if let Some(c_params) = convert_narrow(params) {
                fscmd_dispatch::execute(Some(c_params));
            }
        }
    });
    if res_run.is_err() {
        tracing::warn!("dispatcher panicked; command dropped");
    }
}
