//! ## Logging Configuration
//!
//! This module sets up logging automatically when the library is loaded, using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_TABULAR_TRANSFORMERS` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no subscriber is installed.
//! - **Enabled**: Any other value installs a `fmt` subscriber with a maximum log level of `DEBUG`.
//!
//! Transformers log the state they learn during `fit` at `DEBUG` level.
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_TABULAR_TRANSFORMERS=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Name of the environment variable that enables debug logging.
pub(crate) const DEBUG_ENV_VAR: &str = "DEBUG_TABULAR_TRANSFORMERS";

/// Returns true if the given value of the environment variable disables logging.
fn is_disabled(value: Option<&str>) -> bool {
    value.map_or(true, |v| v == "0" || v == "false" || v.is_empty())
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var(DEBUG_ENV_VAR).ok();
    if !is_disabled(value.as_deref()) {
        // Another subscriber may already be installed by the host application.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}
