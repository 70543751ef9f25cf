//! Host platform utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::PathBuf;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The environment variable giving the root of the software installation.
pub const SW_ROOT_ENV_VAR: &str = "LINE_FOLLOWER_SW_ROOT";

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the software installation.
///
/// The root is read from the `LINE_FOLLOWER_SW_ROOT` environment variable,
/// falling back on the current working directory if it is not set but the
/// `params` directory is visible from there.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    match std::env::var(SW_ROOT_ENV_VAR) {
        Ok(v) => Ok(PathBuf::from(v)),
        Err(e) => {
            let cwd = PathBuf::from(".");
            if cwd.join("params").is_dir() {
                Ok(cwd)
            } else {
                Err(e)
            }
        }
    }
}
