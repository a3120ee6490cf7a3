//! Rewrite of the on-disk recovery-state marker (`grastate.dat`).
//!
//! The marker contains a line `safe_to_bootstrap: 0|1`. Flipping it to 1
//! tells the database engine to restart as a new primary component even
//! though the on-disk state does not prove that is safe. This is the core
//! unsafe operation of a hard bootstrap, so the rewrite itself must not be
//! able to corrupt the file: the new content goes to a temp file in the
//! same directory and replaces the original with an atomic rename.

use std::path::Path;

use tracing::info;

use crate::error::Result;

const FORBID: &str = "safe_to_bootstrap: 0";
const PERMIT: &str = "safe_to_bootstrap: 1";

/// Flip `safe_to_bootstrap` from 0 to 1 in the marker file.
///
/// Returns `true` if the file was rewritten, `false` if the flag already
/// permitted bootstrap (re-applying is a no-op). Touches nothing but the
/// one token; all other lines pass through unchanged.
pub fn permit_unsafe_bootstrap<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    if !content.contains(FORBID) {
        info!(path = %path.display(), "recovery-state marker already permits bootstrap");
        return Ok(false);
    }

    let rewritten = content.replace(FORBID, PERMIT);

    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    std::fs::write(&tmp, rewritten)?;
    std::fs::rename(&tmp, path)?;

    info!(path = %path.display(), "recovery-state marker rewritten to permit bootstrap");
    Ok(true)
}
