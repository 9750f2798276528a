//! Release version comparison for the update check
//!
//! Versions are compared by deleting every `.` and comparing what is left
//! as an integer. This is wrong whenever segments have different digit
//! counts: `0.10.1` becomes `101`, which beats `1.0.0` (`100`). Release
//! numbering has to stay single-digit per segment for the check to be
//! meaningful.

use crate::error::{Error, Result};

/// Whether `latest` is newer than `current`
pub fn is_newer(current: &str, latest: &str) -> Result<bool> {
    Ok(flatten(latest)? > flatten(current)?)
}

fn flatten(version: &str) -> Result<u64> {
    version
        .trim()
        .replace('.', "")
        .parse()
        .map_err(|_| Error::invalid_response(format!("Unparseable version: {version:?}")))
}
