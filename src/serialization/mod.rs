//! Artifact serialization.
//!
//! The emission model is persisted as two files that always travel together:
//!
//! - the random forest, as a `bincode` blob;
//! - the fitted scaler, in the `SafeTensors` layout:
//!
//! ```text
//! [8-byte header: u64 metadata length (little-endian)]
//! [JSON metadata: tensor names, dtypes, shapes, data_offsets]
//! [Raw tensor data: F32 values in little-endian]
//! ```
//!
//! Both writers go through [`write_atomic`] so a crash mid-write never
//! leaves a truncated artifact under the well-known name.

pub mod safetensors;

pub use safetensors::{SafeTensorsMetadata, TensorMetadata};

use crate::error::Result;
use std::fs;
use std::path::Path;

/// Writes `bytes` to a sibling temporary file, then renames it over `path`.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or either
/// filesystem operation fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);
    fs::write(tmp_path, bytes)?;
    fs::rename(tmp_path, path)?;
    Ok(())
}
