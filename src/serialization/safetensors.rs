//! `SafeTensors` format implementation for small F32 tensors.

use super::write_atomic;
use crate::error::{CarbonError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Metadata for a single tensor in `SafeTensors` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorMetadata {
    /// Data type of the tensor (only "F32" is written or accepted).
    pub dtype: String,
    /// Shape of the tensor (e.g., `[n_features]` or `[1]`).
    pub shape: Vec<usize>,
    /// Data offsets `[start, end]` in the raw data section.
    pub data_offsets: [usize; 2],
}

/// Complete `SafeTensors` metadata structure.
/// Uses `BTreeMap` for deterministic JSON serialization (sorted keys).
pub type SafeTensorsMetadata = BTreeMap<String, TensorMetadata>;

/// Named tensors as `(data, shape)` pairs.
pub type TensorMap = BTreeMap<String, (Vec<f32>, Vec<usize>)>;

/// Encodes tensors into `SafeTensors` bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization of the header fails.
pub fn to_bytes(tensors: &TensorMap) -> Result<Vec<u8>> {
    let mut metadata = SafeTensorsMetadata::new();
    let mut raw_data = Vec::new();
    let mut current_offset = 0;

    for (name, (data, shape)) in tensors {
        let end_offset = current_offset + data.len() * 4;
        metadata.insert(
            name.clone(),
            TensorMetadata {
                dtype: "F32".to_string(),
                shape: shape.clone(),
                data_offsets: [current_offset, end_offset],
            },
        );
        for &value in data {
            raw_data.extend_from_slice(&value.to_le_bytes());
        }
        current_offset = end_offset;
    }

    let metadata_json = serde_json::to_vec(&metadata)?;
    let metadata_len = metadata_json.len() as u64;

    let mut output = Vec::with_capacity(8 + metadata_json.len() + raw_data.len());
    output.extend_from_slice(&metadata_len.to_le_bytes());
    output.extend_from_slice(&metadata_json);
    output.extend_from_slice(&raw_data);
    Ok(output)
}

/// Saves tensors to a `SafeTensors` file.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn save_safetensors<P: AsRef<Path>>(path: P, tensors: &TensorMap) -> Result<()> {
    let bytes = to_bytes(tensors)?;
    write_atomic(path.as_ref(), &bytes)
}

/// Loads a `SafeTensors` file, returning `(metadata, raw_data)`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the header is shorter than
/// 8 bytes, the declared metadata length overruns the file, or the JSON
/// header does not parse.
pub fn load_safetensors<P: AsRef<Path>>(path: P) -> Result<(SafeTensorsMetadata, Vec<u8>)> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;

    if bytes.len() < 8 {
        return Err(CarbonError::format(path, "file shorter than 8-byte header"));
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[..8]);
    let metadata_len = u64::from_le_bytes(len_bytes) as usize;

    let data_start = 8usize
        .checked_add(metadata_len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| {
            CarbonError::format(
                path,
                format!("metadata length {metadata_len} exceeds file size {}", bytes.len()),
            )
        })?;

    let metadata: SafeTensorsMetadata = serde_json::from_slice(&bytes[8..data_start])
        .map_err(|e| CarbonError::format(path, format!("metadata is not valid JSON: {e}")))?;

    Ok((metadata, bytes[data_start..].to_vec()))
}

/// Decodes one F32 tensor out of the raw data section.
///
/// # Errors
///
/// Returns an error if the dtype is not F32 or the offsets fall outside
/// the data section.
pub fn extract_tensor(raw_data: &[u8], meta: &TensorMetadata) -> Result<Vec<f32>> {
    if meta.dtype != "F32" {
        return Err(CarbonError::Serialization(format!(
            "unsupported dtype {}",
            meta.dtype
        )));
    }
    let [start, end] = meta.data_offsets;
    if start > end || end > raw_data.len() || (end - start) % 4 != 0 {
        return Err(CarbonError::Serialization(format!(
            "tensor offsets [{start}, {end}] invalid for {} data bytes",
            raw_data.len()
        )));
    }
    Ok(raw_data[start..end]
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Looks up and decodes a named tensor.
///
/// # Errors
///
/// Returns an error if the tensor is absent or cannot be decoded.
pub fn get_tensor(
    metadata: &SafeTensorsMetadata,
    raw_data: &[u8],
    name: &str,
) -> Result<Vec<f32>> {
    let meta = metadata
        .get(name)
        .ok_or_else(|| CarbonError::Serialization(format!("missing '{name}' tensor")))?;
    extract_tensor(raw_data, meta)
}
