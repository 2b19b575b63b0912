//! Raw float buffer loading from disk.
//!
//! Buffer files are flat little-endian `f32` arrays with no header. A file
//! whose size disagrees with the expected element count is still accepted:
//! the loader reads what fits and leaves the remainder zeroed, logging a
//! warning. Runs on truncated weight files therefore degrade instead of
//! failing.

use crate::error::{Result, RuntimeError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const F32_SIZE: usize = std::mem::size_of::<f32>();

/// Host-resident `f32` data with a logical shape.
#[derive(Debug, Clone, PartialEq)]
pub struct HostBuffer {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl HostBuffer {
    /// Wrap existing data.
    ///
    /// # Panics
    /// Panics if `data.len()` doesn't equal the product of `shape`.
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Self {
        let expected_len: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_len,
            "Data length {} doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_len
        );
        Self {
            data,
            shape: shape.to_vec(),
        }
    }

    /// Load a buffer file holding exactly `product(shape)` floats.
    ///
    /// See [`load_bin`] for the size mismatch policy.
    pub fn load(path: impl AsRef<Path>, shape: &[usize]) -> Result<Self> {
        let data = load_bin(path, shape.iter().product())?;
        Ok(Self {
            data,
            shape: shape.to_vec(),
        })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Read a flat `f32` file into a vector of exactly `expected_elems` values.
///
/// If the file holds more than `expected_elems * 4` bytes, only the leading
/// bytes are read. If it holds fewer, the bytes present are copied verbatim
/// and the trailing elements stay `0.0`. Either case logs a warning.
///
/// # Errors
/// Returns [`RuntimeError::IoError`] if the file cannot be opened or read.
pub fn load_bin(path: impl AsRef<Path>, expected_elems: usize) -> Result<Vec<f32>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| RuntimeError::io(path, e))?;
    let actual_bytes = file
        .metadata()
        .map_err(|e| RuntimeError::io(path, e))?
        .len();

    let expected_bytes = expected_elems * F32_SIZE;
    if actual_bytes != expected_bytes as u64 {
        tracing::warn!(
            path = %path.display(),
            expected_bytes,
            actual_bytes,
            "Buffer size mismatch, expected {} bytes, got {} bytes",
            expected_bytes,
            actual_bytes
        );
    }

    let read_len = (actual_bytes.min(expected_bytes as u64)) as usize;
    let mut data = vec![0.0f32; expected_elems];
    {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut data);
        file.take(read_len as u64)
            .read_exact(&mut bytes[..read_len])
            .map_err(|e| RuntimeError::io(path, e))?;
    }

    // Files are little-endian; no-op on little-endian hosts.
    for value in &mut data {
        *value = f32::from_bits(u32::from_le(value.to_bits()));
    }

    Ok(data)
}
