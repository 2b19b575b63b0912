//! Device-resident tensors and host <-> device copies.

use crate::buffer::HostBuffer;
use crate::device::{DLTensor, DataType, Device};
use crate::error::{Result, RuntimeError};
use std::ffi::c_void;

/// A shape and dtype tagged buffer in an execution context's memory space.
///
/// Tensors are allocated fresh for every inference call and dropped with it.
/// On the CPU device the storage is ordinary host memory, which is what the
/// compiled artifact reads and writes through [`DLTensor`] views.
#[derive(Debug)]
pub struct DeviceTensor {
    data: Vec<f32>,
    shape: Vec<i64>,
    dtype: DataType,
    device: Device,
}

impl DeviceTensor {
    /// Allocate a zeroed `f32` tensor of the given shape on `device`.
    pub fn empty(shape: &[usize], device: Device) -> Self {
        let len: usize = shape.iter().product();
        Self {
            data: vec![0.0; len],
            shape: shape.iter().map(|&d| d as i64).collect(),
            dtype: DataType::F32,
            device,
        }
    }

    /// Copy a host buffer into this tensor.
    ///
    /// # Errors
    /// Returns [`RuntimeError::TensorError`] if the element counts differ.
    pub fn copy_from_host(&mut self, host: &HostBuffer) -> Result<()> {
        self.copy_from_slice(host.as_slice())
    }

    /// Copy raw `f32` values into this tensor.
    pub fn copy_from_slice(&mut self, values: &[f32]) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(RuntimeError::TensorError(format!(
                "Host data has {} elements but tensor of shape {:?} holds {}",
                values.len(),
                self.shape,
                self.data.len()
            )));
        }
        self.data.copy_from_slice(values);
        Ok(())
    }

    /// Copy the first `len` elements back to the host.
    ///
    /// # Errors
    /// Returns [`RuntimeError::TensorError`] if the tensor holds fewer than `len`.
    pub fn copy_to_host(&self, len: usize) -> Result<Vec<f32>> {
        self.data
            .get(..len)
            .map(<[f32]>::to_vec)
            .ok_or_else(|| {
                RuntimeError::TensorError(format!(
                    "Requested {} elements from tensor of shape {:?} ({} elements)",
                    len,
                    self.shape,
                    self.data.len()
                ))
            })
    }

    /// Copy the whole tensor back to the host.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.clone()
    }

    /// Raw bytes of the tensor data.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn shape(&self) -> &[i64] {
        &self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.data.len() * self.dtype.size_in_bytes()
    }

    /// Read-only DLPack view for passing as an argument.
    ///
    /// The callee must not write through the returned pointers.
    pub(crate) fn dl_view(&self) -> DLTensor {
        DLTensor {
            data: self.data.as_ptr() as *mut c_void,
            device: self.device.to_dl(),
            ndim: self.shape.len() as i32,
            dtype: self.dtype.to_dl(),
            shape: self.shape.as_ptr() as *mut i64,
            strides: std::ptr::null_mut(),
            byte_offset: 0,
        }
    }

    /// Writable DLPack view for the result slot.
    pub(crate) fn dl_view_mut(&mut self) -> DLTensor {
        DLTensor {
            data: self.data.as_mut_ptr() as *mut c_void,
            device: self.device.to_dl(),
            ndim: self.shape.len() as i32,
            dtype: self.dtype.to_dl(),
            shape: self.shape.as_mut_ptr(),
            strides: std::ptr::null_mut(),
            byte_offset: 0,
        }
    }

    /// Mutable access to the storage, for in-process VM implementations.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
