//! Device descriptors and the DLPack structs shared with compiled artifacts.

use std::ffi::c_void;
use std::fmt;

/// Kind of device a tensor or VM arena lives on.
///
/// Discriminants follow DLPack's `DLDeviceType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DeviceKind {
    Cpu = 1,
}

/// A device kind plus ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    pub kind: DeviceKind,
    pub index: i32,
}

impl Device {
    pub const fn cpu(index: i32) -> Self {
        Self {
            kind: DeviceKind::Cpu,
            index,
        }
    }

    pub(crate) fn to_dl(self) -> DLDevice {
        DLDevice {
            device_type: self.kind as i32,
            device_id: self.index,
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::cpu(0)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DeviceKind::Cpu => write!(f, "cpu({})", self.index),
        }
    }
}

/// Memory allocator strategy requested from the VM for one arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum AllocatorKind {
    Naive = 1,
    #[default]
    Pooled = 2,
}

/// Element type of a tensor. Only 32-bit floats are bound by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    F32,
}

impl DataType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            DataType::F32 => 4,
        }
    }

    pub(crate) fn to_dl(self) -> DLDataType {
        match self {
            DataType::F32 => DLDataType {
                code: DL_FLOAT,
                bits: 32,
                lanes: 1,
            },
        }
    }
}

const DL_FLOAT: u8 = 2;

/// DLPack `DLDevice`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DLDevice {
    pub device_type: i32,
    pub device_id: i32,
}

/// DLPack `DLDataType`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DLDataType {
    pub code: u8,
    pub bits: u8,
    pub lanes: u16,
}

/// DLPack `DLTensor`: a borrowed view handed across the artifact boundary.
///
/// The pointers are only valid while the [`DeviceTensor`](crate::DeviceTensor)
/// that produced the view is alive and not moved.
#[repr(C)]
#[derive(Debug)]
pub struct DLTensor {
    pub data: *mut c_void,
    pub device: DLDevice,
    pub ndim: i32,
    pub dtype: DLDataType,
    pub shape: *mut i64,
    /// Null means compact row-major.
    pub strides: *mut i64,
    pub byte_offset: u64,
}
