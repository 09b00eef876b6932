//! Device identification

use crate::error::DeviceKind;
use std::fmt;

/// Compute device a tensor's storage lives on
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Device {
    /// The host CPU (there's only one)
    #[default]
    Cpu,
    /// An accelerator, identified by ordinal
    Cuda(usize),
}

impl Device {
    /// Device family
    #[inline]
    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Cpu => DeviceKind::Cpu,
            Device::Cuda(_) => DeviceKind::Cuda,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(id) => write!(f, "cuda:{}", id),
        }
    }
}
