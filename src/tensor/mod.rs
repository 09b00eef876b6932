//! Tensor types
//!
//! This module provides the dense host tensor, the metadata handle every
//! validator consumes, and device identification.

mod dense;
mod device;
mod layout;
mod meta;

pub use dense::DenseTensor;
pub use device::Device;
pub use layout::{Layout, Shape, Strides};
pub use meta::{TensorDesc, TensorMeta};
