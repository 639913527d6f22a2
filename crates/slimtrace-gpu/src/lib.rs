//! wgpu device management for the slimtrace renderer.
//!
//! This crate owns the adapter/device/queue setup and the buffer readback
//! path shared by every compute kernel of the renderer.

#![warn(missing_docs)]

mod context;
mod readback;

pub use context::{GpuContext, GpuError};
pub use readback::read_buffer;
