//! GPU context management for wgpu device and queue.

use thiserror::Error;
use wgpu::{Device, Instance, Queue};

/// Errors that can occur during GPU operations.
#[derive(Debug, Error)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device.
    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// Buffer mapping failed.
    #[error("Buffer mapping failed")]
    BufferMapping,

    /// The device reported a validation or out-of-memory error.
    #[error("GPU dispatch failed: {0}")]
    Dispatch(String),

    /// A buffer exceeds what the device allows.
    #[error("{what} needs {bytes} bytes, device limit is {limit}")]
    BufferTooLarge {
        /// Buffer label.
        what: &'static str,
        /// Requested size.
        bytes: u64,
        /// Device limit.
        limit: u64,
    },
}

/// GPU context holding device and queue.
///
/// The context is an ordinary value: the application creates one and hands
/// it to whatever needs to submit work.
pub struct GpuContext {
    /// The wgpu device for creating resources and pipelines.
    pub device: Device,
    /// The command queue for submitting work.
    pub queue: Queue,
    adapter_name: String,
}

impl GpuContext {
    /// Create a GPU context asynchronously.
    pub async fn new() -> Result<Self, GpuError> {
        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_name = adapter.get_info().name;
        tracing::info!(adapter = %adapter_name, "GPU adapter selected");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_name,
        })
    }

    /// Create a GPU context synchronously (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::new())
    }

    /// Name of the adapter backing this context.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Largest storage buffer binding the device accepts.
    pub fn max_storage_buffer_size(&self) -> u64 {
        u64::from(self.device.limits().max_storage_buffer_binding_size)
    }

    /// Run `f` inside a validation and out-of-memory error scope.
    ///
    /// Errors that wgpu would otherwise report asynchronously through the
    /// uncaptured-error handler are returned as [`GpuError::Dispatch`].
    #[cfg(not(target_arch = "wasm32"))]
    pub fn scoped<T>(&self, f: impl FnOnce() -> T) -> Result<T, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        match validation.or(oom) {
            Some(err) => Err(GpuError::Dispatch(err.to_string())),
            None => Ok(value),
        }
    }
}
