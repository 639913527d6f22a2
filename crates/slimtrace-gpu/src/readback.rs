//! Copying kernel output back to host memory.

use crate::context::{GpuContext, GpuError};

/// Copy the first `size` bytes of a `COPY_SRC` storage buffer to the host.
///
/// Goes through a `MAP_READ` staging buffer and blocks until the copy has
/// completed.
pub fn read_buffer(ctx: &GpuContext, source: &wgpu::Buffer, size: u64) -> Result<Vec<u8>, GpuError> {
    let staging_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_buffer_to_buffer(source, 0, &staging_buffer, 0, size);
    ctx.queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        // The receiver only disappears if this function already returned.
        let _ = tx.send(result);
    });
    ctx.device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|_| GpuError::BufferMapping)?
        .map_err(|_| GpuError::BufferMapping)?;

    let data = buffer_slice.get_mapped_range();
    let bytes = data.to_vec();
    drop(data);
    staging_buffer.unmap();

    Ok(bytes)
}
