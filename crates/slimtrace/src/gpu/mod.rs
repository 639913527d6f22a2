//! GPU frame executor using a wgpu compute kernel.
//!
//! The direction cache is uploaded once per regeneration; everything else is
//! small enough to repack every frame.

mod buffers;
mod pipeline;
pub mod shaders;

pub use buffers::{FrameUniforms, GpuBvhNode, GpuFrame, GpuLight, GpuPrimitive};
pub use pipeline::RayTracePipeline;

use slimtrace_gpu::{GpuContext, GpuError};

use crate::error::Result;
use crate::frame::Pixel;
use crate::render::{FrameContext, FrameExecutor};
use crate::settings::Backend;

/// Executes frames on the first available GPU adapter.
pub struct GpuExecutor {
    ctx: GpuContext,
    pipeline: RayTracePipeline,
    uploaded_generation: Option<u64>,
}

impl GpuExecutor {
    /// Acquire a device and compile the kernel.
    pub fn new() -> std::result::Result<Self, GpuError> {
        let ctx = GpuContext::new_blocking()?;
        let pipeline = RayTracePipeline::new(&ctx)?;
        Ok(Self {
            ctx,
            pipeline,
            uploaded_generation: None,
        })
    }

    /// Force the next frame to re-upload the direction cache.
    pub fn invalidate_directions(&mut self) {
        self.uploaded_generation = None;
    }

    /// The device context.
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }
}

impl FrameExecutor for GpuExecutor {
    fn backend(&self) -> Backend {
        Backend::Gpu
    }

    fn execute(&mut self, frame: &FrameContext<'_>, pixels: &mut [Pixel]) -> Result<()> {
        let generation = frame.directions.generation();
        if self.uploaded_generation != Some(generation) {
            self.pipeline
                .upload_directions(&self.ctx, frame.directions.directions())?;
            self.uploaded_generation = Some(generation);
        }

        let packed = GpuFrame::pack(frame);
        let bytes = self.pipeline.render(&self.ctx, &packed)?;
        let expected = std::mem::size_of_val(pixels);
        if bytes.len() != expected {
            return Err(GpuError::Dispatch(format!(
                "read back {} bytes, expected {expected}",
                bytes.len()
            ))
            .into());
        }
        pixels.copy_from_slice(bytemuck::cast_slice(&bytes));
        Ok(())
    }
}
