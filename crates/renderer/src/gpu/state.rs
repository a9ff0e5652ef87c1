use anyhow::{Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::error::CompileError;
use crate::overlay::OverlayRenderer;
use crate::types::UniformRegistry;

use super::context::GpuContext;
use super::pipeline::{PipelineLayouts, ShaderPipeline, QUAD_VERTICES};
use super::query::FrameTimer;
use super::uniforms::{custom_buffer_size, pack_custom, FrameParams};

/// Everything GPU-side: the surface, the active shader program, the uniform
/// buffers it reads, and the frame timer bracketing its render pass.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    params: FrameParams,
    uniform_buffer: wgpu::Buffer,
    custom_buffer: Option<wgpu::Buffer>,
    bind_group: wgpu::BindGroup,
    quad_buffer: wgpu::Buffer,
    pipeline: ShaderPipeline,
    timer: FrameTimer,
    overlay: OverlayRenderer,
}

impl GpuState {
    /// Brings up the device and compiles the initial program. A broken
    /// start-up shader is fatal here; only later replacements fall back to
    /// the previous program.
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        shader_body: &str,
        registry: &UniformRegistry,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size)?;
        let device = &context.device;

        let layouts = PipelineLayouts::new(device, registry);
        let params = FrameParams::new(context.size.width, context.size.height);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let custom_buffer = layouts.has_custom_binding.then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("custom uniforms"),
                contents: &pack_custom(registry),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }];
        if let Some(buffer) = &custom_buffer {
            entries.push(wgpu::BindGroupEntry {
                binding: 1,
                resource: buffer.as_entire_binding(),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &entries,
        });

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let pipeline = ShaderPipeline::new(
            device,
            &layouts,
            context.surface_format,
            shader_body,
            registry,
        )
        .map_err(|err| anyhow::anyhow!(err))
        .context("initial shader failed to compile")?;

        let timer = FrameTimer::new(device, context.timestamps_supported);
        let overlay = OverlayRenderer::new(device, context.surface_format);

        Ok(Self {
            context,
            layouts,
            params,
            uniform_buffer,
            custom_buffer,
            bind_group,
            quad_buffer,
            pipeline,
            timer,
            overlay,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
        self.params
            .set_resolution(self.context.size.width as f32, self.context.size.height as f32);
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    /// Compiles a replacement program and swaps it in. On failure the active
    /// program is untouched and the diagnostic is returned.
    pub(crate) fn swap_shader(
        &mut self,
        shader_body: &str,
        registry: &UniformRegistry,
    ) -> Result<(), CompileError> {
        let replacement = ShaderPipeline::new(
            &self.context.device,
            &self.layouts,
            self.context.surface_format,
            shader_body,
            registry,
        )?;
        self.pipeline = replacement;
        Ok(())
    }

    pub(crate) fn set_frame_state(
        &mut self,
        time: f32,
        animation: f32,
        frame: i32,
        mouse: [f32; 4],
    ) {
        self.params.set_time(time);
        self.params.set_animation(animation);
        self.params.set_frame(frame);
        self.params.set_mouse(mouse);
    }

    /// Renders one frame: shader pass (timed), then the overlay pass, then
    /// present. Returns the GPU-measured shader pass duration in nanoseconds
    /// when timestamps are available.
    pub(crate) fn render(
        &mut self,
        registry: &UniformRegistry,
        overlay_text: Option<&str>,
    ) -> Result<Option<u64>, wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.params));
        if let Some(buffer) = &self.custom_buffer {
            debug_assert_eq!(buffer.size(), custom_buffer_size(registry));
            self.context
                .queue
                .write_buffer(buffer, 0, &pack_custom(registry));
        }
        if let Some(text) = overlay_text {
            self.overlay
                .prepare(&self.context.device, &self.context.queue, self.context.size, text);
        }

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shader pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: self.timer.timestamp_writes(),
            });
            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            pass.draw(0..4, 0..1);
        }

        if overlay_text.is_some() {
            self.overlay.draw(&mut encoder, &view);
        }
        self.timer.resolve(&mut encoder);

        self.context.queue.submit(Some(encoder.finish()));
        let elapsed_ns = self
            .timer
            .read_elapsed_ns(&self.context.device, &self.context.queue);
        frame.present();

        Ok(elapsed_ns)
    }
}
