use std::borrow::Cow;

use wgpu::naga::ShaderStage;
use winit::dpi::PhysicalSize;

/// Distance in pixels between the overlay and the window's bottom-left corner.
const MARGIN_PX: u32 = 6;
/// Integer upscale applied to the 5x7 glyph cells.
const GLYPH_SCALE: u32 = 2;
/// Extra canvas left around the text for the stamped drop shadow.
const SHADOW_PAD: u32 = 5;
/// Drop-shadow opacity per stamp; the stamps accumulate into a soft halo.
const SHADOW_ALPHA: u16 = 32;

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Draws the render-time readout as a textured screen-space quad.
///
/// The text texture is cached by its pixel dimensions: the readout string
/// length rarely changes, so most frames overwrite the existing texture in
/// place and no GPU allocation happens.
pub(crate) struct OverlayRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vertex_buffer: wgpu::Buffer,
    cached: Option<CachedTexture>,
}

struct CachedTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

impl OverlayRenderer {
    pub(crate) fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("overlay bind layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("overlay vertex"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(OVERLAY_VERT),
                stage: ShaderStage::Vertex,
                defines: &[],
            },
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("overlay fragment"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(OVERLAY_FRAG),
                stage: ShaderStage::Fragment,
                defines: &[],
            },
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("overlay pipeline layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("overlay pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 16,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("overlay sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Dynamic quad: (x, y, u, v) * 4, rewritten whenever the rect moves.
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("overlay vertices"),
            size: 4 * 16,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            bind_layout,
            sampler,
            vertex_buffer,
            cached: None,
        }
    }

    /// Rasterizes `text`, uploads it, and positions the quad at bottom-left.
    pub(crate) fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface: PhysicalSize<u32>,
        text: &str,
    ) {
        let (pixels, width, height) = rasterize_with_shadow(text);

        let recreate = self
            .cached
            .as_ref()
            .map(|cached| cached.size != (width, height))
            .unwrap_or(true);
        if recreate {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("overlay text"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("overlay bind group"),
                layout: &self.bind_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            self.cached = Some(CachedTexture {
                texture,
                bind_group,
                size: (width, height),
            });
        }

        let cached = self.cached.as_ref().expect("texture cached above");
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &cached.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice(&quad_vertices(surface, width, height)),
        );
    }

    /// Encodes the overlay pass over the already-rendered frame.
    pub(crate) fn draw(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let Some(cached) = self.cached.as_ref() else {
            return;
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("overlay pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &cached.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..4, 0..1);
    }
}

const OVERLAY_VERT: &str = r#"#version 450
layout(location = 0) in vec2 in_pos;
layout(location = 1) in vec2 in_uv;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = in_uv;
    gl_Position = vec4(in_pos, 0.0, 1.0);
}
"#;

const OVERLAY_FRAG: &str = r#"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 0) uniform texture2D overlay_tex;
layout(set = 0, binding = 1) uniform sampler overlay_samp;

void main() {
    outColor = texture(sampler2D(overlay_tex, overlay_samp), v_uv);
}
"#;

/// NDC rect for a `width`x`height` pixel texture at the bottom-left, with
/// texture row zero at the top of the rect.
fn quad_vertices(surface: PhysicalSize<u32>, width: u32, height: u32) -> [[f32; 4]; 4] {
    let sw = surface.width.max(1) as f32;
    let sh = surface.height.max(1) as f32;
    let left = MARGIN_PX as f32;
    let bottom_px = sh - MARGIN_PX as f32;
    let top_px = bottom_px - height as f32;
    let right = left + width as f32;

    let nl = left * 2.0 / sw - 1.0;
    let nr = right * 2.0 / sw - 1.0;
    let nt = 1.0 - top_px * 2.0 / sh;
    let nb = 1.0 - bottom_px * 2.0 / sh;

    [
        [nl, nb, 0.0, 1.0],
        [nr, nb, 1.0, 1.0],
        [nl, nt, 0.0, 0.0],
        [nr, nt, 1.0, 0.0],
    ]
}

/// Rasterizes `text` into premultiplied RGBA with a soft drop shadow.
///
/// The shadow is the glyph coverage stamped in black at every offset of a
/// 5x5 neighbourhood except the centre; the white foreground lands at the
/// centre offset on top.
fn rasterize_with_shadow(text: &str) -> (Vec<u8>, u32, u32) {
    let glyph_count = text.chars().count().max(1) as u32;
    let text_width = glyph_count * GLYPH_ADVANCE * GLYPH_SCALE;
    let text_height = GLYPH_HEIGHT * GLYPH_SCALE;
    let width = text_width + SHADOW_PAD;
    let height = text_height + SHADOW_PAD;

    let coverage = rasterize_coverage(text, text_width, text_height);
    let mut pixels = vec![0u8; (width * height * 4) as usize];

    let mut stamp = |offset_x: u32, offset_y: u32, color: [u8; 3], alpha: u16| {
        for y in 0..text_height {
            for x in 0..text_width {
                if coverage[(y * text_width + x) as usize] == 0 {
                    continue;
                }
                let px = x + offset_x;
                let py = y + offset_y;
                let index = ((py * width + px) * 4) as usize;
                let combined = (pixels[index + 3] as u16 + alpha).min(255) as u8;
                let a = combined as u16;
                pixels[index] = ((color[0] as u16 * a) / 255) as u8;
                pixels[index + 1] = ((color[1] as u16 * a) / 255) as u8;
                pixels[index + 2] = ((color[2] as u16 * a) / 255) as u8;
                pixels[index + 3] = combined;
            }
        }
    };

    for offset_y in 0..SHADOW_PAD {
        for offset_x in 0..SHADOW_PAD {
            if offset_x == 2 && offset_y == 2 {
                continue;
            }
            stamp(offset_x, offset_y, [0, 0, 0], SHADOW_ALPHA);
        }
    }
    stamp(2, 2, [255, 255, 255], 255);

    (pixels, width, height)
}

/// Binary coverage mask for the scaled glyph run. Unknown characters render
/// as blanks.
fn rasterize_coverage(text: &str, width: u32, height: u32) -> Vec<u8> {
    let mut coverage = vec![0u8; (width * height) as usize];
    for (slot, ch) in text.chars().enumerate() {
        let rows = glyph_rows(ch);
        let origin_x = slot as u32 * GLYPH_ADVANCE * GLYPH_SCALE;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for sy in 0..GLYPH_SCALE {
                    for sx in 0..GLYPH_SCALE {
                        let x = origin_x + col * GLYPH_SCALE + sx;
                        let y = row as u32 * GLYPH_SCALE + sy;
                        if x < width && y < height {
                            coverage[(y * width + x) as usize] = 1;
                        }
                    }
                }
            }
        }
    }
    coverage
}

/// 5x7 glyph cells for the readout alphabet: digits, decimal point, the
/// `<0.01` marker, the `ms` suffix, and the no-sample dash.
fn glyph_rows(ch: char) -> [u8; 7] {
    match ch {
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110],
        '<' => [0b00010, 0b00100, 0b01000, 0b10000, 0b01000, 0b00100, 0b00010],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        'm' => [0b00000, 0b00000, 0b11010, 0b10101, 0b10101, 0b10101, 0b10101],
        's' => [0b00000, 0b00000, 0b01111, 0b10000, 0b01110, 0b00001, 0b11110],
        _ => [0; 7],
    }
}
