use bytemuck::{Pod, Zeroable};

use crate::types::{UniformRegistry, UniformValue};

/// Standard uniform block shared with every wrapped shader.
///
/// Field order and padding must match the `PeekParams` block declared in
/// `compile.rs`: the std140 rules place `_iTime` in the trailing lane of the
/// `vec3` resolution, which the `[f32; 3]` + `f32` pair reproduces exactly.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct FrameParams {
    i_resolution: [f32; 3],
    i_time: f32,
    i_mouse: [f32; 4],
    i_frame: i32,
    i_animation: f32,
    _padding0: [f32; 2],
}

impl FrameParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            i_resolution: [width as f32, height as f32, 1.0],
            i_time: 0.0,
            i_mouse: [0.0; 4],
            i_frame: 0,
            i_animation: 0.0,
            _padding0: [0.0; 2],
        }
    }

    pub fn set_resolution(&mut self, width: f32, height: f32) {
        self.i_resolution = [width, height, 1.0];
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.i_time = seconds;
    }

    pub fn set_animation(&mut self, seconds: f32) {
        self.i_animation = seconds;
    }

    pub fn set_frame(&mut self, frame: i32) {
        self.i_frame = frame;
    }

    pub fn set_mouse(&mut self, mouse: [f32; 4]) {
        self.i_mouse = mouse;
    }
}

/// std140 base alignment and size for a uniform value.
fn layout_of(value: &UniformValue) -> (usize, usize) {
    match value {
        UniformValue::Float(_) | UniformValue::Int(_) => (4, 4),
        UniformValue::Vec2(_) => (8, 8),
        UniformValue::Vec3(_) => (16, 12),
        UniformValue::Vec4(_) => (16, 16),
    }
}

fn align_up(offset: usize, align: usize) -> usize {
    offset.div_ceil(align) * align
}

/// Byte size of the custom uniform buffer for this registry, rounded up to a
/// 16-byte boundary. At least one slot even when empty so a buffer can always
/// be created.
pub(crate) fn custom_buffer_size(registry: &UniformRegistry) -> u64 {
    let mut offset = 0usize;
    for (_, value) in registry.iter() {
        let (align, size) = layout_of(value);
        offset = align_up(offset, align) + size;
    }
    align_up(offset.max(4), 16) as u64
}

/// Packs the registry's values into the std140 layout the synthesized
/// `PeekCustom` block declares, in registration order.
pub(crate) fn pack_custom(registry: &UniformRegistry) -> Vec<u8> {
    let mut bytes = vec![0u8; custom_buffer_size(registry) as usize];
    let mut offset = 0usize;
    for (_, value) in registry.iter() {
        let (align, size) = layout_of(value);
        offset = align_up(offset, align);
        let slot = &mut bytes[offset..offset + size];
        match value {
            UniformValue::Float(v) => slot.copy_from_slice(&v.to_le_bytes()),
            UniformValue::Int(v) => slot.copy_from_slice(&v.to_le_bytes()),
            UniformValue::Vec2(v) => slot.copy_from_slice(bytemuck::cast_slice(v)),
            UniformValue::Vec3(v) => slot.copy_from_slice(bytemuck::cast_slice(v)),
            UniformValue::Vec4(v) => slot.copy_from_slice(bytemuck::cast_slice(v)),
        }
        offset += size;
    }
    bytes
}
