use std::path::PathBuf;

/// Value carried by a custom uniform. The variant fixes the GLSL type at
/// registration time; re-registering a name with a different arity is not
/// validated and the shader side decides what happens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl UniformValue {
    /// GLSL type keyword used when the wrapper declares this uniform.
    pub fn glsl_type(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Int(_) => "int",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
        }
    }
}

/// Ordered name -> value map for caller-declared uniforms.
///
/// Entries are declared in the wrapped shader in registration order and are
/// never removed during a run. Writes to names that were never registered are
/// ignored, mirroring the forgiving uniform-write behaviour of the preview
/// loop: a stale name must never take the frame down.
#[derive(Debug, Clone, Default)]
pub struct UniformRegistry {
    entries: Vec<(String, UniformValue)>,
}

impl UniformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a uniform. Registering an existing name replaces its value
    /// while keeping the original declaration slot.
    pub fn register(&mut self, name: impl Into<String>, value: UniformValue) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Updates a previously registered uniform. Unknown names are a no-op.
    pub fn set(&mut self, name: &str, value: UniformValue) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => {
                tracing::debug!(name, "ignoring write to unregistered uniform");
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Immutable configuration handed to the render loop at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Path to the fragment-shader body defining `mainImage`.
    pub shader_source: PathBuf,
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Start with the window above normal z-order.
    pub always_on_top: bool,
    /// Start with the render-time overlay visible.
    pub overlay_enabled: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shader_source: PathBuf::from("shader.glsl"),
            surface_size: (640, 640),
            always_on_top: true,
            overlay_enabled: true,
        }
    }
}

/// Commands the render loop understands. Key bindings live in the binary
/// crate; the loop only cares about the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Quit,
    TogglePause,
    ToggleAlwaysOnTop,
    ToggleOverlay,
    ResetAnimation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_preserves_insertion_order() {
        let mut registry = UniformRegistry::new();
        registry.register("iZoom", UniformValue::Float(1.0));
        registry.register("iTint", UniformValue::Vec3([1.0, 0.5, 0.0]));
        registry.register("iSteps", UniformValue::Int(32));

        let names: Vec<&str> = registry.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["iZoom", "iTint", "iSteps"]);
    }

    #[test]
    fn set_on_unregistered_name_is_ignored() {
        let mut registry = UniformRegistry::new();
        registry.register("iZoom", UniformValue::Float(1.0));
        registry.set("iMissing", UniformValue::Float(2.0));

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.iter().next(),
            Some(("iZoom", &UniformValue::Float(1.0)))
        );
    }

    #[test]
    fn set_updates_registered_value() {
        let mut registry = UniformRegistry::new();
        registry.register("iZoom", UniformValue::Float(1.0));
        registry.set("iZoom", UniformValue::Float(2.5));
        assert_eq!(
            registry.iter().next(),
            Some(("iZoom", &UniformValue::Float(2.5)))
        );
    }

    #[test]
    fn glsl_types_follow_arity() {
        assert_eq!(UniformValue::Float(0.0).glsl_type(), "float");
        assert_eq!(UniformValue::Int(0).glsl_type(), "int");
        assert_eq!(UniformValue::Vec2([0.0; 2]).glsl_type(), "vec2");
        assert_eq!(UniformValue::Vec3([0.0; 3]).glsl_type(), "vec3");
        assert_eq!(UniformValue::Vec4([0.0; 4]).glsl_type(), "vec4");
    }
}
