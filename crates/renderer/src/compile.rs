use std::borrow::Cow;
use std::fmt::Write as _;

use wgpu::naga::ShaderStage;

use crate::types::UniformRegistry;

/// Builds the shader module for the static full-screen quad vertex stage.
pub(crate) fn create_vertex_module(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen quad vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Wraps a user fragment body and hands it to the naga GLSL frontend.
///
/// Compile and link failures are not reported here; the caller builds the
/// pipeline inside a validation error scope and maps failures to
/// [`crate::CompileError`].
pub(crate) fn create_fragment_module(
    device: &wgpu::Device,
    body: &str,
    uniforms: &UniformRegistry,
) -> wgpu::ShaderModule {
    let wrapped = wrap_fragment(body, uniforms);
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("shaderpeek fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

/// Produces a self-contained GLSL fragment shader from a bare `mainImage`
/// body.
///
/// Steps performed:
///
/// 1. Strip `#version` directives and any redeclaration of the standard
///    uniforms so our definitions win.
/// 2. Prepend [`HEADER`]: the standard uniform block (resolution, time,
///    mouse, frame, animation, in that order) plus one declaration per
///    registered custom uniform, each aliased to its bare name.
/// 3. Append the wrapper `main` which remaps `gl_FragCoord` to a bottom-left
///    origin, calls `mainImage`, and writes premultiplied alpha so the
///    translucent window composites correctly.
pub(crate) fn wrap_fragment(body: &str, uniforms: &UniformRegistry) -> String {
    let mut sanitized = String::new();
    let mut skipped_version = false;
    for line in body.lines() {
        if !skipped_version && line.trim_start().starts_with("#version") {
            skipped_version = true;
            continue;
        }
        let trimmed = line.trim_start();
        let redeclares_standard = trimmed.starts_with("uniform ")
            && (trimmed.contains("iResolution")
                || trimmed.contains("iTime")
                || trimmed.contains("iMouse")
                || trimmed.contains("iFrame")
                || trimmed.contains("iAnimation"));
        if redeclares_standard {
            continue;
        }
        sanitized.push_str(line);
        sanitized.push('\n');
    }

    format!(
        "{HEADER}{custom}{WRAPPER}#line 1\n{sanitized}",
        custom = custom_uniform_block(uniforms),
    )
}

/// Declares the custom uniform block and one `#define` alias per entry, in
/// registration order. Empty registries produce no block at all.
fn custom_uniform_block(uniforms: &UniformRegistry) -> String {
    if uniforms.is_empty() {
        return String::new();
    }

    let mut block = String::from("layout(std140, set = 0, binding = 1) uniform PeekCustom {\n");
    for (name, value) in uniforms.iter() {
        let _ = writeln!(block, "    {} _{};", value.glsl_type(), name);
    }
    block.push_str("} peek_custom;\n\n");
    for (name, _) in uniforms.iter() {
        let _ = writeln!(block, "#define {name} peek_custom._{name}");
    }
    block.push('\n');
    block
}

/// GLSL prologue injected ahead of every fragment body.
///
/// The uniform block layout must match `FrameParams` in `gpu/uniforms.rs`.
/// Standard names are mapped onto block members via macros so user code can
/// use the ShaderToy spellings without clashing with our declarations.
const HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform PeekParams {
    vec3 _iResolution;
    float _iTime;
    vec4 _iMouse;
    int _iFrame;
    float _iAnimation;
    vec2 _padding0;
} peek;

#define iResolution peek._iResolution
#define iTime peek._iTime
#define iMouse peek._iMouse
#define iFrame peek._iFrame
#define iAnimation peek._iAnimation

vec4 peek_gl_FragCoord;
#define gl_FragCoord peek_gl_FragCoord

";

/// Forward declaration plus the wrapper `main`. The user body follows, so
/// `mainImage` is resolved at link time within the same translation unit.
const WRAPPER: &str = r"void mainImage(out vec4 fragColor, in vec2 fragCoord);

void main() {
    // Capture the real builtin, then remap to a bottom-left origin.
    #undef gl_FragCoord
    vec2 builtinFC = vec2(gl_FragCoord.x, gl_FragCoord.y);
    #define gl_FragCoord peek_gl_FragCoord

    vec2 fragCoord = vec2(builtinFC.x, iResolution.y - builtinFC.y);
    peek_gl_FragCoord = vec4(fragCoord, 0.0, 1.0);

    vec4 color = vec4(0.0);
    mainImage(color, fragCoord);
    outColor = vec4(color.rgb * color.a, color.a);
}

";

/// Vertex stage for the unit quad spanning [-1,1]^2; UV derived from clip
/// position. The geometry never varies.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 in_vert;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = in_vert * 0.5 + 0.5;
    gl_Position = vec4(in_vert, 0.0, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UniformValue;

    const BODY: &str = "void mainImage(out vec4 c, in vec2 p) { c = vec4(1.0); }\n";

    #[test]
    fn wrapper_declares_standard_uniforms_in_order() {
        let wrapped = wrap_fragment(BODY, &UniformRegistry::new());
        let res = wrapped.find("vec3 _iResolution;").expect("resolution");
        let time = wrapped.find("float _iTime;").expect("time");
        let mouse = wrapped.find("vec4 _iMouse;").expect("mouse");
        let frame = wrapped.find("int _iFrame;").expect("frame");
        let animation = wrapped.find("float _iAnimation;").expect("animation");
        assert!(res < time && time < mouse && mouse < frame && frame < animation);
    }

    #[test]
    fn wrapper_declares_custom_uniforms_by_kind() {
        let mut registry = UniformRegistry::new();
        registry.register("iZoom", UniformValue::Float(1.0));
        registry.register("iSteps", UniformValue::Int(16));
        registry.register("iOffset", UniformValue::Vec2([0.0, 0.0]));
        registry.register("iTint", UniformValue::Vec3([1.0, 1.0, 1.0]));
        registry.register("iRect", UniformValue::Vec4([0.0; 4]));

        let wrapped = wrap_fragment(BODY, &registry);
        assert!(wrapped.contains("float _iZoom;"));
        assert!(wrapped.contains("int _iSteps;"));
        assert!(wrapped.contains("vec2 _iOffset;"));
        assert!(wrapped.contains("vec3 _iTint;"));
        assert!(wrapped.contains("vec4 _iRect;"));
        assert!(wrapped.contains("#define iZoom peek_custom._iZoom"));
    }

    #[test]
    fn empty_registry_emits_no_custom_block() {
        let wrapped = wrap_fragment(BODY, &UniformRegistry::new());
        assert!(!wrapped.contains("PeekCustom"));
    }

    #[test]
    fn wrapper_premultiplies_alpha() {
        let wrapped = wrap_fragment(BODY, &UniformRegistry::new());
        assert!(wrapped.contains("outColor = vec4(color.rgb * color.a, color.a);"));
    }

    #[test]
    fn wrapper_strips_version_and_standard_redeclarations() {
        let body = "#version 330\nuniform float iTime;\nuniform vec3 iResolution;\nvoid mainImage(out vec4 c, in vec2 p) { c = vec4(iTime); }\n";
        let wrapped = wrap_fragment(body, &UniformRegistry::new());
        assert!(!wrapped.contains("#version 330"));
        assert!(!wrapped.contains("uniform float iTime;"));
        assert!(!wrapped.contains("uniform vec3 iResolution;"));
        assert!(wrapped.contains("mainImage"));
    }

    #[test]
    fn user_body_follows_wrapper_main() {
        let wrapped = wrap_fragment(BODY, &UniformRegistry::new());
        let main_at = wrapped.find("void main()").expect("main");
        let body_at = wrapped.find("void mainImage(out vec4 c").expect("body");
        assert!(main_at < body_at);
    }
}
