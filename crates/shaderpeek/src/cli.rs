use std::path::PathBuf;

use clap::Parser;
use renderer::UniformValue;

#[derive(Parser, Debug)]
#[command(
    name = "shaderpeek",
    author,
    version,
    about = "Borderless live preview for a GLSL fragment shader"
)]
pub struct Cli {
    /// Fragment shader file defining `mainImage` (defaults to `shader.glsl`)
    #[arg(value_name = "SHADER")]
    pub shader: Option<PathBuf>,

    /// Window size in pixels (e.g. `800x450`)
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_dimensions)]
    pub size: Option<(u32, u32)>,

    /// Load settings from a TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Declare a custom uniform; the component count picks the GLSL type
    /// (`iZoom=1.5`, `iSteps=32`, `iTint=1,0.5,0`). Repeatable.
    #[arg(long = "uniform", value_name = "NAME=VALUE", value_parser = parse_uniform)]
    pub uniforms: Vec<(String, UniformValue)>,

    /// Hide the render-time overlay
    #[arg(long)]
    pub no_overlay: bool,

    /// Start with the window above normal z-order (`true` by default)
    #[arg(long = "start-on-top", value_name = "BOOL")]
    pub on_top: Option<bool>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

fn parse_dimensions(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid width".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid height".to_string())?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

fn parse_uniform(value: &str) -> Result<(String, UniformValue), String> {
    let (name, raw) = value
        .split_once('=')
        .ok_or_else(|| "expected NAME=VALUE".to_string())?;
    let name = name.trim();
    if name.is_empty() {
        return Err("uniform name must not be empty".into());
    }
    Ok((name.to_string(), parse_uniform_value(raw)?))
}

/// Infers the uniform type from the component count; a lone integer literal
/// stays an `int`, anything with a decimal point becomes a `float`.
pub fn parse_uniform_value(raw: &str) -> Result<UniformValue, String> {
    let components: Vec<&str> = raw.split(',').map(str::trim).collect();
    match components.as_slice() {
        [single] => {
            if let Ok(int) = single.parse::<i32>() {
                return Ok(UniformValue::Int(int));
            }
            single
                .parse::<f32>()
                .map(UniformValue::Float)
                .map_err(|_| format!("invalid uniform scalar '{single}'"))
        }
        parts @ ([_, _] | [_, _, _] | [_, _, _, _]) => {
            let mut values = [0.0f32; 4];
            for (slot, part) in values.iter_mut().zip(parts) {
                *slot = part
                    .parse::<f32>()
                    .map_err(|_| format!("invalid uniform component '{part}'"))?;
            }
            Ok(match parts.len() {
                2 => UniformValue::Vec2([values[0], values[1]]),
                3 => UniformValue::Vec3([values[0], values[1], values[2]]),
                _ => UniformValue::Vec4(values),
            })
        }
        _ => Err("expected 1 to 4 comma-separated components".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dimensions() {
        assert_eq!(parse_dimensions("800x450"), Ok((800, 450)));
        assert_eq!(parse_dimensions("640X640"), Ok((640, 640)));
        assert!(parse_dimensions("800").is_err());
        assert!(parse_dimensions("0x100").is_err());
    }

    #[test]
    fn uniform_type_follows_component_count() {
        assert_eq!(parse_uniform_value("32"), Ok(UniformValue::Int(32)));
        assert_eq!(parse_uniform_value("1.5"), Ok(UniformValue::Float(1.5)));
        assert_eq!(
            parse_uniform_value("1,2"),
            Ok(UniformValue::Vec2([1.0, 2.0]))
        );
        assert_eq!(
            parse_uniform_value("1, 0.5, 0"),
            Ok(UniformValue::Vec3([1.0, 0.5, 0.0]))
        );
        assert_eq!(
            parse_uniform_value("0,0,0,1"),
            Ok(UniformValue::Vec4([0.0, 0.0, 0.0, 1.0]))
        );
        assert!(parse_uniform_value("1,2,3,4,5").is_err());
        assert!(parse_uniform_value("abc").is_err());
    }

    #[test]
    fn uniform_flag_is_repeatable() {
        let cli = Cli::try_parse_from([
            "shaderpeek",
            "demo.glsl",
            "--uniform",
            "iZoom=2.0",
            "--uniform",
            "iTint=1,0,0",
        ])
        .expect("valid invocation");

        assert_eq!(cli.shader, Some(PathBuf::from("demo.glsl")));
        assert_eq!(cli.uniforms.len(), 2);
        assert_eq!(cli.uniforms[0].0, "iZoom");
        assert_eq!(cli.uniforms[1].1, UniformValue::Vec3([1.0, 0.0, 0.0]));
    }

    #[test]
    fn rejects_malformed_uniform_flag() {
        assert!(Cli::try_parse_from(["shaderpeek", "--uniform", "noequals"]).is_err());
        assert!(Cli::try_parse_from(["shaderpeek", "--uniform", "=1.0"]).is_err());
    }
}
