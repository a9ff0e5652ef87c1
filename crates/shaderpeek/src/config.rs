use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use renderer::UniformValue;
use serde::Deserialize;

/// Optional TOML configuration file. CLI flags win over anything set here.
///
/// ```toml
/// [window]
/// width = 800
/// height = 450
/// always_on_top = false
///
/// [uniforms]
/// iZoom = 1.5
/// iSteps = 32
/// iTint = [1.0, 0.5, 0.0]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub uniforms: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub always_on_top: Option<bool>,
    pub overlay: Option<bool>,
}

pub fn load(path: &Path) -> Result<FileConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid configuration {}", path.display()))
}

pub fn parse(text: &str) -> Result<FileConfig> {
    toml::from_str(text).map_err(Into::into)
}

/// Maps a TOML value onto a uniform: integers stay `int`, floats become
/// `float`, and arrays of two to four numbers pick the matching vector type.
pub fn uniform_from_toml(name: &str, value: &toml::Value) -> Result<UniformValue> {
    match value {
        toml::Value::Integer(int) => Ok(UniformValue::Int(
            i32::try_from(*int).with_context(|| format!("uniform '{name}' out of i32 range"))?,
        )),
        toml::Value::Float(float) => Ok(UniformValue::Float(*float as f32)),
        toml::Value::Array(items) => {
            let mut components = Vec::with_capacity(items.len());
            for item in items {
                let component = match item {
                    toml::Value::Integer(int) => *int as f32,
                    toml::Value::Float(float) => *float as f32,
                    other => bail!(
                        "uniform '{name}' has a non-numeric component ({})",
                        other.type_str()
                    ),
                };
                components.push(component);
            }
            match components.as_slice() {
                [x, y] => Ok(UniformValue::Vec2([*x, *y])),
                [x, y, z] => Ok(UniformValue::Vec3([*x, *y, *z])),
                [x, y, z, w] => Ok(UniformValue::Vec4([*x, *y, *z, *w])),
                _ => bail!("uniform '{name}' must have 2 to 4 components"),
            }
        }
        other => bail!(
            "uniform '{name}' must be a number or an array, got {}",
            other.type_str()
        ),
    }
}
