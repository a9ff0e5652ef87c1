use anyhow::Result;
use renderer::{RendererConfig, UniformRegistry};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::{self, FileConfig};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let file = match &cli.config {
        Some(path) => config::load(path)?,
        None => FileConfig::default(),
    };
    let (settings, registry) = merge(&cli, &file)?;
    tracing::debug!(
        shader = %settings.shader_source.display(),
        uniforms = registry.len(),
        "effective settings resolved"
    );
    renderer::run(settings, registry)
}

/// Resolves the effective settings: CLI flags override the configuration
/// file, which overrides the built-in defaults. File uniforms register
/// first so a CLI `--uniform` can override a file entry's value.
fn merge(cli: &Cli, file: &FileConfig) -> Result<(RendererConfig, UniformRegistry)> {
    let defaults = RendererConfig::default();

    let width = cli
        .size
        .map(|(w, _)| w)
        .or(file.window.width)
        .unwrap_or(defaults.surface_size.0);
    let height = cli
        .size
        .map(|(_, h)| h)
        .or(file.window.height)
        .unwrap_or(defaults.surface_size.1);

    let settings = RendererConfig {
        shader_source: cli.shader.clone().unwrap_or(defaults.shader_source),
        surface_size: (width, height),
        always_on_top: cli
            .on_top
            .or(file.window.always_on_top)
            .unwrap_or(defaults.always_on_top),
        overlay_enabled: if cli.no_overlay {
            false
        } else {
            file.window.overlay.unwrap_or(defaults.overlay_enabled)
        },
    };

    let mut registry = UniformRegistry::new();
    for (name, value) in &file.uniforms {
        registry.register(name.clone(), config::uniform_from_toml(name, value)?);
    }
    for (name, value) in &cli.uniforms {
        registry.register(name.clone(), *value);
    }

    Ok((settings, registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use renderer::UniformValue;
    use std::path::PathBuf;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once(&"shaderpeek").chain(args)).expect("valid args")
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let (settings, registry) = merge(&cli(&[]), &FileConfig::default()).unwrap();
        assert_eq!(settings.shader_source, PathBuf::from("shader.glsl"));
        assert_eq!(settings.surface_size, (640, 640));
        assert!(settings.always_on_top);
        assert!(settings.overlay_enabled);
        assert!(registry.is_empty());
    }

    #[test]
    fn cli_overrides_configuration_file() {
        let file = config::parse(
            r#"
            [window]
            width = 800
            height = 600
            always_on_top = true
            "#,
        )
        .unwrap();
        let (settings, _) =
            merge(&cli(&["--size", "320x240", "--start-on-top", "false"]), &file).unwrap();
        assert_eq!(settings.surface_size, (320, 240));
        assert!(!settings.always_on_top);
    }

    #[test]
    fn file_sizes_apply_without_cli_override() {
        let file = config::parse("[window]\nwidth = 800\nheight = 600").unwrap();
        let (settings, _) = merge(&cli(&[]), &file).unwrap();
        assert_eq!(settings.surface_size, (800, 600));
    }

    #[test]
    fn no_overlay_flag_wins_over_file() {
        let file = config::parse("[window]\noverlay = true").unwrap();
        let (settings, _) = merge(&cli(&["--no-overlay"]), &file).unwrap();
        assert!(!settings.overlay_enabled);
    }

    #[test]
    fn cli_uniform_overrides_file_uniform() {
        let file = config::parse("[uniforms]\niZoom = 1.0\niSteps = 16").unwrap();
        let (_, registry) = merge(&cli(&["--uniform", "iZoom=2.5"]), &file).unwrap();

        let values: Vec<(&str, &UniformValue)> = registry.iter().collect();
        assert_eq!(values.len(), 2);
        assert!(values
            .iter()
            .any(|(n, v)| *n == "iZoom" && **v == UniformValue::Float(2.5)));
        assert!(values
            .iter()
            .any(|(n, v)| *n == "iSteps" && **v == UniformValue::Int(16)));
    }
}
