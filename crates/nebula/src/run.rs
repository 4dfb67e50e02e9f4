use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use heroconfig::HeroConfig;
use renderer::{validate_fragment, Renderer};
use tracing_subscriber::EnvFilter;

use crate::bindings;
use crate::cli::RunArgs;
use crate::paths::AppPaths;

const DEFAULT_LOG_FILTER: &str = "warn,nebula=info,renderer=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";

pub fn initialise_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let (config, base_dir) = load_config(args.config.as_deref(), &paths)?;
    let renderer_config = bindings::renderer_config(&config, &base_dir, &args)?;
    tracing::info!(
        width = renderer_config.window_size.0,
        height = renderer_config.window_size.1,
        custom_shader = renderer_config.fragment_source.is_some(),
        "starting nebula"
    );
    Renderer::new(renderer_config).run()
}

/// Validates a shader file; returns whether it passed.
pub fn check(shader: &Path) -> Result<bool> {
    let source = fs::read_to_string(shader)
        .with_context(|| format!("failed to read shader at {}", shader.display()))?;
    match validate_fragment(&source) {
        Ok(()) => {
            println!("ok");
            Ok(true)
        }
        Err(diagnostic) => {
            eprintln!("{}: {diagnostic}", shader.display());
            Ok(false)
        }
    }
}

pub fn print_where() -> Result<()> {
    let paths = AppPaths::discover()?;
    let config_file = paths.config_file();
    println!("config dir:  {}", paths.config_dir().display());
    println!(
        "config file: {}{}",
        config_file.display(),
        if config_file.exists() { "" } else { " (missing)" }
    );
    Ok(())
}

/// Loads the explicit config, else the default file when present, else defaults.
///
/// Also returns the directory relative shader paths resolve against.
fn load_config(explicit: Option<&Path>, paths: &AppPaths) -> Result<(HeroConfig, PathBuf)> {
    let default_file = paths.config_file();
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None if default_file.is_file() => default_file,
        None => {
            tracing::debug!(
                expected = %default_file.display(),
                "no config file found; using defaults"
            );
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            return Ok((HeroConfig::default(), cwd));
        }
    };

    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config = HeroConfig::from_toml_str(&text)
        .with_context(|| format!("invalid config at {}", path.display()))?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    tracing::debug!(config = %path.display(), "loaded config");
    Ok((config, base_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_config_resolves_relative_to_its_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("custom.toml");
        fs::write(&file, "version = 1\n[window]\nwidth = 320\nheight = 200\n").unwrap();
        let paths = AppPaths::discover_in(dir.path().join("unused"));

        let (config, base_dir) = load_config(Some(&file), &paths).unwrap();

        assert_eq!(config.window.width, 320);
        assert_eq!(base_dir, dir.path());
    }

    #[test]
    fn default_config_file_is_picked_up_when_present() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("nebula.toml"), "version = 1\n[window]\nheight = 400\n").unwrap();
        let paths = AppPaths::discover_in(dir.path().to_path_buf());

        let (config, _) = load_config(None, &paths).unwrap();

        assert_eq!(config.window.height, 400);
    }

    #[test]
    fn absent_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths::discover_in(dir.path().to_path_buf());

        let (config, _) = load_config(None, &paths).unwrap();

        assert_eq!(config, HeroConfig::default());
    }

    #[test]
    fn invalid_config_reports_its_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("broken.toml");
        fs::write(&file, "version = 3\n").unwrap();
        let paths = AppPaths::discover_in(dir.path().to_path_buf());

        let err = load_config(Some(&file), &paths).unwrap_err();

        assert!(format!("{err:#}").contains("broken.toml"));
    }
}
