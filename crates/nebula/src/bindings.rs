//! Maps the TOML model and CLI overrides onto renderer types.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use heroconfig::{ButtonSection, ContentSection, HeroConfig, PowerSetting};
use renderer::{
    CallToAction, GpuPowerPreference, Headline, HeroContent, HeroOverlay, RendererConfig,
    ScalePolicy, Stat,
};

use crate::cli::RunArgs;

pub fn renderer_config(
    config: &HeroConfig,
    base_dir: &Path,
    args: &RunArgs,
) -> Result<RendererConfig> {
    let window_size = args
        .size
        .unwrap_or((config.window.width, config.window.height));
    let dpr_factor = args.dpr_factor.unwrap_or(config.render.dpr_factor);
    let power = args.power.unwrap_or(config.render.power);

    let fragment_source = match shader_path(config, base_dir, args) {
        Some(path) => {
            let source = fs::read_to_string(&path)
                .with_context(|| format!("failed to read shader at {}", path.display()))?;
            tracing::info!(shader = %path.display(), "using custom fragment shader");
            Some(source)
        }
        None => None,
    };

    Ok(RendererConfig {
        window_size,
        title: config.window.title.clone(),
        fragment_source,
        scale_policy: ScalePolicy::new(dpr_factor, config.render.min_scale),
        power_preference: map_power(power),
        overlay: overlay(&config.content),
    })
}

/// CLI paths are taken as given; config paths are relative to the config file.
fn shader_path(config: &HeroConfig, base_dir: &Path, args: &RunArgs) -> Option<PathBuf> {
    if let Some(path) = &args.shader {
        return Some(path.clone());
    }
    config.render.shader.as_ref().map(|path| base_dir.join(path))
}

pub fn map_power(power: PowerSetting) -> GpuPowerPreference {
    match power {
        PowerSetting::Low => GpuPowerPreference::Low,
        PowerSetting::High => GpuPowerPreference::High,
    }
}

pub fn hero_content(content: &ContentSection) -> HeroContent {
    HeroContent {
        trust_badge: content.trust_badge.clone(),
        headline: Headline {
            line1: content.headline.line1.clone(),
            line2: content.headline.line2.clone(),
        },
        subtitle: content.subtitle.clone(),
        primary: content.primary.as_ref().map(call_to_action),
        secondary: content.secondary.as_ref().map(call_to_action),
        stats: content
            .stats
            .iter()
            .map(|stat| Stat {
                value: stat.value.clone(),
                label: stat.label.clone(),
            })
            .collect(),
    }
}

fn call_to_action(button: &ButtonSection) -> CallToAction {
    CallToAction {
        text: button.text.clone(),
        action: button.action.clone(),
    }
}

/// The desktop host has no page to navigate, so actions are reported in the log.
pub fn overlay(content: &ContentSection) -> HeroOverlay {
    HeroOverlay::new(hero_content(content))
        .with_primary_action(|action| {
            tracing::info!(action = action.unwrap_or("none"), "primary action triggered");
        })
        .with_secondary_action(|action| {
            tracing::info!(action = action.unwrap_or("none"), "secondary action triggered");
        })
}
