//! TOML configuration for the nebula hero: window, render policy and the
//! overlay content shown above the animated background.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerSetting {
    #[default]
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HeroConfig {
    pub version: u32,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub content: ContentSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSection {
    /// Fragment shader path, resolved relative to the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shader: Option<PathBuf>,
    pub dpr_factor: f32,
    pub min_scale: f32,
    pub power: PowerSetting,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            shader: None,
            dpr_factor: 0.5,
            min_scale: 1.0,
            power: PowerSetting::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeadlineSection {
    pub line1: String,
    pub line2: String,
}

impl Default for HeadlineSection {
    fn default() -> Self {
        Self {
            line1: "Work without borders".to_string(),
            line2: "Paid on-chain".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ButtonSection {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatSection {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_badge: Option<String>,
    pub subtitle: String,
    pub headline: HeadlineSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<ButtonSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<ButtonSection>,
    pub stats: Vec<StatSection>,
}

impl Default for HeroConfig {
    fn default() -> Self {
        Self {
            version: 1,
            window: WindowSection::default(),
            render: RenderSection::default(),
            content: ContentSection::default(),
        }
    }
}

impl HeroConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: HeroConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero (got {}x{})",
                self.window.width, self.window.height
            )));
        }

        let render = &self.render;
        if !render.dpr_factor.is_finite() || render.dpr_factor <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "render.dpr_factor must be a positive number (got {})",
                render.dpr_factor
            )));
        }
        if !render.min_scale.is_finite() || render.min_scale < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "render.min_scale must be at least 1.0 (got {})",
                render.min_scale
            )));
        }
        if let Some(shader) = &render.shader {
            if shader.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("render.shader must not be empty".into()));
            }
        }

        let content = &self.content;
        if content.headline.line1.trim().is_empty() || content.headline.line2.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "content.headline lines must not be empty".into(),
            ));
        }
        for (name, button) in [
            ("primary", &content.primary),
            ("secondary", &content.secondary),
        ] {
            if let Some(button) = button {
                if button.text.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "content.{name}.text must not be empty"
                    )));
                }
            }
        }
        for stat in &content.stats {
            if stat.value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "stat '{}' has an empty value",
                    stat.label
                )));
            }
        }

        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
