//! Engine configuration
//!
//! Every section has defaults, so a config file only needs the values it
//! changes. Files are TOML or RON, chosen by extension.

use std::path::{Path, PathBuf};

pub use serde::{Deserialize, Serialize};

use crate::render::settings::{MipmapMode, MsaaLevel};

/// Load and save a serde type by file extension
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match Format::of(path)? {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to a `.toml` or `.ron` file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window creation
    pub window: WindowConfig,
    /// Renderer setup and initial graphics settings
    pub renderer: RendererConfig,
    /// Frame pacing
    pub limits: FrameLimits,
    /// Asset directories
    pub assets: AssetConfig,
}

impl Config for EngineConfig {}

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Cake Engine".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

/// Renderer setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Enable the Khronos validation layer
    pub validation: bool,
    /// Prefer mailbox presentation over immediate
    pub vsync: bool,
    /// Upper bound on the MSAA sample count, on top of the hardware limit
    pub max_msaa: Option<u32>,
    /// Initial texture mipmap mode
    pub mipmaps: MipmapMode,
    /// Initial MSAA level
    pub msaa: MsaaLevel,
    /// Initial sample shading state
    pub sample_shading: bool,
    /// Color the frame is cleared to
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
            vsync: true,
            max_msaa: None,
            mipmaps: MipmapMode::Linear,
            msaa: MsaaLevel::Disabled,
            sample_shading: false,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Frame pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameLimits {
    /// Frame rate cap, 0 for unlimited
    pub max_fps: u32,
    /// Seconds between FPS log lines
    pub fps_log_interval: f32,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_fps: 6000,
            fps_log_interval: 1.0,
        }
    }
}

/// Directories relative asset paths are resolved against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Compiled SPIR-V shaders
    pub shader_dir: PathBuf,
    /// OBJ models
    pub model_dir: PathBuf,
    /// Texture images
    pub texture_dir: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            shader_dir: PathBuf::from("assets/shaders"),
            model_dir: PathBuf::from("assets/models"),
            texture_dir: PathBuf::from("assets/textures"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("cake_engine_{}_{}", std::process::id(), name))
    }

    fn sample() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.window.title = "round trip".to_string();
        config.renderer.msaa = MsaaLevel::X4;
        config.renderer.max_msaa = Some(8);
        config.limits.max_fps = 144;
        config
    }

    #[test]
    fn test_toml_round_trip() {
        let path = temp_path("config.toml");
        sample().save_to_file(&path).expect("save toml");
        let loaded = EngineConfig::load_from_file(&path).expect("load toml");
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_ron_round_trip() {
        let path = temp_path("config.ron");
        sample().save_to_file(&path).expect("save ron");
        let loaded = EngineConfig::load_from_file(&path).expect("load ron");
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str("[window]\nwidth = 1280\n").expect("parse");
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.limits, FrameLimits::default());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = EngineConfig::default().save_to_file(temp_path("config.yaml"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
