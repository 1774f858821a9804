//! Graphics settings that require a renderer restart
//!
//! Changing any of these alters the render pass, the pipelines or the
//! texture samplers, so the renderer rebuilds all of them together.

use ash::vk;
use serde::{Deserialize, Serialize};

/// Multisample anti-aliasing level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MsaaLevel {
    /// Single sample
    Disabled,
    /// 2 samples
    X2,
    /// 4 samples
    X4,
    /// 8 samples
    X8,
    /// 16 samples
    X16,
    /// 32 samples
    X32,
    /// 64 samples
    X64,
}

impl MsaaLevel {
    const ALL: [MsaaLevel; 7] = [
        Self::Disabled,
        Self::X2,
        Self::X4,
        Self::X8,
        Self::X16,
        Self::X32,
        Self::X64,
    ];

    /// Samples per pixel
    pub fn samples(self) -> u32 {
        match self {
            Self::Disabled => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X16 => 16,
            Self::X32 => 32,
            Self::X64 => 64,
        }
    }

    /// Level with exactly `samples` samples per pixel
    pub fn from_samples(samples: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.samples() == samples)
    }

    /// Whether more than one sample is taken
    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }

    /// Matching Vulkan sample count flag
    pub fn sample_count(self) -> vk::SampleCountFlags {
        match self {
            Self::Disabled => vk::SampleCountFlags::TYPE_1,
            Self::X2 => vk::SampleCountFlags::TYPE_2,
            Self::X4 => vk::SampleCountFlags::TYPE_4,
            Self::X8 => vk::SampleCountFlags::TYPE_8,
            Self::X16 => vk::SampleCountFlags::TYPE_16,
            Self::X32 => vk::SampleCountFlags::TYPE_32,
            Self::X64 => vk::SampleCountFlags::TYPE_64,
        }
    }

    /// Next level up, wrapping to [`MsaaLevel::Disabled`] past `max`
    pub fn cycle(self, max: MsaaLevel) -> Self {
        let next = Self::ALL
            .iter()
            .position(|&level| level == self)
            .and_then(|index| Self::ALL.get(index + 1))
            .copied()
            .unwrap_or(Self::Disabled);

        if next > max {
            Self::Disabled
        } else {
            next
        }
    }

    /// Clamp to `max`
    pub fn clamp_to(self, max: MsaaLevel) -> Self {
        self.min(max)
    }
}

/// Highest level both color and depth attachments support, optionally capped
pub fn max_usable_msaa(
    color_counts: vk::SampleCountFlags,
    depth_counts: vk::SampleCountFlags,
    cap: Option<u32>,
) -> MsaaLevel {
    let counts = color_counts & depth_counts;
    MsaaLevel::ALL
        .into_iter()
        .rev()
        .filter(|level| cap.map_or(true, |cap| level.samples() <= cap))
        .find(|level| counts.contains(level.sample_count()))
        .unwrap_or(MsaaLevel::Disabled)
}

/// How textures sample between mip levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MipmapMode {
    /// Base level only, no mip chain is generated
    Disabled,
    /// Nearest mip level
    Nearest,
    /// Blend between mip levels
    Linear,
}

impl MipmapMode {
    /// Disabled, Nearest, Linear, then back to Disabled
    pub fn cycle(self) -> Self {
        match self {
            Self::Disabled => Self::Nearest,
            Self::Nearest => Self::Linear,
            Self::Linear => Self::Disabled,
        }
    }

    /// Whether textures get a mip chain
    pub fn is_enabled(self) -> bool {
        self != Self::Disabled
    }

    /// Sampler mipmap mode
    pub fn sampler_mode(self) -> vk::SamplerMipmapMode {
        match self {
            Self::Linear => vk::SamplerMipmapMode::LINEAR,
            Self::Disabled | Self::Nearest => vk::SamplerMipmapMode::NEAREST,
        }
    }
}

/// Current graphics settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphicsSettings {
    /// Texture mipmapping
    pub mipmaps: MipmapMode,
    /// Anti-aliasing level
    pub msaa: MsaaLevel,
    /// Per-sample fragment shading while MSAA is on
    pub sample_shading: bool,
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            mipmaps: MipmapMode::Linear,
            msaa: MsaaLevel::Disabled,
            sample_shading: false,
        }
    }
}

/// A requested settings change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingChange {
    /// Advance the mipmap mode
    CycleMipmaps,
    /// Advance the MSAA level, wrapping past the device maximum
    CycleMsaa,
    /// Flip sample shading
    ToggleSampleShading,
}

impl GraphicsSettings {
    /// Settings after `change`, given the highest usable MSAA level
    pub fn apply(self, change: SettingChange, max_msaa: MsaaLevel) -> Self {
        let mut next = self;
        match change {
            SettingChange::CycleMipmaps => next.mipmaps = self.mipmaps.cycle(),
            SettingChange::CycleMsaa => next.msaa = self.msaa.cycle(max_msaa),
            SettingChange::ToggleSampleShading => next.sample_shading = !self.sample_shading,
        }
        next
    }

    /// Whether the pipelines should enable sample shading
    pub fn sample_shading_active(&self, supported: bool) -> bool {
        self.sample_shading && supported && self.msaa.is_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msaa_cycle_walks_up_to_max() {
        let max = MsaaLevel::X8;
        let mut level = MsaaLevel::Disabled;
        let mut seen = Vec::new();
        for _ in 0..5 {
            level = level.cycle(max);
            seen.push(level);
        }
        assert_eq!(
            seen,
            vec![MsaaLevel::X2, MsaaLevel::X4, MsaaLevel::X8, MsaaLevel::Disabled, MsaaLevel::X2]
        );
    }

    #[test]
    fn test_msaa_cycle_wraps_at_hardware_maximum() {
        let max = max_usable_msaa(
            vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_2 | vk::SampleCountFlags::TYPE_4,
            vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_2 | vk::SampleCountFlags::TYPE_4,
            None,
        );
        assert_eq!(max, MsaaLevel::X4);

        let settings = GraphicsSettings {
            msaa: MsaaLevel::X4,
            ..GraphicsSettings::default()
        };
        let next = settings.apply(SettingChange::CycleMsaa, max);
        assert_eq!(next.msaa, MsaaLevel::Disabled);
    }

    #[test]
    fn test_msaa_cycle_from_top_level_wraps() {
        assert_eq!(MsaaLevel::X64.cycle(MsaaLevel::X64), MsaaLevel::Disabled);
    }

    #[test]
    fn test_max_usable_msaa_intersects_and_caps() {
        let color = vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_2
            | vk::SampleCountFlags::TYPE_4
            | vk::SampleCountFlags::TYPE_8;
        let depth = vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_2 | vk::SampleCountFlags::TYPE_4;

        assert_eq!(max_usable_msaa(color, depth, None), MsaaLevel::X4);
        assert_eq!(max_usable_msaa(color, color, Some(2)), MsaaLevel::X2);
        assert_eq!(max_usable_msaa(vk::SampleCountFlags::TYPE_1, color, None), MsaaLevel::Disabled);
    }

    #[test]
    fn test_mipmap_cycle() {
        assert_eq!(MipmapMode::Disabled.cycle(), MipmapMode::Nearest);
        assert_eq!(MipmapMode::Nearest.cycle(), MipmapMode::Linear);
        assert_eq!(MipmapMode::Linear.cycle(), MipmapMode::Disabled);
    }

    #[test]
    fn test_sample_shading_needs_msaa_and_support() {
        let mut settings = GraphicsSettings::default().apply(SettingChange::ToggleSampleShading, MsaaLevel::X4);
        assert!(settings.sample_shading);
        assert!(!settings.sample_shading_active(true));

        settings.msaa = MsaaLevel::X2;
        assert!(settings.sample_shading_active(true));
        assert!(!settings.sample_shading_active(false));
    }

    #[test]
    fn test_sample_count_round_trip() {
        assert_eq!(MsaaLevel::from_samples(16), Some(MsaaLevel::X16));
        assert_eq!(MsaaLevel::from_samples(3), None);
    }
}
