//! World/environment settings.

use super::ImageId;
use serde::{Deserialize, Serialize};

/// Ambient light, mist and sky settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub name: String,
    #[serde(default)]
    pub ambient_color: [f32; 3],
    #[serde(default)]
    pub horizon_color: [f32; 3],
    #[serde(default)]
    pub zenith_color: [f32; 3],
    #[serde(default)]
    pub mist: MistSettings,
    #[serde(default)]
    pub sky: SkyBlend,
    /// Images used for the sides of the background box.
    #[serde(default)]
    pub sky_textures: Vec<SkyTexture>,
}

impl World {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient_color: [0.0; 3],
            horizon_color: [0.0; 3],
            zenith_color: [0.0; 3],
            mist: MistSettings::default(),
            sky: SkyBlend::default(),
            sky_textures: Vec::new(),
        }
    }

    /// Average ambient color scaled into a light's `ambientIntensity`.
    pub fn ambient_intensity(&self) -> f32 {
        let [r, g, b] = self.ambient_color;
        ((r + g + b) / 3.0) / 2.5
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MistSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub falloff: MistFalloff,
    /// Distance over which mist reaches full strength.
    #[serde(default)]
    pub depth: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MistFalloff {
    #[default]
    Quadratic,
    Linear,
    InverseQuadratic,
}

/// Sky blending flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkyBlend {
    /// Blend between horizon and zenith.
    #[serde(default)]
    pub blend: bool,
    /// Flatten the blend to the view.
    #[serde(default)]
    pub paper: bool,
    /// Blend relative to the real horizon.
    #[serde(default)]
    pub real: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkyTexture {
    pub side: SkySide,
    pub image: ImageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkySide {
    Back,
    Bottom,
    Front,
    Left,
    Right,
    Top,
}

impl SkySide {
    /// The Background field holding this side's URL.
    pub fn url_field(&self) -> &'static str {
        match self {
            SkySide::Back => "backUrl",
            SkySide::Bottom => "bottomUrl",
            SkySide::Front => "frontUrl",
            SkySide::Left => "leftUrl",
            SkySide::Right => "rightUrl",
            SkySide::Top => "topUrl",
        }
    }
}
