//! Materials, textures and images.

use super::ImageId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Surface shading parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialAsset {
    pub name: String,
    #[serde(default = "default_diffuse")]
    pub diffuse_color: [f32; 3],
    #[serde(default = "white")]
    pub specular_color: [f32; 3],
    #[serde(default = "half")]
    pub specular_intensity: f32,
    /// Specular hardness, 1..=511.
    #[serde(default = "default_hardness")]
    pub specular_hardness: u32,
    /// Emission amount.
    #[serde(default)]
    pub emit: f32,
    /// Ambient light factor.
    #[serde(default = "one")]
    pub ambient: f32,
    #[serde(default = "one")]
    pub alpha: f32,
    /// Flat, unlit shading.
    #[serde(default)]
    pub shadeless: bool,
    /// Use the per-face image of the UV layer instead of the material's texture.
    #[serde(default)]
    pub use_face_texture: bool,
    /// Vertex colors tint this material.
    #[serde(default)]
    pub use_vertex_color_paint: bool,
    #[serde(default)]
    pub texture_slots: Vec<TextureSlot>,
}

fn default_diffuse() -> [f32; 3] {
    [0.8, 0.8, 0.8]
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn half() -> f32 {
    0.5
}

fn one() -> f32 {
    1.0
}

fn default_hardness() -> u32 {
    50
}

impl MaterialAsset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse_color: default_diffuse(),
            specular_color: white(),
            specular_intensity: half(),
            specular_hardness: default_hardness(),
            emit: 0.0,
            ambient: one(),
            alpha: one(),
            shadeless: false,
            use_face_texture: false,
            use_vertex_color_paint: false,
            texture_slots: Vec::new(),
        }
    }

    pub fn with_diffuse(mut self, color: [f32; 3]) -> Self {
        self.diffuse_color = color;
        self
    }

    pub fn with_texture_slot(mut self, slot: TextureSlot) -> Self {
        self.texture_slots.push(slot);
        self
    }

    /// The first texture slot whose texture is an image with an image set.
    pub fn image_slot(&self) -> Option<(&TextureSlot, ImageId)> {
        self.texture_slots.iter().find_map(|slot| match slot.texture.kind {
            TextureKind::Image { image: Some(image) } => Some((slot, image)),
            _ => None,
        })
    }

    /// Image bound through the material's texture slots.
    pub fn image(&self) -> Option<ImageId> {
        self.image_slot().map(|(_, image)| image)
    }
}

/// A texture bound to a material, with its placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureSlot {
    pub texture: Texture,
    #[serde(default)]
    pub offset: [f32; 3],
    #[serde(default = "white")]
    pub scale: [f32; 3],
}

impl TextureSlot {
    pub fn new(texture: Texture) -> Self {
        Self {
            texture,
            offset: [0.0; 3],
            scale: white(),
        }
    }
}

/// A texture datablock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    pub kind: TextureKind,
    /// Repeat counts along x and y.
    #[serde(default = "one_one")]
    pub repeat: [u32; 2],
    /// Swap the x and y sampling axes.
    #[serde(default)]
    pub flip_axis: bool,
}

fn one_one() -> [u32; 2] {
    [1, 1]
}

impl Texture {
    pub fn image(name: impl Into<String>, image: ImageId) -> Self {
        Self {
            name: name.into(),
            kind: TextureKind::Image { image: Some(image) },
            repeat: one_one(),
            flip_axis: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextureKind {
    Image {
        #[serde(default)]
        image: Option<ImageId>,
    },
    #[serde(other)]
    Procedural,
}

/// An image file referenced by textures or faces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    pub name: String,
    /// Absolute, or relative to the export's base directory.
    pub filepath: PathBuf,
    /// The image is tiled across face UVs.
    #[serde(default)]
    pub use_tiles: bool,
    #[serde(default = "one_one")]
    pub tiles: [u32; 2],
}

impl ImageAsset {
    pub fn new(name: impl Into<String>, filepath: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            filepath: filepath.into(),
            use_tiles: false,
            tiles: one_one(),
        }
    }
}
