//! In-memory scene model consumed by the exporter.
//!
//! Assets (meshes, materials, images) live in flat tables on [`Scene`] and are
//! referenced by typed ids, so many objects can share one mesh and many faces
//! can share one material without any ownership between them. The exporter
//! only ever borrows a scene; nothing here records export state.

mod material;
mod mesh;
mod transform;
mod world;

pub use material::{ImageAsset, MaterialAsset, Texture, TextureKind, TextureSlot};
pub use mesh::{Face, FaceColors, FaceUv, MeshAsset, MeshVertex};
pub use transform::{neg_z_direction, Decomposed};
pub use world::{MistFalloff, MistSettings, SkyBlend, SkySide, SkyTexture, World};

use crate::error::{ExportError, Result};
use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Index of a mesh in [`Scene::meshes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshId(pub usize);

/// Index of a material in [`Scene::materials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub usize);

/// Index of an image in [`Scene::images`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub usize);

/// A complete scene ready for export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    /// Objects in export order.
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub meshes: Vec<MeshAsset>,
    #[serde(default)]
    pub materials: Vec<MaterialAsset>,
    #[serde(default)]
    pub images: Vec<ImageAsset>,
    /// World/environment settings (ambient light, mist, sky).
    #[serde(default)]
    pub world: Option<World>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a scene from its JSON description.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add a mesh and return its id.
    pub fn add_mesh(&mut self, mesh: MeshAsset) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    /// Add a material and return its id.
    pub fn add_material(&mut self, material: MaterialAsset) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Add an image and return its id.
    pub fn add_image(&mut self, image: ImageAsset) -> ImageId {
        self.images.push(image);
        ImageId(self.images.len() - 1)
    }

    /// Add an object to the end of the export order.
    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshAsset> {
        self.meshes.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Result<&MaterialAsset> {
        self.materials
            .get(id.0)
            .ok_or_else(|| ExportError::MissingAsset(format!("material #{}", id.0)))
    }

    pub fn image(&self, id: ImageId) -> Result<&ImageAsset> {
        self.images
            .get(id.0)
            .ok_or_else(|| ExportError::MissingAsset(format!("image #{}", id.0)))
    }

    /// Find an object by name (used to resolve lamps referenced from shaders).
    pub fn object_by_name(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }
}

/// An object placed in the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    /// World matrix (object and parent transforms already combined).
    #[serde(default = "identity")]
    pub matrix: Mat4,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub selected: bool,
    pub data: ObjectData,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

fn default_true() -> bool {
    true
}

impl SceneObject {
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            matrix: Mat4::IDENTITY,
            visible: true,
            selected: true,
            data,
        }
    }

    /// Create an object instancing a mesh.
    pub fn mesh(name: impl Into<String>, mesh: MeshId) -> Self {
        Self::new(name, ObjectData::Mesh { mesh })
    }

    pub fn with_matrix(mut self, matrix: Mat4) -> Self {
        self.matrix = matrix;
        self
    }
}

/// What an object carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectData {
    Camera(Camera),
    Light(Light),
    Mesh { mesh: MeshId },
    /// Objects with nothing to export (empties, armatures, ...).
    Empty,
}

/// Camera parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Camera {
    /// Field of view in radians.
    pub angle: f32,
}

/// Light parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    #[serde(default = "white")]
    pub color: [f32; 3],
    #[serde(default = "default_energy")]
    pub energy: f32,
    #[serde(default = "default_distance")]
    pub distance: f32,
    /// Spot cone angle in radians.
    #[serde(default = "default_spot_size")]
    pub spot_size: f32,
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_energy() -> f32 {
    1.0
}

fn default_distance() -> f32 {
    25.0
}

fn default_spot_size() -> f32 {
    45f32.to_radians()
}

impl Light {
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            color: white(),
            energy: default_energy(),
            distance: default_distance(),
            spot_size: default_spot_size(),
        }
    }
}

/// Light kinds. Anything that is not a point or spot light is exported as a
/// directional light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    Point,
    Spot,
    Sun,
    Hemi,
    Area,
    #[serde(other)]
    Other,
}
