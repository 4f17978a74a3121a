//! Mesh assets: vertices, faces and per-face-corner layers.

use super::{ImageId, MaterialId};
use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};

/// A mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshVertex {
    pub position: [f32; 3],
    #[serde(default = "up")]
    pub normal: [f32; 3],
}

fn up() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }
}

/// A triangle or quad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Vertex indices, 3 or 4 of them.
    pub vertices: Vec<u32>,
    #[serde(default)]
    pub smooth: bool,
    /// Index into the mesh's material slots.
    #[serde(default)]
    pub material_index: usize,
}

impl Face {
    pub fn tri(a: u32, b: u32, c: u32) -> Self {
        Self {
            vertices: vec![a, b, c],
            smooth: false,
            material_index: 0,
        }
    }

    pub fn quad(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self {
            vertices: vec![a, b, c, d],
            smooth: false,
            material_index: 0,
        }
    }

    pub fn with_material(mut self, material_index: usize) -> Self {
        self.material_index = material_index;
        self
    }

    pub fn with_smooth(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn corner_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Per-face data of the active UV layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceUv {
    /// One UV per face corner.
    pub uv: Vec<[f32; 2]>,
    /// Image assigned to this face.
    #[serde(default)]
    pub image: Option<ImageId>,
    #[serde(default)]
    pub use_image: bool,
    #[serde(default)]
    pub use_halo: bool,
    #[serde(default)]
    pub use_billboard: bool,
    #[serde(default)]
    pub use_collision: bool,
}

impl FaceUv {
    pub fn new(uv: Vec<[f32; 2]>) -> Self {
        Self {
            uv,
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: ImageId) -> Self {
        self.image = Some(image);
        self.use_image = true;
        self
    }
}

/// Per-face data of the active vertex-color layer: one RGB color per corner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceColors(pub Vec<[f32; 3]>);

/// A polygon mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshAsset {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub faces: Vec<Face>,
    /// Material slots. An empty list behaves like a single empty slot.
    #[serde(default)]
    pub materials: Vec<Option<MaterialId>>,
    /// Active UV layer, one entry per face.
    #[serde(default)]
    pub uv_layer: Option<Vec<FaceUv>>,
    /// Active vertex-color layer, one entry per face.
    #[serde(default)]
    pub color_layer: Option<Vec<FaceColors>>,
    #[serde(default)]
    pub double_sided: bool,
    /// Crease angle hint for smooth faces, in radians.
    #[serde(default = "default_auto_smooth_angle")]
    pub auto_smooth_angle: f32,
}

fn default_auto_smooth_angle() -> f32 {
    30f32.to_radians()
}

impl MeshAsset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertices: Vec::new(),
            faces: Vec::new(),
            materials: Vec::new(),
            uv_layer: None,
            color_layer: None,
            double_sided: false,
            auto_smooth_angle: default_auto_smooth_angle(),
        }
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, position: [f32; 3], normal: [f32; 3]) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(MeshVertex::new(position, normal));
        index
    }

    pub fn add_face(&mut self, face: Face) {
        self.faces.push(face);
    }

    pub fn with_materials(mut self, materials: Vec<Option<MaterialId>>) -> Self {
        self.materials = materials;
        self
    }

    /// Material slots with the "no material" slot filled in for meshes
    /// without any.
    pub fn material_slots(&self) -> Vec<Option<MaterialId>> {
        if self.materials.is_empty() {
            vec![None]
        } else {
            self.materials.clone()
        }
    }

    /// Number of usable material slots (at least one).
    pub fn slot_count(&self) -> usize {
        self.materials.len().max(1)
    }

    /// Material slot a face resolves to; out-of-range indices clamp to the
    /// last slot.
    pub fn face_slot(&self, face: &Face) -> usize {
        face.material_index.min(self.slot_count() - 1)
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Check that faces reference existing vertices and that every layer has
    /// one entry per face with one value per corner.
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len();
        for (i, face) in self.faces.iter().enumerate() {
            let corners = face.corner_count();
            if !(3..=4).contains(&corners) {
                return Err(ExportError::invalid_mesh(
                    &self.name,
                    format!("face {} has {} corners (expected 3 or 4)", i, corners),
                ));
            }
            if let Some(&v) = face.vertices.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(ExportError::invalid_mesh(
                    &self.name,
                    format!("face {} references vertex {} of {}", i, v, vertex_count),
                ));
            }
        }

        if let Some(uvs) = &self.uv_layer {
            if uvs.len() != self.faces.len() {
                return Err(ExportError::invalid_mesh(
                    &self.name,
                    format!("UV layer has {} faces, mesh has {}", uvs.len(), self.faces.len()),
                ));
            }
            for (i, (face, uv)) in self.faces.iter().zip(uvs).enumerate() {
                if uv.uv.len() != face.corner_count() {
                    return Err(ExportError::invalid_mesh(
                        &self.name,
                        format!("face {} has {} UVs for {} corners", i, uv.uv.len(), face.corner_count()),
                    ));
                }
            }
        }

        if let Some(colors) = &self.color_layer {
            if colors.len() != self.faces.len() {
                return Err(ExportError::invalid_mesh(
                    &self.name,
                    format!("color layer has {} faces, mesh has {}", colors.len(), self.faces.len()),
                ));
            }
            for (i, (face, col)) in self.faces.iter().zip(colors).enumerate() {
                if col.0.len() != face.corner_count() {
                    return Err(ExportError::invalid_mesh(
                        &self.name,
                        format!("face {} has {} colors for {} corners", i, col.0.len(), face.corner_count()),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshAsset {
        let mut mesh = MeshAsset::new("Tri");
        let a = mesh.add_vertex([0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        let b = mesh.add_vertex([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        let c = mesh.add_vertex([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]);
        mesh.add_face(Face::tri(a, b, c));
        mesh
    }

    #[test]
    fn test_valid_triangle() {
        assert!(triangle().validate().is_ok());
    }

    #[test]
    fn test_face_vertex_out_of_range() {
        let mut mesh = triangle();
        mesh.add_face(Face::tri(0, 1, 7));
        assert!(matches!(mesh.validate(), Err(ExportError::InvalidMesh { .. })));
    }

    #[test]
    fn test_pentagon_rejected() {
        let mut mesh = triangle();
        mesh.add_face(Face {
            vertices: vec![0, 1, 2, 0, 1],
            smooth: false,
            material_index: 0,
        });
        assert!(mesh.validate().is_err());
    }

    #[test]
    fn test_color_count_must_match_corners() {
        let mut mesh = triangle();
        mesh.color_layer = Some(vec![FaceColors(vec![[1.0, 0.0, 0.0]; 4])]);
        assert!(mesh.validate().is_err());

        mesh.color_layer = Some(vec![FaceColors(vec![[1.0, 0.0, 0.0]; 3])]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_empty_material_list_has_one_slot() {
        let mesh = triangle();
        assert_eq!(mesh.material_slots(), vec![None]);
        assert_eq!(mesh.face_slot(&Face::tri(0, 1, 2).with_material(5)), 0);
    }
}
