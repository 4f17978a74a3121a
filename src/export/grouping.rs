//! Partition a mesh's faces into (material, image) groups.
//!
//! Each group becomes one `Shape` with its own appearance. Groups are kept in
//! a `BTreeMap` keyed by material slot and image name, so the output order is
//! the same on every export of the same scene.

use crate::error::Result;
use crate::scene::{ImageId, MaterialAsset, MeshAsset, Scene};
use std::collections::BTreeMap;

/// Faces sharing one material slot and one effective image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceGroup {
    pub material_index: usize,
    pub image: Option<ImageId>,
    /// Face indices in original order.
    pub faces: Vec<usize>,
}

/// Per-slot material information needed to resolve face images.
#[derive(Debug, Clone)]
pub struct SlotInfo<'a> {
    pub material: Option<&'a MaterialAsset>,
    /// Image of the material's first image texture slot.
    pub image: Option<ImageId>,
    /// Faces take their image from the UV layer. Slots without a material
    /// always do.
    pub use_face_texture: bool,
}

/// Resolve every material slot of `mesh`.
pub fn slot_infos<'a>(scene: &'a Scene, mesh: &MeshAsset) -> Result<Vec<SlotInfo<'a>>> {
    mesh.material_slots()
        .into_iter()
        .map(|slot| {
            let material = slot.map(|id| scene.material(id)).transpose()?;
            Ok(SlotInfo {
                material,
                image: material.and_then(|m| m.image()),
                use_face_texture: material.map_or(true, |m| m.use_face_texture),
            })
        })
        .collect()
}

/// The image each face is shaded with.
pub fn face_images(mesh: &MeshAsset, slots: &[SlotInfo<'_>]) -> Vec<Option<ImageId>> {
    match &mesh.uv_layer {
        Some(uvs) if slots.iter().any(|s| s.use_face_texture) => mesh
            .faces
            .iter()
            .zip(uvs)
            .map(|(face, fuv)| {
                let slot = &slots[mesh.face_slot(face)];
                if slot.use_face_texture && fuv.use_image {
                    fuv.image
                } else {
                    slot.image
                }
            })
            .collect(),
        _ if slots.iter().any(|s| s.image.is_some()) => mesh
            .faces
            .iter()
            .map(|face| slots[mesh.face_slot(face)].image)
            .collect(),
        _ => vec![None; mesh.faces.len()],
    }
}

/// Group the faces of `mesh` by material slot and effective image.
///
/// Every face lands in exactly one group; empty groups are never returned.
/// Groups are ordered by material slot, then image name, with "no image"
/// first.
pub fn group_faces(scene: &Scene, mesh: &MeshAsset) -> Result<Vec<FaceGroup>> {
    let slots = slot_infos(scene, mesh)?;
    let images = face_images(mesh, &slots);

    let mut groups: BTreeMap<(usize, String, Option<ImageId>), Vec<usize>> = BTreeMap::new();
    for (i, (face, image)) in mesh.faces.iter().zip(&images).enumerate() {
        let image_name = match image {
            Some(id) => scene.image(*id)?.name.clone(),
            None => String::new(),
        };
        groups
            .entry((mesh.face_slot(face), image_name, *image))
            .or_default()
            .push(i);
    }

    Ok(groups
        .into_iter()
        .filter(|(_, faces)| !faces.is_empty())
        .map(|((material_index, _, image), faces)| FaceGroup {
            material_index,
            image,
            faces,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::scene::{Face, FaceUv, ImageAsset, MaterialAsset, Texture, TextureSlot};

    fn quad_strip(faces: usize) -> MeshAsset {
        let mut mesh = MeshAsset::new("Strip");
        for i in 0..=faces {
            mesh.add_vertex([i as f32, 0.0, 0.0], [0.0, 0.0, 1.0]);
            mesh.add_vertex([i as f32, 1.0, 0.0], [0.0, 0.0, 1.0]);
        }
        for i in 0..faces as u32 {
            mesh.add_face(Face::quad(2 * i, 2 * i + 2, 2 * i + 3, 2 * i + 1));
        }
        mesh
    }

    fn all_faces(groups: &[FaceGroup]) -> Vec<usize> {
        let mut faces: Vec<usize> = groups.iter().flat_map(|g| g.faces.clone()).collect();
        faces.sort();
        faces
    }

    #[test]
    fn test_single_group_without_materials() {
        let scene = Scene::new();
        let mesh = quad_strip(3);
        let groups = group_faces(&scene, &mesh).unwrap();
        assert_eq!(
            groups,
            vec![FaceGroup {
                material_index: 0,
                image: None,
                faces: vec![0, 1, 2]
            }]
        );
    }

    #[test]
    fn test_groups_by_material_slot_in_order() {
        let mut scene = Scene::new();
        let red = scene.add_material(MaterialAsset::new("Red"));
        let blue = scene.add_material(MaterialAsset::new("Blue"));
        let mut mesh = quad_strip(4).with_materials(vec![Some(red), Some(blue)]);
        mesh.faces[0].material_index = 1;
        mesh.faces[2].material_index = 1;

        let groups = group_faces(&scene, &mesh).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].material_index, 0);
        assert_eq!(groups[0].faces, vec![1, 3]);
        assert_eq!(groups[1].material_index, 1);
        assert_eq!(groups[1].faces, vec![0, 2]);
        assert_eq!(all_faces(&groups), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_face_images_sorted_by_name() {
        let mut scene = Scene::new();
        let zebra = scene.add_image(ImageAsset::new("zebra.png", "/tex/zebra.png"));
        let apple = scene.add_image(ImageAsset::new("apple.png", "/tex/apple.png"));
        let mut mesh = quad_strip(3);
        mesh.uv_layer = Some(vec![
            FaceUv::new(vec![[0.0, 0.0]; 4]).with_image(zebra),
            FaceUv::new(vec![[0.0, 0.0]; 4]),
            FaceUv::new(vec![[0.0, 0.0]; 4]).with_image(apple),
        ]);

        let groups = group_faces(&scene, &mesh).unwrap();
        let keys: Vec<_> = groups.iter().map(|g| g.image).collect();
        assert_eq!(keys, vec![None, Some(apple), Some(zebra)]);
        assert_eq!(groups[0].faces, vec![1]);
        assert_eq!(all_faces(&groups), vec![0, 1, 2]);
    }

    #[test]
    fn test_face_image_ignored_without_use_image() {
        let mut scene = Scene::new();
        let img = scene.add_image(ImageAsset::new("a.png", "/tex/a.png"));
        let mut mesh = quad_strip(1);
        let mut fuv = FaceUv::new(vec![[0.0, 0.0]; 4]).with_image(img);
        fuv.use_image = false;
        mesh.uv_layer = Some(vec![fuv]);

        let groups = group_faces(&scene, &mesh).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].image, None);
    }

    #[test]
    fn test_material_texture_used_when_face_textures_off() {
        let mut scene = Scene::new();
        let img = scene.add_image(ImageAsset::new("wood.png", "/tex/wood.png"));
        let other = scene.add_image(ImageAsset::new("other.png", "/tex/other.png"));
        let wood = scene.add_material(
            MaterialAsset::new("Wood").with_texture_slot(TextureSlot::new(Texture::image("W", img))),
        );
        let mut mesh = quad_strip(2).with_materials(vec![Some(wood)]);
        mesh.uv_layer = Some(vec![
            FaceUv::new(vec![[0.0, 0.0]; 4]).with_image(other),
            FaceUv::new(vec![[0.0, 0.0]; 4]),
        ]);

        let groups = group_faces(&scene, &mesh).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].image, Some(img));
        assert_eq!(groups[0].faces, vec![0, 1]);
    }

    #[test]
    fn test_face_texture_material_mixes_sources() {
        let mut scene = Scene::new();
        let img = scene.add_image(ImageAsset::new("base.png", "/tex/base.png"));
        let face_img = scene.add_image(ImageAsset::new("face.png", "/tex/face.png"));
        let mut mat = MaterialAsset::new("Mixed")
            .with_texture_slot(TextureSlot::new(Texture::image("B", img)));
        mat.use_face_texture = true;
        let mat = scene.add_material(mat);
        let mut mesh = quad_strip(2).with_materials(vec![Some(mat)]);
        mesh.uv_layer = Some(vec![
            FaceUv::new(vec![[0.0, 0.0]; 4]).with_image(face_img),
            FaceUv::new(vec![[0.0, 0.0]; 4]),
        ]);

        let groups = group_faces(&scene, &mesh).unwrap();
        let keys: Vec<_> = groups.iter().map(|g| (g.image, g.faces.clone())).collect();
        assert_eq!(keys, vec![(Some(img), vec![1]), (Some(face_img), vec![0])]);
    }

    #[test]
    fn test_dangling_references_report_missing_asset() {
        let mut scene = Scene::new();
        let mesh = quad_strip(1).with_materials(vec![Some(crate::scene::MaterialId(9))]);
        assert!(matches!(group_faces(&scene, &mesh), Err(ExportError::MissingAsset(_))));

        let lost = scene.add_material(
            MaterialAsset::new("Lost").with_texture_slot(TextureSlot::new(Texture::image("L", ImageId(4)))),
        );
        let mesh = quad_strip(1).with_materials(vec![Some(lost)]);
        assert!(matches!(group_faces(&scene, &mesh), Err(ExportError::MissingAsset(_))));
    }
}
