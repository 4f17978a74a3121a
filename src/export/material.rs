//! Material to X3D `Material` node translation.

use super::cache::{AssetRef, Emission, ReferenceCache};
use super::format::{self, COLOR_DIGITS};
use super::names::clean_name_with_prefix;
use super::writer::{MarkupWriter, Tag};
use crate::scene::{MaterialAsset, MaterialId, World};

/// X3D lighting-model fields computed from a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialFields {
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub emissive: [f32; 3],
    pub ambient_intensity: f32,
    pub shininess: f32,
    pub transparency: f32,
}

impl MaterialFields {
    /// Translate `material`; the world's ambient color feeds the emissive term.
    /// Colors are clamped to `[0, 1]`.
    pub fn from_material(material: &MaterialAsset, world: Option<&World>) -> Self {
        let diffuse = material.diffuse_color;
        let ambient_term = match world {
            Some(world) => world.ambient_color.map(|c| c * material.ambient * 2.0),
            None => [0.0; 3],
        };

        let mut ambient_intensity = material.ambient / 3.0;
        let mut emissive: [f32; 3] =
            std::array::from_fn(|i| (diffuse[i] * material.emit + ambient_term[i]) / 2.0);
        let mut shininess = material.specular_hardness as f32 / 512.0;
        let mut specular = material
            .specular_color
            .map(|c| (c + 0.001) / (1.25 / (material.specular_intensity + 0.001)));
        let transparency = 1.0 - material.alpha;

        if material.shadeless {
            ambient_intensity = 1.0;
            shininess = 0.0;
            specular = diffuse;
            emissive = diffuse;
        }

        Self {
            diffuse: format::clamp_color(diffuse),
            specular: format::clamp_color(specular),
            emissive: format::clamp_color(emissive),
            ambient_intensity,
            shininess,
            transparency,
        }
    }
}

/// DEF identifier of a material's appearance node.
pub fn material_def(material: &MaterialAsset) -> String {
    format!("MA_{}", clean_name_with_prefix(&material.name, ""))
}

/// Write a `Material` definition, a `USE` of an earlier one, or an empty
/// default material when the face group has none.
pub fn write_material(
    w: &mut MarkupWriter,
    cache: &mut ReferenceCache,
    material: Option<(MaterialId, &MaterialAsset)>,
    world: Option<&World>,
) {
    let Some((id, material)) = material else {
        w.empty(Tag::new("Material"));
        return;
    };

    let def = cache.def_name(AssetRef::Material(id), material_def(material));
    if cache.try_emit(AssetRef::Material(id)) == Emission::AlreadyEmitted {
        w.empty(Tag::new("Material").attr("USE", def));
        return;
    }

    let fields = MaterialFields::from_material(material, world);
    w.empty(
        Tag::new("Material")
            .attr("DEF", def)
            .attr("diffuseColor", format::join_g(&fields.diffuse, COLOR_DIGITS))
            .attr("specularColor", format::join_g(&fields.specular, COLOR_DIGITS))
            .attr("emissiveColor", format::join_g(&fields.emissive, COLOR_DIGITS))
            .attr("ambientIntensity", format::fmt_g(fields.ambient_intensity, COLOR_DIGITS))
            .attr("shininess", format::fmt_g(fields.shininess, COLOR_DIGITS))
            .attr("transparency", fields.transparency.to_string()),
    );
}
