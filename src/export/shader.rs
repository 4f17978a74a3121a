//! Shader-program appearances for the H3D profile.
//!
//! In this profile every `Appearance` carries an empty `Material` followed by a
//! `ComposedShader`. The GLSL sources and the uniform/attribute layout come
//! from a [`ShaderProvider`]; uniforms are bound to scene values here, and the
//! sources are written next to the document under `shaders/`.

use super::cache::{AssetRef, Emission, ReferenceCache};
use super::format::{self, POSITION_DIGITS, UV_DIGITS};
use super::geometry::TriangleSet;
use super::names::clean_name_with_prefix;
use super::texture;
use super::writer::{MarkupWriter, Tag};
use crate::error::{ExportError, Result};
use crate::scene::{ImageId, MaterialAsset, MaterialId, ObjectData, Scene, SceneObject};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory (relative to the document) holding exported shader sources.
pub const SHADER_DIR: &str = "shaders";

/// Name given to the shader of faces without a material.
pub const DEFAULT_SHADER_NAME: &str = "X3D_DEFAULT_MAT";

/// Data layout of a uniform or vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderDataType {
    Int1,
    Float1,
    Float2,
    Float3,
    Float4,
    Float9,
    Float16,
    #[serde(rename = "ubyte4")]
    UByte4,
}

/// What a uniform is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UniformKind {
    /// An image texture sampler.
    #[serde(rename = "sampler_2d_image")]
    Sampler2DImage { image: ImageId },
    #[serde(rename = "sampler_2d_shadow")]
    Sampler2DShadow,
    #[serde(rename = "sampler_2d_buffer")]
    Sampler2DBuffer,
    /// World position of the named lamp object.
    LampPosition { lamp: String },
    /// Color times energy of the named lamp object.
    LampColor { lamp: String },
    /// World direction of the named lamp object.
    LampDirection { lamp: String },
    ObjectViewInverseMatrix,
    ObjectInverseMatrix,
    ObjectColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderUniform {
    pub varname: String,
    #[serde(flatten)]
    pub kind: UniformKind,
    pub datatype: ShaderDataType,
}

/// Mesh data feeding a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeSource {
    FaceUv,
    VertexColor,
    Orco,
    Tangent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderAttribute {
    pub varname: String,
    pub source: AttributeSource,
    pub datatype: ShaderDataType,
}

/// A compiled-for-export shader: GLSL sources plus their inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaderProgram {
    pub vertex: String,
    pub fragment: String,
    #[serde(default)]
    pub uniforms: Vec<ShaderUniform>,
    #[serde(default)]
    pub attributes: Vec<ShaderAttribute>,
}

/// Source of shader programs for materials.
///
/// `material` is `None` for faces without a material; the provider should
/// return its default program.
pub trait ShaderProvider {
    fn export_shader(&self, scene: &Scene, material: Option<&MaterialAsset>) -> Result<ShaderProgram>;
}

/// Shader programs prepared ahead of time, keyed by material name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShaderLibrary {
    /// Program for faces without a material and for unlisted materials.
    pub default: ShaderProgram,
    #[serde(default)]
    pub materials: BTreeMap<String, ShaderProgram>,
}

impl ShaderLibrary {
    pub fn new(default: ShaderProgram) -> Self {
        Self {
            default,
            materials: BTreeMap::new(),
        }
    }

    pub fn with_material(mut self, name: impl Into<String>, program: ShaderProgram) -> Self {
        self.materials.insert(name.into(), program);
        self
    }

    /// Parse a library from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ShaderProvider for ShaderLibrary {
    fn export_shader(&self, _scene: &Scene, material: Option<&MaterialAsset>) -> Result<ShaderProgram> {
        let program = material
            .and_then(|m| self.materials.get(&m.name))
            .unwrap_or(&self.default);
        Ok(program.clone())
    }
}

/// Scene state uniforms are bound against.
pub struct ShaderBinding<'a> {
    pub scene: &'a Scene,
    /// Axis conversion applied to every object matrix.
    pub global_matrix: Mat4,
    /// World matrix (global matrix applied) of the object being written.
    pub object_matrix: Mat4,
    /// Directory of the output document; shader files go below it.
    pub output_dir: Option<&'a Path>,
    pub base_dir: Option<&'a Path>,
}

impl ShaderBinding<'_> {
    fn lamp(&self, name: &str) -> Result<&SceneObject> {
        self.scene
            .object_by_name(name)
            .ok_or_else(|| ExportError::MissingAsset(format!("lamp object '{}'", name)))
    }

    fn lamp_matrix(&self, name: &str) -> Result<Mat4> {
        Ok(self.global_matrix * self.lamp(name)?.matrix)
    }

    fn shader_dir(&self) -> PathBuf {
        self.output_dir.unwrap_or(Path::new(".")).join(SHADER_DIR)
    }
}

fn expect_datatype(uniform: &ShaderUniform, allowed: &[ShaderDataType]) -> Result<()> {
    if allowed.contains(&uniform.datatype) {
        Ok(())
    } else {
        Err(ExportError::UnsupportedShaderData(format!(
            "uniform '{}' of {:?} has datatype {:?}",
            uniform.varname, uniform.kind, uniform.datatype
        )))
    }
}

fn field(uniform: &ShaderUniform, kind: &'static str, value: String) -> Tag {
    Tag::new("field")
        .attr("name", uniform.varname.clone())
        .attr("type", kind)
        .attr("accessType", "inputOutput")
        .attr("value", value)
}

/// Row-major matrix values, six decimals.
fn matrix_values(m: &Mat4) -> String {
    format::join_fixed(&m.transpose().to_cols_array(), 6)
}

fn vec3(v: Vec3) -> String {
    format::join_g(&v.to_array(), POSITION_DIGITS)
}

fn write_uniform(
    w: &mut MarkupWriter,
    cache: &mut ReferenceCache,
    binding: &ShaderBinding<'_>,
    uniform: &ShaderUniform,
) -> Result<()> {
    match &uniform.kind {
        UniformKind::Sampler2DImage { image } => {
            let asset = binding.scene.image(*image)?;
            w.start(
                Tag::new("field")
                    .attr("name", uniform.varname.clone())
                    .attr("type", "SFNode")
                    .attr("accessType", "inputOutput"),
            );
            texture::write_image_texture(w, cache, *image, asset, binding.output_dir, binding.base_dir);
            w.end("field");
        }
        UniformKind::LampPosition { lamp } => {
            expect_datatype(uniform, &[ShaderDataType::Float3])?;
            let position = binding.lamp_matrix(lamp)?.w_axis.truncate();
            w.empty(field(uniform, "SFVec3f", vec3(position)));
        }
        UniformKind::LampColor { lamp } => {
            expect_datatype(uniform, &[ShaderDataType::Float3, ShaderDataType::Float4])?;
            let ObjectData::Light(light) = &binding.lamp(lamp)?.data else {
                return Err(ExportError::MissingAsset(format!("'{}' is not a lamp", lamp)));
            };
            let color = vec3(Vec3::from_array(light.color) * light.energy);
            if uniform.datatype == ShaderDataType::Float4 {
                w.empty(field(uniform, "SFVec4f", format!("{} 1.0", color)));
            } else {
                w.empty(field(uniform, "SFVec3f", color));
            }
        }
        UniformKind::LampDirection { lamp } => {
            expect_datatype(uniform, &[ShaderDataType::Float3])?;
            let (_, rotation, _) = binding.lamp_matrix(lamp)?.to_scale_rotation_translation();
            let direction = (rotation * Vec3::Z).normalize_or_zero();
            w.empty(field(uniform, "SFVec3f", vec3(direction)));
        }
        UniformKind::ObjectViewInverseMatrix => {
            expect_datatype(uniform, &[ShaderDataType::Float16])?;
            // The view is not known at export time.
            w.empty(field(uniform, "SFMatrix4f", matrix_values(&Mat4::IDENTITY)));
        }
        UniformKind::ObjectInverseMatrix => {
            expect_datatype(uniform, &[ShaderDataType::Float16])?;
            let inverse = binding.object_matrix.inverse();
            w.empty(field(uniform, "SFMatrix4f", matrix_values(&inverse)));
        }
        UniformKind::Sampler2DShadow | UniformKind::Sampler2DBuffer | UniformKind::ObjectColor => {
            tracing::debug!(
                "Skipping uniform '{}' ({:?}): no X3D equivalent",
                uniform.varname,
                uniform.kind
            );
        }
    }
    Ok(())
}

/// Write the shader half of an H3D appearance: an empty `Material`, then the
/// program's `ComposedShader` (or a `USE` of it). The GLSL sources are written
/// to `<output_dir>/shaders/` the first time a program is defined.
pub fn write_shader_appearance(
    w: &mut MarkupWriter,
    cache: &mut ReferenceCache,
    binding: &ShaderBinding<'_>,
    material: Option<(MaterialId, &MaterialAsset)>,
    program: &ShaderProgram,
) -> Result<()> {
    w.empty(Tag::new("Material"));

    let (asset, base) = match material {
        Some((id, m)) => (AssetRef::Material(id), clean_name_with_prefix(&m.name, "")),
        None => (AssetRef::DefaultShader, DEFAULT_SHADER_NAME.to_string()),
    };
    let def = cache.def_name(asset, format!("MA_{}", base));
    // Shader files follow the DEF so renamed programs don't overwrite each other.
    let material_id = def.strip_prefix("MA_").unwrap_or(&def).to_string();

    if cache.try_emit(asset) == Emission::AlreadyEmitted {
        w.empty(Tag::new("ComposedShader").attr("USE", def));
        return Ok(());
    }

    w.start(
        Tag::new("ComposedShader")
            .attr("DEF", def)
            .attr("language", "GLSL"),
    );

    for uniform in &program.uniforms {
        write_uniform(w, cache, binding, uniform)?;
    }

    let frag_url = format!("{}/glsl_{}.frag", SHADER_DIR, material_id);
    let vert_url = format!("{}/glsl_{}.vert", SHADER_DIR, material_id);

    let dir = binding.shader_dir();
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(format!("glsl_{}.frag", material_id)), &program.fragment)?;
    fs::write(dir.join(format!("glsl_{}.vert", material_id)), &program.vertex)?;

    w.empty(Tag::new("ShaderPart").attr("type", "FRAGMENT").attr("url", frag_url));
    w.empty(Tag::new("ShaderPart").attr("type", "VERTEX").attr("url", vert_url));
    w.end("ComposedShader");
    Ok(())
}

/// Write the program's per-vertex attribute streams for a triangle set.
pub fn write_vertex_attributes(w: &mut MarkupWriter, program: &ShaderProgram, set: &TriangleSet) -> Result<()> {
    for attribute in &program.attributes {
        match (attribute.source, attribute.datatype) {
            (AttributeSource::FaceUv, ShaderDataType::Float2) => {
                let uvs: Vec<[f32; 2]> = set.vertices.iter().filter_map(|v| v.uv).collect();
                let mut value = String::new();
                format::push_tuples(&mut value, &uvs, UV_DIGITS);
                w.empty(
                    Tag::new("FloatVertexAttribute")
                        .attr("name", attribute.varname.clone())
                        .attr("numComponents", "2")
                        .attr("value", value),
                );
            }
            // H3D has no byte color attributes.
            (AttributeSource::VertexColor, ShaderDataType::UByte4) => {}
            (AttributeSource::FaceUv | AttributeSource::VertexColor, datatype) => {
                return Err(ExportError::UnsupportedShaderData(format!(
                    "attribute '{}' from {:?} has datatype {:?}",
                    attribute.varname, attribute.source, datatype
                )));
            }
            (AttributeSource::Orco | AttributeSource::Tangent, _) => {
                tracing::debug!("Skipping vertex attribute '{}' ({:?})", attribute.varname, attribute.source);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::geometry::WeldedVertex;
    use crate::scene::{ImageAsset, Light, LightKind};

    fn uniform(varname: &str, kind: UniformKind, datatype: ShaderDataType) -> ShaderUniform {
        ShaderUniform {
            varname: varname.to_string(),
            kind,
            datatype,
        }
    }

    fn lamp_scene() -> Scene {
        let mut scene = Scene::new();
        let mut light = Light::new(LightKind::Point);
        light.color = [1.0, 0.5, 0.25];
        light.energy = 2.0;
        scene.add_object(
            SceneObject::new("Lamp", ObjectData::Light(light))
                .with_matrix(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))),
        );
        scene
    }

    fn binding<'a>(scene: &'a Scene, dir: &'a Path) -> ShaderBinding<'a> {
        ShaderBinding {
            scene,
            global_matrix: Mat4::IDENTITY,
            object_matrix: Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)),
            output_dir: Some(dir),
            base_dir: None,
        }
    }

    #[test]
    fn test_lamp_uniforms() {
        let scene = lamp_scene();
        let dir = tempfile::tempdir().unwrap();
        let binding = binding(&scene, dir.path());
        let mut w = MarkupWriter::new();
        let mut cache = ReferenceCache::new();

        let lamp = || "Lamp".to_string();
        for u in [
            uniform("pos", UniformKind::LampPosition { lamp: lamp() }, ShaderDataType::Float3),
            uniform("col3", UniformKind::LampColor { lamp: lamp() }, ShaderDataType::Float3),
            uniform("col4", UniformKind::LampColor { lamp: lamp() }, ShaderDataType::Float4),
            uniform("dir", UniformKind::LampDirection { lamp: lamp() }, ShaderDataType::Float3),
        ] {
            write_uniform(&mut w, &mut cache, &binding, &u).unwrap();
        }
        let out = w.into_string();

        assert!(out.contains("name=\"pos\" type=\"SFVec3f\" accessType=\"inputOutput\" value=\"1 2 3\""));
        assert!(out.contains("name=\"col3\" type=\"SFVec3f\" accessType=\"inputOutput\" value=\"2 1 0.5\""));
        assert!(out.contains("name=\"col4\" type=\"SFVec4f\" accessType=\"inputOutput\" value=\"2 1 0.5 1.0\""));
        assert!(out.contains("name=\"dir\" type=\"SFVec3f\" accessType=\"inputOutput\" value=\"0 0 1\""));
    }

    #[test]
    fn test_matrix_uniforms() {
        let scene = Scene::new();
        let dir = tempfile::tempdir().unwrap();
        let binding = binding(&scene, dir.path());
        let mut w = MarkupWriter::new();
        let mut cache = ReferenceCache::new();

        write_uniform(
            &mut w,
            &mut cache,
            &binding,
            &uniform("inv", UniformKind::ObjectInverseMatrix, ShaderDataType::Float16),
        )
        .unwrap();
        let out = w.into_string();
        // Row-major: translation sits at the end of the first three rows.
        assert!(out.contains(
            "value=\"1.000000 0.000000 0.000000 0.000000 \
             0.000000 1.000000 0.000000 0.000000 \
             0.000000 0.000000 1.000000 -5.000000 \
             0.000000 0.000000 0.000000 1.000000\""
        ));
    }

    #[test]
    fn test_unsupported_uniforms_are_skipped() {
        let scene = Scene::new();
        let dir = tempfile::tempdir().unwrap();
        let binding = binding(&scene, dir.path());
        let mut w = MarkupWriter::new();
        let mut cache = ReferenceCache::new();
        write_uniform(
            &mut w,
            &mut cache,
            &binding,
            &uniform("shadow", UniformKind::Sampler2DShadow, ShaderDataType::Int1),
        )
        .unwrap();
        assert!(w.as_str().is_empty());
    }

    #[test]
    fn test_wrong_datatype_is_an_error() {
        let scene = lamp_scene();
        let dir = tempfile::tempdir().unwrap();
        let binding = binding(&scene, dir.path());
        let mut w = MarkupWriter::new();
        let mut cache = ReferenceCache::new();
        let result = write_uniform(
            &mut w,
            &mut cache,
            &binding,
            &uniform("pos", UniformKind::LampPosition { lamp: "Lamp".into() }, ShaderDataType::Float4),
        );
        assert!(matches!(result, Err(ExportError::UnsupportedShaderData(_))));

        let result = write_uniform(
            &mut w,
            &mut cache,
            &binding,
            &uniform("pos", UniformKind::LampPosition { lamp: "Nope".into() }, ShaderDataType::Float3),
        );
        assert!(matches!(result, Err(ExportError::MissingAsset(_))));
    }

    #[test]
    fn test_composed_shader_writes_files_once() {
        let mut scene = Scene::new();
        let img = scene.add_image(ImageAsset::new("tex.png", "/tex/tex.png"));
        let material = MaterialAsset::new("Glossy.001");
        let program = ShaderProgram {
            vertex: "void main() {}".to_string(),
            fragment: "void main() { gl_FragColor = vec4(1.0); }".to_string(),
            uniforms: vec![uniform(
                "samp0",
                UniformKind::Sampler2DImage { image: img },
                ShaderDataType::Int1,
            )],
            attributes: Vec::new(),
        };

        let dir = tempfile::tempdir().unwrap();
        let binding = binding(&scene, dir.path());
        let mut w = MarkupWriter::new();
        let mut cache = ReferenceCache::new();
        let slot = Some((MaterialId(0), &material));
        write_shader_appearance(&mut w, &mut cache, &binding, slot, &program).unwrap();
        write_shader_appearance(&mut w, &mut cache, &binding, slot, &program).unwrap();
        let out = w.into_string();

        assert_eq!(out.matches("<Material />").count(), 2);
        assert!(out.contains("<ComposedShader DEF=\"MA_Glossy_001\" language=\"GLSL\">"));
        assert!(out.contains("<ComposedShader USE=\"MA_Glossy_001\" />"));
        assert!(out.contains("<field name=\"samp0\" type=\"SFNode\" accessType=\"inputOutput\">"));
        assert!(out.contains("\t<ImageTexture DEF=\"tex_png\""));
        assert!(out.contains("<ShaderPart type=\"FRAGMENT\" url=\"shaders/glsl_Glossy_001.frag\" />"));
        assert!(out.contains("<ShaderPart type=\"VERTEX\" url=\"shaders/glsl_Glossy_001.vert\" />"));

        let frag = fs::read_to_string(dir.path().join("shaders/glsl_Glossy_001.frag")).unwrap();
        assert_eq!(frag, program.fragment);
        assert!(dir.path().join("shaders/glsl_Glossy_001.vert").exists());
    }

    #[test]
    fn test_default_shader_for_missing_material() {
        let scene = Scene::new();
        let dir = tempfile::tempdir().unwrap();
        let binding = binding(&scene, dir.path());
        let mut w = MarkupWriter::new();
        let mut cache = ReferenceCache::new();
        write_shader_appearance(&mut w, &mut cache, &binding, None, &ShaderProgram::default()).unwrap();
        assert!(w.as_str().contains("DEF=\"MA_X3D_DEFAULT_MAT\""));
        assert!(dir.path().join("shaders/glsl_X3D_DEFAULT_MAT.frag").exists());
    }

    #[test]
    fn test_vertex_attributes() {
        let mut set = TriangleSet::new();
        for uv in [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]] {
            set.add_vertex(WeldedVertex {
                source: 0,
                uv: Some(uv),
                color: None,
            });
        }
        set.add_triangle(0, 1, 2);

        let mut program = ShaderProgram::default();
        program.attributes.push(ShaderAttribute {
            varname: "att0".to_string(),
            source: AttributeSource::FaceUv,
            datatype: ShaderDataType::Float2,
        });
        program.attributes.push(ShaderAttribute {
            varname: "att1".to_string(),
            source: AttributeSource::VertexColor,
            datatype: ShaderDataType::UByte4,
        });

        let mut w = MarkupWriter::new();
        write_vertex_attributes(&mut w, &program, &set).unwrap();
        assert_eq!(
            w.as_str(),
            "<FloatVertexAttribute name=\"att0\" numComponents=\"2\" value=\"0 0 1 0 1 1 \" />\n"
        );

        program.attributes[0].datatype = ShaderDataType::Float3;
        assert!(write_vertex_attributes(&mut w, &program, &set).is_err());
    }

    #[test]
    fn test_library_lookup() {
        let default = ShaderProgram {
            vertex: "default".to_string(),
            ..ShaderProgram::default()
        };
        let special = ShaderProgram {
            vertex: "special".to_string(),
            ..ShaderProgram::default()
        };
        let library = ShaderLibrary::new(default).with_material("Special", special);
        let scene = Scene::new();

        let program = library.export_shader(&scene, Some(&MaterialAsset::new("Special"))).unwrap();
        assert_eq!(program.vertex, "special");
        let program = library.export_shader(&scene, Some(&MaterialAsset::new("Other"))).unwrap();
        assert_eq!(program.vertex, "default");
        let program = library.export_shader(&scene, None).unwrap();
        assert_eq!(program.vertex, "default");
    }

    #[test]
    fn test_library_from_json() {
        let json = r#"{
            "default": {
                "vertex": "v",
                "fragment": "f",
                "uniforms": [
                    {"varname": "unflamp", "type": "lamp_color", "lamp": "Sun", "datatype": "float4"},
                    {"varname": "unfshadow", "type": "sampler_2d_shadow", "datatype": "int1"}
                ],
                "attributes": [
                    {"varname": "att0", "source": "face_uv", "datatype": "float2"}
                ]
            }
        }"#;
        let library = ShaderLibrary::from_json(json).unwrap();
        assert_eq!(library.default.uniforms.len(), 2);
        assert_eq!(
            library.default.uniforms[0].kind,
            UniformKind::LampColor { lamp: "Sun".to_string() }
        );
        assert_eq!(library.default.attributes[0].source, AttributeSource::FaceUv);
    }
}
