//! X3D document export.
//!
//! [`X3dExporter`] walks the scene's objects in order and writes one X3D
//! document. Meshes, materials and images are written once (`DEF`) and
//! referenced afterwards (`USE`); that bookkeeping lives in an
//! [`ExportSession`] created fresh for every export, so a scene can be
//! exported any number of times with identical output.

pub mod cache;
pub mod environment;
pub mod file;
pub mod format;
pub mod geometry;
pub mod grouping;
pub mod material;
pub mod names;
pub mod shader;
pub mod texture;
pub mod writer;

pub use cache::{AssetRef, Emission, ReferenceCache};
pub use file::{resolve_output_path, write_document, write_x3d_file};
pub use grouping::{group_faces, FaceGroup};
pub use names::{clean_name, SecureNamer};
pub use shader::{ShaderLibrary, ShaderProgram, ShaderProvider};

use crate::error::{ExportError, Result};
use crate::scene::{
    Decomposed, ImageId, LightKind, MaterialAsset, MaterialId, MeshAsset, MeshId, ObjectData,
    Scene, SceneObject,
};
use format::POSITION_DIGITS;
use geometry::GeometryContext;
use glam::Mat4;
use grouping::SlotInfo;
use shader::ShaderBinding;
use std::collections::HashMap;
use std::path::PathBuf;
use texture::TextureTransform;
use writer::{MarkupWriter, Tag};

/// Output profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Profile {
    /// Plain X3D 3.0 (Immersive profile) with fixed-function materials.
    #[default]
    Baseline,
    /// H3D API document with GLSL shader appearances.
    H3d,
}

/// Options controlling an export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Write `IndexedTriangleSet` (welded, triangulated) instead of
    /// `IndexedFaceSet`.
    pub triangulate: bool,
    /// Write per-vertex normals.
    pub normals: bool,
    pub profile: Profile,
    /// Export only selected objects.
    pub selection_only: bool,
    /// Directory the document is written to. Image URLs are made relative to
    /// it and shader sources are written below it.
    pub output_dir: Option<PathBuf>,
    /// Directory relative image paths are resolved against.
    pub base_dir: Option<PathBuf>,
    /// Premultiplied onto every object matrix (axis conversion).
    pub global_matrix: Mat4,
    /// Document file name recorded in the header.
    pub filename: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            triangulate: false,
            normals: false,
            profile: Profile::Baseline,
            selection_only: false,
            output_dir: None,
            base_dir: None,
            global_matrix: Mat4::IDENTITY,
            filename: None,
        }
    }
}

impl ExportOptions {
    pub fn with_triangulate(mut self, triangulate: bool) -> Self {
        self.triangulate = triangulate;
        self
    }

    pub fn with_normals(mut self, normals: bool) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_selection_only(mut self, selection_only: bool) -> Self {
        self.selection_only = selection_only;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_global_matrix(mut self, matrix: Mat4) -> Self {
        self.global_matrix = matrix;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Mutable state of one export.
#[derive(Debug, Default)]
pub struct ExportSession {
    pub writer: MarkupWriter,
    pub cache: ReferenceCache,
    pub namer: SecureNamer,
    /// Shader programs fetched so far, by material (`None` = no material).
    programs: HashMap<Option<MaterialId>, ShaderProgram>,
}

impl ExportSession {
    pub fn new(capacity: usize) -> Self {
        Self {
            writer: MarkupWriter::with_capacity(capacity),
            ..Self::default()
        }
    }
}

/// Billboard or collision node wrapped around a mesh's Transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    Halo,
    Billboard,
    NoCollision,
}

impl Wrapper {
    fn for_mesh(mesh: &MeshAsset) -> Option<Self> {
        let uvs = mesh.uv_layer.as_ref()?;
        if uvs.iter().any(|f| f.use_halo) {
            Some(Wrapper::Halo)
        } else if uvs.iter().any(|f| f.use_billboard) {
            Some(Wrapper::Billboard)
        } else if uvs.iter().any(|f| f.use_collision) {
            Some(Wrapper::NoCollision)
        } else {
            None
        }
    }

    fn tag(&self) -> Tag {
        match self {
            Wrapper::Halo => Tag::new("Billboard").attr("axisOfRotation", "0 0 0"),
            Wrapper::Billboard => Tag::new("Billboard").attr("axisOfRotation", "0 1 0"),
            Wrapper::NoCollision => Tag::new("Collision").attr("enabled", "false"),
        }
    }
}

/// Writes a [`Scene`] as an X3D document.
pub struct X3dExporter<'a> {
    scene: &'a Scene,
    options: &'a ExportOptions,
    shaders: Option<&'a dyn ShaderProvider>,
}

impl<'a> X3dExporter<'a> {
    pub fn new(scene: &'a Scene, options: &'a ExportOptions) -> Self {
        Self {
            scene,
            options,
            shaders: None,
        }
    }

    /// Supply shader programs; required by [`Profile::H3d`].
    pub fn with_shader_provider(mut self, provider: &'a dyn ShaderProvider) -> Self {
        self.shaders = Some(provider);
        self
    }

    fn estimated_size(&self) -> usize {
        let vertices: usize = self.scene.meshes.iter().map(|m| m.vertices.len()).sum();
        let faces: usize = self.scene.meshes.iter().map(|m| m.faces.len()).sum();
        4096 + vertices * 64 + faces * 48
    }

    /// Export the scene and return the document text.
    pub fn export(&self) -> Result<String> {
        if self.options.profile == Profile::H3d && self.shaders.is_none() {
            return Err(ExportError::Export(
                "the H3D profile needs a shader provider".to_string(),
            ));
        }

        tracing::info!(
            "Starting X3D export: {} objects, {} meshes",
            self.scene.objects.len(),
            self.scene.meshes.len()
        );

        let mut session = ExportSession::new(self.estimated_size());
        let world = self.scene.world.as_ref();

        self.write_header(&mut session.writer);
        environment::write_navigation_info(&mut session.writer);
        environment::write_background(
            &mut session.writer,
            &mut session.cache,
            &mut session.namer,
            self.scene,
            world,
            self.options.base_dir.as_deref(),
        );
        environment::write_fog(&mut session.writer, world);

        let mut written = 0usize;
        for (index, object) in self.scene.objects.iter().enumerate() {
            if !self.is_exported(object) {
                continue;
            }
            if self.write_object(&mut session, index, object)? {
                written += 1;
            }
        }

        self.write_footer(&mut session.writer);

        tracing::info!(
            "Finished X3D export: {} objects written, {} assets defined",
            written,
            session.cache.len()
        );
        Ok(session.writer.into_string())
    }

    fn is_exported(&self, object: &SceneObject) -> bool {
        object.visible && (!self.options.selection_only || object.selected)
    }

    fn write_header(&self, w: &mut MarkupWriter) {
        w.raw_line("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        match self.options.profile {
            Profile::H3d => w.start(
                Tag::new("X3D")
                    .attr("profile", "H3DAPI")
                    .attr("version", "1.4"),
            ),
            Profile::Baseline => {
                w.raw_line(
                    "<!DOCTYPE X3D PUBLIC \"ISO//Web3D//DTD X3D 3.0//EN\" \
                     \"http://www.web3d.org/specifications/x3d-3.0.dtd\">",
                );
                w.start(
                    Tag::new("X3D")
                        .attr("version", "3.0")
                        .attr("profile", "Immersive")
                        .attr("xmlns:xsd", "http://www.w3.org/2001/XMLSchema-instance")
                        .attr(
                            "xsd:noNamespaceSchemaLocation",
                            "http://www.web3d.org/specifications/x3d-3.0.xsd",
                        ),
                );
            }
        }

        w.start(Tag::new("head"));
        if let Some(filename) = &self.options.filename {
            w.empty(
                Tag::new("meta")
                    .attr("name", "filename")
                    .attr("content", filename.clone()),
            );
        }
        w.empty(
            Tag::new("meta")
                .attr("name", "generator")
                .attr("content", concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))),
        );
        w.empty(
            Tag::new("meta")
                .attr("name", "translator")
                .attr("content", concat!("X3D exporter v", env!("CARGO_PKG_VERSION"))),
        );
        w.end("head");
        w.start(Tag::new("Scene"));
    }

    fn write_footer(&self, w: &mut MarkupWriter) {
        w.end("Scene");
        w.end("X3D");
    }

    /// Write one object. Returns false when the object produced no nodes.
    fn write_object(&self, session: &mut ExportSession, index: usize, object: &SceneObject) -> Result<bool> {
        let matrix = self.options.global_matrix * object.matrix;
        let world = self.scene.world.as_ref();

        match &object.data {
            ObjectData::Camera(camera) => {
                let def = session.cache.def_name(AssetRef::Object(index), clean_name(&object.name));
                let w = &mut session.writer;
                environment::write_viewpoint(w, &def, &object.name, &matrix, camera);
            }
            ObjectData::Light(light) => {
                let def = session.cache.def_name(AssetRef::Object(index), clean_name(&object.name));
                let w = &mut session.writer;
                match light.kind {
                    LightKind::Point => {
                        environment::write_point_light(w, &def, &matrix, light, world)
                    }
                    LightKind::Spot => {
                        environment::write_spot_light(w, &def, &matrix, light, world)
                    }
                    LightKind::Sun | LightKind::Hemi | LightKind::Area | LightKind::Other => {
                        environment::write_directional_light(w, &def, &matrix, light, world)
                    }
                }
            }
            ObjectData::Mesh { mesh: id } => {
                let Some(mesh) = self.scene.mesh(*id) else {
                    tracing::debug!("Skipping '{}': mesh #{} does not exist", object.name, id.0);
                    return Ok(false);
                };
                return self.write_mesh_object(session, index, object, *id, mesh, &matrix);
            }
            ObjectData::Empty => {
                tracing::debug!("Skipping '{}': nothing to export", object.name);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn write_mesh_object(
        &self,
        session: &mut ExportSession,
        index: usize,
        object: &SceneObject,
        id: MeshId,
        mesh: &MeshAsset,
        matrix: &Mat4,
    ) -> Result<bool> {
        if mesh.is_empty() {
            tracing::debug!("Skipping '{}': mesh '{}' has no faces", object.name, mesh.name);
            return Ok(false);
        }
        mesh.validate()?;

        // Resolve materials and images before any node is opened, so a
        // dangling reference drops the whole object and nothing else.
        let resolved = grouping::slot_infos(self.scene, mesh)
            .and_then(|slots| Ok((group_faces(self.scene, mesh)?, slots)));
        let (groups, slots) = match resolved {
            Ok(resolved) => resolved,
            Err(ExportError::MissingAsset(what)) => {
                tracing::warn!("Skipping '{}': missing {}", object.name, what);
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        let wrapper = Wrapper::for_mesh(mesh);
        if let Some(wrapper) = wrapper {
            session.writer.start(wrapper.tag());
        }

        let d = Decomposed::from_matrix(matrix);
        let transform_def = session.cache.def_name(AssetRef::Object(index), clean_name(&object.name));
        session.writer.start(
            Tag::new("Transform")
                .attr("DEF", transform_def)
                .attr("translation", format::join_g(&d.translation.to_array(), POSITION_DIGITS))
                .attr("scale", format::join_g(&d.scale.to_array(), POSITION_DIGITS))
                .attr("rotation", format::join_g(&d.rotation_values(), POSITION_DIGITS)),
        );

        let mesh_def = clean_name(&mesh.name);
        let group_def = session.cache.def_name(AssetRef::Mesh(id), format!("G_{}", mesh_def));
        match session.cache.try_emit(AssetRef::Mesh(id)) {
            Emission::AlreadyEmitted => {
                session.writer.empty(Tag::new("Group").attr("USE", group_def));
            }
            Emission::First => {
                session.writer.start(Tag::new("Group").attr("DEF", group_def));

                let slot_ids = mesh.material_slots();
                for group in &groups {
                    let shape = ShapeContext {
                        mesh_id: id,
                        mesh,
                        mesh_def: &mesh_def,
                        slot: &slots[group.material_index],
                        material_id: slot_ids[group.material_index],
                        object_matrix: *matrix,
                    };
                    self.write_shape(session, &shape, group)?;
                }

                session.writer.end("Group");
            }
        }

        session.writer.end("Transform");
        if let Some(wrapper) = wrapper {
            session.writer.end(wrapper.tag().name());
        }
        Ok(true)
    }

    fn write_shape(&self, session: &mut ExportSession, shape: &ShapeContext<'_>, group: &FaceGroup) -> Result<()> {
        let mesh = shape.mesh;
        let material = shape.slot.material;
        let material_ref = shape.material_id.zip(material);

        let smooth = group.faces.iter().any(|&f| mesh.faces[f].smooth);
        let color = mesh.color_layer.is_some() && material.map_or(true, |m| m.use_vertex_color_paint);
        let uv = mesh.uv_layer.is_some();

        session.writer.start(Tag::new("Shape"));
        session.writer.start(Tag::new("Appearance"));

        let program = match self.options.profile {
            Profile::Baseline => {
                if let Some(image) = group.image {
                    self.write_texture(session, shape.slot, image)?;
                }
                material::write_material(
                    &mut session.writer,
                    &mut session.cache,
                    material_ref,
                    self.scene.world.as_ref(),
                );
                None
            }
            Profile::H3d => {
                let key = shape.material_id.filter(|_| material.is_some());
                if !session.programs.contains_key(&key) {
                    let provider = self.shaders.ok_or_else(|| {
                        ExportError::Export("the H3D profile needs a shader provider".to_string())
                    })?;
                    let program = provider.export_shader(self.scene, material)?;
                    session.programs.insert(key, program);
                }
                let program = &session.programs[&key];

                let binding = ShaderBinding {
                    scene: self.scene,
                    global_matrix: self.options.global_matrix,
                    object_matrix: shape.object_matrix,
                    output_dir: self.options.output_dir.as_deref(),
                    base_dir: self.options.base_dir.as_deref(),
                };
                shader::write_shader_appearance(
                    &mut session.writer,
                    &mut session.cache,
                    &binding,
                    material_ref,
                    program,
                )?;
                Some(program)
            }
        };

        session.writer.end("Appearance");

        let ctx = GeometryContext {
            mesh_id: shape.mesh_id,
            mesh,
            mesh_def: shape.mesh_def,
            smooth,
            uv,
            color,
            normals: self.options.normals,
            shader: program,
        };
        if self.options.triangulate {
            geometry::write_indexed_triangle_set(&mut session.writer, &ctx, &group.faces)?;
        } else {
            geometry::write_indexed_face_set(&mut session.writer, &mut session.cache, &ctx, &group.faces);
        }

        session.writer.end("Shape");
        Ok(())
    }

    fn write_texture(&self, session: &mut ExportSession, slot: &SlotInfo<'_>, image_id: ImageId) -> Result<()> {
        let image = self.scene.image(image_id)?;
        texture::write_image_texture(
            &mut session.writer,
            &mut session.cache,
            image_id,
            image,
            self.options.output_dir.as_deref(),
            self.options.base_dir.as_deref(),
        );

        let transform = if slot.use_face_texture {
            TextureTransform::for_face_image(image)
        } else {
            slot.material
                .and_then(MaterialAsset::image_slot)
                .map(|(texture_slot, _)| TextureTransform::for_slot(texture_slot))
        };
        if let Some(transform) = transform {
            transform.write(&mut session.writer);
        }
        Ok(())
    }
}

/// A face group's mesh and material slot.
struct ShapeContext<'a> {
    mesh_id: MeshId,
    mesh: &'a MeshAsset,
    mesh_def: &'a str,
    slot: &'a SlotInfo<'a>,
    material_id: Option<MaterialId>,
    object_matrix: Mat4,
}

/// Export `scene` with `options` using the baseline profile's needs (no
/// shader provider).
pub fn export_x3d(scene: &Scene, options: &ExportOptions) -> Result<String> {
    X3dExporter::new(scene, options).export()
}
