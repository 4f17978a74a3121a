//! Geometry nodes for one face group.
//!
//! Two layouts are supported, chosen once per export:
//!
//! - `IndexedFaceSet`: triangles and quads as stored. Positions and normals are
//!   shared by every group of a mesh (defined once, then referenced), while UVs
//!   and colors get their own per-corner/per-face arrays and index lists.
//! - `IndexedTriangleSet`: quads are split into two triangles and face corners
//!   are welded into output vertices, so a single index list addresses every
//!   attribute array.

use super::cache::{AssetRef, Emission, ReferenceCache};
use super::format::{self, POSITION_DIGITS, UV_DIGITS, VERTEX_COLOR_DIGITS};
use super::shader::{self, ShaderProgram};
use super::writer::{MarkupWriter, Tag};
use crate::error::Result;
use crate::scene::{MeshAsset, MeshId};
use std::collections::HashMap;

/// Which per-corner attributes distinguish output vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKeyMode {
    None,
    Uv,
    Color,
    UvAndColor,
}

impl VertexKeyMode {
    pub fn new(uv: bool, color: bool) -> Self {
        match (uv, color) {
            (false, false) => VertexKeyMode::None,
            (true, false) => VertexKeyMode::Uv,
            (false, true) => VertexKeyMode::Color,
            (true, true) => VertexKeyMode::UvAndColor,
        }
    }

    pub fn has_uv(&self) -> bool {
        matches!(self, VertexKeyMode::Uv | VertexKeyMode::UvAndColor)
    }

    pub fn has_color(&self) -> bool {
        matches!(self, VertexKeyMode::Color | VertexKeyMode::UvAndColor)
    }
}

/// Attribute values of one face corner, hashed by bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CornerKey {
    uv: Option<[u32; 2]>,
    color: Option<[u32; 3]>,
}

fn bits<const N: usize>(values: [f32; N]) -> [u32; N] {
    // +0.0 and -0.0 weld together
    values.map(|v| if v == 0.0 { 0 } else { v.to_bits() })
}

/// An output vertex of the triangle layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldedVertex {
    /// Index of the mesh vertex providing position and normal.
    pub source: u32,
    pub uv: Option<[f32; 2]>,
    pub color: Option<[f32; 3]>,
}

/// Welded vertices plus triangle indices into them.
#[derive(Debug, Clone, Default)]
pub struct TriangleSet {
    pub vertices: Vec<WeldedVertex>,
    /// Triangle indices (3 per triangle).
    pub indices: Vec<u32>,
}

impl TriangleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, vertex: WeldedVertex) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        index
    }

    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Add a triangle, or a quad as the fan (0, 1, 2) + (0, 2, 3).
    pub fn add_polygon(&mut self, corners: &[u32]) {
        match *corners {
            [a, b, c] => self.add_triangle(a, b, c),
            [a, b, c, d] => {
                self.add_triangle(a, b, c);
                self.add_triangle(a, c, d);
            }
            _ => {}
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Triangulate `faces` of `mesh`, welding corners that share a mesh vertex and
/// the same active attribute values.
pub fn weld_triangles(mesh: &MeshAsset, faces: &[usize], mode: VertexKeyMode) -> TriangleSet {
    let mut set = TriangleSet::new();
    let mut welded: HashMap<(u32, CornerKey), u32> = HashMap::new();
    let mut corners = Vec::with_capacity(4);

    for &fi in faces {
        let face = &mesh.faces[fi];
        corners.clear();

        for (ci, &v) in face.vertices.iter().enumerate() {
            let uv = mode
                .has_uv()
                .then(|| mesh.uv_layer.as_ref().map(|l| l[fi].uv[ci]))
                .flatten();
            let color = mode
                .has_color()
                .then(|| mesh.color_layer.as_ref().map(|l| l[fi].0[ci]))
                .flatten();
            let key = CornerKey {
                uv: uv.map(bits),
                color: color.map(bits),
            };

            let index = *welded.entry((v, key)).or_insert_with(|| {
                set.vertices.push(WeldedVertex { source: v, uv, color });
                set.vertices.len() as u32 - 1
            });
            corners.push(index);
        }

        set.add_polygon(&corners);
    }

    set
}

/// Index lists and per-corner arrays of the polygon layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceSet {
    /// Mesh vertex indices, `-1` after each face.
    pub coord_index: Vec<i32>,
    /// Sequential corner indices, `-1` after each face (only with UVs).
    pub tex_coord_index: Vec<i32>,
    /// One UV per face corner.
    pub uvs: Vec<[f32; 2]>,
    /// One color per face.
    pub colors: Vec<[f32; 3]>,
}

/// Build the polygon layout for `faces` of `mesh`.
pub fn build_face_set(mesh: &MeshAsset, faces: &[usize], with_uv: bool, with_color: bool) -> FaceSet {
    let mut set = FaceSet::default();
    let uv_layer = mesh.uv_layer.as_ref().filter(|_| with_uv);
    let color_layer = mesh.color_layer.as_ref().filter(|_| with_color);
    let mut corner = 0i32;

    for &fi in faces {
        let face = &mesh.faces[fi];
        set.coord_index.extend(face.vertices.iter().map(|&v| v as i32));
        set.coord_index.push(-1);

        if let Some(uvs) = uv_layer {
            for uv in &uvs[fi].uv {
                set.tex_coord_index.push(corner);
                set.uvs.push(*uv);
                corner += 1;
            }
            set.tex_coord_index.push(-1);
        }

        if let Some(colors) = color_layer {
            // Per-face coloring takes the first corner's color.
            if let Some(first) = colors[fi].0.first() {
                set.colors.push(*first);
            }
        }
    }

    set
}

/// Everything the geometry writers need to know about one face group.
pub struct GeometryContext<'a> {
    pub mesh_id: MeshId,
    pub mesh: &'a MeshAsset,
    /// Cleaned mesh name the Coordinate and Normal DEF identifiers are built
    /// from.
    pub mesh_def: &'a str,
    pub smooth: bool,
    pub uv: bool,
    pub color: bool,
    pub normals: bool,
    /// Shader program of the group's appearance (H3D profile).
    pub shader: Option<&'a ShaderProgram>,
}

impl GeometryContext<'_> {
    fn common_attrs(&self, tag: Tag) -> Tag {
        // Double-sided meshes must not be back-face culled, so they are the
        // ones written with solid="false".
        tag.attr("solid", if self.mesh.double_sided { "false" } else { "true" })
            .attr_opt(
                "creaseAngle",
                self.smooth
                    .then(|| format::fmt_g(self.mesh.auto_smooth_angle, 4)),
            )
            .attr_opt("normalPerVertex", self.normals.then(|| "true".to_string()))
    }
}

fn positions(mesh: &MeshAsset, sources: impl Iterator<Item = u32>) -> String {
    let mut out = String::new();
    for v in sources {
        format::push_tuples(&mut out, &[mesh.vertices[v as usize].position], POSITION_DIGITS);
    }
    out
}

fn normals(mesh: &MeshAsset, sources: impl Iterator<Item = u32>) -> String {
    let mut out = String::new();
    for v in sources {
        format::push_tuples(&mut out, &[mesh.vertices[v as usize].normal], POSITION_DIGITS);
    }
    out
}

fn colors(values: &[[f32; 3]]) -> String {
    let clamped: Vec<[f32; 3]> = values.iter().map(|c| format::clamp_color(*c)).collect();
    let mut out = String::new();
    format::push_tuples(&mut out, &clamped, VERTEX_COLOR_DIGITS);
    out
}

/// Write an `IndexedFaceSet` for `faces`.
pub fn write_indexed_face_set(
    w: &mut MarkupWriter,
    cache: &mut ReferenceCache,
    ctx: &GeometryContext<'_>,
    faces: &[usize],
) {
    let set = build_face_set(ctx.mesh, faces, ctx.uv, ctx.color);

    let mut tag = ctx.common_attrs(Tag::new("IndexedFaceSet"));
    if ctx.color {
        tag = tag.attr("colorPerVertex", "false");
    }
    if ctx.uv {
        let mut index = String::new();
        format::push_indices(&mut index, &set.tex_coord_index);
        tag = tag.attr("texCoordIndex", index);
    }
    let mut coord_index = String::new();
    format::push_indices(&mut coord_index, &set.coord_index);
    w.start(tag.attr("coordIndex", coord_index));

    let all_vertices = || 0..ctx.mesh.vertices.len() as u32;
    let coord_def = cache.def_name(AssetRef::Coordinates(ctx.mesh_id), format!("coord_{}", ctx.mesh_def));
    let normals_def = ctx
        .normals
        .then(|| cache.def_name(AssetRef::Normals(ctx.mesh_id), format!("normals_{}", ctx.mesh_def)));
    match cache.try_emit(AssetRef::Coordinates(ctx.mesh_id)) {
        Emission::First => {
            w.empty(
                Tag::new("Coordinate")
                    .attr("DEF", coord_def)
                    .attr("point", positions(ctx.mesh, all_vertices())),
            );
            if let Some(def) = normals_def {
                w.empty(
                    Tag::new("Normal")
                        .attr("DEF", def)
                        .attr("vector", normals(ctx.mesh, all_vertices())),
                );
            }
        }
        Emission::AlreadyEmitted => {
            w.empty(Tag::new("Coordinate").attr("USE", coord_def));
            if let Some(def) = normals_def {
                w.empty(Tag::new("Normal").attr("USE", def));
            }
        }
    }

    if ctx.uv {
        let mut points = String::new();
        format::push_tuples(&mut points, &set.uvs, UV_DIGITS);
        w.empty(Tag::new("TextureCoordinate").attr("point", points));
    }
    if ctx.color {
        w.empty(Tag::new("Color").attr("color", colors(&set.colors)));
    }

    w.end("IndexedFaceSet");
}

/// Write an `IndexedTriangleSet` for `faces`.
pub fn write_indexed_triangle_set(
    w: &mut MarkupWriter,
    ctx: &GeometryContext<'_>,
    faces: &[usize],
) -> Result<()> {
    let mode = VertexKeyMode::new(ctx.uv, ctx.color);
    let set = weld_triangles(ctx.mesh, faces, mode);

    let mut index = String::with_capacity(set.indices.len() * 4);
    for tri in set.indices.chunks(3) {
        for i in tri {
            index.push_str(&i.to_string());
            index.push(' ');
        }
    }
    w.start(ctx.common_attrs(Tag::new("IndexedTriangleSet")).attr("index", index));

    let sources = || set.vertices.iter().map(|v| v.source);
    w.empty(Tag::new("Coordinate").attr("point", positions(ctx.mesh, sources())));
    if ctx.normals {
        w.empty(Tag::new("Normal").attr("vector", normals(ctx.mesh, sources())));
    }

    if mode.has_uv() {
        let uvs: Vec<[f32; 2]> = set.vertices.iter().filter_map(|v| v.uv).collect();
        let mut points = String::new();
        format::push_tuples(&mut points, &uvs, UV_DIGITS);
        w.empty(Tag::new("TextureCoordinate").attr("point", points));
    }
    if mode.has_color() {
        let cols: Vec<[f32; 3]> = set.vertices.iter().filter_map(|v| v.color).collect();
        w.empty(Tag::new("Color").attr("color", colors(&cols)));
    }

    if let Some(program) = ctx.shader {
        shader::write_vertex_attributes(w, program, &set)?;
    }

    w.end("IndexedTriangleSet");
    Ok(())
}
