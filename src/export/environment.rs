//! Camera, light and world nodes.
//!
//! These are direct field mappings. DEF identifiers are chosen by the caller,
//! except the Background's, which comes from the export's [`SecureNamer`].

use super::cache::{AssetRef, ReferenceCache};
use super::format::{self, COLOR_DIGITS};
use super::names::SecureNamer;
use super::writer::{MarkupWriter, Tag};
use crate::scene::{
    neg_z_direction, Camera, Decomposed, Light, MistFalloff, Scene, SkyBlend, World,
};
use glam::Mat4;
use std::path::Path;

const LIGHT_DIGITS: usize = 4;

fn ambient_intensity(world: Option<&World>) -> f32 {
    world.map_or(0.0, World::ambient_intensity)
}

fn light_intensity(light: &Light) -> f32 {
    (light.energy / 1.75).min(1.0)
}

fn light_color(light: &Light) -> String {
    format::join_g(&format::clamp_color(light.color), LIGHT_DIGITS)
}

pub fn write_navigation_info(w: &mut MarkupWriter) {
    w.empty(
        Tag::new("NavigationInfo")
            .attr("headlight", "false")
            .attr("visibilityLimit", "0.0")
            .attr("type", "\"EXAMINE\",\"ANY\"")
            .attr("avatarSize", "0.25, 1.75, 0.75"),
    );
}

pub fn write_viewpoint(w: &mut MarkupWriter, def: &str, name: &str, matrix: &Mat4, camera: &Camera) {
    let d = Decomposed::from_matrix(matrix);
    w.empty(
        Tag::new("Viewpoint")
            .attr("DEF", def)
            .attr("description", name)
            .attr("centerOfRotation", "0 0 0")
            .attr("position", format::join_fixed(&d.translation.to_array(), 2))
            .attr("orientation", format::join_fixed(&d.rotation_values(), 2))
            .attr("fieldOfView", format::fmt_g(camera.angle, 3)),
    );
}

pub fn write_point_light(
    w: &mut MarkupWriter,
    def: &str,
    matrix: &Mat4,
    light: &Light,
    world: Option<&World>,
) {
    let location = matrix.w_axis.truncate();
    w.empty(
        Tag::new("PointLight")
            .attr("DEF", def)
            .attr("ambientIntensity", format::fmt_g(ambient_intensity(world), LIGHT_DIGITS))
            .attr("color", light_color(light))
            .attr("intensity", format::fmt_g(light_intensity(light), LIGHT_DIGITS))
            .attr("radius", format::fmt_g(light.distance, LIGHT_DIGITS))
            .attr("location", format::join_g(&location.to_array(), LIGHT_DIGITS)),
    );
}

pub fn write_spot_light(
    w: &mut MarkupWriter,
    def: &str,
    matrix: &Mat4,
    light: &Light,
    world: Option<&World>,
) {
    let beam_width = light.spot_size * 0.37;
    let cut_off_angle = beam_width * 1.3;
    let radius = light.distance * beam_width.cos();
    let direction = neg_z_direction(matrix);
    let location = matrix.w_axis.truncate();

    w.empty(
        Tag::new("SpotLight")
            .attr("DEF", def)
            .attr("radius", format::fmt_g(radius, LIGHT_DIGITS))
            .attr("ambientIntensity", format::fmt_g(ambient_intensity(world), LIGHT_DIGITS))
            .attr("intensity", format::fmt_g(light_intensity(light), LIGHT_DIGITS))
            .attr("color", light_color(light))
            .attr("beamWidth", format::fmt_g(beam_width, LIGHT_DIGITS))
            .attr("cutOffAngle", format::fmt_g(cut_off_angle, LIGHT_DIGITS))
            .attr("direction", format::join_g(&direction.to_array(), LIGHT_DIGITS))
            .attr("location", format::join_g(&location.to_array(), LIGHT_DIGITS)),
    );
}

pub fn write_directional_light(
    w: &mut MarkupWriter,
    def: &str,
    matrix: &Mat4,
    light: &Light,
    world: Option<&World>,
) {
    let direction = neg_z_direction(matrix);
    w.empty(
        Tag::new("DirectionalLight")
            .attr("DEF", def)
            .attr("ambientIntensity", format::fmt_g(ambient_intensity(world), LIGHT_DIGITS))
            .attr("color", light_color(light))
            .attr("intensity", format::fmt_g(light_intensity(light), LIGHT_DIGITS))
            .attr("direction", format::join_g(&direction.to_array(), LIGHT_DIGITS)),
    );
}

/// Write a `Fog` node when the world has mist enabled.
pub fn write_fog(w: &mut MarkupWriter, world: Option<&World>) {
    let Some(world) = world.filter(|w| w.mist.enabled) else {
        return;
    };

    let fog_type = match world.mist.falloff {
        MistFalloff::Linear => "LINEAR",
        MistFalloff::Quadratic | MistFalloff::InverseQuadratic => "EXPONENTIAL",
    };
    w.empty(
        Tag::new("Fog")
            .attr("fogType", fog_type)
            .attr("color", format::color(world.horizon_color))
            .attr("visibilityRange", format::fmt_g(world.mist.depth, COLOR_DIGITS)),
    );
}

/// Ground and sky gradients of a Background node.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyGradient {
    pub ground_color: String,
    pub ground_angle: Option<&'static str>,
    pub sky_color: String,
    pub sky_angle: Option<&'static str>,
}

impl SkyGradient {
    pub fn new(world: &World) -> Self {
        let ground = format::clamp_color(world.horizon_color);
        let sky = format::clamp_color(world.zenith_color);
        let mix: [f32; 3] = std::array::from_fn(|i| (ground[i] + sky[i]) / 2.0);
        let c = |rgb: [f32; 3]| format::join_g(&format::clamp_color(rgb), COLOR_DIGITS);

        let flat = |ground_rgb, sky_rgb| SkyGradient {
            ground_color: c(ground_rgb),
            ground_angle: None,
            sky_color: c(sky_rgb),
            sky_angle: None,
        };

        match world.sky {
            SkyBlend {
                blend: false,
                paper: false,
                real: false,
            } => flat(ground, ground),
            SkyBlend {
                blend: true,
                paper: false,
                real: false,
            } => SkyGradient {
                ground_color: format!("{}, {}", c(ground), c(mix)),
                ground_angle: Some("1.57, 1.57"),
                sky_color: format!("{}, {}", c(sky), c(mix)),
                sky_angle: Some("1.57, 1.57"),
            },
            SkyBlend {
                blend: true,
                paper: false,
                real: true,
            } => SkyGradient {
                ground_color: format!("{}, {}", c(sky), c(ground)),
                ground_angle: Some("1.57"),
                sky_color: format!("{}, {}, {}", c(sky), c(ground), c(sky)),
                sky_angle: Some("1.57, 3.14159"),
            },
            SkyBlend {
                blend: false,
                paper: false,
                real: true,
            } => flat(sky, sky),
            SkyBlend {
                blend: true,
                paper: true,
                real: true,
            } => SkyGradient {
                ground_color: format!("{}, {}", c(sky), c(ground)),
                ground_angle: Some("1.57, 1.57"),
                sky_color: format!("{}, {}", c(sky), c(ground)),
                sky_angle: Some("1.57, 1.57"),
            },
            _ => flat(ground, sky),
        }
    }
}

/// Write the world's `Background` node, including any side textures.
///
/// A side whose image is missing from the scene is left out.
pub fn write_background(
    w: &mut MarkupWriter,
    cache: &mut ReferenceCache,
    namer: &mut SecureNamer,
    scene: &Scene,
    world: Option<&World>,
    base_dir: Option<&Path>,
) {
    let Some(world) = world else {
        return;
    };

    let gradient = SkyGradient::new(world);
    let def = cache.def_name(AssetRef::Background, namer.secure_name(&world.name));
    let mut tag = Tag::new("Background")
        .attr("DEF", def)
        .attr("groundColor", gradient.ground_color)
        .attr_opt("groundAngle", gradient.ground_angle.map(String::from))
        .attr("skyColor", gradient.sky_color)
        .attr_opt("skyAngle", gradient.sky_angle.map(String::from));

    for sky_texture in &world.sky_textures {
        let image = match scene.image(sky_texture.image) {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!("Background '{}': skipping {:?} side: {}", world.name, sky_texture.side, err);
                continue;
            }
        };
        let path = super::texture::absolute_image_path(image, base_dir);
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tag = tag.attr(sky_texture.side.url_field(), basename);
    }

    w.empty(tag);
}
