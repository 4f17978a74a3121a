//! `ImageTexture` and `TextureTransform` nodes.

use super::cache::{AssetRef, Emission, ReferenceCache};
use super::format::{self, POSITION_DIGITS};
use super::names::clean_name;
use super::writer::{MarkupWriter, Tag};
use crate::scene::{ImageAsset, ImageId, TextureSlot};
use std::path::{Path, PathBuf};

/// Resolve an image path to an absolute path, joining relative paths onto the
/// export's base directory first. Relative base directories are taken from the
/// current working directory.
pub fn absolute_image_path(image: &ImageAsset, base_dir: Option<&Path>) -> PathBuf {
    let joined = match base_dir {
        Some(base) if image.filepath.is_relative() => base.join(&image.filepath),
        _ => image.filepath.clone(),
    };
    absolute(&joined)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Candidate locations for an image, in the order a viewer should try them:
/// relative to the output directory (only when the image lives below it),
/// the bare file name, then the absolute path.
pub fn image_urls(image: &ImageAsset, output_dir: Option<&Path>, base_dir: Option<&Path>) -> Vec<String> {
    let full = absolute_image_path(image, base_dir);
    let output_dir = output_dir.map(absolute);
    let mut urls = Vec::with_capacity(3);

    if let Some(relative) = output_dir.and_then(|dir| full.strip_prefix(&dir).ok().map(Path::to_path_buf)) {
        urls.push(relative.to_string_lossy().into_owned());
    }
    if let Some(name) = full.file_name() {
        urls.push(name.to_string_lossy().into_owned());
    }
    urls.push(full.to_string_lossy().into_owned());

    urls.into_iter().map(|u| u.replace('\\', "/")).collect()
}

/// Format candidate URLs as an X3D MFString.
pub fn mf_string(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Write an `ImageTexture` definition, or a `USE` when the image was already
/// written.
pub fn write_image_texture(
    w: &mut MarkupWriter,
    cache: &mut ReferenceCache,
    id: ImageId,
    image: &ImageAsset,
    output_dir: Option<&Path>,
    base_dir: Option<&Path>,
) {
    let def = cache.def_name(AssetRef::Image(id), clean_name(&image.name));
    if cache.try_emit(AssetRef::Image(id)) == Emission::AlreadyEmitted {
        w.empty(Tag::new("ImageTexture").attr("USE", def));
        return;
    }

    let urls = image_urls(image, output_dir, base_dir);
    w.empty(
        Tag::new("ImageTexture")
            .attr("DEF", def)
            .attr("url", mf_string(&urls)),
    );
}

/// Placement of a texture on a face group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureTransform {
    /// Tiled face image: scale by the tile counts.
    Tiles { x: u32, y: u32 },
    /// Placement from the material's texture slot.
    Placement {
        translation: [f32; 2],
        scale: [f32; 2],
        rotation: f32,
    },
}

impl TextureTransform {
    /// Transform for an image applied through per-face UV data; only tiled
    /// images need one.
    pub fn for_face_image(image: &ImageAsset) -> Option<Self> {
        image.use_tiles.then_some(TextureTransform::Tiles {
            x: image.tiles[0],
            y: image.tiles[1],
        })
    }

    /// Transform for an image bound through a material texture slot.
    pub fn for_slot(slot: &TextureSlot) -> Self {
        let texture = &slot.texture;
        let mut scale = [
            slot.scale[0] * texture.repeat[0] as f32,
            slot.scale[1] * texture.repeat[1] as f32,
        ];

        // Flipped sampling axes become a quarter turn.
        let rotation = if texture.flip_axis {
            scale = [scale[1], -scale[0]];
            -std::f32::consts::FRAC_PI_2
        } else {
            0.0
        };

        TextureTransform::Placement {
            translation: [slot.offset[0], slot.offset[1]],
            scale,
            rotation,
        }
    }

    pub fn write(&self, w: &mut MarkupWriter) {
        let tag = match self {
            TextureTransform::Tiles { x, y } => {
                Tag::new("TextureTransform").attr("scale", format!("{} {}", x, y))
            }
            TextureTransform::Placement {
                translation,
                scale,
                rotation,
            } => Tag::new("TextureTransform")
                .attr("translation", format::join_g(translation, POSITION_DIGITS))
                .attr("scale", format::join_g(scale, POSITION_DIGITS))
                .attr("rotation", format::fmt_g(*rotation, POSITION_DIGITS)),
        };
        w.empty(tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Texture;

    #[test]
    fn test_urls_inside_output_dir() {
        let image = ImageAsset::new("wood", "/project/out/textures/wood.png");
        let urls = image_urls(&image, Some(Path::new("/project/out")), None);
        assert_eq!(
            urls,
            vec![
                "textures/wood.png".to_string(),
                "wood.png".to_string(),
                "/project/out/textures/wood.png".to_string()
            ]
        );
    }

    #[test]
    fn test_urls_outside_output_dir() {
        let image = ImageAsset::new("wood", "/assets/wood.png");
        let urls = image_urls(&image, Some(Path::new("/project/out")), None);
        assert_eq!(urls, vec!["wood.png".to_string(), "/assets/wood.png".to_string()]);
    }

    #[test]
    fn test_relative_path_resolved_against_base() {
        let image = ImageAsset::new("wood", "tex/wood.png");
        let urls = image_urls(&image, Some(Path::new("/scene")), Some(Path::new("/scene")));
        assert_eq!(urls[0], "tex/wood.png");
        assert_eq!(urls[2], "/scene/tex/wood.png");
    }

    #[test]
    fn test_relative_base_dir_gives_absolute_url() {
        let cwd = std::env::current_dir().unwrap();
        let image = ImageAsset::new("wood", "tex/wood.png");
        let urls = image_urls(&image, None, Some(Path::new("scenes")));
        let expected = cwd.join("scenes").join("tex").join("wood.png");
        assert_eq!(
            urls,
            vec!["wood.png".to_string(), expected.to_string_lossy().replace('\\', "/")]
        );
        assert!(Path::new(&urls[1]).is_absolute());
    }

    #[test]
    fn test_no_dirs_still_gives_absolute_url() {
        let image = ImageAsset::new("wood", "tex/wood.png");
        let urls = image_urls(&image, None, None);
        assert_eq!(urls[0], "wood.png");
        assert!(Path::new(&urls[1]).is_absolute());
        assert!(urls[1].ends_with("tex/wood.png"));
    }

    #[test]
    fn test_relative_output_dir_matches_absolute_image() {
        let cwd = std::env::current_dir().unwrap();
        let image = ImageAsset::new("wood", cwd.join("out").join("tex").join("wood.png"));
        let urls = image_urls(&image, Some(Path::new("out")), None);
        assert_eq!(urls[0], "tex/wood.png");
        assert_eq!(urls.len(), 3);
    }

    #[test]
    fn test_sibling_prefix_is_not_a_subdirectory() {
        let image = ImageAsset::new("wood", "/project/output2/wood.png");
        let urls = image_urls(&image, Some(Path::new("/project/out")), None);
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_image_texture_def_then_use() {
        let image = ImageAsset::new("Wood Grain.png", "/assets/wood.png");
        let mut w = MarkupWriter::new();
        let mut cache = ReferenceCache::new();
        write_image_texture(&mut w, &mut cache, ImageId(0), &image, None, None);
        write_image_texture(&mut w, &mut cache, ImageId(0), &image, None, None);
        assert_eq!(
            w.as_str(),
            "<ImageTexture DEF=\"Wood_Grain_png\" url='\"wood.png\" \"/assets/wood.png\"' />\n\
             <ImageTexture USE=\"Wood_Grain_png\" />\n"
        );
    }

    #[test]
    fn test_tiles_transform() {
        let mut image = ImageAsset::new("t", "/t.png");
        assert_eq!(TextureTransform::for_face_image(&image), None);
        image.use_tiles = true;
        image.tiles = [2, 3];
        let mut w = MarkupWriter::new();
        TextureTransform::for_face_image(&image).unwrap().write(&mut w);
        assert_eq!(w.as_str(), "<TextureTransform scale=\"2 3\" />\n");
    }

    #[test]
    fn test_slot_transform_with_repeat() {
        let mut texture = Texture::image("T", ImageId(0));
        texture.repeat = [2, 4];
        let mut slot = TextureSlot::new(texture);
        slot.offset = [0.5, 0.25, 0.0];
        slot.scale = [1.5, 1.0, 1.0];

        assert_eq!(
            TextureTransform::for_slot(&slot),
            TextureTransform::Placement {
                translation: [0.5, 0.25],
                scale: [3.0, 4.0],
                rotation: 0.0
            }
        );
    }

    #[test]
    fn test_slot_transform_flip_axis() {
        let mut texture = Texture::image("T", ImageId(0));
        texture.flip_axis = true;
        let mut slot = TextureSlot::new(texture);
        slot.scale = [2.0, 3.0, 1.0];

        let mut w = MarkupWriter::new();
        TextureTransform::for_slot(&slot).write(&mut w);
        assert_eq!(
            w.as_str(),
            "<TextureTransform translation=\"0 0\" scale=\"3 -2\" rotation=\"-1.5708\" />\n"
        );
    }
}
