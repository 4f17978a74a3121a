//! Writing documents to disk, optionally gzip-compressed (`.x3dz`).

use super::{ExportOptions, ShaderProvider, X3dExporter};
use crate::error::Result;
use crate::scene::Scene;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// Force the `.x3d` or `.x3dz` extension onto `path`.
pub fn resolve_output_path(path: &Path, compress: bool) -> PathBuf {
    let ext = if compress { "x3dz" } else { "x3d" };
    if has_extension(path, ext) {
        path.to_path_buf()
    } else {
        path.with_extension(ext)
    }
}

/// Write document text to `path`, gzip-compressing it when the path ends in
/// `.x3dz`.
pub fn write_document(path: &Path, text: &str) -> Result<()> {
    if has_extension(path, "x3dz") {
        let file = BufWriter::new(File::create(path)?);
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(text.as_bytes())?;
        encoder.finish()?.flush()?;
    } else {
        fs::write(path, text)?;
    }
    Ok(())
}

/// Export `scene` to the file at `path` and return the path written.
///
/// The output directory and header file name default to those of `path`.
pub fn write_x3d_file(
    scene: &Scene,
    options: &ExportOptions,
    path: &Path,
    shaders: Option<&dyn ShaderProvider>,
) -> Result<PathBuf> {
    let mut options = options.clone();
    if options.output_dir.is_none() {
        options.output_dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf);
    }
    if options.filename.is_none() {
        options.filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
    }

    let mut exporter = X3dExporter::new(scene, &options);
    if let Some(provider) = shaders {
        exporter = exporter.with_shader_provider(provider);
    }
    let text = exporter.export()?;
    write_document(path, &text)?;

    tracing::info!("Wrote {} bytes of X3D to {}", text.len(), path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_resolve_output_path() {
        assert_eq!(resolve_output_path(Path::new("a/scene.blend"), false), PathBuf::from("a/scene.x3d"));
        assert_eq!(resolve_output_path(Path::new("scene.X3D"), false), PathBuf::from("scene.X3D"));
        assert_eq!(resolve_output_path(Path::new("scene.x3d"), true), PathBuf::from("scene.x3dz"));
        assert_eq!(resolve_output_path(Path::new("scene"), true), PathBuf::from("scene.x3dz"));
    }

    #[test]
    fn test_plain_and_compressed_documents() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("a.x3d");
        let packed = dir.path().join("a.x3dz");

        write_document(&plain, "<X3D />\n").unwrap();
        write_document(&packed, "<X3D />\n").unwrap();

        assert_eq!(fs::read_to_string(&plain).unwrap(), "<X3D />\n");
        let mut text = String::new();
        GzDecoder::new(File::open(&packed).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "<X3D />\n");
    }

    #[test]
    fn test_write_file_records_filename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.x3d");
        let written = write_x3d_file(&Scene::new(), &ExportOptions::default(), &path, None).unwrap();
        assert_eq!(written, path);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("<meta name=\"filename\" content=\"empty.x3d\" />"));
    }
}
