//! Scene X3D CLI
//!
//! Export a JSON scene description to X3D.

use clap::{Parser, ValueEnum};
use scene_x3d::{resolve_output_path, write_x3d_file, ExportOptions, Profile, Scene, ShaderLibrary};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scene-x3d")]
#[command(author, version, about = "Export 3D scenes to X3D", long_about = None)]
struct Cli {
    /// Input JSON file containing the scene
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path (extension is set to .x3d or .x3dz)
    #[arg(short, long)]
    output: PathBuf,

    /// Write IndexedTriangleSet instead of IndexedFaceSet
    #[arg(long)]
    triangulate: bool,

    /// Write per-vertex normals
    #[arg(long)]
    normals: bool,

    /// Gzip the output (.x3dz)
    #[arg(long)]
    compress: bool,

    /// Export only selected objects
    #[arg(long)]
    selection_only: bool,

    /// Output profile
    #[arg(long, value_enum, default_value = "baseline")]
    profile: ProfileArg,

    /// JSON shader library (required by the h3d profile)
    #[arg(long)]
    shaders: Option<PathBuf>,

    /// Directory relative image paths are resolved against (defaults to the
    /// input file's directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    /// Plain X3D 3.0
    Baseline,
    /// H3D API with GLSL shaders
    H3d,
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    println!("Loading scene from {:?}...", cli.input);
    let scene = Scene::from_json(&fs::read_to_string(&cli.input)?)?;
    println!(
        "  Loaded {} objects, {} meshes, {} materials, {} images",
        scene.objects.len(),
        scene.meshes.len(),
        scene.materials.len(),
        scene.images.len()
    );

    let profile = match cli.profile {
        ProfileArg::Baseline => Profile::Baseline,
        ProfileArg::H3d => Profile::H3d,
    };

    let mut options = ExportOptions::default()
        .with_triangulate(cli.triangulate)
        .with_normals(cli.normals)
        .with_selection_only(cli.selection_only)
        .with_profile(profile);
    match (&cli.base_dir, cli.input.parent()) {
        (Some(dir), _) => options = options.with_base_dir(dir),
        (None, Some(dir)) => options = options.with_base_dir(dir),
        (None, None) => {}
    }

    let shaders = match &cli.shaders {
        Some(path) => Some(ShaderLibrary::from_json(&fs::read_to_string(path)?)?),
        None => None,
    };

    let path = resolve_output_path(&cli.output, cli.compress);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let written = write_x3d_file(
        &scene,
        &options,
        &path,
        shaders.as_ref().map(|s| s as &dyn scene_x3d::ShaderProvider),
    )?;
    println!("Exported X3D to {:?}", written);

    Ok(())
}
