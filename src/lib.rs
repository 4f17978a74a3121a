//! # Scene X3D
//!
//! A Rust library for exporting 3D scenes to X3D.
//!
//! ## Overview
//!
//! This library takes an in-memory scene (objects with world matrices, plus
//! tables of meshes, materials and images) and writes it as one X3D XML
//! document. Shared meshes, materials and images are defined once and
//! referenced with `USE` afterwards.
//!
//! ## Quick Start
//!
//! ```ignore
//! use scene_x3d::{export_x3d, ExportOptions, Scene};
//!
//! // Load a scene description
//! let scene = Scene::from_json(&std::fs::read_to_string("scene.json")?)?;
//!
//! // Export with welded triangles and normals
//! let options = ExportOptions::default()
//!     .with_triangulate(true)
//!     .with_normals(true);
//! let document = export_x3d(&scene, &options)?;
//! ```
//!
//! ## Shader Profile
//!
//! The H3D profile replaces fixed-function materials with GLSL shader
//! appearances. Shader sources come from a [`ShaderProvider`]; a
//! [`ShaderLibrary`] can be loaded from JSON:
//!
//! ```ignore
//! use scene_x3d::{write_x3d_file, ExportOptions, Profile, ShaderLibrary};
//!
//! let shaders = ShaderLibrary::from_json(&std::fs::read_to_string("shaders.json")?)?;
//! let options = ExportOptions::default().with_profile(Profile::H3d);
//! write_x3d_file(&scene, &options, "out/scene.x3d".as_ref(), Some(&shaders))?;
//! ```

pub mod error;
pub mod export;
pub mod scene;

// Re-export main types for convenience
pub use error::{ExportError, Result};
pub use export::{
    export_x3d, resolve_output_path, write_document, write_x3d_file, ExportOptions, Profile,
    ShaderLibrary, ShaderProgram, ShaderProvider, X3dExporter,
};
pub use scene::{
    Camera, Face, FaceColors, FaceUv, ImageAsset, ImageId, Light, LightKind, MaterialAsset,
    MaterialId, MeshAsset, MeshId, ObjectData, Scene, SceneObject, World,
};
