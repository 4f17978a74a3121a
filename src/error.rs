//! Error types for the X3D exporter.

use thiserror::Error;

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Main error type for scene export operations.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error while writing the document or shader files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a JSON scene description.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Mesh data is internally inconsistent.
    #[error("Invalid mesh '{mesh}': {reason}")]
    InvalidMesh { mesh: String, reason: String },

    /// An id points outside the scene's asset tables.
    #[error("Missing asset: {0}")]
    MissingAsset(String),

    /// Shader introspection returned an attribute or uniform layout the
    /// exporter cannot represent.
    #[error("Unsupported shader data: {0}")]
    UnsupportedShaderData(String),

    /// Failed to export the scene.
    #[error("Export error: {0}")]
    Export(String),
}

impl ExportError {
    pub(crate) fn invalid_mesh(mesh: &str, reason: impl Into<String>) -> Self {
        Self::InvalidMesh {
            mesh: mesh.to_string(),
            reason: reason.into(),
        }
    }
}
