//! Per-export ledger of assets already written to the document.
//!
//! The first time an asset is emitted the writer produces a full `DEF`
//! definition; afterwards it only writes a `USE` reference. The cache also
//! hands out the `DEF` identifiers themselves: names are derived from asset
//! names, and an identifier already claimed by another asset gets a numeric
//! suffix, so every `DEF` in a document is distinct.

use crate::scene::{ImageId, MaterialId, MeshId};
use std::collections::{HashMap, HashSet};

/// An asset that can be defined once and referenced afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRef {
    /// A mesh's `Group` of shapes.
    Mesh(MeshId),
    /// A mesh's shared `Coordinate` node (indexed-polygon mode).
    Coordinates(MeshId),
    /// A mesh's shared `Normal` node. Named only; emitted with its coordinates.
    Normals(MeshId),
    Material(MaterialId),
    Image(ImageId),
    /// The shader standing in for faces without a material (H3D profile).
    DefaultShader,
    /// An object's own node (`Transform`, light or `Viewpoint`), by position
    /// in the scene's object list.
    Object(usize),
    Background,
}

/// Outcome of [`ReferenceCache::try_emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    /// Write the full definition.
    First,
    /// Write a reference to the earlier definition.
    AlreadyEmitted,
}

/// Records which assets have been defined in the current document.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    emitted: HashSet<AssetRef>,
    names: HashMap<AssetRef, String>,
    taken: HashSet<String>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `asset` as emitted, reporting whether it already was.
    pub fn try_emit(&mut self, asset: AssetRef) -> Emission {
        if self.emitted.insert(asset) {
            Emission::First
        } else {
            Emission::AlreadyEmitted
        }
    }

    /// The `DEF` identifier of `asset`.
    ///
    /// The first call claims `base` (or `base_1`, `base_2`, ... when another
    /// asset already holds it); later calls return the same identifier, so
    /// `USE` references always match their definition.
    pub fn def_name(&mut self, asset: AssetRef, base: impl Into<String>) -> String {
        if let Some(name) = self.names.get(&asset) {
            return name.clone();
        }

        let base = base.into();
        let mut name = base.clone();
        let mut suffix = 1u32;
        while self.taken.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        self.taken.insert(name.clone());
        self.names.insert(asset, name.clone());
        name
    }

    pub fn is_emitted(&self, asset: AssetRef) -> bool {
        self.emitted.contains(&asset)
    }

    /// Number of distinct assets emitted so far.
    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }
}
