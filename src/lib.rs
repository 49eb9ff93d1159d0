//! Splits triangle meshes into meshlets and caches the results as `.jmesh` files.
//!
//! A [`Mesh`] is clustered one submesh at a time by a [`MeshletBuilder`]; the resulting
//! [`MeshData`] may then be written to and read from disk using a [`MeshCache`], keyed by a
//! [`MeshId`].

mod builder;
mod cache;
mod cluster;
mod config;
mod format;
mod index;
mod mesh;
mod meshlet;

#[cfg(feature = "bake")]
pub mod buf;

pub use self::{
    builder::{BuildError, MeshletBuilder, build_meshlets},
    cache::MeshCache,
    cluster::{Bounds, Meshlets, build_meshlets_bound, compute_meshlet_bounds},
    config::{Config, KeyKind, MeshletConfig},
    format::{Flags, Header, MESHLET_RECORD_SIZE},
    index::IndexWidth,
    mesh::{Mesh, MeshId},
    meshlet::{MeshData, Meshlet},
};

pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];

/// File extension of cached mesh files.
pub const EXTENSION: &str = "jmesh";
