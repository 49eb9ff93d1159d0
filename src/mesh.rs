use {
    super::{Vec3, Vec4},
    crc32fast::Hasher,
    serde::{Deserialize, Serialize},
    std::fmt::{Display, Formatter},
};

/// A triangle mesh made of shared vertex attributes and one or more submeshes.
///
/// Each submesh is a triangle list indexing into the shared attributes. Normals and tangents are
/// either empty or have one entry per position.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Mesh {
    name: String,
    normals: Vec<Vec3>,
    positions: Vec<Vec3>,
    submeshes: Vec<Vec<u32>>,
    tangents: Vec<Vec4>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, positions: impl Into<Vec<Vec3>>) -> Self {
        Self {
            name: name.into(),
            normals: vec![],
            positions: positions.into(),
            submeshes: vec![],
            tangents: vec![],
        }
    }

    /// The artist-provided name of this mesh.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Appends a triangle list which indexes into the shared vertex attributes.
    pub fn push_submesh(&mut self, indices: impl Into<Vec<u32>>) {
        self.submeshes.push(indices.into());
    }

    pub fn set_normals(&mut self, normals: impl Into<Vec<Vec3>>) {
        self.normals = normals.into();
    }

    pub fn set_tangents(&mut self, tangents: impl Into<Vec<Vec4>>) {
        self.tangents = tangents.into();
    }

    pub fn submesh(&self, idx: usize) -> Option<&[u32]> {
        self.submeshes.get(idx).map(Vec::as_slice)
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    pub fn submeshes(&self) -> impl ExactSizeIterator<Item = &[u32]> {
        self.submeshes.iter().map(Vec::as_slice)
    }

    pub fn tangents(&self) -> &[Vec4] {
        &self.tangents
    }

    /// Total number of whole triangles across all submeshes.
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(|indices| indices.len() / 3).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn with_normals(mut self, normals: impl Into<Vec<Vec3>>) -> Self {
        self.set_normals(normals);
        self
    }

    pub fn with_submesh(mut self, indices: impl Into<Vec<u32>>) -> Self {
        self.push_submesh(indices);
        self
    }

    pub fn with_tangents(mut self, tangents: impl Into<Vec<Vec4>>) -> Self {
        self.set_tangents(tangents);
        self
    }
}

/// Integer key of a cached mesh; the file name of the cache entry is `<id>.jmesh`.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct MeshId(pub i32);

impl MeshId {
    /// Number of leading positions mixed into [`MeshId::fingerprint`].
    pub const FINGERPRINT_POSITIONS: usize = 5;

    /// A hash over the name, every position and every submesh index list.
    pub fn content(mesh: &Mesh) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(mesh.name.as_bytes());

        hasher.update(&(mesh.positions.len() as u64).to_le_bytes());
        for position in &mesh.positions {
            for val in position {
                hasher.update(&val.to_bits().to_le_bytes());
            }
        }

        hasher.update(&(mesh.submeshes.len() as u64).to_le_bytes());
        for indices in &mesh.submeshes {
            hasher.update(&(indices.len() as u64).to_le_bytes());
            for idx in indices {
                hasher.update(&idx.to_le_bytes());
            }
        }

        Self(hasher.finalize() as i32)
    }

    /// A weak fingerprint of the mesh name and its first few positions.
    ///
    /// Meshes sharing a name and leading positions collide; prefer [`MeshId::content`] unless
    /// ids must match those of an existing cache.
    pub fn fingerprint(name: &str, positions: &[Vec3]) -> Self {
        let mut hash = crc32fast::hash(name.as_bytes()) as i32;
        for &position in positions.iter().take(Self::FINGERPRINT_POSITIONS) {
            hash ^= Self::position_hash(position);
        }

        Self(hash)
    }

    fn position_hash([x, y, z]: Vec3) -> i32 {
        let x = x.to_bits() as i32;
        let y = y.to_bits() as i32;
        let z = z.to_bits() as i32;

        // Arithmetic shift on the signed bits
        x ^ (y << 2) ^ (z >> 2)
    }
}

impl Display for MeshId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for MeshId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}
