use {
    super::{Vec3, Vec4},
    log::warn,
    serde::{Deserialize, Serialize},
    std::{
        io::{Error, ErrorKind},
        ops::Range,
    },
};

/// A bounded cluster of triangles and the vertices they reference.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Meshlet {
    /// First entry of this meshlet within [`MeshData::meshlet_vertices`].
    pub vertex_offset: u32,

    /// First element of this meshlet within [`MeshData::meshlet_triangles`].
    ///
    /// Each triangle uses three elements.
    pub triangle_offset: u32,

    pub vertex_count: u32,
    pub triangle_count: u32,

    /// Bounding box minimum, useful for frustum and occlusion culling.
    pub min: Vec3,

    /// Bounding box maximum.
    pub max: Vec3,

    /// Normal cone apex, useful for backface culling.
    pub cone_apex: Vec3,

    /// Normal cone axis; zero when the cone is disabled.
    pub cone_axis: Vec3,

    /// `cos(angle / 2)` of the normal cone.
    pub cone_cutoff: f32,
}

impl Meshlet {
    /// The range of this meshlet within [`MeshData::meshlet_triangles`], excluding padding.
    pub fn triangle_range(&self) -> Range<usize> {
        let start = self.triangle_offset as usize;

        start..start + self.triangle_count as usize * 3
    }

    /// The range of this meshlet within [`MeshData::meshlet_vertices`].
    pub fn vertex_range(&self) -> Range<usize> {
        let start = self.vertex_offset as usize;

        start..start + self.vertex_count as usize
    }
}

/// Meshlets of a mesh along with the full vertex attributes they index.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct MeshData {
    pub meshlets: Vec<Meshlet>,
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,

    /// Empty when the source mesh has no tangents.
    pub tangents: Vec<Vec4>,

    /// Meshlet-local vertex indices, three per triangle; each meshlet is padded to four elements.
    pub meshlet_triangles: Vec<u8>,

    /// Indices into [`MeshData::vertices`].
    pub meshlet_vertices: Vec<u32>,
}

impl MeshData {
    /// Returns `true` when there are no meshlets.
    pub fn is_empty(&self) -> bool {
        self.meshlets.is_empty()
    }

    /// Gets the local triangle indices and global vertex indices of one meshlet.
    pub fn meshlet(&self, idx: usize) -> Option<(&[u8], &[u32])> {
        let meshlet = self.meshlets.get(idx)?;
        let triangles = self.meshlet_triangles.get(meshlet.triangle_range())?;
        let vertices = self.meshlet_vertices.get(meshlet.vertex_range())?;

        Some((triangles, vertices))
    }

    /// Iterates every triangle as global vertex indices, in meshlet order.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        (0..self.meshlets.len())
            .filter_map(|idx| self.meshlet(idx))
            .flat_map(|(triangles, vertices)| {
                triangles.chunks_exact(3).map(move |triangle| {
                    [
                        vertices[triangle[0] as usize],
                        vertices[triangle[1] as usize],
                        vertices[triangle[2] as usize],
                    ]
                })
            })
    }

    /// Checks that every meshlet range and index is in bounds and no ranges overlap.
    pub fn validate(&self) -> Result<(), Error> {
        fn invalid(msg: String) -> Error {
            warn!("{msg}");

            Error::new(ErrorKind::InvalidData, msg)
        }

        if !self.normals.is_empty() && self.normals.len() != self.vertices.len() {
            return Err(invalid(format!(
                "{} normals for {} vertices",
                self.normals.len(),
                self.vertices.len()
            )));
        }

        if !self.tangents.is_empty() && self.tangents.len() != self.vertices.len() {
            return Err(invalid(format!(
                "{} tangents for {} vertices",
                self.tangents.len(),
                self.vertices.len()
            )));
        }

        let mut vertex_end = 0;
        let mut triangle_end = 0;

        for (idx, meshlet) in self.meshlets.iter().enumerate() {
            let vertices = meshlet.vertex_range();
            let triangles = meshlet.triangle_range();

            if vertices.start < vertex_end || triangles.start < triangle_end {
                return Err(invalid(format!("Meshlet {idx} overlaps the previous meshlet")));
            }

            let (Some(local), Some(global)) = (
                self.meshlet_triangles.get(triangles.clone()),
                self.meshlet_vertices.get(vertices.clone()),
            ) else {
                return Err(invalid(format!("Meshlet {idx} is out of range")));
            };

            if local.iter().any(|&local| local as u32 >= meshlet.vertex_count) {
                return Err(invalid(format!(
                    "Meshlet {idx} has a local index outside of its {} vertices",
                    meshlet.vertex_count
                )));
            }

            if global
                .iter()
                .any(|&global| global as usize >= self.vertices.len())
            {
                return Err(invalid(format!(
                    "Meshlet {idx} references a vertex outside of {} vertices",
                    self.vertices.len()
                )));
            }

            vertex_end = vertices.end;
            triangle_end = triangles.end;
        }

        Ok(())
    }
}
