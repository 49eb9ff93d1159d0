use {
    super::{
        Mesh, MeshData,
        cluster::{self, Meshlets},
    },
    log::{debug, trace, warn},
    std::{
        error::Error,
        fmt::{Display, Formatter},
        io,
    },
};

/// Reasons a mesh could not be split into meshlets.
#[derive(Clone, Debug, PartialEq)]
pub enum BuildError {
    /// Normals or tangents are present but do not have one entry per position.
    AttributeLength {
        attribute: &'static str,
        len: usize,
        expected: usize,
    },

    /// A submesh produced no meshlets; the whole mesh is rejected.
    Clustering { submesh: usize },

    /// A submesh references a vertex which does not exist.
    IndexOutOfRange {
        submesh: usize,
        index: u32,
        vertex_count: usize,
    },

    /// `max_vertices` must be within `3..=255` and `max_triangles` a multiple of four within
    /// `4..=512`.
    InvalidLimits {
        max_vertices: usize,
        max_triangles: usize,
    },

    /// A submesh index count is not a multiple of three.
    NotTriangleList { submesh: usize, len: usize },
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AttributeLength {
                attribute,
                len,
                expected,
            } => write!(f, "{len} {attribute} given for {expected} vertices"),
            Self::Clustering { submesh } => {
                write!(f, "submesh {submesh} could not be split into meshlets")
            }
            Self::IndexOutOfRange {
                submesh,
                index,
                vertex_count,
            } => write!(
                f,
                "submesh {submesh} references vertex {index} of {vertex_count}"
            ),
            Self::InvalidLimits {
                max_vertices,
                max_triangles,
            } => write!(
                f,
                "unsupported meshlet limits ({max_vertices} vertices, {max_triangles} triangles)"
            ),
            Self::NotTriangleList { submesh, len } => {
                write!(f, "submesh {submesh} has {len} indices, not a triangle list")
            }
        }
    }
}

impl Error for BuildError {}

impl From<BuildError> for io::Error {
    fn from(err: BuildError) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, err)
    }
}

/// Splits meshes into meshlets, one submesh at a time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshletBuilder {
    cone_weight: f32,
    max_triangles: usize,
    max_vertices: usize,
}

impl MeshletBuilder {
    pub const DEFAULT_CONE_WEIGHT: f32 = 0.0;
    pub const DEFAULT_MAX_TRIANGLES: usize = 64;
    pub const DEFAULT_MAX_VERTICES: usize = 255;

    /// Largest supported `max_triangles`, which must also be a multiple of four.
    pub const LIMIT_TRIANGLES: usize = 512;

    /// Largest supported `max_vertices`; local indices are stored as bytes.
    pub const LIMIT_VERTICES: usize = 255;

    /// Splits `mesh` into meshlets.
    ///
    /// The meshlets of each submesh follow those of the previous submesh. The full vertex
    /// attributes of `mesh` are copied into the result unchanged.
    pub fn build(&self, mesh: &Mesh) -> Result<MeshData, BuildError> {
        self.validate(mesh)?;

        let mut res = MeshData::default();

        for (submesh, indices) in mesh.submeshes().enumerate() {
            let Meshlets {
                mut meshlets,
                vertices,
                triangles,
            } = cluster::build_meshlets(
                indices,
                mesh.positions(),
                self.max_vertices,
                self.max_triangles,
                self.cone_weight,
            )
            .map_err(|_| BuildError::Clustering { submesh })?;

            if meshlets.is_empty() {
                warn!(
                    "Unable to build meshlets for \"{}\" submesh {submesh}",
                    mesh.name()
                );

                return Err(BuildError::Clustering { submesh });
            }

            trace!(
                "Submesh {submesh}: {} meshlet{} ({} vertices, {} triangle indices)",
                meshlets.len(),
                if meshlets.len() == 1 { "" } else { "s" },
                vertices.len(),
                triangles.len()
            );

            // Offsets continue from the meshlets of earlier submeshes
            let vertex_base = res.meshlet_vertices.len() as u32;
            let triangle_base = res.meshlet_triangles.len() as u32;
            for meshlet in &mut meshlets {
                meshlet.vertex_offset += vertex_base;
                meshlet.triangle_offset += triangle_base;
            }

            res.meshlets.extend(meshlets);
            res.meshlet_vertices.extend(vertices);
            res.meshlet_triangles.extend(triangles);
        }

        res.vertices = mesh.positions().to_vec();
        res.normals = mesh.normals().to_vec();
        res.tangents = mesh.tangents().to_vec();

        debug!(
            "Built \"{}\": {} meshlet{} from {} submesh{}",
            mesh.name(),
            res.meshlets.len(),
            if res.meshlets.len() == 1 { "" } else { "s" },
            mesh.submesh_count(),
            if mesh.submesh_count() == 1 { "" } else { "es" }
        );

        Ok(res)
    }

    /// Trades spatial locality for tighter normal cones; between 0 and 1.
    pub fn cone_weight(&self) -> f32 {
        self.cone_weight
    }

    pub fn max_triangles(&self) -> usize {
        self.max_triangles
    }

    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    pub fn new() -> Self {
        Self {
            cone_weight: Self::DEFAULT_CONE_WEIGHT,
            max_triangles: Self::DEFAULT_MAX_TRIANGLES,
            max_vertices: Self::DEFAULT_MAX_VERTICES,
        }
    }

    fn validate(&self, mesh: &Mesh) -> Result<(), BuildError> {
        if !(3..=Self::LIMIT_VERTICES).contains(&self.max_vertices)
            || !(4..=Self::LIMIT_TRIANGLES).contains(&self.max_triangles)
            || self.max_triangles % 4 != 0
        {
            return Err(BuildError::InvalidLimits {
                max_vertices: self.max_vertices,
                max_triangles: self.max_triangles,
            });
        }

        let vertex_count = mesh.vertex_count();

        for (attribute, len) in [
            ("normals", mesh.normals().len()),
            ("tangents", mesh.tangents().len()),
        ] {
            if len != 0 && len != vertex_count {
                return Err(BuildError::AttributeLength {
                    attribute,
                    len,
                    expected: vertex_count,
                });
            }
        }

        for (submesh, indices) in mesh.submeshes().enumerate() {
            if indices.len() % 3 != 0 {
                return Err(BuildError::NotTriangleList {
                    submesh,
                    len: indices.len(),
                });
            }

            if let Some(&index) = indices
                .iter()
                .find(|&&index| index as usize >= vertex_count)
            {
                return Err(BuildError::IndexOutOfRange {
                    submesh,
                    index,
                    vertex_count,
                });
            }
        }

        Ok(())
    }

    pub fn with_cone_weight(mut self, cone_weight: f32) -> Self {
        self.cone_weight = cone_weight.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_triangles(mut self, max_triangles: usize) -> Self {
        self.max_triangles = max_triangles;
        self
    }

    pub fn with_max_vertices(mut self, max_vertices: usize) -> Self {
        self.max_vertices = max_vertices;
        self
    }
}

impl Default for MeshletBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits `mesh` into meshlets of at most 255 vertices and 64 triangles.
pub fn build_meshlets(mesh: &Mesh) -> Result<MeshData, BuildError> {
    MeshletBuilder::default().build(mesh)
}
