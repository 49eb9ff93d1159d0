use {
    super::{Mesh, MeshCache, MeshId, MeshletBuilder},
    anyhow::Context,
    log::trace,
    ordered_float::OrderedFloat,
    serde::Deserialize,
    std::{
        fs::read_to_string,
        path::{Path, PathBuf},
    },
};

/// How cache keys are derived from meshes.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum KeyKind {
    /// Hashes the name, every position and every index; see [`MeshId::content`].
    #[default]
    Content,
    /// Hashes the name and the first few positions; see [`MeshId::fingerprint`].
    Fingerprint,
}

impl KeyKind {
    pub fn mesh_id(self, mesh: &Mesh) -> MeshId {
        match self {
            Self::Content => MeshId::content(mesh),
            Self::Fingerprint => MeshId::fingerprint(mesh.name(), mesh.positions()),
        }
    }
}

/// Meshlet limits, the `[meshlet]` table.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct MeshletConfig {
    cone_weight: Option<OrderedFloat<f32>>,
    max_triangles: Option<usize>,
    max_vertices: Option<usize>,
}

impl MeshletConfig {
    pub fn builder(&self) -> MeshletBuilder {
        MeshletBuilder::new()
            .with_cone_weight(self.cone_weight())
            .with_max_triangles(self.max_triangles())
            .with_max_vertices(self.max_vertices())
    }

    pub fn cone_weight(&self) -> f32 {
        self.cone_weight
            .map(|cone_weight| cone_weight.0)
            .unwrap_or(MeshletBuilder::DEFAULT_CONE_WEIGHT)
    }

    pub fn max_triangles(&self) -> usize {
        self.max_triangles
            .unwrap_or(MeshletBuilder::DEFAULT_MAX_TRIANGLES)
    }

    pub fn max_vertices(&self) -> usize {
        self.max_vertices
            .unwrap_or(MeshletBuilder::DEFAULT_MAX_VERTICES)
    }
}

/// Describes where meshes are cached and how they are built; usually read from a `.toml` file.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    key: Option<KeyKind>,
    legacy_format: Option<bool>,
    models: Option<Vec<String>>,
    packed_triangles: Option<bool>,
    root: Option<PathBuf>,

    #[serde(skip)]
    dir: PathBuf,

    meshlet: Option<MeshletConfig>,
}

impl Config {
    pub const DEFAULT_ROOT: &'static str = "Res/JMesh";

    pub fn builder(&self) -> MeshletBuilder {
        self.meshlet().builder()
    }

    pub fn cache(&self) -> MeshCache {
        MeshCache::new(self.root())
            .with_legacy_format(self.legacy_format())
            .with_packed_triangles(self.packed_triangles())
    }

    /// The directory which relative paths are resolved against.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key(&self) -> KeyKind {
        self.key.unwrap_or_default()
    }

    /// Writes headerless files when `true`.
    pub fn legacy_format(&self) -> bool {
        self.legacy_format.unwrap_or_default()
    }

    pub fn meshlet(&self) -> MeshletConfig {
        self.meshlet.clone().unwrap_or_default()
    }

    /// Glob patterns of the model files to bake, relative to [`Self::dir`].
    pub fn models(&self) -> &[String] {
        self.models.as_deref().unwrap_or_default()
    }

    pub fn packed_triangles(&self) -> bool {
        self.packed_triangles.unwrap_or_default()
    }

    /// Reads a config file; relative paths inside it are relative to the file itself.
    pub fn read(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let str = read_to_string(path).context("Reading config file as a string")?;
        let mut res: Self = toml::from_str(&str).context("Parsing config toml")?;

        let dir = path
            .parent()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_default();
        res.dir = dunce::canonicalize(&dir).unwrap_or(dir);

        trace!("Read config {}", path.display());

        Ok(res)
    }

    /// The cache directory.
    pub fn root(&self) -> PathBuf {
        self.dir.join(
            self.root
                .as_deref()
                .unwrap_or_else(|| Path::new(Self::DEFAULT_ROOT)),
        )
    }
}
