use {
    crate::MeshId,
    anyhow::Context,
    log::trace,
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeMap,
        fs::{create_dir_all, read_to_string, write},
        path::Path,
    },
};

/// Maps each baked mesh key, `"<model file stem>/<mesh name>"`, to the id it was cached under.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Manifest {
    meshes: BTreeMap<String, MeshId>,
}

impl Manifest {
    pub const FILE_NAME: &'static str = "manifest.toml";

    pub fn get(&self, key: impl AsRef<str>) -> Option<MeshId> {
        self.meshes.get(key.as_ref()).copied()
    }

    /// Adds `key`, returning `false` and leaving the manifest unchanged if it is already present.
    pub fn insert(&mut self, key: impl Into<String>, id: MeshId) -> bool {
        let key = key.into();

        if self.meshes.contains_key(&key) {
            return false;
        }

        self.meshes.insert(key, id);

        true
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, MeshId)> {
        self.meshes.iter().map(|(key, &id)| (key.as_str(), id))
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Reads `manifest.toml` from a cache directory.
    pub fn read(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = root.as_ref().join(Self::FILE_NAME);
        let str = read_to_string(&path).context("Reading manifest file as a string")?;

        toml::from_str(&str).context("Parsing manifest toml")
    }

    /// Writes `manifest.toml` into a cache directory.
    pub fn write(&self, root: impl AsRef<Path>) -> anyhow::Result<()> {
        let root = root.as_ref();
        let path = root.join(Self::FILE_NAME);

        create_dir_all(root).context("Creating cache directory")?;
        write(&path, toml::to_string(self)?).context("Writing manifest file")?;

        trace!(
            "Wrote {} key{} to {}",
            self.len(),
            if self.len() == 1 { "" } else { "s" },
            path.display()
        );

        Ok(())
    }
}
