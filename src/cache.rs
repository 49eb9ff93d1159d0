use {
    super::{
        EXTENSION, IndexWidth, MeshData, MeshId,
        format::{read_mesh_data, write_mesh_data},
    },
    log::{debug, trace, warn},
    std::{
        fs::{File, create_dir_all, read_dir, remove_file, rename},
        io::{BufReader, BufWriter, Error, ErrorKind, Write},
        path::{Path, PathBuf},
        process,
        sync::atomic::{AtomicUsize, Ordering},
    },
};

/// Numbers the temp files of this process so concurrent saves never share one.
static SAVE_COUNT: AtomicUsize = AtomicUsize::new(0);

/// A directory of `.jmesh` files, one per [`MeshId`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MeshCache {
    legacy: bool,
    root: PathBuf,
    triangles: IndexWidth,
}

impl MeshCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            legacy: false,
            root: root.into(),
            triangles: IndexWidth::U32,
        }
    }

    pub fn contains(&self, id: impl Into<MeshId>) -> bool {
        self.path(id).is_file()
    }

    /// Returns the ids of every cached mesh, sorted.
    ///
    /// A missing root directory holds no meshes.
    pub fn ids(&self) -> Result<Vec<MeshId>, Error> {
        let entries = match read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(err),
        };

        let mut res = vec![];
        for entry in entries {
            let path = entry?.path();

            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }

            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse().ok())
            {
                res.push(MeshId(id));
            }
        }

        res.sort_unstable();

        Ok(res)
    }

    /// Reads the mesh stored under `id`.
    pub fn load(&self, id: impl Into<MeshId>) -> Result<MeshData, Error> {
        let path = self.path(id);

        trace!("Loading {}", path.display());

        let file = File::open(&path)?;
        let data = read_mesh_data(BufReader::new(file)).inspect_err(|err| {
            warn!("Unable to read {}: {err}", path.display());
        })?;

        debug!(
            "Loaded {} meshlet{} from {}",
            data.meshlets.len(),
            if data.meshlets.len() == 1 { "" } else { "s" },
            path.display()
        );

        Ok(data)
    }

    /// Reads the mesh stored under `id`, or returns empty mesh data if it cannot be read.
    pub fn load_or_empty(&self, id: impl Into<MeshId>) -> MeshData {
        let id: MeshId = id.into();

        self.load(id).unwrap_or_else(|err| {
            warn!("Unable to load mesh {id}: {err}");

            MeshData::default()
        })
    }

    /// Returns `<root>/<id>.jmesh`.
    pub fn path(&self, id: impl Into<MeshId>) -> PathBuf {
        let id: MeshId = id.into();

        self.root.join(format!("{id}.{EXTENSION}"))
    }

    /// Deletes the mesh stored under `id`, returning `false` if there was none.
    pub fn remove(&self, id: impl Into<MeshId>) -> Result<bool, Error> {
        match remove_file(self.path(id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `data` under `id`, replacing any previous file.
    ///
    /// The file is written next to its destination under a name unique to this call and then
    /// renamed into place, so readers never observe a partial file. Concurrent saves of one id
    /// each succeed and the last rename wins.
    pub fn save(&self, data: &MeshData, id: impl Into<MeshId>) -> Result<(), Error> {
        let path = self.path(id);
        let temp_path = path.with_extension(format!(
            "{EXTENSION}.{}.{}.tmp",
            process::id(),
            SAVE_COUNT.fetch_add(1, Ordering::Relaxed)
        ));

        create_dir_all(&self.root)?;

        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            let res = write_mesh_data(&mut writer, data, self.legacy, self.triangles)
                .and_then(|_| writer.flush());

            if let Err(err) = res {
                drop(writer);
                remove_file(&temp_path).ok();

                return Err(err);
            }
        }

        rename(&temp_path, &path).inspect_err(|_| {
            remove_file(&temp_path).ok();
        })?;

        debug!(
            "Saved {} meshlet{} to {}",
            data.meshlets.len(),
            if data.meshlets.len() == 1 { "" } else { "s" },
            path.display()
        );

        Ok(())
    }

    /// Writes `data` under `id`, logging instead of returning any failure.
    pub fn save_or_log(&self, data: &MeshData, id: impl Into<MeshId>) -> bool {
        let id: MeshId = id.into();

        self.save(data, id)
            .inspect_err(|err| warn!("Unable to save mesh {id}: {err}"))
            .is_ok()
    }

    /// Writes headerless files which older readers understand.
    ///
    /// Legacy files always store 32-bit triangle indices, so this also disables packing.
    pub fn with_legacy_format(mut self, legacy: bool) -> Self {
        self.legacy = legacy;

        if legacy {
            self.triangles = IndexWidth::U32;
        }

        self
    }

    /// Stores meshlet triangle indices as single bytes.
    ///
    /// Ignored when writing legacy files.
    pub fn with_packed_triangles(mut self, packed: bool) -> Self {
        self.triangles = if packed && !self.legacy {
            IndexWidth::U8
        } else {
            IndexWidth::U32
        };

        self
    }
}
