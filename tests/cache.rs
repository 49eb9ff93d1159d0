use {
    jmesh::{
        Flags, Header, MESHLET_RECORD_SIZE, Mesh, MeshCache, MeshData, MeshId, Meshlet,
        build_meshlets,
    },
    lazy_static::lazy_static,
    std::{
        ffi::OsString,
        fs::{read, read_dir, remove_dir_all, write},
        io::{Error, ErrorKind},
        path::PathBuf,
        thread,
    },
};

lazy_static! {
    static ref CARGO_TARGET_TMPDIR: PathBuf = PathBuf::from(env!("CARGO_TARGET_TMPDIR"));
}

fn init_logger() {
    pretty_env_logger::try_init().ok();
}

/// A fresh cache rooted in its own scratch directory.
fn scratch_cache(name: &str) -> MeshCache {
    let root = CARGO_TARGET_TMPDIR.join("cache").join(name);
    remove_dir_all(&root).ok();

    MeshCache::new(root)
}

/// Three meshlets using ten meshlet vertices and six triangles.
fn three_meshlets() -> MeshData {
    let meshlet = |vertex_offset, vertex_count, triangle_offset| Meshlet {
        vertex_offset,
        triangle_offset,
        vertex_count,
        triangle_count: 2,
        min: [0.0, 0.0, 0.0],
        max: [1.0, 1.0, 0.0],
        cone_apex: [0.5, 0.5, -1.0],
        cone_axis: [0.0, 0.0, 1.0],
        cone_cutoff: 0.25,
    };

    MeshData {
        meshlets: vec![meshlet(0, 4, 0), meshlet(4, 3, 6), meshlet(7, 3, 12)],
        vertices: (0..6).map(|idx| [idx as f32, 1.0, 2.0]).collect(),
        normals: vec![[0.0, 0.0, 1.0]; 6],
        tangents: vec![[1.0, 0.0, 0.0, -1.0]; 6],
        meshlet_triangles: vec![
            0, 1, 2, 0, 2, 3, // first
            0, 1, 2, 2, 1, 0, // second
            1, 2, 0, 0, 2, 1, // third
        ],
        meshlet_vertices: vec![0, 1, 2, 3, 1, 4, 5, 2, 3, 5],
    }
}

/// Splits a payload into its six length-prefixed blocks.
fn blocks(mut buf: &[u8]) -> Vec<&[u8]> {
    let mut res = vec![];
    while buf.len() >= 4 {
        let len = i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        res.push(&buf[4..4 + len]);
        buf = &buf[4 + len..];
    }

    assert!(buf.is_empty());

    res
}

#[test]
fn save_load_42() -> Result<(), Error> {
    init_logger();

    let cache = scratch_cache("save_load_42");
    let data = three_meshlets();

    cache.save(&data, 42)?;

    let path = cache.path(42);

    assert_eq!(path.file_name().unwrap(), "42.jmesh");
    assert_eq!(cache.load(42)?, data);

    let buf = read(&path)?;
    let header = Header::decode(&buf)?.unwrap();

    assert_eq!(header.version, Header::VERSION);
    assert_eq!(header.flags, Flags::HAS_NORMALS | Flags::HAS_TANGENTS);

    let blocks = blocks(&buf[Header::SIZE..]);

    assert_eq!(blocks.len(), 6);
    assert_eq!(blocks[0].len(), MESHLET_RECORD_SIZE * 3);
    assert_eq!(blocks[1].len(), 12 * 6);
    assert_eq!(blocks[2].len(), 12 * 6);
    assert_eq!(blocks[3].len(), 16 * 6);
    assert_eq!(blocks[4].len(), 4 * 18);
    assert_eq!(blocks[5].len(), 4 * 10);

    // First record: offsets and counts, then min
    assert_eq!(
        blocks[0][..16],
        [0u8, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 2, 0, 0, 0]
    );
    assert_eq!(blocks[0][16..20], 0f32.to_le_bytes());
    assert_eq!(blocks[0][64..68], 0.25f32.to_le_bytes());

    Ok(())
}

#[test]
fn save_load_42_legacy() -> Result<(), Error> {
    init_logger();

    let cache = scratch_cache("save_load_42_legacy").with_legacy_format(true);
    let data = three_meshlets();

    cache.save(&data, 42)?;

    let buf = read(cache.path(42))?;

    assert!(Header::decode(&buf)?.is_none());

    let blocks = blocks(&buf);

    assert_eq!(blocks.len(), 6);
    assert_eq!(blocks[0].len(), MESHLET_RECORD_SIZE * 3);
    assert_eq!(blocks[4].len(), 4 * 18);
    assert_eq!(blocks[5].len(), 4 * 10);

    // Either reader accepts legacy files
    assert_eq!(cache.load(42)?, data);
    assert_eq!(MeshCache::new(cache.root()).load(42)?, data);

    Ok(())
}

#[test]
fn save_load_packed() -> Result<(), Error> {
    init_logger();

    let cache = scratch_cache("save_load_packed").with_packed_triangles(true);
    let data = three_meshlets();

    cache.save(&data, 7)?;

    let buf = read(cache.path(7))?;
    let header = Header::decode(&buf)?.unwrap();

    assert!(header.flags.contains(Flags::PACKED_TRIANGLES));
    assert_eq!(blocks(&buf[Header::SIZE..])[4].len(), 18);
    assert_eq!(cache.load(7)?, data);

    Ok(())
}

#[test]
fn overwrite() -> Result<(), Error> {
    init_logger();

    let cache = scratch_cache("overwrite");
    let first = three_meshlets();
    let mut second = three_meshlets();
    second.meshlets.pop();

    cache.save(&first, 1)?;
    cache.save(&second, 1)?;

    assert_eq!(cache.load(1)?, second);
    assert_eq!(cache.ids()?.len(), 1);

    Ok(())
}

#[test]
fn concurrent_saves() -> Result<(), Error> {
    init_logger();

    let cache = scratch_cache("concurrent_saves");
    let data = three_meshlets();

    // Every thread writes the same id at once
    let results = thread::scope(|scope| {
        let handles = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    (0..16)
                        .map(|_| cache.save(&data, 42))
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    for res in results {
        res?;
    }

    assert_eq!(cache.load(42)?, data);
    assert_eq!(cache.ids()?, vec![MeshId(42)]);

    // No temp files are left behind
    let names = read_dir(cache.root())?
        .map(|entry| entry.map(|entry| entry.file_name()))
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(names, vec![OsString::from("42.jmesh")]);

    Ok(())
}

#[test]
fn built_mesh() -> Result<(), Error> {
    init_logger();

    let mut positions = vec![];
    let mut indices = vec![];
    for idx in 0..200u32 {
        let angle = idx as f32 * 0.1;
        positions.push([angle.cos(), angle.sin(), idx as f32 * 0.01]);
        if idx >= 2 {
            indices.extend_from_slice(&[idx - 2, idx - 1, idx]);
        }
    }

    let mesh = Mesh::new("spiral", positions).with_submesh(indices);
    let data = build_meshlets(&mesh).map_err(Error::from)?;
    let cache = scratch_cache("built_mesh");

    cache.save(&data, -3)?;

    assert_eq!(cache.load(-3)?, data);

    Ok(())
}

#[test]
fn corrupt() -> Result<(), Error> {
    init_logger();

    let cache = scratch_cache("corrupt");
    cache.save(&three_meshlets(), 5)?;

    let path = cache.path(5);
    let mut buf = read(&path)?;
    let last = buf.len() - 1;
    buf[last] ^= 0xff;
    write(&path, &buf)?;

    assert_eq!(cache.load(5).unwrap_err().kind(), ErrorKind::InvalidData);
    assert!(cache.load_or_empty(5).is_empty());

    buf.truncate(buf.len() / 2);
    write(&path, &buf)?;

    assert!(cache.load(5).is_err());

    Ok(())
}

#[test]
fn empty_mesh_data() -> Result<(), Error> {
    init_logger();

    let cache = scratch_cache("empty_mesh_data");
    let data = MeshData::default();

    cache.save(&data, 0)?;

    assert_eq!(cache.load(0)?, data);

    Ok(())
}
