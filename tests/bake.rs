use {
    jmesh::{
        Config, KeyKind, MeshCache, MeshId,
        buf::{Manifest, bake},
    },
    lazy_static::lazy_static,
    std::{
        fs::{copy, create_dir_all, remove_dir_all, write},
        io::Error,
        path::PathBuf,
    },
};

lazy_static! {
    static ref CARGO_MANIFEST_DIR: PathBuf = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    static ref CARGO_TARGET_TMPDIR: PathBuf = PathBuf::from(env!("CARGO_TARGET_TMPDIR"));
    static ref TESTS_DATA_DIR: PathBuf = CARGO_MANIFEST_DIR.join("tests/data");
}

fn init_logger() {
    pretty_env_logger::try_init().ok();
}

/// Copies the test model into a scratch directory along with a config file.
fn scratch_project(name: &str, config: &str) -> Result<PathBuf, Error> {
    let dir = CARGO_TARGET_TMPDIR.join("bake").join(name);
    remove_dir_all(&dir).ok();
    create_dir_all(dir.join("models"))?;

    copy(
        TESTS_DATA_DIR.join("bake/quad.gltf"),
        dir.join("models/quad.gltf"),
    )?;

    let config_path = dir.join("bake.toml");
    write(&config_path, config)?;

    Ok(config_path)
}

#[test]
fn read_config() {
    let config = Config::read(TESTS_DATA_DIR.join("bake/bake.toml")).unwrap();

    assert_eq!(config.key(), KeyKind::Fingerprint);
    assert_eq!(config.models(), ["*.gltf"]);
    assert_eq!(config.builder().max_vertices(), 64);
    assert_eq!(config.builder().max_triangles(), 32);
    assert!(config.root().ends_with("bake/cache"));
    assert!(config.root().is_absolute());
}

#[test]
fn bake_models() -> Result<(), Error> {
    init_logger();

    let config_path = scratch_project(
        "bake_models",
        r#"
        root = "cache"
        key = "fingerprint"
        models = ["models/*.gltf"]
        "#,
    )?;

    let manifest = bake(&config_path).unwrap();

    assert_eq!(manifest.len(), 2);
    assert_eq!(
        manifest.iter().map(|(key, _)| key).collect::<Vec<_>>(),
        ["quad/Quad", "quad/Strip"]
    );

    let positions = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];

    assert_eq!(
        manifest.get("quad/Quad"),
        Some(MeshId::fingerprint("Quad", &positions))
    );
    assert_eq!(
        manifest.get("quad/Strip"),
        Some(MeshId::fingerprint("Strip", &positions))
    );

    let root = config_path.parent().unwrap().join("cache");
    let cache = MeshCache::new(&root);

    let quad = cache.load(manifest.get("quad/Quad").unwrap())?;

    assert_eq!(quad.meshlets.len(), 1);
    assert_eq!(quad.meshlets[0].vertex_count, 4);
    assert_eq!(quad.meshlets[0].triangle_count, 2);
    assert_eq!(quad.vertices, positions);
    assert_eq!(quad.normals, [[0.0, 0.0, 1.0]; 4]);
    assert!(quad.tangents.is_empty());

    // Strips are converted to lists
    let strip = cache.load(manifest.get("quad/Strip").unwrap())?;

    assert_eq!(strip.meshlets.len(), 1);
    assert_eq!(strip.meshlets[0].triangle_count, 2);
    assert!(strip.normals.is_empty());

    assert_eq!(Manifest::read(&root).unwrap(), manifest);
    assert_eq!(cache.ids()?.len(), 2);

    Ok(())
}

#[test]
fn bake_legacy_content_keys() -> Result<(), Error> {
    init_logger();

    let config_path = scratch_project(
        "bake_legacy_content_keys",
        r#"
        root = "out"
        legacy-format = true
        models = ["models/*.gltf", "missing/*.gltf"]
        "#,
    )?;

    let manifest = bake(&config_path).unwrap();

    assert_eq!(manifest.len(), 2);

    let cache = MeshCache::new(config_path.parent().unwrap().join("out"));

    for (key, id) in manifest.iter() {
        let data = cache.load(id)?;

        assert!(!data.is_empty(), "{key}");
        assert!(!std::fs::read(cache.path(id))?.starts_with(b"JMSH"));
    }

    Ok(())
}

#[test]
fn bake_without_models() {
    init_logger();

    let config_path = scratch_project("bake_without_models", "root = \"cache\"\n").unwrap();
    let manifest = bake(&config_path).unwrap();

    assert!(manifest.is_empty());
    assert_eq!(
        Manifest::read(config_path.parent().unwrap().join("cache")).unwrap(),
        manifest
    );
}

#[test]
fn bake_missing_config() {
    assert!(bake(CARGO_TARGET_TMPDIR.join("bake/does-not-exist.toml")).is_err());
}
