//! Contains functions and types used to bake model files into mesh caches
//!
//! Models are regular art such as `.glb` and `.gltf` files.

mod manifest;
mod model;

pub use self::manifest::Manifest;

use {
    self::model::read_meshes,
    crate::Config,
    anyhow::Context,
    glob::glob,
    log::{info, trace, warn},
    std::path::Path,
};

/// Returns the file name of `path` without its extension.
fn file_stem(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Builds and caches every mesh of the models named by a config file.
///
/// Each node with a triangle mesh is keyed as `"<model file stem>/<mesh name>"`. Meshes which
/// fail to read, build, or save are logged and skipped. The returned manifest is also written
/// next to the cached files.
pub fn bake(config_path: impl AsRef<Path>) -> anyhow::Result<Manifest> {
    let config = Config::read(&config_path)?;
    let builder = config.builder();
    let cache = config.cache();
    let key_kind = config.key();

    let mut manifest = Manifest::default();

    for pattern in config.models() {
        let model_paths = glob(config.dir().join(pattern).to_string_lossy().as_ref())
            .context("Unable to glob model directory")?;
        for model_path in model_paths {
            let model_path = model_path?;
            let stem = file_stem(&model_path);

            info!("Baking model: {}", model_path.display());

            let meshes = match read_meshes(&model_path) {
                Ok(meshes) => meshes,
                Err(err) => {
                    warn!("Unable to read {}: {err:#}", model_path.display());
                    continue;
                }
            };

            for mesh in meshes {
                let key = format!("{stem}/{}", mesh.name());

                if manifest.get(&key).is_some() {
                    warn!("Duplicate mesh key: {key}");
                    continue;
                }

                let id = key_kind.mesh_id(&mesh);

                trace!("Mesh \"{key}\" -> {id}");

                let data = match builder.build(&mesh) {
                    Ok(data) => data,
                    Err(err) => {
                        warn!("Unable to build \"{key}\": {err}");
                        continue;
                    }
                };

                if let Err(err) = cache.save(&data, id) {
                    warn!("Unable to save \"{key}\": {err}");
                    continue;
                }

                manifest.insert(key, id);
            }
        }
    }

    manifest.write(cache.root())?;

    info!(
        "Baked {} mesh{} into {}",
        manifest.len(),
        if manifest.len() == 1 { "" } else { "es" },
        cache.root().display()
    );

    Ok(manifest)
}
