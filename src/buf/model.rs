use {
    crate::{Mesh, Vec3, Vec4},
    anyhow::{Context, anyhow},
    gltf::{
        Buffer, import,
        mesh::{Mode, Reader, util::ReadIndices},
    },
    log::{trace, warn},
    meshopt::unstripify,
    std::path::Path,
};

struct PrimitiveData {
    indices: Vec<u32>,
    normals: Option<Vec<Vec3>>,
    positions: Vec<Vec3>,
    tangents: Option<Vec<Vec4>>,
}

fn convert_triangle_fan_to_list(indices: &mut Vec<u32>) {
    if indices.len() < 3 {
        indices.clear();
        return;
    }

    let fan = std::mem::take(indices);
    indices.reserve_exact((fan.len() - 2) * 3);
    for edge in fan[1..].windows(2) {
        indices.extend_from_slice(&[fan[0], edge[0], edge[1]]);
    }
}

fn convert_triangle_strip_to_list(
    indices: &mut Vec<u32>,
    restart_index: u32,
) -> anyhow::Result<()> {
    *indices = unstripify(indices, restart_index)
        .map_err(|err| anyhow!("Unable to unstripify index buffer: {err:?}"))?;

    Ok(())
}

fn read_primitive<'a, 's, F>(data: Reader<'a, 's, F>) -> Option<(u32, PrimitiveData)>
where
    F: Clone + Fn(Buffer<'a>) -> Option<&'s [u8]>,
{
    let positions = data
        .read_positions()
        .map(|positions| positions.collect::<Vec<_>>())?;

    let (restart_index, indices) = data
        .read_indices()
        .map(|indices| {
            (
                match indices {
                    ReadIndices::U8(_) => u8::MAX as u32,
                    ReadIndices::U16(_) => u16::MAX as u32,
                    ReadIndices::U32(_) => u32::MAX,
                },
                indices.into_u32().collect::<Vec<_>>(),
            )
        })
        .unwrap_or_else(|| (u32::MAX, (0..positions.len() as u32).collect()));

    let normals = data
        .read_normals()
        .map(|normals| normals.collect::<Vec<_>>())
        .filter(|normals| normals.len() == positions.len());
    let tangents = data
        .read_tangents()
        .map(|tangents| tangents.collect::<Vec<_>>())
        .filter(|tangents| tangents.len() == positions.len());

    Some((
        restart_index,
        PrimitiveData {
            indices,
            normals,
            positions,
            tangents,
        },
    ))
}

/// Reads every node with a triangle mesh from a `.gltf` or `.glb` file.
///
/// The primitives of each node are concatenated into one [`Mesh`] with one submesh per primitive.
/// Normals and tangents are kept only when every primitive provides them.
pub(super) fn read_meshes(path: &Path) -> anyhow::Result<Vec<Mesh>> {
    let (doc, bufs, _) =
        import(path).with_context(|| format!("Importing model {}", path.display()))?;

    let mut res = vec![];
    for node in doc.nodes() {
        let Some(gltf_mesh) = node.mesh() else {
            continue;
        };

        let name = node
            .name()
            .or(gltf_mesh.name())
            .map(|name| name.to_owned())
            .unwrap_or_else(|| format!("mesh{}", gltf_mesh.index()));

        trace!("Reading mesh \"{name}\"");

        let mut positions = vec![];
        let mut submeshes = vec![];
        let mut normals = Some(vec![]);
        let mut tangents = Some(vec![]);

        for primitive in gltf_mesh.primitives() {
            let mode = primitive.mode();
            if !matches!(
                mode,
                Mode::TriangleFan | Mode::TriangleStrip | Mode::Triangles
            ) {
                trace!("Skipping {mode:?} primitive of \"{name}\"");
                continue;
            }

            let Some((restart_index, mut data)) = read_primitive(
                primitive.reader(|buf| bufs.get(buf.index()).map(|data| data.0.as_slice())),
            ) else {
                warn!("Missing positions in \"{name}\"");
                continue;
            };

            match mode {
                Mode::TriangleFan => convert_triangle_fan_to_list(&mut data.indices),
                Mode::TriangleStrip => {
                    if let Err(err) =
                        convert_triangle_strip_to_list(&mut data.indices, restart_index)
                    {
                        warn!("Skipping strip of \"{name}\": {err}");
                        continue;
                    }
                }
                _ => (),
            }

            // Indices are relative to the primitive; rebase onto the concatenated vertices
            let base = positions.len() as u32;
            submeshes.push(
                data.indices
                    .iter()
                    .map(|&idx| idx + base)
                    .collect::<Vec<_>>(),
            );

            normals = normals.zip(data.normals).map(|(mut all, some)| {
                all.extend(some);
                all
            });
            tangents = tangents.zip(data.tangents).map(|(mut all, some)| {
                all.extend(some);
                all
            });
            positions.extend(data.positions);
        }

        if submeshes.is_empty() {
            trace!("No triangles in \"{name}\"");
            continue;
        }

        if normals.is_none() {
            warn!("Missing normals in \"{name}\"");
        }

        let mut mesh = Mesh::new(name, positions)
            .with_normals(normals.unwrap_or_default())
            .with_tangents(tangents.unwrap_or_default());
        for indices in submeshes {
            mesh.push_submesh(indices);
        }

        res.push(mesh);
    }

    trace!(
        "Document contains {} mesh{}",
        res.len(),
        if res.len() == 1 { "" } else { "es" }
    );

    Ok(res)
}
