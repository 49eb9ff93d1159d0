//! Meshlet clustering of a single triangle list, backed by `meshoptimizer`.

use {
    super::meshlet::Meshlet,
    glam::Vec3,
    log::{trace, warn},
    meshopt::{VertexDataAdapter, typed_to_bytes},
    std::io::{Error, ErrorKind},
};

/// Bytes per position: three `f32` components.
const POSITION_STRIDE: usize = 12;

/// Meshlets built from one triangle list.
///
/// Offsets are relative to the start of `vertices` and `triangles` of this value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Meshlets {
    pub meshlets: Vec<Meshlet>,
    pub vertices: Vec<u32>,
    pub triangles: Vec<u8>,
}

impl Meshlets {
    pub fn is_empty(&self) -> bool {
        self.meshlets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.meshlets.len()
    }
}

/// Bounding box and normal cone of a meshlet.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub cone_apex: [f32; 3],
    pub cone_axis: [f32; 3],
    pub cone_cutoff: f32,
}

/// Returns the largest number of meshlets `build_meshlets` may produce for `index_count` indices.
pub fn build_meshlets_bound(
    index_count: usize,
    max_vertices: usize,
    max_triangles: usize,
) -> usize {
    debug_assert_eq!(index_count % 3, 0);
    debug_assert!(max_vertices >= 3);
    debug_assert!(max_triangles >= 1);

    // A meshlet may be closed when two more vertices would not fit
    let max_vertices_conservative = max_vertices - 2;
    let by_vertices = index_count.div_ceil(max_vertices_conservative);
    let by_triangles = (index_count / 3).div_ceil(max_triangles);

    by_vertices.max(by_triangles)
}

/// Splits a triangle list into meshlets of at most `max_vertices` vertices and `max_triangles`
/// triangles.
///
/// `cone_weight` between 0 and 1 trades spatial locality for tighter normal cones. Indices must
/// be in range of `positions`, `max_vertices` must be within `3..=255` and `max_triangles` must
/// be a multiple of four no larger than 512.
pub fn build_meshlets(
    indices: &[u32],
    positions: &[[f32; 3]],
    max_vertices: usize,
    max_triangles: usize,
    cone_weight: f32,
) -> Result<Meshlets, Error> {
    if indices.len() < 3 {
        return Ok(Meshlets::default());
    }

    let adapter = vertex_adapter(positions)?;
    let meshopt::Meshlets {
        meshlets: raw,
        mut vertices,
        mut triangles,
    } = meshopt::build_meshlets(indices, &adapter, max_vertices, max_triangles, cone_weight);

    // Scratch space is sized by the bound; keep only what the last meshlet reaches
    if let Some(last) = raw.last() {
        vertices.truncate((last.vertex_offset + last.vertex_count) as usize);
        triangles.truncate(
            last.triangle_offset as usize + ((last.triangle_count as usize * 3 + 3) & !3),
        );
    } else {
        vertices.clear();
        triangles.clear();
    }

    let mut meshlets = Vec::with_capacity(raw.len());
    for meshlet in &raw {
        let mut res = Meshlet {
            vertex_offset: meshlet.vertex_offset,
            triangle_offset: meshlet.triangle_offset,
            vertex_count: meshlet.vertex_count,
            triangle_count: meshlet.triangle_count,
            ..Default::default()
        };

        let bounds = meshlet_bounds(
            &vertices[res.vertex_range()],
            &triangles[res.triangle_range()],
            positions,
            &adapter,
        );

        res.min = bounds.min;
        res.max = bounds.max;
        res.cone_apex = bounds.cone_apex;
        res.cone_axis = bounds.cone_axis;
        res.cone_cutoff = bounds.cone_cutoff;

        meshlets.push(res);
    }

    trace!(
        "Clustered {} triangle{} into {} meshlet{}",
        indices.len() / 3,
        if indices.len() / 3 == 1 { "" } else { "s" },
        meshlets.len(),
        if meshlets.len() == 1 { "" } else { "s" }
    );

    Ok(Meshlets {
        meshlets,
        vertices,
        triangles,
    })
}

/// Computes the bounding box and normal cone of the triangles of one meshlet.
///
/// `vertices` are global vertex indices and `triangles` are local indices into `vertices`.
pub fn compute_meshlet_bounds(
    vertices: &[u32],
    triangles: &[u8],
    positions: &[[f32; 3]],
) -> Result<Bounds, Error> {
    if triangles.len() < 3 {
        return Ok(Bounds::default());
    }

    let adapter = vertex_adapter(positions)?;

    Ok(meshlet_bounds(vertices, triangles, positions, &adapter))
}

fn meshlet_bounds(
    vertices: &[u32],
    triangles: &[u8],
    positions: &[[f32; 3]],
    adapter: &VertexDataAdapter<'_>,
) -> Bounds {
    let (min, max) = triangles
        .iter()
        .map(|&local| Vec3::from(positions[vertices[local as usize] as usize]))
        .fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), position| (min.min(position), max.max(position)),
        );

    let cone = meshopt::compute_meshlet_bounds(meshopt::Meshlet { vertices, triangles }, adapter);

    Bounds {
        min: min.into(),
        max: max.into(),
        cone_apex: cone.cone_apex,
        cone_axis: cone.cone_axis,
        cone_cutoff: cone.cone_cutoff,
    }
}

fn vertex_adapter(positions: &[[f32; 3]]) -> Result<VertexDataAdapter<'_>, Error> {
    VertexDataAdapter::new(typed_to_bytes(positions), POSITION_STRIDE, 0).map_err(|err| {
        warn!("Unable to read {} positions: {err:?}", positions.len());

        Error::new(ErrorKind::InvalidInput, format!("{err:?}"))
    })
}
