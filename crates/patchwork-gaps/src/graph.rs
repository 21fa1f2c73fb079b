//! Corner/edge graph of a patch set and triangle search.

use std::collections::{BTreeMap, HashMap, HashSet};

use patchwork_spline::SurfacePatch;
use patchwork_topo::PointId;
use tracing::{debug, info};

/// A triangular hole bounded by three patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceGap {
    /// Owners of the edges `(v0, v1)`, `(v1, v2)` and `(v2, v0)`.
    pub patches: [usize; 3],
    /// Corner ids in triangle order.
    pub vertices: [PointId; 3],
}

/// Valence at which a corner is considered a regular grid vertex.
const REGULAR_VALENCE: usize = 4;

/// Find triangular holes in the corner graph of `patches`.
///
/// Each patch contributes its four corners and the four edges between
/// them. An edge shared by several patches keeps the owner that
/// registered it first, so results depend on patch order. A triangle is
/// reported only when one of its corners has fewer than four incident
/// edges.
pub fn find_gaps(patches: &[SurfacePatch]) -> Vec<SurfaceGap> {
    let mut index_of: HashMap<PointId, usize> = HashMap::new();
    let mut vertices: Vec<PointId> = Vec::new();
    let mut degree: Vec<usize> = Vec::new();
    let mut owner: HashMap<(usize, usize), usize> = HashMap::new();
    let mut edges: Vec<(usize, usize)> = Vec::new();

    for (patch_index, patch) in patches.iter().enumerate() {
        let corners = patch.corners().map(|id| {
            *index_of.entry(id).or_insert_with(|| {
                vertices.push(id);
                degree.push(0);
                vertices.len() - 1
            })
        });

        // Corner order is (0,0), (3,0), (3,3), (0,3); walk the boundary.
        for side in 0..4 {
            let a = corners[side];
            let b = corners[(side + 1) % 4];
            if a == b {
                continue;
            }
            let key = (a.min(b), a.max(b));
            if owner.contains_key(&key) {
                continue;
            }
            owner.insert(key, patch_index);
            edges.push((a, b));
            degree[a] += 1;
            degree[b] += 1;
        }
    }

    let edge_owner = |a: usize, b: usize| owner.get(&(a.min(b), a.max(b))).copied();

    // Canonical sorted triple -> triangle in discovery order.
    let mut triangles: BTreeMap<[usize; 3], [usize; 3]> = BTreeMap::new();
    for &(u, v) in &edges {
        for w in 0..vertices.len() {
            if w == u || w == v {
                continue;
            }
            if edge_owner(v, w).is_none() || edge_owner(w, u).is_none() {
                continue;
            }
            if [u, v, w].iter().all(|&i| degree[i] >= REGULAR_VALENCE) {
                continue;
            }
            let mut key = [u, v, w];
            key.sort_unstable();
            triangles.entry(key).or_insert([u, v, w]);
        }
    }

    let gaps: Vec<SurfaceGap> = triangles
        .values()
        .filter_map(|&[u, v, w]| {
            Some(SurfaceGap {
                patches: [edge_owner(u, v)?, edge_owner(v, w)?, edge_owner(w, u)?],
                vertices: [vertices[u], vertices[v], vertices[w]],
            })
        })
        .collect();

    let owners: HashSet<usize> = gaps.iter().flat_map(|g| g.patches).collect();
    debug!(
        vertices = vertices.len(),
        edges = edges.len(),
        patches_involved = owners.len(),
        "corner graph built"
    );
    info!(gaps = gaps.len(), "gap search finished");
    gaps
}
