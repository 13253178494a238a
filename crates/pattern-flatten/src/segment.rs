//! Flood segmentation with seam barriers and kerf removal.
//!
//! Red marks are treated as a cutting medium with positive width, not a
//! zero-width curve: faces sitting on a barrier edge are frozen during the
//! first flood, reattached by neighbor vote, and (with kerf on) every face
//! touching a red vertex is discarded outright. That removes the sliver
//! triangles a zero-width cut would leave along the seam.

use std::collections::VecDeque;

use hashbrown::HashMap;
use pattern_mesh::{Mesh, MeshAdjacency};
use tracing::{debug, info, warn};

use crate::patch::Patch;
use crate::seams::SeamSet;

/// Maximum neighbor-vote rounds for reattaching frozen barrier faces.
const VOTE_ROUNDS: usize = 5;

/// Split a mesh into patches along the barrier edges.
///
/// Patches are returned largest first (ties toward the patch containing the
/// smallest face index), each below `min_patch_faces` dropped. With
/// `kerf_margin`, faces touching a red vertex are removed from every patch.
pub fn segment_mesh(
    mesh: &Mesh,
    seams: &SeamSet,
    min_patch_faces: usize,
    kerf_margin: bool,
) -> Vec<Patch> {
    if mesh.is_empty() {
        return Vec::new();
    }

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let barriers = &seams.barrier_edges;

    // Faces that sit on a barrier edge are frozen in round 1.
    let frozen: Vec<bool> = mesh
        .faces
        .iter()
        .map(|&[v0, v1, v2]| {
            [(v0, v1), (v1, v2), (v2, v0)]
                .iter()
                .any(|&(a, b)| barriers.contains(&pattern_mesh::edge_key(a, b)))
        })
        .collect();

    // Round 1: flood-fill the unfrozen faces across non-barrier edges.
    let mut labels: Vec<Option<u32>> = vec![None; mesh.faces.len()];
    let mut patch_count = 0u32;

    for start in 0..mesh.faces.len() as u32 {
        if frozen[start as usize] || labels[start as usize].is_some() {
            continue;
        }

        let label = patch_count;
        patch_count += 1;

        let mut queue = VecDeque::new();
        queue.push_back(start);
        labels[start as usize] = Some(label);

        while let Some(face_idx) = queue.pop_front() {
            let face = mesh.faces[face_idx as usize];
            for neighbor in adjacency.face_neighbors(face, face_idx, Some(barriers)) {
                if !frozen[neighbor as usize] && labels[neighbor as usize].is_none() {
                    labels[neighbor as usize] = Some(label);
                    queue.push_back(neighbor);
                }
            }
        }
    }

    debug!(
        "Flood fill: {} base patches, {} frozen barrier faces",
        patch_count,
        frozen.iter().filter(|&&f| f).count()
    );

    // Rounds 2..: attach frozen faces to the patch holding the plurality of
    // their non-barrier neighbors. Ties go to the lower label so the
    // reassignment is deterministic.
    for round in 0..VOTE_ROUNDS {
        let mut changed = false;

        for face_idx in 0..mesh.faces.len() as u32 {
            if labels[face_idx as usize].is_some() {
                continue;
            }

            let face = mesh.faces[face_idx as usize];
            let mut votes: HashMap<u32, usize> = HashMap::new();
            for neighbor in adjacency.face_neighbors(face, face_idx, Some(barriers)) {
                if let Some(label) = labels[neighbor as usize] {
                    *votes.entry(label).or_insert(0) += 1;
                }
            }

            if let Some(label) = vote_winner(&votes) {
                labels[face_idx as usize] = Some(label);
                changed = true;
            }
        }

        if !changed {
            debug!("Vote reassignment converged after {} rounds", round);
            break;
        }
    }

    // A face fenced in by barriers on every side (an all-red triangle, for
    // one) has no edge to vote through and would silently drop out of the
    // coverage. Sweep such faces into an adjacent labeled patch, crossing
    // the barrier: under the kerf they are removed again anyway, and in the
    // legacy flow every face must land in some patch.
    let mut swept = 0usize;
    loop {
        let mut changed = false;

        for face_idx in 0..mesh.faces.len() as u32 {
            if labels[face_idx as usize].is_some() {
                continue;
            }

            let face = mesh.faces[face_idx as usize];
            let mut votes: HashMap<u32, usize> = HashMap::new();
            for neighbor in adjacency.face_neighbors(face, face_idx, None) {
                if let Some(label) = labels[neighbor as usize] {
                    *votes.entry(label).or_insert(0) += 1;
                }
            }

            if let Some(label) = vote_winner(&votes) {
                labels[face_idx as usize] = Some(label);
                swept += 1;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }
    if swept > 0 {
        debug!("Swept {} barrier-enclosed faces into adjacent patches", swept);
    }
    let unassigned = labels.iter().filter(|label| label.is_none()).count();
    if unassigned > 0 {
        warn!(
            "{} faces share no edge with any patch and were dropped",
            unassigned
        );
    }

    // Group faces by label, in face-index order.
    let mut patch_faces: Vec<Vec<u32>> = vec![Vec::new(); patch_count as usize];
    for (face_idx, label) in labels.iter().enumerate() {
        if let Some(label) = label {
            patch_faces[*label as usize].push(face_idx as u32);
        }
    }

    // Largest first; ties toward the patch containing the smallest face.
    patch_faces.retain(|faces| !faces.is_empty());
    patch_faces.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));

    let before_filter = patch_faces.len();
    patch_faces.retain(|faces| faces.len() >= min_patch_faces);
    if patch_faces.len() < before_filter {
        info!(
            "Dropped {} patches below {} faces",
            before_filter - patch_faces.len(),
            min_patch_faces
        );
    }

    let mut patches = Vec::with_capacity(patch_faces.len());
    for faces in &patch_faces {
        let kept: Vec<u32> = if kerf_margin {
            faces
                .iter()
                .copied()
                .filter(|&f| {
                    mesh.faces[f as usize]
                        .iter()
                        .all(|v| !seams.red_vertices.contains(v))
                })
                .collect()
        } else {
            faces.clone()
        };

        if kept.is_empty() {
            continue;
        }

        let removed = faces.len() - kept.len();
        if removed > 0 {
            debug!("Kerf removed {} red-touching faces from a patch", removed);
        }

        patches.push(Patch::from_faces(mesh, &kept, &seams.red_vertices));
    }

    info!(
        "Segmentation: {} patches ({} faces total)",
        patches.len(),
        patches.iter().map(Patch::face_count).sum::<usize>()
    );

    patches
}

/// Plurality winner of a label vote; ties go to the lower label so
/// reassignment is deterministic.
fn vote_winner(votes: &HashMap<u32, usize>) -> Option<u32> {
    votes
        .iter()
        .map(|(&label, &count)| (count, std::cmp::Reverse(label)))
        .max()
        .map(|(_, reverse)| reverse.0)
}
