//! SVG export of packed pattern pieces.
//!
//! Each piece is drawn as its boundary outline (one path per boundary loop)
//! inside a group, with the UV domain mapped 1:1 to user units. Intended as
//! a cutting preview, not a sewing-grade export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use pattern_flatten::FlattenResult;
use pattern_mesh::{edge_key, MeshAdjacency};

/// Scale from UV units to SVG user units.
const UNITS_PER_UV: f64 = 100.0;

const PALETTE: [&str; 6] = [
    "#4e79a7", "#f28e2b", "#59a14f", "#e15759", "#b07aa1", "#76b7b2",
];

/// Write the packed patterns as an SVG document.
pub fn write_svg(result: &FlattenResult, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(file);

    let bounds = result.bounds.unwrap_or_else(pattern_flatten::UvBounds::zero);
    let width = bounds.width() * UNITS_PER_UV;
    let height = bounds.height() * UNITS_PER_UV;

    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        w,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.2} {:.2} {:.2} {:.2}">"#,
        bounds.u_min * UNITS_PER_UV,
        bounds.v_min * UNITS_PER_UV,
        width.max(1.0),
        height.max(1.0)
    )?;

    for (index, pattern) in result.patterns.iter().enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        writeln!(w, r#"  <g id="piece-{}">"#, index)?;

        for outline in boundary_outlines(&pattern.local_faces) {
            write!(w, r#"    <path fill="{}" fill-opacity="0.25" stroke="{}" stroke-width="1" d=""#, color, color)?;
            for (i, &v) in outline.iter().enumerate() {
                let p = pattern.uv[v as usize];
                let cmd = if i == 0 { 'M' } else { 'L' };
                write!(w, "{}{:.2} {:.2} ", cmd, p.x * UNITS_PER_UV, p.y * UNITS_PER_UV)?;
            }
            writeln!(w, r#"Z"/>"#)?;
        }

        writeln!(w, "  </g>")?;
    }

    writeln!(w, "</svg>")?;
    w.flush()?;
    Ok(())
}

/// Walk the boundary edges of a face list into closed outlines.
///
/// Junction vertices (from kerf bites or non-manifold spots) end a walk
/// early; the remaining edges start new outlines, so every boundary edge is
/// drawn exactly once.
fn boundary_outlines(faces: &[[u32; 3]]) -> Vec<Vec<u32>> {
    let adjacency = MeshAdjacency::build(faces);

    let mut neighbors: std::collections::BTreeMap<u32, Vec<u32>> = std::collections::BTreeMap::new();
    for (a, b) in adjacency.boundary_edges() {
        neighbors.entry(a).or_default().push(b);
        neighbors.entry(b).or_default().push(a);
    }
    for list in neighbors.values_mut() {
        list.sort_unstable();
    }

    let mut used: std::collections::BTreeSet<(u32, u32)> = std::collections::BTreeSet::new();
    let mut outlines = Vec::new();

    let starts: Vec<u32> = neighbors.keys().copied().collect();
    for &start in &starts {
        loop {
            let Some(&next) = neighbors[&start]
                .iter()
                .find(|&&n| !used.contains(&edge_key(start, n)))
            else {
                break;
            };

            let mut outline = vec![start];
            used.insert(edge_key(start, next));
            let mut prev = start;
            let mut current = next;

            while current != start {
                outline.push(current);
                let step = neighbors[&current]
                    .iter()
                    .find(|&&n| n != prev && !used.contains(&edge_key(current, n)))
                    .copied();
                match step {
                    Some(n) => {
                        used.insert(edge_key(current, n));
                        prev = current;
                        current = n;
                    }
                    None => break,
                }
            }

            outlines.push(outline);
        }
    }

    outlines
}
