//! OBJ file I/O.
//!
//! OBJ is the only supported format because the pipeline depends on
//! per-vertex colors (the seam markers), which OBJ carries as the
//! widely-supported `v x y z r g b` extension.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{MeshError, MeshResult};
use crate::types::{Mesh, Vertex};

/// Load a mesh from an OBJ file, capturing vertex colors when present.
///
/// Multiple models in one file are merged into a single mesh, as garment
/// scans are frequently exported in parts.
pub fn load_obj(path: &Path) -> MeshResult<Mesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| MeshError::ParseError {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    if models.is_empty() {
        return Err(MeshError::EmptyMesh {
            details: "OBJ file contains no models".to_string(),
        });
    }

    let mut mesh = Mesh::new();
    let mut vertex_offset = 0u32;

    for model in &models {
        debug!("OBJ model '{}': loading", model.name);

        let obj_mesh = &model.mesh;
        let has_colors = obj_mesh.vertex_color.len() == obj_mesh.positions.len();

        for (i, chunk) in obj_mesh.positions.chunks(3).enumerate() {
            if chunk.len() != 3 {
                continue;
            }
            let mut vertex =
                Vertex::from_coords(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
            if has_colors {
                let c = &obj_mesh.vertex_color[i * 3..i * 3 + 3];
                vertex = vertex.with_color(c[0] as f64, c[1] as f64, c[2] as f64);
            }
            mesh.vertices.push(vertex);
        }

        for chunk in obj_mesh.indices.chunks(3) {
            if chunk.len() == 3 {
                mesh.faces.push([
                    chunk[0] + vertex_offset,
                    chunk[1] + vertex_offset,
                    chunk[2] + vertex_offset,
                ]);
            }
        }

        vertex_offset = mesh.vertices.len() as u32;
    }

    if mesh.vertices.is_empty() || mesh.faces.is_empty() {
        return Err(MeshError::EmptyMesh {
            details: "mesh has no vertices or faces".to_string(),
        });
    }

    let colored = mesh.vertices.iter().filter(|v| v.color.is_some()).count();
    info!(
        "OBJ loaded: {} vertices ({} colored), {} faces from {} models",
        mesh.vertex_count(),
        colored,
        mesh.face_count(),
        models.len()
    );
    if colored == 0 {
        warn!("Mesh carries no vertex colors; seam extraction will find nothing");
    }

    Ok(mesh)
}

/// Save a mesh to an OBJ file, writing vertex colors when present.
pub fn save_obj(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    info!("Saving mesh to {:?}", path);

    let file = File::create(path).map_err(|e| MeshError::IoWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    let io_err = |e: std::io::Error| MeshError::IoWrite {
        path: path.to_path_buf(),
        source: e,
    };

    // Keep the vertex rows uniform: strict parsers reject mixed 3- and
    // 6-column `v` lines.
    let write_colors = mesh.vertices.iter().any(|v| v.color.is_some());
    for vertex in &mesh.vertices {
        let p = &vertex.position;
        if write_colors {
            let c = vertex.color.unwrap_or_default();
            writeln!(
                writer,
                "v {} {} {} {} {} {}",
                p.x, p.y, p.z, c.x, c.y, c.z
            )
            .map_err(io_err)?;
        } else {
            writeln!(writer, "v {} {} {}", p.x, p.y, p.z).map_err(io_err)?;
        }
    }

    // OBJ face indices are 1-based.
    for &[i0, i1, i2] in &mesh.faces {
        writeln!(writer, "f {} {} {}", i0 + 1, i1 + 1, i2 + 1).map_err(io_err)?;
    }

    writer.flush().map_err(io_err)?;

    info!(
        "Saved {} vertices, {} faces to {:?}",
        mesh.vertex_count(),
        mesh.face_count(),
        path
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obj_round_trip_with_colors() {
        let mut mesh = Mesh::new();
        mesh.vertices
            .push(Vertex::from_coords(0.0, 0.0, 0.0).with_color(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.faces.push([0, 1, 2]);

        let dir = std::env::temp_dir();
        let path = dir.join("patternfold_io_test.obj");
        save_obj(&mesh, &path).expect("save");

        let loaded = load_obj(&path).expect("load");
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.vertex_count(), 3);
        assert_eq!(loaded.face_count(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_obj(Path::new("/nonexistent/mesh.obj"));
        assert!(result.is_err());
    }
}
