//! STL import and export of meshes.

use fixturekit_core::{Mesh, Result};
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Read an ASCII or binary STL stream into a welded mesh
pub fn read_stl<R: Read + Seek>(reader: &mut R) -> Result<Mesh> {
    let stl = stl_io::read_stl(reader)?;
    debug!("STL contains {} vertices, {} faces", stl.vertices.len(), stl.faces.len());

    let point = |i: usize| {
        stl.vertices
            .get(i)
            .map(|v| Point3::new(f64::from(v[0]), f64::from(v[1]), f64::from(v[2])))
    };
    let mut skipped = 0usize;
    let triangles: Vec<[Point3<f64>; 3]> = stl
        .faces
        .iter()
        .filter_map(|face| {
            let tri = match (point(face.vertices[0]), point(face.vertices[1]), point(face.vertices[2])) {
                (Some(a), Some(b), Some(c)) => Some([a, b, c]),
                _ => None,
            };
            if tri.is_none() {
                skipped += 1;
            }
            tri
        })
        .collect();
    if skipped > 0 {
        warn!("Skipped {} STL faces with missing vertices", skipped);
    }

    Ok(Mesh::from_triangles(triangles))
}

/// Load a mesh from an STL file
pub fn load_stl(path: &Path) -> Result<Mesh> {
    debug!("Loading STL file: {}", path.display());
    let mut reader = BufReader::new(File::open(path)?);
    read_stl(&mut reader)
}

/// Write a mesh as binary STL
pub fn write_stl<W: Write>(writer: &mut W, mesh: &Mesh) -> Result<()> {
    let triangles: Vec<stl_io::Triangle> = (0..mesh.face_count())
        .map(|f| {
            let n = mesh.normal(f);
            let [a, b, c] = mesh.triangle(f);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [vertex(&a), vertex(&b), vertex(&c)],
            }
        })
        .collect();
    stl_io::write_stl(writer, triangles.iter())?;
    Ok(())
}

/// Save a mesh to an STL file
pub fn save_stl(path: &Path, mesh: &Mesh) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_stl(&mut writer, mesh)?;
    writer.flush()?;
    debug!("Saved {} faces to {}", mesh.face_count(), path.display());
    Ok(())
}

fn vertex(p: &Point3<f64>) -> stl_io::Vertex {
    stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32])
}
