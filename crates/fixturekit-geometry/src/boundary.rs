//! Boundary tracing: turn a set of mesh faces into oriented rings.

use crate::frame::PlanarFrame;
use crate::polygon::{clean_ring, ring_contains, signed_area, Polygon2};
use fixturekit_core::{FaceIndex, GeometryError, Mesh};
use nalgebra::Point2;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Closed vertex rings bounding a face set.
///
/// Each ring follows the faces' winding, so the region lies on its left
/// when seen from the face normals. Rings are traced from the lowest
/// unused boundary edge. Regions touching at a single vertex give one ring
/// each; no ring visits a vertex twice.
pub fn boundary_loops(mesh: &Mesh, faces: &[FaceIndex]) -> Result<Vec<Vec<usize>>, GeometryError> {
    let mut directed: HashSet<(usize, usize)> = HashSet::new();
    for &f in faces {
        let [a, b, c] = mesh.face(f);
        directed.insert((a, b));
        directed.insert((b, c));
        directed.insert((c, a));
    }

    let mut outgoing: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut edge_count = 0usize;
    for &(a, b) in &directed {
        if !directed.contains(&(b, a)) {
            outgoing.entry(a).or_default().push(b);
            edge_count += 1;
        }
    }
    for ends in outgoing.values_mut() {
        ends.sort_unstable_by(|x, y| y.cmp(x));
    }

    let mut loops = Vec::new();
    loop {
        let Some((&start, _)) = outgoing.iter().find(|(_, ends)| !ends.is_empty()) else {
            break;
        };
        let mut ring = vec![start];
        let mut current = pop_edge(&mut outgoing, start).ok_or(GeometryError::OpenBoundary { vertex: start })?;
        let mut steps = 0usize;
        while current != start {
            steps += 1;
            if steps > edge_count {
                return Err(GeometryError::OpenBoundary { vertex: current });
            }
            ring.push(current);
            current = pop_edge(&mut outgoing, current).ok_or(GeometryError::OpenBoundary { vertex: current })?;
        }
        loops.extend(split_pinched(ring));
    }
    Ok(loops)
}

/// Split a closed vertex walk wherever it comes back to a vertex it already passed
fn split_pinched(ring: Vec<usize>) -> Vec<Vec<usize>> {
    let mut done = Vec::new();
    let mut pending = vec![ring];
    while let Some(ring) = pending.pop() {
        let mut first_seen: HashMap<usize, usize> = HashMap::new();
        let pinch = ring
            .iter()
            .enumerate()
            .find_map(|(i, &v)| first_seen.insert(v, i).map(|first| (first, i)));
        let Some((first, again)) = pinch else {
            done.push(ring);
            continue;
        };
        debug!("Splitting boundary ring at pinched vertex {}", ring[first]);
        let lobe = ring[first..again].to_vec();
        let mut rest = ring[..first].to_vec();
        rest.extend_from_slice(&ring[again..]);
        pending.push(rest);
        pending.push(lobe);
    }
    done
}

fn pop_edge(outgoing: &mut BTreeMap<usize, Vec<usize>>, from: usize) -> Option<usize> {
    outgoing.get_mut(&from).and_then(Vec::pop)
}

/// Planar polygons (with holes) covering a face set, in `frame`.
///
/// Counter-clockwise rings become outer boundaries; clockwise rings are
/// holes of the smallest outer ring enclosing them.
pub fn boundary_polygons(
    mesh: &Mesh,
    faces: &[FaceIndex],
    frame: &PlanarFrame,
) -> Result<Vec<Polygon2>, GeometryError> {
    let mut outers: Vec<(Vec<Point2<f64>>, f64)> = Vec::new();
    let mut holes: Vec<Vec<Point2<f64>>> = Vec::new();

    for ring in boundary_loops(mesh, faces)? {
        let projected: Vec<Point2<f64>> = ring.iter().map(|&v| frame.project(mesh.vertex(v))).collect();
        let cleaned = clean_ring(&projected, 1e-9);
        if cleaned.len() < 3 {
            return Err(GeometryError::TooFewVertices {
                vertices: cleaned.len(),
            });
        }
        let area = signed_area(&cleaned);
        if area > 0.0 {
            outers.push((cleaned, area));
        } else {
            holes.push(cleaned);
        }
    }

    let mut assigned: Vec<Vec<Vec<Point2<f64>>>> = vec![Vec::new(); outers.len()];
    for hole in holes {
        let sample = interior_sample(&hole);
        let owner = outers
            .iter()
            .enumerate()
            .filter(|(_, (ring, _))| ring_contains(ring, &sample))
            .min_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
            .map(|(i, _)| i)
            .ok_or(GeometryError::OrphanHole { vertices: hole.len() })?;
        assigned[owner].push(hole);
    }

    let polygons = outers
        .into_iter()
        .zip(assigned)
        .map(|((outer, _), holes)| Polygon2::new(outer, holes))
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Traced {} polygons from {} faces", polygons.len(), faces.len());
    Ok(polygons)
}

/// A point just left of the ring's first edge, inside the traced region
fn interior_sample(ring: &[Point2<f64>]) -> Point2<f64> {
    let a = ring[0];
    let b = ring[1 % ring.len()];
    let edge = b - a;
    let length = edge.norm().max(1e-12);
    let left = nalgebra::Vector2::new(-edge.y, edge.x) / length;
    nalgebra::center(&a, &b) + left * (length * 1e-3).min(1e-4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixturekit_core::{planar_surfaces, VoxelPart};
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_top_face_of_block_with_hole() {
        let mesh = VoxelPart::solid([3, 3, 1]).without_box([1, 1, 0], [2, 2, 1]).to_mesh();
        let surfaces = planar_surfaces(&mesh, 1.0);
        let top = surfaces.iter().find(|s| s.normal().z > 0.99).unwrap();
        let frame = PlanarFrame::new(&Vector3::z()).unwrap();

        let loops = boundary_loops(&mesh, top.faces()).unwrap();
        assert_eq!(loops.len(), 2);

        let polygons = boundary_polygons(&mesh, top.faces(), &frame).unwrap();
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].outer().len(), 4);
        assert_eq!(polygons[0].holes().len(), 1);
        assert!((polygons[0].area() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_faces_give_separate_polygons() {
        // Two pillars rising from a shared base: their tops are two squares.
        let mesh = VoxelPart::solid([3, 1, 2]).without_box([1, 0, 1], [2, 1, 2]).to_mesh();
        let frame = PlanarFrame::new(&Vector3::z()).unwrap();
        let tops: Vec<usize> = (0..mesh.face_count())
            .filter(|&f| mesh.normal(f).z > 0.99 && mesh.centroid(f).z > 1.5)
            .collect();
        let polygons = boundary_polygons(&mesh, &tops, &frame).unwrap();
        assert_eq!(polygons.len(), 2);
        for p in &polygons {
            assert!((p.area() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tops_touching_at_one_corner() {
        // Two unit cubes sharing only the vertical edge through (1, 1).
        let cube = |min: Point3<f64>| {
            let mesh = Mesh::cuboid(min, min + Vector3::new(1.0, 1.0, 1.0));
            (0..mesh.face_count()).map(|f| mesh.triangle(f)).collect::<Vec<_>>()
        };
        let mut triangles = cube(Point3::origin());
        triangles.extend(cube(Point3::new(1.0, 1.0, 0.0)));
        let mesh = Mesh::from_triangles(triangles);
        let tops: Vec<usize> = (0..mesh.face_count())
            .filter(|&f| mesh.normal(f).z > 0.99)
            .collect();
        assert_eq!(tops.len(), 4);

        let loops = boundary_loops(&mesh, &tops).unwrap();
        assert_eq!(loops.len(), 2);
        for ring in &loops {
            assert_eq!(ring.len(), 4);
            let unique: HashSet<usize> = ring.iter().copied().collect();
            assert_eq!(unique.len(), ring.len());
        }

        let frame = PlanarFrame::new(&Vector3::z()).unwrap();
        let polygons = boundary_polygons(&mesh, &tops, &frame).unwrap();
        assert_eq!(polygons.len(), 2);
        for p in &polygons {
            assert!(p.holes().is_empty());
            assert!((p.area() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_split_pinched_walk() {
        let parts = split_pinched(vec![0, 1, 2, 3, 4, 2, 5]);
        assert_eq!(parts.len(), 2);
        assert!(parts.contains(&vec![2, 3, 4]));
        assert!(parts.contains(&vec![0, 1, 2, 5]));
        assert_eq!(split_pinched(vec![7, 8, 9]), vec![vec![7, 8, 9]]);
    }

    #[test]
    fn test_closed_mesh_has_no_boundary() {
        let mesh = VoxelPart::solid([2, 2, 2]).to_mesh();
        let all: Vec<usize> = (0..mesh.face_count()).collect();
        assert!(boundary_loops(&mesh, &all).unwrap().is_empty());
    }

    #[test]
    fn test_bottom_face_seen_from_below() {
        let mesh = VoxelPart::solid([2, 3, 1]).to_mesh();
        let bottom: Vec<usize> = (0..mesh.face_count())
            .filter(|&f| mesh.normal(f).z < -0.99)
            .collect();
        let frame = PlanarFrame::new(&-Vector3::z()).unwrap();
        let polygons = boundary_polygons(&mesh, &bottom, &frame).unwrap();
        assert_eq!(polygons.len(), 1);
        assert!((polygons[0].area() - 6.0).abs() < 1e-9);
    }
}
