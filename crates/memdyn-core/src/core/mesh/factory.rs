use super::state::MeshState;
use super::topology::{MeshError, MeshTopology};
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;

/// Builds an icosphere of the given radius by repeated midpoint subdivision
/// of an icosahedron, projecting new vertices onto the sphere.
pub fn icosphere(radius: f64, subdivisions: u32) -> Result<(MeshTopology, MeshState), MeshError> {
    let t = (1.0 + 5f64.sqrt()) / 2.0;
    let mut positions: Vec<Point3<f64>> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Point3::from(Vector3::new(x, y, z).normalize()))
    .collect();

    let mut faces: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |a: usize, b: usize, positions: &mut Vec<Point3<f64>>| -> usize {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let mid = (positions[a].coords + positions[b].coords).normalize();
                positions.push(Point3::from(mid));
                positions.len() - 1
            })
        };

        let mut refined = Vec::with_capacity(faces.len() * 4);
        for &[a, b, c] in &faces {
            let ab = midpoint(a, b, &mut positions);
            let bc = midpoint(b, c, &mut positions);
            let ca = midpoint(c, a, &mut positions);
            refined.push([a, ab, ca]);
            refined.push([b, bc, ab]);
            refined.push([c, ca, bc]);
            refined.push([ab, bc, ca]);
        }
        faces = refined;
    }

    for face in faces.iter_mut() {
        let [a, b, c] = *face;
        let normal = (positions[b] - positions[a]).cross(&(positions[c] - positions[a]));
        let centroid = (positions[a].coords + positions[b].coords + positions[c].coords) / 3.0;
        if normal.dot(&centroid) < 0.0 {
            face.swap(1, 2);
        }
    }

    for p in positions.iter_mut() {
        p.coords *= radius;
    }

    let topology = MeshTopology::new(positions.len(), faces)?;
    Ok((topology, MeshState::new(positions)))
}

/// Builds a flat hexagonal patch of a triangular lattice in the `z = 0`
/// plane, with `rings` lattice rings around the center vertex and the given
/// edge length. The patch is open and oriented with normals along `+z`.
pub fn hexagonal_patch(
    edge_length: f64,
    rings: usize,
) -> Result<(MeshTopology, MeshState), MeshError> {
    let n = rings as i64;
    let inside = |q: i64, r: i64| q.abs() <= n && r.abs() <= n && (q + r).abs() <= n;

    let mut index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut positions = Vec::new();
    for r in -n..=n {
        for q in -n..=n {
            if inside(q, r) {
                index.insert((q, r), positions.len());
                let x = edge_length * (q as f64 + 0.5 * r as f64);
                let y = edge_length * (r as f64 * 3f64.sqrt() / 2.0);
                positions.push(Point3::new(x, y, 0.0));
            }
        }
    }

    let mut faces = Vec::new();
    for r in -n..=n {
        for q in -n..=n {
            let lookup = |dq: i64, dr: i64| index.get(&(q + dq, r + dr)).copied();
            if let (Some(a), Some(b), Some(c)) = (lookup(0, 0), lookup(1, 0), lookup(0, 1)) {
                faces.push([a, b, c]);
            }
            if let (Some(a), Some(b), Some(c)) = (lookup(1, 0), lookup(1, 1), lookup(0, 1)) {
                faces.push([a, b, c]);
            }
        }
    }

    let topology = MeshTopology::new(positions.len(), faces)?;
    Ok((topology, MeshState::new(positions)))
}
