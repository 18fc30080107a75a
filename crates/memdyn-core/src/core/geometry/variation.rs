//! Exact first variations of the elementary discrete quantities.
//!
//! Every mechanical force in the energy engine is assembled from these
//! derivatives by the chain rule, so they are kept free of any state.

use nalgebra::{Point3, Vector3};

/// Gradients of a triangle's area with respect to its three corners.
#[inline]
pub fn triangle_area_gradients(p: [&Point3<f64>; 3]) -> [Vector3<f64>; 3] {
    let normal = (p[1] - p[0]).cross(&(p[2] - p[0])).normalize();
    std::array::from_fn(|k| {
        let opposite_edge = p[(k + 2) % 3] - p[(k + 1) % 3];
        0.5 * normal.cross(&opposite_edge)
    })
}

/// Gradient of `|a - b|` with respect to `a`; the gradient for `b` is its negation.
#[inline]
pub fn edge_length_gradient(a: &Point3<f64>, b: &Point3<f64>) -> Vector3<f64> {
    (a - b).normalize()
}

/// Signed volume of the tetrahedron spanned by the origin and a triangle.
#[inline]
pub fn signed_volume(p: [&Point3<f64>; 3]) -> f64 {
    p[0].coords.dot(&p[1].coords.cross(&p[2].coords)) / 6.0
}

/// Gradients of [`signed_volume`] with respect to the three corners.
#[inline]
pub fn signed_volume_gradients(p: [&Point3<f64>; 3]) -> [Vector3<f64>; 3] {
    std::array::from_fn(|k| {
        p[(k + 1) % 3].coords.cross(&p[(k + 2) % 3].coords) / 6.0
    })
}

/// Signed dihedral angle across the edge `a -> b`, where `(a, b, c)` and
/// `(b, a, d)` are the two counter-clockwise faces sharing it.
///
/// Positive on convex folds when normals point outward.
#[inline]
pub fn dihedral_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    let e = (b - a).normalize();
    let n1 = (b - a).cross(&(c - a)).normalize();
    let n2 = (a - b).cross(&(d - b)).normalize();
    n1.cross(&n2).dot(&e).atan2(n1.dot(&n2))
}

/// Gradients of [`dihedral_angle`] with respect to `a`, `b`, `c` and `d`.
#[inline]
pub fn dihedral_angle_gradients(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> [Vector3<f64>; 4] {
    let e = (b - a).normalize();
    let big_n1 = (b - a).cross(&(c - a));
    let big_n2 = (a - b).cross(&(d - b));
    let double_area1 = big_n1.norm();
    let double_area2 = big_n2.norm();
    let n1 = big_n1 / double_area1;
    let n2 = big_n2 / double_area2;

    let from_first = |edge: Vector3<f64>| -(edge.dot(&e) / double_area1) * n1;
    let from_second = |edge: Vector3<f64>| (edge.dot(&e) / double_area2) * n2;

    [
        from_first(c - b) + from_second(b - d),
        from_first(a - c) + from_second(d - a),
        from_first(b - a),
        from_second(a - b),
    ]
}

/// Length cross ratio `|ad| |bc| / (|ca| |db|)` of the diamond around edge `ab`.
#[inline]
pub fn length_cross_ratio(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>) -> f64 {
    (a - d).norm() * (b - c).norm() / ((c - a).norm() * (d - b).norm())
}

/// Gradients of [`length_cross_ratio`] with respect to `a`, `b`, `c` and `d`.
#[inline]
pub fn length_cross_ratio_gradients(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> [Vector3<f64>; 4] {
    let ratio = length_cross_ratio(a, b, c, d);
    let ad2 = (a - d).norm_squared();
    let bc2 = (b - c).norm_squared();
    let ca2 = (c - a).norm_squared();
    let db2 = (d - b).norm_squared();
    [
        ratio * ((a - d) / ad2 - (a - c) / ca2),
        ratio * ((b - c) / bc2 - (b - d) / db2),
        ratio * ((c - b) / bc2 - (c - a) / ca2),
        ratio * ((d - a) / ad2 - (d - b) / db2),
    ]
}
