//! Plane and quadric error metric primitives
//!
//! A [`Quadric`] is the symmetric 4x4 matrix `Q = p pᵀ` of a plane
//! `p = (a, b, c, d)`, or a sum of such matrices. Evaluating it at the
//! homogeneous point `[x, y, z, 1]` yields the summed squared distance to
//! every contributing plane.

use std::ops::{Add, AddAssign};

use nalgebra::Matrix4;
use lodcrate_core::{Point3d, Vector3d};

/// Determinant magnitude below which the 3x3 solve is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-10;

/// Plane `ax + by + cz + d = 0` with a unit normal `(a, b, c)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Plane {
    /// Stand-in plane for zero-area triangles.
    pub const NEUTRAL: Plane = Plane {
        a: 0.0,
        b: 0.0,
        c: 1.0,
        d: 0.0,
    };

    /// Plane through three points, oriented by `(p1 - p0) x (p2 - p0)`.
    ///
    /// Collinear or coincident points yield [`Plane::NEUTRAL`].
    pub fn from_points(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> Self {
        let n = (p1 - p0).cross(&(p2 - p0));
        match n.try_normalize(0.0) {
            Some(n) if n.iter().all(|x| x.is_finite()) => Plane {
                a: n.x,
                b: n.y,
                c: n.z,
                d: -n.dot(&p0.coords),
            },
            _ => Plane::NEUTRAL,
        }
    }

    /// Signed distance from `p` to the plane.
    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        self.a * p.x + self.b * p.y + self.c * p.z + self.d
    }
}

/// Upper-left 3x3 block of a quadric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetricMatrix3 {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yy: f64,
    pub yz: f64,
    pub zz: f64,
}

impl SymmetricMatrix3 {
    fn columns(&self) -> [Vector3d; 3] {
        [
            Vector3d::new(self.xx, self.xy, self.xz),
            Vector3d::new(self.xy, self.yy, self.yz),
            Vector3d::new(self.xz, self.yz, self.zz),
        ]
    }

    pub fn determinant(&self) -> f64 {
        let [c0, c1, c2] = self.columns();
        det3(&c0, &c1, &c2)
    }

    /// Solve `A x = rhs` by Cramer's rule.
    ///
    /// Returns `None` when `|det(A)| < SINGULAR_EPSILON`.
    pub fn solve_cramer(&self, rhs: &Vector3d) -> Option<Vector3d> {
        let [c0, c1, c2] = self.columns();
        let det = det3(&c0, &c1, &c2);
        if det.abs() < SINGULAR_EPSILON {
            return None;
        }
        let x = det3(rhs, &c1, &c2) / det;
        let y = det3(&c0, rhs, &c2) / det;
        let z = det3(&c0, &c1, rhs) / det;
        let solution = Vector3d::new(x, y, z);
        solution.iter().all(|v| v.is_finite()).then_some(solution)
    }
}

/// Determinant of the 3x3 matrix with the given columns.
#[inline]
fn det3(c0: &Vector3d, c1: &Vector3d, c2: &Vector3d) -> f64 {
    c0.dot(&c1.cross(c2))
}

/// Symmetric 4x4 error matrix stored as its 10 independent coefficients.
///
/// Layout (upper triangle, row-major):
///
/// ```text
/// [ aa ab ac ad ]
/// [    bb bc bd ]
/// [       cc cd ]
/// [          dd ]
/// ```
///
/// Only ever built from planes or by summing other quadrics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quadric {
    coeffs: [f64; 10],
}

impl Quadric {
    pub const fn zero() -> Self {
        Self { coeffs: [0.0; 10] }
    }

    /// Fundamental quadric `p pᵀ` of a plane.
    pub fn from_plane(p: &Plane) -> Self {
        let (a, b, c, d) = (p.a, p.b, p.c, p.d);
        Self {
            coeffs: [
                a * a, a * b, a * c, a * d,
                b * b, b * c, b * d,
                c * c, c * d,
                d * d,
            ],
        }
    }

    pub fn coefficients(&self) -> &[f64; 10] {
        &self.coeffs
    }

    /// Homogeneous quadratic form `vᵀ Q v` with `v = [x, y, z, 1]`.
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let [aa, ab, ac, ad, bb, bc, bd, cc, cd, dd] = self.coeffs;
        let (x, y, z) = (p.x, p.y, p.z);
        aa * x * x
            + 2.0 * ab * x * y
            + 2.0 * ac * x * z
            + 2.0 * ad * x
            + bb * y * y
            + 2.0 * bc * y * z
            + 2.0 * bd * y
            + cc * z * z
            + 2.0 * cd * z
            + dd
    }

    /// The system `A v = b` whose solution minimises the error.
    pub fn linear_system(&self) -> (SymmetricMatrix3, Vector3d) {
        let [aa, ab, ac, ad, bb, bc, bd, cc, cd, _] = self.coeffs;
        (
            SymmetricMatrix3 {
                xx: aa,
                xy: ab,
                xz: ac,
                yy: bb,
                yz: bc,
                zz: cc,
            },
            Vector3d::new(-ad, -bd, -cd),
        )
    }

    /// Error-minimising point, or `None` if the system is singular.
    pub fn optimal_point(&self) -> Option<Point3d> {
        let (a, b) = self.linear_system();
        a.solve_cramer(&b).map(Point3d::from)
    }

    /// Expand into a full symmetric matrix.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let [aa, ab, ac, ad, bb, bc, bd, cc, cd, dd] = self.coeffs;
        Matrix4::new(
            aa, ab, ac, ad,
            ab, bb, bc, bd,
            ac, bc, cc, cd,
            ad, bd, cd, dd,
        )
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, rhs: Self) {
        for (l, r) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *l += r;
        }
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

/// Sum each face's fundamental quadric into its three vertices.
///
/// Faces must reference valid vertex indices.
pub fn accumulate_vertex_quadrics(positions: &[Point3d], faces: &[[usize; 3]]) -> Vec<Quadric> {
    let mut quadrics = vec![Quadric::zero(); positions.len()];
    for face in faces {
        let plane = Plane::from_points(
            &positions[face[0]],
            &positions[face[1]],
            &positions[face[2]],
        );
        let q = Quadric::from_plane(&plane);
        for &v in face {
            quadrics[v] += q;
        }
    }
    quadrics
}
