//! View frustum and AABB containment classification

use crate::foundation::math::{Mat4, Vec3, Vec4};

use super::AABB;

/// Result of testing a bounding box against a [`Frustum`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Containment {
    /// Entirely outside at least one plane
    Disjoint,
    /// Straddles one or more planes
    Intersecting,
    /// Entirely inside every plane
    Contained,
}

/// Plane defined by normal and distance from origin
///
/// Points with a non-negative signed distance are on the inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (should be normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Plane `a*x + b*y + c*z + d = 0`, rescaled to a unit normal
    pub fn from_coefficients(coefficients: &Vec4) -> Self {
        let normal = coefficients.xyz();
        let length = normal.magnitude();
        if length > 0.0 {
            Self { normal: normal / length, distance: coefficients.w / length }
        } else {
            Self { normal, distance: coefficients.w }
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for clip-space depth in `[-1, 1]`, which
    /// matches nalgebra's `new_perspective` and `new_orthographic`.
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { view_projection.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(&(r3 + r0)),
                Plane::from_coefficients(&(r3 - r0)),
                Plane::from_coefficients(&(r3 + r1)),
                Plane::from_coefficients(&(r3 - r1)),
                Plane::from_coefficients(&(r3 + r2)),
                Plane::from_coefficients(&(r3 - r2)),
            ],
        }
    }

    /// Classify an AABB against the frustum
    ///
    /// The empty box is always [`Containment::Disjoint`]. The test is
    /// conservative: a box near a frustum corner may report `Intersecting`
    /// while being outside.
    pub fn classify(&self, aabb: &AABB) -> Containment {
        if aabb.is_empty() {
            return Containment::Disjoint;
        }

        let mut result = Containment::Contained;
        for plane in &self.planes {
            // Corner furthest along the normal, and the one opposite it
            let mut positive = aabb.min;
            let mut negative = aabb.max;
            for axis in 0..3 {
                if plane.normal[axis] >= 0.0 {
                    positive[axis] = aabb.max[axis];
                    negative[axis] = aabb.min[axis];
                }
            }

            if plane.distance_to_point(positive) < 0.0 {
                return Containment::Disjoint;
            }
            if plane.distance_to_point(negative) < 0.0 {
                result = Containment::Intersecting;
            }
        }

        result
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.classify(aabb) != Containment::Disjoint
    }
}
