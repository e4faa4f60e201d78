//! Math utilities and types
//!
//! Provides the fundamental math types for the transform hierarchy and the
//! stateless construction of a local matrix from a [`Transform`].
//!
//! All matrices follow nalgebra's column-vector convention: a point is
//! transformed as `M * p`, so `A * B` applies `B` first.

use serde::{Deserialize, Serialize};

use crate::scene::SceneError;

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Rotation3, Unit, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Order in which the three Euler rotations are applied.
///
/// `Xyz` rotates about X first, then Y, then Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum AxisOrder {
    /// X, then Y, then Z (roll, pitch, yaw)
    #[default]
    Xyz = 0,
    /// X, then Z, then Y
    Xzy = 1,
    /// Y, then X, then Z
    Yxz = 2,
    /// Y, then Z, then X
    Yzx = 3,
    /// Z, then X, then Y
    Zxy = 4,
    /// Z, then Y, then X
    Zyx = 5,
}

impl AxisOrder {
    /// Every axis order, in discriminant order
    pub const ALL: [Self; 6] = [Self::Xyz, Self::Xzy, Self::Yxz, Self::Yzx, Self::Zxy, Self::Zyx];

    /// Build the rotation matrix for Euler `angles` (radians, one per axis)
    pub fn rotation_matrix(self, angles: &Vec3) -> Mat4 {
        let rx = || Mat4::from_axis_angle(&Vec3::x_axis(), angles.x);
        let ry = || Mat4::from_axis_angle(&Vec3::y_axis(), angles.y);
        let rz = || Mat4::from_axis_angle(&Vec3::z_axis(), angles.z);

        match self {
            // roll/pitch/yaw composes to Rz * Ry * Rx directly
            Self::Xyz => {
                Rotation3::from_euler_angles(angles.x, angles.y, angles.z).to_homogeneous()
            }
            Self::Xzy => ry() * rz() * rx(),
            Self::Yxz => rz() * rx() * ry(),
            Self::Yzx => rx() * rz() * ry(),
            Self::Zxy => ry() * rx() * rz(),
            Self::Zyx => rx() * ry() * rz(),
        }
    }
}

impl TryFrom<u8> for AxisOrder {
    type Error = SceneError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(SceneError::InvalidEnum { kind: "axis order", value })
    }
}

/// Order in which scale, rotation and translation are applied.
///
/// `Srt` scales first, then rotates, then translates (`T * R * S`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompositionOrder {
    /// Scale, rotate, translate
    #[default]
    Srt = 0,
    /// Scale, translate, rotate
    Str = 1,
    /// Rotate, scale, translate
    Rst = 2,
    /// Rotate, translate, scale
    Rts = 3,
    /// Translate, scale, rotate
    Tsr = 4,
    /// Translate, rotate, scale
    Trs = 5,
}

impl CompositionOrder {
    /// Every composition order, in discriminant order
    pub const ALL: [Self; 6] = [Self::Srt, Self::Str, Self::Rst, Self::Rts, Self::Tsr, Self::Trs];

    /// Combine the three sub-matrices in this order
    pub fn compose(self, translation: &Mat4, rotation: &Mat4, scale: &Mat4) -> Mat4 {
        let (t, r, s) = (translation, rotation, scale);
        match self {
            Self::Srt => t * r * s,
            Self::Str => r * t * s,
            Self::Rst => t * s * r,
            Self::Rts => s * t * r,
            Self::Tsr => r * s * t,
            Self::Trs => s * r * t,
        }
    }
}

impl TryFrom<u8> for CompositionOrder {
    type Error = SceneError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(SceneError::InvalidEnum { kind: "composition order", value })
    }
}

/// Rotation representation carried by a [`Transform`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// Euler angles in radians, combined using the transform's [`AxisOrder`]
    Euler(Vec3),
    /// Unit quaternion; the axis order is ignored
    Quaternion(Quat),
}

impl Default for Rotation {
    fn default() -> Self {
        Self::Euler(Vec3::zeros())
    }
}

impl Rotation {
    /// Homogeneous rotation matrix for this rotation
    pub fn to_matrix(&self, axis_order: AxisOrder) -> Mat4 {
        match self {
            Self::Euler(angles) => axis_order.rotation_matrix(angles),
            Self::Quaternion(quat) => quat.to_homogeneous(),
        }
    }
}

/// Transform representing position, rotation, and scale plus the two
/// ordering policies used to combine them.
///
/// Building a matrix is a pure function of these fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position relative to the parent
    pub position: Vec3,

    /// Rotation relative to the parent
    pub rotation: Rotation,

    /// Scale factors
    pub scale: Vec3,

    /// How Euler angles are combined
    pub axis_order: AxisOrder,

    /// How translation, rotation and scale are combined
    pub composition_order: CompositionOrder,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Rotation::default(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            axis_order: AxisOrder::default(),
            composition_order: CompositionOrder::default(),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Identity transform using the given ordering policies
    pub fn with_orders(axis_order: AxisOrder, composition_order: CompositionOrder) -> Self {
        Self {
            axis_order,
            composition_order,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        let translation = Mat4::new_translation(&self.position);
        let rotation = self.rotation.to_matrix(self.axis_order);
        let scale = Mat4::new_nonuniform_scaling(&self.scale);
        self.composition_order.compose(&translation, &rotation, &scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.to_matrix().transform_point(&point)
    }
}

/// Split an affine matrix into translation, rotation and per-axis scale.
///
/// Zero-length basis columns yield a zero scale on that axis and an
/// identity contribution to the rotation.
pub fn decompose_trs(matrix: &Mat4) -> (Vec3, Quat, Vec3) {
    let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

    let mut basis = matrix.fixed_view::<3, 3>(0, 0).into_owned();
    let mut scale = Vec3::zeros();
    for axis in 0..3 {
        let length = basis.column(axis).magnitude();
        scale[axis] = length;
        if approx::abs_diff_eq!(length, 0.0) {
            basis.set_column(axis, &Vec3::ith(axis, 1.0));
        } else {
            let unit = basis.column(axis) / length;
            basis.set_column(axis, &unit);
        }
    }

    let rotation = Quat::from_matrix(&basis);
    (position, rotation, scale)
}

/// Inverse of [`decompose_trs`]: `T * R * S`
pub fn compose_trs(position: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::new_translation(&position)
        * rotation.to_homogeneous()
        * Mat4::new_nonuniform_scaling(&scale)
}

/// Translation component of an affine matrix
pub fn translation_of(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix.m14, matrix.m24, matrix.m34)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_identity_transform_builds_identity_matrix() {
        assert_relative_eq!(Transform::identity().to_matrix(), Mat4::identity(), epsilon = EPSILON);
    }

    #[test]
    fn test_srt_matches_translation_rotation_scale_product() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Rotation::Euler(Vec3::new(0.0, FRAC_PI_2, 0.0)),
            scale: Vec3::new(2.0, 2.0, 2.0),
            ..Default::default()
        };

        let point = transform.transform_point(Point3::new(1.0, 0.0, 0.0));

        // Scale to (2,0,0), rotate about Y to (0,0,-2), translate
        assert_relative_eq!(point, Point3::new(1.0, 2.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_trs_translates_before_scaling() {
        let transform = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            scale: Vec3::new(3.0, 3.0, 3.0),
            composition_order: CompositionOrder::Trs,
            ..Default::default()
        };

        let point = transform.transform_point(Point3::origin());
        assert_relative_eq!(point, Point3::new(3.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_xyz_shortcut_matches_explicit_product() {
        let angles = Vec3::new(0.3, -0.7, 1.1);
        let explicit = Mat4::from_axis_angle(&Vec3::z_axis(), angles.z)
            * Mat4::from_axis_angle(&Vec3::y_axis(), angles.y)
            * Mat4::from_axis_angle(&Vec3::x_axis(), angles.x);

        assert_relative_eq!(AxisOrder::Xyz.rotation_matrix(&angles), explicit, epsilon = EPSILON);
    }

    #[test]
    fn test_axis_orders_differ_for_compound_rotation() {
        let angles = Vec3::new(FRAC_PI_2, FRAC_PI_2, 0.0);
        let xyz = AxisOrder::Xyz.rotation_matrix(&angles);
        let yxz = AxisOrder::Yxz.rotation_matrix(&angles);

        assert!((xyz - yxz).abs().max() > 0.5);
    }

    #[test]
    fn test_quaternion_ignores_axis_order() {
        let quat = Quat::from_axis_angle(&Vec3::y_axis(), 0.8);
        let mut transform = Transform {
            rotation: Rotation::Quaternion(quat),
            ..Default::default()
        };
        let first = transform.to_matrix();
        transform.axis_order = AxisOrder::Zyx;

        assert_relative_eq!(transform.to_matrix(), first, epsilon = EPSILON);
    }

    #[test]
    fn test_out_of_range_orders_are_rejected() {
        assert_eq!(AxisOrder::try_from(5_u8), Ok(AxisOrder::Zyx));
        assert_eq!(
            AxisOrder::try_from(6_u8),
            Err(SceneError::InvalidEnum { kind: "axis order", value: 6 })
        );
        assert_eq!(CompositionOrder::try_from(2_u8), Ok(CompositionOrder::Rst));
        assert!(matches!(
            CompositionOrder::try_from(200_u8),
            Err(SceneError::InvalidEnum { value: 200, .. })
        ));
    }

    #[test]
    fn test_decompose_recovers_components() {
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), 0.5);
        let matrix = compose_trs(Vec3::new(4.0, -1.0, 2.0), rotation, Vec3::new(1.0, 2.0, 3.0));

        let (position, recovered, scale) = decompose_trs(&matrix);

        assert_relative_eq!(position, Vec3::new(4.0, -1.0, 2.0), epsilon = EPSILON);
        assert_relative_eq!(scale, Vec3::new(1.0, 2.0, 3.0), epsilon = EPSILON);
        assert_relative_eq!(recovered.angle_to(&rotation), 0.0, epsilon = 1e-3);
    }
}
