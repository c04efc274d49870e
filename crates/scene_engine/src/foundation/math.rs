//! Math utilities and types
//!
//! Provides the vector, matrix and quaternion aliases used by the scene graph,
//! plus the TRS [`Transform`] and the matrix helpers used when composing world
//! transforms. All matrices follow nalgebra's column-vector convention: a
//! parent transform is applied *after* a child's local one, so
//! `world = parent * local`.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Columns shorter than this are treated as collapsed and left untouched
/// when stripping scale.
const SCALE_EPSILON: f32 = 1.0e-6;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
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

    /// Builder pattern: Set rotation from axis-angle
    #[must_use]
    pub fn with_rotation_axis_angle(mut self, axis: Vec3, angle: f32) -> Self {
        self.rotation = Quat::from_axis_angle(&Unit::new_normalize(axis), angle);
        self
    }

    /// Builder pattern: Set scale (uniform)
    #[must_use]
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Builder pattern: Set scale (non-uniform)
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a transformation matrix (`T * R * S`)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Extract the per-axis scale encoded in the upper 3x3 of a matrix.
pub fn scale_of(matrix: &Mat4) -> Vec3 {
    Vec3::new(
        column_length(matrix, 0),
        column_length(matrix, 1),
        column_length(matrix, 2),
    )
}

/// A pure scaling matrix holding only the scale component of `matrix`.
pub fn scale_part(matrix: &Mat4) -> Mat4 {
    Mat4::new_nonuniform_scaling(&scale_of(matrix))
}

/// Return `matrix` with its scale set to one, keeping rotation and translation.
///
/// Used when a parent's world transform becomes the base for a child: scale
/// never propagates down the hierarchy, only translation and rotation do.
pub fn without_scale(matrix: &Mat4) -> Mat4 {
    let mut result = *matrix;
    for column in 0..3 {
        let length = column_length(matrix, column);
        if length > SCALE_EPSILON {
            for row in 0..3 {
                result[(row, column)] /= length;
            }
        }
    }
    result
}

fn column_length(matrix: &Mat4, column: usize) -> f32 {
    Vec3::new(
        matrix[(0, column)],
        matrix[(1, column)],
        matrix[(2, column)],
    )
    .magnitude()
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;
}

/// Extension trait for Mat4 with camera helpers
pub trait Mat4Ext {
    /// Create a right-handed perspective projection matrix with [0, 1] depth
    ///
    /// The camera looks down -Z, as with [`Mat4Ext::look_at`]. Points on the
    /// near plane map to depth 0 and points on the far plane to depth 1.
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (near - far);
        result[(2, 3)] = (near * far) / (near - far);
        result[(3, 2)] = -1.0;
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new_translation(&-eye);
        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }
}
