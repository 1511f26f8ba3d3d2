/// World-matrix builders
use nalgebra::{Matrix4, Vector3};

/// Euler angles in radians, applied Z, then Y, then X.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Rotate by delta amounts (in radians), wrapping each angle into `[0, 2π)`.
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        let tau = std::f32::consts::TAU;
        self.x = (self.x + dx).rem_euclid(tau);
        self.y = (self.y + dy).rem_euclid(tau);
        self.z = (self.z + dz).rem_euclid(tau);
    }
}

/// Builders for the matrices handed to `RenderDevice::set_world_transform`.
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from a rotation state
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(rotation.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z));
        rz * ry * rx
    }

    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    pub fn scale_matrix(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Rotate about the local origin, then move to `translation`.
    pub fn model_matrix(rotation: &RotationState, translation: Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_translation(&translation) * Self::rotation_matrix(rotation)
    }
}
