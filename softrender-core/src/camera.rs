/// Camera state and the view/projection matrices derived from it
use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::{RenderError, Result};

/// Below this length a direction is treated as zero.
const ORIENTATION_EPSILON: f32 = 1e-6;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

impl ProjectionMode {
    pub fn from_perspective(perspective: bool) -> Self {
        if perspective {
            Self::Perspective
        } else {
            Self::Orthographic
        }
    }
}

/// Look-at camera with a symmetric view volume.
///
/// Projection matrices map view-space depth to normalized device depth in
/// `[-1, 1]`, near plane at `-1`. The render device's depth buffer uses the
/// same convention: smaller is nearer.
///
/// The fields are private so that the clip-plane, aspect and field-of-view
/// invariants hold for every camera that exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Point3<f32>,
    target: Point3<f32>,
    up: Vector3<f32>,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
    mode: ProjectionMode,
}

impl Camera {
    /// Default camera five units in front of the origin, looking at it.
    pub fn new(width: u32, height: u32) -> Self {
        let aspect = if width > 0 && height > 0 {
            width as f32 / height as f32
        } else {
            1.0
        };
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect,
            near: 0.1,
            far: 100.0,
            mode: ProjectionMode::Perspective,
        }
    }

    /// Perspective camera looking from `position` at `target` with +Y up.
    pub fn perspective(
        position: Point3<f32>,
        target: Point3<f32>,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        validate_fov(fov_y)?;
        validate_aspect(aspect)?;
        validate_clip_planes(near, far)?;
        let camera = Self {
            position,
            target,
            up: Vector3::y(),
            fov_y,
            aspect,
            near,
            far,
            mode: ProjectionMode::Perspective,
        };
        camera.forward()?;
        Ok(camera)
    }

    /// Same parameters as [`Camera::perspective`], orthographic projection.
    pub fn orthographic(
        position: Point3<f32>,
        target: Point3<f32>,
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<Self> {
        let mut camera = Self::perspective(position, target, fov_y, aspect, near, far)?;
        camera.mode = ProjectionMode::Orthographic;
        Ok(camera)
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    pub fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
        log::trace!("camera position set to {:?}", position);
    }

    /// Point the camera at `target` using `up` as the approximate up vector.
    pub fn look_at(&mut self, target: Point3<f32>, up: Vector3<f32>) {
        self.target = target;
        self.up = up;
        log::trace!("camera looking at {:?}, up {:?}", target, up);
    }

    pub fn set_fov(&mut self, fov_y: f32) -> Result<()> {
        validate_fov(fov_y)?;
        self.fov_y = fov_y;
        Ok(())
    }

    pub fn set_aspect(&mut self, aspect: f32) -> Result<()> {
        validate_aspect(aspect)?;
        self.aspect = aspect;
        Ok(())
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> Result<()> {
        validate_clip_planes(near, far)?;
        self.near = near;
        self.far = far;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: ProjectionMode) {
        self.mode = mode;
    }

    /// Create the view matrix (camera transformation).
    ///
    /// Right-handed look-at: the camera looks down its local -Z axis. The
    /// basis is re-orthonormalized from `up`, so the result never shears.
    pub fn view_matrix(&self) -> Result<Matrix4<f32>> {
        self.forward()?;
        Ok(Matrix4::look_at_rh(&self.position, &self.target, &self.up))
    }

    /// Create the projection matrix for the camera's own mode.
    pub fn projection_matrix(&self) -> Result<Matrix4<f32>> {
        self.projection_matrix_for(self.mode)
    }

    /// Create the projection matrix for `mode`.
    ///
    /// The orthographic volume frames the target plane the same way the
    /// perspective frustum does: half height `tan(fov_y / 2) * distance`.
    pub fn projection_matrix_for(&self, mode: ProjectionMode) -> Result<Matrix4<f32>> {
        validate_clip_planes(self.near, self.far)?;
        validate_aspect(self.aspect)?;
        validate_fov(self.fov_y)?;
        match mode {
            ProjectionMode::Perspective => Ok(Matrix4::new_perspective(
                self.aspect,
                self.fov_y,
                self.near,
                self.far,
            )),
            ProjectionMode::Orthographic => {
                let distance = (self.target - self.position).norm();
                if distance < ORIENTATION_EPSILON {
                    return Err(RenderError::DegenerateOrientation);
                }
                let half_height = (self.fov_y / 2.0).tan() * distance;
                let half_width = half_height * self.aspect;
                Ok(Matrix4::new_orthographic(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                ))
            }
        }
    }

    /// Unit view direction, or an error when the orientation has no basis.
    fn forward(&self) -> Result<Vector3<f32>> {
        let direction = self.target - self.position;
        let length = direction.norm();
        if length < ORIENTATION_EPSILON {
            return Err(RenderError::DegenerateOrientation);
        }
        let forward = direction / length;
        if forward.cross(&self.up).norm() < ORIENTATION_EPSILON {
            return Err(RenderError::DegenerateOrientation);
        }
        Ok(forward)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

fn validate_clip_planes(near: f32, far: f32) -> Result<()> {
    if near.is_finite() && far.is_finite() && near > 0.0 && far > near {
        Ok(())
    } else {
        Err(RenderError::InvalidClipPlanes { near, far })
    }
}

fn validate_aspect(aspect: f32) -> Result<()> {
    if aspect.is_finite() && aspect > 0.0 {
        Ok(())
    } else {
        Err(RenderError::InvalidAspect(aspect))
    }
}

fn validate_fov(fov_y: f32) -> Result<()> {
    if fov_y > 0.0 && fov_y < std::f32::consts::PI {
        Ok(())
    } else {
        Err(RenderError::InvalidFieldOfView(fov_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert_eq!(camera.mode(), ProjectionMode::Perspective);
        assert!((camera.aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_view_matrix_is_rigid() {
        let camera = Camera::perspective(
            Point3::new(3.0, 2.0, 4.0),
            Point3::new(0.5, -1.0, 0.0),
            1.0,
            1.5,
            0.1,
            50.0,
        )
        .unwrap();
        let view = camera.view_matrix().unwrap();
        let rotation = view.fixed_view::<3, 3>(0, 0).into_owned();
        assert_relative_eq!(
            rotation * rotation.transpose(),
            nalgebra::Matrix3::identity(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_view_matrix_moves_eye_to_origin() {
        let camera = Camera::default();
        let view = camera.view_matrix().unwrap();
        let eye = view * Vector4::new(0.0, 0.0, 5.0, 1.0);
        assert_relative_eq!(eye, Vector4::new(0.0, 0.0, 0.0, 1.0), epsilon = 1e-6);
        let target = view * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(target, Vector4::new(0.0, 0.0, -5.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_view_matrix_depends_only_on_state() {
        let mut camera = Camera::default();
        let before = camera.view_matrix().unwrap();
        camera.set_position(Point3::new(1.0, 1.0, 1.0));
        camera.set_position(Point3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.view_matrix().unwrap(), before);
    }

    #[test]
    fn test_degenerate_orientation_rejected() {
        let mut camera = Camera::default();
        camera.look_at(Point3::new(0.0, 0.0, 5.0), Vector3::y());
        assert_eq!(camera.view_matrix(), Err(RenderError::DegenerateOrientation));

        camera.look_at(Point3::origin(), Vector3::z());
        assert_eq!(camera.view_matrix(), Err(RenderError::DegenerateOrientation));
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_ndc_bounds() {
        let camera = Camera::default();
        let projection = camera.projection_matrix().unwrap();
        let near = projection * Vector4::new(0.0, 0.0, -0.1, 1.0);
        let far = projection * Vector4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-4);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_orthographic_frames_target_plane() {
        let camera = Camera::new(100, 100);
        let projection = camera
            .projection_matrix_for(ProjectionMode::Orthographic)
            .unwrap();
        let half_height = (camera.fov_y() / 2.0).tan() * 5.0;
        let edge = projection * Vector4::new(0.0, half_height, -5.0, 1.0);
        assert_relative_eq!(edge.y / edge.w, 1.0, epsilon = 1e-5);
        assert_relative_eq!(edge.w, 1.0);
    }

    #[test]
    fn test_invalid_projection_parameters_rejected() {
        let eye = Point3::new(0.0, 0.0, 5.0);
        let origin = Point3::origin();
        assert_eq!(
            Camera::perspective(eye, origin, 1.0, 1.0, 0.0, 10.0),
            Err(RenderError::InvalidClipPlanes { near: 0.0, far: 10.0 })
        );
        assert_eq!(
            Camera::perspective(eye, origin, 1.0, 1.0, 5.0, 5.0),
            Err(RenderError::InvalidClipPlanes { near: 5.0, far: 5.0 })
        );
        assert_eq!(
            Camera::perspective(eye, origin, 1.0, 0.0, 0.1, 10.0),
            Err(RenderError::InvalidAspect(0.0))
        );
        assert!(Camera::perspective(eye, origin, 0.0, 1.0, 0.1, 10.0).is_err());

        let mut camera = Camera::default();
        assert!(camera.set_clip_planes(-1.0, 10.0).is_err());
        assert_eq!(camera.near(), 0.1);
        assert_eq!(camera.far(), 100.0);
    }
}
