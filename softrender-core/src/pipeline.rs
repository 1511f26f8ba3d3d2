/// World → view → projection → window transform chain
use std::cell::Cell;

use nalgebra::{Matrix4, Point2, Vector4};

/// Transformed `w` at or below this is behind the eye or at infinity.
const MIN_CLIP_W: f32 = 1e-6;

/// A vertex after the full transform and the perspective divide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenVertex {
    /// Window coordinates in pixels, `(0, 0)` at the top-left corner.
    pub position: Point2<f32>,
    /// Normalized device depth in `[-1, 1]` for points between the clip planes.
    pub depth: f32,
    /// `1 / w` of the transformed vertex, kept for perspective-correct interpolation.
    pub inv_w: f32,
}

/// Affine map from normalized device coordinates to pixel coordinates.
///
/// NDC x in `[-1, 1]` maps to `[0, width]` and NDC y in `[-1, 1]` maps to
/// `[height, 0]`: image rows run top to bottom while NDC y points up. Depth
/// passes through untouched. Written as a 4x4 matrix so it can sit in front
/// of the projection matrix; since it leaves `w` alone, dividing afterwards
/// gives the same result as dividing first.
pub fn window_matrix(width: u32, height: u32) -> Matrix4<f32> {
    let half_w = width as f32 / 2.0;
    let half_h = height as f32 / 2.0;
    #[rustfmt::skip]
    let matrix = Matrix4::new(
        half_w, 0.0,     0.0, half_w,
        0.0,    -half_h, 0.0, half_h,
        0.0,    0.0,     1.0, 0.0,
        0.0,    0.0,     0.0, 1.0,
    );
    matrix
}

/// The four transforms of a render device and their cached product.
///
/// Each setter invalidates the cache; the product is rebuilt on the next
/// projection. The cache lives in a [`Cell`], so a pipeline must not be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    world: Matrix4<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    window: Matrix4<f32>,
    composed: Cell<Option<Matrix4<f32>>>,
}

impl TransformPipeline {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>, window: Matrix4<f32>) -> Self {
        Self {
            world: Matrix4::identity(),
            view,
            projection,
            window,
            composed: Cell::new(None),
        }
    }

    pub fn world(&self) -> &Matrix4<f32> {
        &self.world
    }

    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn window(&self) -> &Matrix4<f32> {
        &self.window
    }

    pub fn set_world(&mut self, world: Matrix4<f32>) {
        self.world = world;
        self.composed.set(None);
    }

    pub fn set_view(&mut self, view: Matrix4<f32>) {
        self.view = view;
        self.composed.set(None);
    }

    pub fn set_projection(&mut self, projection: Matrix4<f32>) {
        self.projection = projection;
        self.composed.set(None);
    }

    pub fn set_window(&mut self, window: Matrix4<f32>) {
        self.window = window;
        self.composed.set(None);
    }

    /// `window * projection * view * world`, rebuilt only after a setter ran.
    pub fn composed(&self) -> Matrix4<f32> {
        match self.composed.get() {
            Some(matrix) => matrix,
            None => {
                let matrix = self.window * self.projection * self.view * self.world;
                self.composed.set(Some(matrix));
                matrix
            }
        }
    }

    /// Full transform plus perspective divide.
    ///
    /// `None` when the transformed `w` is not positive (the vertex sits on or
    /// behind the eye plane) or the result is not finite.
    pub fn project(&self, vertex: &Vector4<f32>) -> Option<ScreenVertex> {
        let clip = self.composed() * vertex;
        if !(clip.w > MIN_CLIP_W) {
            return None;
        }
        let inv_w = 1.0 / clip.w;
        let projected = ScreenVertex {
            position: Point2::new(clip.x * inv_w, clip.y * inv_w),
            depth: clip.z * inv_w,
            inv_w,
        };
        let finite = projected.position.x.is_finite()
            && projected.position.y.is_finite()
            && projected.depth.is_finite();
        finite.then_some(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use approx::assert_relative_eq;

    fn default_pipeline(width: u32, height: u32) -> TransformPipeline {
        let camera = Camera::new(width, height);
        TransformPipeline::new(
            camera.view_matrix().unwrap(),
            camera.projection_matrix().unwrap(),
            window_matrix(width, height),
        )
    }

    #[test]
    fn test_window_matrix_flips_y() {
        let window = window_matrix(640, 480);
        let top_left = window * Vector4::new(-1.0, 1.0, 0.25, 1.0);
        assert_relative_eq!(top_left, Vector4::new(0.0, 0.0, 0.25, 1.0));
        let bottom_right = window * Vector4::new(1.0, -1.0, 0.0, 1.0);
        assert_relative_eq!(bottom_right, Vector4::new(640.0, 480.0, 0.0, 1.0));
    }

    #[test]
    fn test_origin_projects_to_viewport_center() {
        let pipeline = default_pipeline(200, 100);
        let projected = pipeline.project(&Vector4::new(0.0, 0.0, 0.0, 1.0)).unwrap();
        assert_relative_eq!(projected.position, Point2::new(100.0, 50.0), epsilon = 1e-4);
        assert!(projected.depth > -1.0 && projected.depth < 1.0);
        assert_relative_eq!(projected.inv_w, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_nearer_points_have_smaller_depth() {
        let pipeline = default_pipeline(100, 100);
        let far = pipeline.project(&Vector4::new(0.0, 0.0, -3.0, 1.0)).unwrap();
        let near = pipeline.project(&Vector4::new(0.0, 0.0, 3.0, 1.0)).unwrap();
        assert!(near.depth < far.depth);
    }

    #[test]
    fn test_vertices_behind_eye_are_excluded() {
        let pipeline = default_pipeline(100, 100);
        // The eye sits at z = 5 looking towards -z.
        assert!(pipeline.project(&Vector4::new(0.0, 0.0, 5.0, 1.0)).is_none());
        assert!(pipeline.project(&Vector4::new(0.0, 0.0, 9.0, 1.0)).is_none());
        assert!(pipeline.project(&Vector4::new(0.0, 0.0, 0.0, 0.0)).is_none());
        assert!(pipeline
            .project(&Vector4::new(f32::NAN, 0.0, 0.0, 1.0))
            .is_none());
    }

    #[test]
    fn test_cache_invalidated_by_setters() {
        let mut pipeline = default_pipeline(100, 100);
        let before = pipeline.composed();
        pipeline.set_world(Matrix4::new_translation(&nalgebra::Vector3::new(1.0, 0.0, 0.0)));
        let after = pipeline.composed();
        assert_ne!(before, after);
        assert_eq!(
            after,
            pipeline.window() * pipeline.projection() * pipeline.view() * pipeline.world()
        );

        pipeline.set_window(window_matrix(50, 50));
        assert_ne!(pipeline.composed(), after);
    }

    #[test]
    fn test_identity_chain_is_passthrough() {
        let pipeline =
            TransformPipeline::new(Matrix4::identity(), Matrix4::identity(), Matrix4::identity());
        let projected = pipeline.project(&Vector4::new(4.0, 6.0, 0.5, 2.0)).unwrap();
        assert_eq!(projected.position, Point2::new(2.0, 3.0));
        assert_eq!(projected.depth, 0.25);
        assert_eq!(projected.inv_w, 0.5);
    }
}
