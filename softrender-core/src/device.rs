/// The render device: buffers, transforms and draw calls
use image::{Rgb, RgbImage};
use nalgebra::{Matrix4, Point2, Vector4};

use crate::camera::{Camera, ProjectionMode};
use crate::error::Result;
use crate::framebuffer::{DepthImage, Framebuffer, DEFAULT_CLEAR_COLOR};
use crate::mesh::{is_degenerate, Mesh};
use crate::pipeline::{window_matrix, ScreenVertex, TransformPipeline};
use crate::raster;

/// Owns a color buffer, a depth buffer, a camera and the transform chain,
/// and rasterizes lines and meshes into the buffers.
///
/// The device performs no clipping against the view frustum: vertices that
/// land on or behind the eye plane drop the primitives they belong to, and
/// pixels outside the viewport are skipped.
///
/// Not thread-safe. The composed transform is cached in a `Cell`, so the
/// device is `!Sync`; callers serialize access themselves.
#[derive(Debug, Clone)]
pub struct RenderDevice {
    framebuffer: Framebuffer,
    pipeline: TransformPipeline,
    camera: Camera,
}

impl RenderDevice {
    /// Device with the default camera.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_camera(width, height, Camera::new(width, height))
    }

    /// Device with a caller-supplied camera. The camera's aspect ratio is
    /// replaced by the viewport's.
    pub fn with_camera(width: u32, height: u32, mut camera: Camera) -> Result<Self> {
        let framebuffer = Framebuffer::new(width, height, DEFAULT_CLEAR_COLOR)?;
        camera.set_aspect(width as f32 / height as f32)?;
        let pipeline = TransformPipeline::new(
            camera.view_matrix()?,
            camera.projection_matrix()?,
            window_matrix(width, height),
        );
        log::debug!("render device created: {}x{}, {:?} projection", width, height, camera.mode());
        Ok(Self {
            framebuffer,
            pipeline,
            camera,
        })
    }

    pub fn width(&self) -> u32 {
        self.framebuffer.width()
    }

    pub fn height(&self) -> u32 {
        self.framebuffer.height()
    }

    /// Current color buffer, background and drawing included.
    pub fn image(&self) -> &RgbImage {
        self.framebuffer.color()
    }

    /// Current depth buffer; untouched pixels hold `f32::INFINITY`.
    pub fn depth_buffer(&self) -> &DepthImage {
        self.framebuffer.depth()
    }

    pub fn background(&self) -> Option<&RgbImage> {
        self.framebuffer.background()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera access. Changes reach the transforms only through
    /// [`RenderDevice::update_view_transform`] and
    /// [`RenderDevice::update_projection_transform`].
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn clear_color(&self) -> Rgb<u8> {
        self.framebuffer.clear_color()
    }

    /// Color used by [`RenderDevice::reset_buffers`] when no background is set.
    pub fn set_clear_color(&mut self, color: Rgb<u8>) {
        self.framebuffer.set_clear_color(color);
    }

    /// Use `image` as the base layer of the color buffer.
    ///
    /// The image must match the viewport exactly; otherwise nothing changes
    /// and [`RenderError::BackgroundSizeMismatch`] is returned.
    pub fn set_background_image(&mut self, image: RgbImage) -> Result<()> {
        self.framebuffer.set_background(image)
    }

    pub fn clear_background_image(&mut self) {
        self.framebuffer.clear_background();
    }

    /// Discard all drawing since the last reset.
    pub fn reset_buffers(&mut self) {
        self.framebuffer.reset();
    }

    /// Resize the viewport.
    ///
    /// Fresh buffers are built before anything is replaced, so a rejected
    /// size leaves the device untouched. The background is dropped, the
    /// window transform rebuilt, and the camera aspect and projection follow
    /// the new size.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        let framebuffer = self.framebuffer.resized(width, height)?;
        let mut camera = self.camera.clone();
        camera.set_aspect(width as f32 / height as f32)?;
        let projection = camera.projection_matrix()?;

        self.framebuffer = framebuffer;
        self.camera = camera;
        self.pipeline.set_projection(projection);
        self.pipeline.set_window(window_matrix(width, height));
        log::debug!("viewport set to {}x{}", width, height);
        Ok(())
    }

    pub fn world_transform(&self) -> &Matrix4<f32> {
        self.pipeline.world()
    }

    pub fn view_transform(&self) -> &Matrix4<f32> {
        self.pipeline.view()
    }

    pub fn projection_transform(&self) -> &Matrix4<f32> {
        self.pipeline.projection()
    }

    pub fn window_transform(&self) -> &Matrix4<f32> {
        self.pipeline.window()
    }

    /// `window * projection * view * world`.
    pub fn composed_transform(&self) -> Matrix4<f32> {
        self.pipeline.composed()
    }

    /// Replace the world (model) matrix. Singular matrices are accepted.
    pub fn set_world_transform(&mut self, world: Matrix4<f32>) {
        self.pipeline.set_world(world);
    }

    /// Rebuild the view matrix from the camera's current position and orientation.
    pub fn update_view_transform(&mut self) -> Result<()> {
        let view = self.camera.view_matrix()?;
        self.pipeline.set_view(view);
        Ok(())
    }

    /// Rebuild the projection matrix, perspective or orthographic. The
    /// camera's mode is switched accordingly.
    pub fn update_projection_transform(&mut self, perspective: bool) -> Result<()> {
        let mode = ProjectionMode::from_perspective(perspective);
        let projection = self.camera.projection_matrix_for(mode)?;
        self.camera.set_mode(mode);
        self.pipeline.set_projection(projection);
        Ok(())
    }

    /// Window coordinates of `vertex`, or `None` when it has no valid
    /// projection (`w <= 0` after the transform, or non-finite).
    pub fn project_vertex(&self, vertex: Vector4<f32>) -> Option<Point2<f32>> {
        self.pipeline.project(&vertex).map(|projected| projected.position)
    }

    /// [`RenderDevice::project_vertex`] over a list; order and length are
    /// preserved and unprojectable vertices come back as `None`.
    pub fn project_vertex_list(&self, vertices: &[Vector4<f32>]) -> Vec<Option<Point2<f32>>> {
        vertices
            .iter()
            .map(|vertex| self.project_vertex(*vertex))
            .collect()
    }

    /// Draw a line segment over whatever is in the color buffer.
    ///
    /// No depth test and no depth write. If either endpoint cannot be
    /// projected, nothing is drawn.
    pub fn render_line(&mut self, p0: Vector4<f32>, p1: Vector4<f32>, color: Rgb<u8>) {
        match (self.pipeline.project(&p0), self.pipeline.project(&p1)) {
            (Some(from), Some(to)) => {
                raster::draw_line(&mut self.framebuffer, from.position, to.position, color);
            }
            _ => log::trace!("line {:?} -> {:?} skipped: endpoint not projectable", p0, p1),
        }
    }

    /// Rasterize every face of `mesh` with depth testing.
    ///
    /// Faces that repeat a vertex index, touch an unprojectable vertex or
    /// project to zero area are skipped. Returns the number of pixels written.
    pub fn render_mesh(&mut self, mesh: &Mesh) -> usize {
        let projected: Vec<Option<ScreenVertex>> = mesh
            .vertices()
            .iter()
            .map(|vertex| self.pipeline.project(&vertex.position))
            .collect();

        let mut written = 0;
        let mut skipped = 0;
        for face in mesh.faces() {
            if is_degenerate(face) {
                skipped += 1;
                continue;
            }
            let corners = [projected[face[0]], projected[face[1]], projected[face[2]]];
            let [Some(a), Some(b), Some(c)] = corners else {
                skipped += 1;
                continue;
            };
            let colors = face.map(|index| mesh.vertices()[index].color);
            written += raster::fill_triangle(&mut self.framebuffer, [a, b, c], colors);
        }
        log::trace!(
            "mesh rendered: {} faces, {} skipped, {} pixels written",
            mesh.faces().len(),
            skipped,
            written
        );
        written
    }
}
