/// Errors surfaced by the rendering core
use thiserror::Error;

/// Construction and shape errors.
///
/// Degenerate geometry (zero-area faces, vertices with `w <= 0`) and pixels
/// outside the viewport are never reported through this type; they are
/// dropped during rasterization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("invalid viewport {width}x{height}: both sides must be non-zero")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid clip planes: near = {near}, far = {far} (need 0 < near < far)")]
    InvalidClipPlanes { near: f32, far: f32 },

    #[error("invalid aspect ratio {0} (must be positive and finite)")]
    InvalidAspect(f32),

    #[error("invalid vertical field of view {0} rad (must be in (0, pi))")]
    InvalidFieldOfView(f32),

    #[error("degenerate camera orientation: view direction is zero or parallel to up")]
    DegenerateOrientation,

    #[error("background image is {actual_width}x{actual_height}, viewport is {width}x{height}")]
    BackgroundSizeMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("face {face} references vertex {index}, mesh has {vertex_count} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        index: usize,
        vertex_count: usize,
    },
}

pub type Result<T> = std::result::Result<T, RenderError>;
