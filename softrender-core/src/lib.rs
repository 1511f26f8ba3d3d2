/// softrender core - a depth-buffered software rasterizer
///
/// A [`RenderDevice`] owns a color and a depth buffer, a [`Camera`] and the
/// world → view → projection → window transform chain, and rasterizes lines
/// and indexed [`Mesh`]es into its buffers. STL loading and a file image
/// source are provided as the usual producers of meshes and backgrounds.

pub mod camera;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod image_source;
pub mod mesh;
pub mod pipeline;
pub mod raster;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use camera::{Camera, ProjectionMode};
pub use device::RenderDevice;
pub use error::{RenderError, Result};
pub use framebuffer::{DepthImage, DEPTH_SENTINEL};
pub use image_source::{FileImageSource, ImageSourceError};
pub use mesh::{Face, Mesh, Vertex};
pub use pipeline::ScreenVertex;
pub use stl::StlError;
pub use transform::{RotationState, Transform};
