/// Sequential image files, decoded on demand
///
/// Background images for a render device come from here: a sorted list of
/// files, walked front to back, each decoded to 8-bit RGB when asked for.
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;

/// Extensions picked up by [`FileImageSource::from_directory`].
const IMAGE_EXTENSIONS: &[&str] = &[
    "bmp", "png", "jpg", "jpeg", "jpe", "ppm", "pgm", "pbm", "pnm", "tif", "tiff",
];

#[derive(Debug, Error)]
pub enum ImageSourceError {
    #[error("file '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode '{}': {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone)]
pub struct FileImageSource {
    files: Vec<PathBuf>,
    index: usize,
}

impl FileImageSource {
    /// A source holding a single file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImageSourceError> {
        Self::from_paths([path])
    }

    /// Every path must exist. The list is sorted.
    pub fn from_paths<I, P>(paths: I) -> Result<Self, ImageSourceError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut files = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                return Err(ImageSourceError::NotFound(path.to_path_buf()));
            }
            files.push(path.to_path_buf());
        }
        files.sort();
        Ok(Self { files, index: 0 })
    }

    /// All regular files in `dir` with a known image extension, sorted.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, ImageSourceError> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(ImageSourceError::NotFound(dir.to_path_buf()));
        }
        let io_error = |source: std::io::Error| ImageSourceError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
        log::debug!("found {} images in {}", files.len(), dir.display());
        Ok(Self { files, index: 0 })
    }

    pub fn names(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Path of the image the next call to `next` will decode.
    pub fn current_name(&self) -> Option<&Path> {
        self.files.get(self.index).map(PathBuf::as_path)
    }

    /// Decode the current image without advancing. `None` once exhausted.
    pub fn current_image(&self) -> Option<Result<RgbImage, ImageSourceError>> {
        self.current_name().map(decode)
    }

    /// Go back to the first image.
    pub fn rewind(&mut self) {
        self.index = 0;
    }
}

impl Iterator for FileImageSource {
    type Item = Result<RgbImage, ImageSourceError>;

    /// Decode the current image, then advance.
    fn next(&mut self) -> Option<Self::Item> {
        let image = self.current_image()?;
        self.index += 1;
        Some(image)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.files.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn decode(path: &Path) -> Result<RgbImage, ImageSourceError> {
    let image = image::open(path).map_err(|source| ImageSourceError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    log::trace!("decoded {}", path.display());
    Ok(image.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_png(dir: &Path, name: &str, shade: u8) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(4, 3, Rgb([shade, shade, shade]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_missing_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.png");
        assert!(matches!(
            FileImageSource::from_path(&missing),
            Err(ImageSourceError::NotFound(path)) if path == missing
        ));
    }

    #[test]
    fn test_paths_sorted_and_decoded_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let b = write_png(dir.path(), "b.png", 20);
        let a = write_png(dir.path(), "a.png", 10);

        let mut source = FileImageSource::from_paths([&b, &a]).unwrap();
        assert_eq!(source.names(), &[a.clone(), b.clone()]);
        assert_eq!(source.current_name(), Some(a.as_path()));

        // Peeking does not advance.
        let peeked = source.current_image().unwrap().unwrap();
        assert_eq!(peeked.get_pixel(0, 0), &Rgb([10, 10, 10]));

        let shades: Vec<u8> = source
            .by_ref()
            .map(|image| image.unwrap().get_pixel(0, 0).0[0])
            .collect();
        assert_eq!(shades, vec![10, 20]);
        assert!(source.current_name().is_none());
        assert!(source.next().is_none());

        source.rewind();
        assert_eq!(source.size_hint(), (2, Some(2)));
    }

    #[test]
    fn test_directory_listing_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "frame_002.png", 2);
        write_png(dir.path(), "frame_001.PNG", 1);
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let source = FileImageSource::from_directory(dir.path()).unwrap();
        let names: Vec<_> = source
            .names()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["frame_001.PNG", "frame_002.png"]);
    }

    #[test]
    fn test_undecodable_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();
        let mut source = FileImageSource::from_path(&path).unwrap();
        assert!(matches!(source.next(), Some(Err(ImageSourceError::Decode { .. }))));
    }
}
