//! # Loader Module
//!
//! Decodes captures and turns them into the canonical form every scoring
//! method works on.
//!
//! ## Preprocessing Steps
//! 1. Decode (zune-jpeg for JPEG, image crate otherwise)
//! 2. Convert to single-channel grayscale
//! 3. Resize to the canonical resolution (area interpolation)
//! 4. Global histogram equalization
//!
//! The output is a pure function of the input pixels and the target size.

mod equalize;
pub mod fast_decode;
pub mod fast_resize;

pub use equalize::equalize;
pub use fast_decode::{FastDecoder, ImageFormat};
pub use fast_resize::{resize_gray, resize_rgb, FastResizer, ResizeFilter, ScaleError};

use crate::error::ImageReadError;
use image::{DynamicImage, GrayImage};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// Where a capture comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// An encoded file on disk
    Path(PathBuf),
    /// Encoded bytes already in memory
    Bytes(Vec<u8>),
    /// An already decoded image
    Decoded(DynamicImage),
}

impl ImageSource {
    /// Decode the source into a full-resolution image
    pub fn load(&self) -> Result<DynamicImage, ImageReadError> {
        let image = match self {
            ImageSource::Path(path) => FastDecoder::decode(path)?,
            ImageSource::Bytes(bytes) => FastDecoder::decode_bytes(bytes)?,
            ImageSource::Decoded(image) => image.clone(),
        };

        if image.width() == 0 || image.height() == 0 {
            return Err(ImageReadError::EmptyImage {
                path: PathBuf::from(self.to_string()),
            });
        }

        Ok(image)
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => write!(f, "{}", path.display()),
            ImageSource::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            ImageSource::Decoded(image) => write!(f, "<{}x{} image>", image.width(), image.height()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&std::path::Path> for ImageSource {
    fn from(path: &std::path::Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Decoded(image)
    }
}

/// A grayscale, canonical-size, equalized capture
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedImage {
    pixels: GrayImage,
}

impl PreprocessedImage {
    /// Wrap an already-prepared grayscale buffer
    pub fn from_gray(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    /// Borrow the underlying pixels
    pub fn pixels(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Turns captures into [`PreprocessedImage`]s
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    width: u32,
    height: u32,
}

impl Preprocessor {
    /// Create a preprocessor for the given canonical resolution
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Decode and preprocess a capture
    pub fn preprocess(&self, source: &ImageSource) -> Result<PreprocessedImage, ImageReadError> {
        let image = source.load()?;
        self.preprocess_image(&image)
    }

    /// Preprocess an already decoded capture
    pub fn preprocess_image(&self, image: &DynamicImage) -> Result<PreprocessedImage, ImageReadError> {
        let gray = image.to_luma8();
        let resized = resize_gray(&gray, self.width, self.height, ResizeFilter::Area)
            .map_err(|e| ImageReadError::ResizeFailed(e.to_string()))?;

        debug!(
            from_width = image.width(),
            from_height = image.height(),
            to_width = self.width,
            to_height = self.height,
            "preprocessed capture"
        );

        Ok(PreprocessedImage::from_gray(equalize(&resized)))
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(512, 512)
    }
}
