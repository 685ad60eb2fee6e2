//! Image display for downloaded assets.

use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("`{}` is not a displayable image: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to launch an image viewer for `{}`: {source}", .path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Pixel dimensions of a decoded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

pub trait ImageViewer {
    /// Render the image at `path`, failing if it does not decode.
    fn show(&self, path: &Path) -> Result<ImageInfo, DisplayError>;
}

/// Fully decode the file to make sure it is an image.
pub fn decode(path: &Path) -> Result<ImageInfo, DisplayError> {
    let img = image::open(path).map_err(|source| DisplayError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ImageInfo {
        width: img.width(),
        height: img.height(),
    })
}

/// Opens images with the platform's default viewer.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemViewer;

impl ImageViewer for SystemViewer {
    fn show(&self, path: &Path) -> Result<ImageInfo, DisplayError> {
        let info = decode(path)?;
        debug!(
            "opening {} ({}x{}) in system viewer",
            path.display(),
            info.width,
            info.height
        );
        open::that(path).map_err(|source| DisplayError::Launch {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(info)
    }
}
