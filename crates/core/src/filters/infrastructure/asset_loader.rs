use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::filters::domain::filter_assets::FilterAssets;
use crate::filters::domain::filter_id::FilterId;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum AssetLoadError {
    #[error("filter image not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to decode filter image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Decodes an overlay image as RGBA so transparent areas blend over the face.
pub fn load_filter_image(path: &Path) -> Result<Frame, AssetLoadError> {
    if !path.exists() {
        return Err(AssetLoadError::NotFound(path.to_path_buf()));
    }
    let rgba = image::open(path)
        .map_err(|source| AssetLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Frame::new(rgba.into_raw(), width, height, 4, 0))
}

/// Loads every `(filter, path)` pair once, before the pipeline starts.
///
/// A path given twice is decoded only once.
pub fn load_filter_assets(sources: &[(FilterId, PathBuf)]) -> Result<FilterAssets, AssetLoadError> {
    let mut assets = FilterAssets::new();
    let mut decoded: Vec<(&Path, Frame)> = Vec::new();
    for (id, path) in sources {
        let image = match decoded.iter().find(|(p, _)| *p == path.as_path()) {
            Some((_, image)) => image.clone(),
            None => {
                let image = load_filter_image(path)?;
                log::info!(
                    "Loaded {id} image {} ({}x{})",
                    path.display(),
                    image.width(),
                    image.height()
                );
                decoded.push((path.as_path(), image.clone()));
                image
            }
        };
        assets.insert(*id, image);
    }
    Ok(assets)
}
