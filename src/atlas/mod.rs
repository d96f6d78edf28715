//! Vertical texture atlas: N square tiles stacked top to bottom in one PNG.
//!
//! Tile `i` occupies rows `i * tile_size .. (i + 1) * tile_size`, so the client
//! can recover the tile count as `height / tile_size` and the V range of a
//! tile as `i / n .. (i + 1) / n`. A JSON manifest carrying the same layout is
//! written alongside the image for tools that prefer not to derive it.

use image::{ImageError, ImageFormat, ImageReader, RgbaImage};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AtlasConfig;

pub const MANIFEST_VERSION: u32 = 1;

/// Upper bound on the RGBA8 atlas buffer (1 GiB).
pub const MAX_ATLAS_BYTES: u64 = 1 << 30;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("texture list is empty")]
    EmptyTextureList,

    #[error("tile size must be > 0")]
    ZeroTileSize,

    #[error("atlas of {count} tiles at {tile_size}px exceeds the maximum atlas size")]
    TooLarge { count: usize, tile_size: u32 },

    #[error("decode {}: {source}", .path.display())]
    Open { path: PathBuf, source: ImageError },

    #[error("encode {}: {source}", .path.display())]
    Encode { path: PathBuf, source: ImageError },

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("malformed atlas: {0}")]
    Malformed(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TileRect { pub x: u32, pub y: u32, pub w: u32, pub h: u32 }

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TileUv { pub u0: f32, pub v0: f32, pub u1: f32, pub v1: f32 }

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TileEntry {
    pub name: String,
    /// Zero-based slot, also used for the `hotbar{index}` element ids.
    pub index: u32,
    pub px: TileRect,
    pub uv: TileUv,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AtlasManifest {
    pub version: u32,
    pub tile_size: u32,
    pub atlas_width: u32,
    pub atlas_height: u32,
    pub tiles: Vec<TileEntry>,
}

/// Placement of every tile; computed before any pixel is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasLayout {
    pub tile_size: u32,
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<TileEntry>,
}

impl AtlasLayout {
    pub fn vertical<S: AsRef<str>>(names: &[S], tile_size: u32) -> Result<Self, AtlasError> {
        if names.is_empty() {
            return Err(AtlasError::EmptyTextureList);
        }
        if tile_size == 0 {
            return Err(AtlasError::ZeroTileSize);
        }
        let count = names.len();
        let height = u32::try_from(count)
            .ok()
            .and_then(|n| n.checked_mul(tile_size))
            .filter(|&h| u64::from(h) * u64::from(tile_size) * 4 <= MAX_ATLAS_BYTES)
            .ok_or(AtlasError::TooLarge { count, tile_size })?;
        let n = count as f32;
        let tiles = names
            .iter()
            .enumerate()
            .map(|(i, name)| TileEntry {
                name: name.as_ref().to_owned(),
                index: i as u32,
                px: TileRect { x: 0, y: i as u32 * tile_size, w: tile_size, h: tile_size },
                uv: TileUv { u0: 0.0, v0: i as f32 / n, u1: 1.0, v1: (i + 1) as f32 / n },
            })
            .collect();
        Ok(Self { tile_size, width: tile_size, height, tiles })
    }

    pub fn manifest(&self) -> AtlasManifest {
        AtlasManifest {
            version: MANIFEST_VERSION,
            tile_size: self.tile_size,
            atlas_width: self.width,
            atlas_height: self.height,
            tiles: self.tiles.clone(),
        }
    }
}

pub struct AtlasArtifact {
    pub image: RgbaImage,
    pub manifest: AtlasManifest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub atlas_dim: (u32, u32),
    pub tile_size: u32,
    pub tile_count: u32,
    /// Tile names from the manifest, when one was supplied.
    pub names: Option<Vec<String>>,
}

/// Copy the top-left `tile_size` square of each image into its slot.
/// Pixels a source image does not cover stay transparent; anything beyond the square is cropped.
pub fn compose_strip(layout: &AtlasLayout, images: &[RgbaImage]) -> Result<RgbaImage, AtlasError> {
    if images.len() != layout.tiles.len() {
        return Err(AtlasError::Malformed(format!(
            "{} images for {} tiles",
            images.len(),
            layout.tiles.len()
        )));
    }
    let mut atlas = RgbaImage::new(layout.width, layout.height);
    for (tile, img) in layout.tiles.iter().zip(images) {
        let w = img.width().min(tile.px.w);
        let h = img.height().min(tile.px.h);
        for x in 0..w {
            for y in 0..h {
                atlas.put_pixel(tile.px.x + x, tile.px.y + y, *img.get_pixel(x, y));
            }
        }
    }
    Ok(atlas)
}

fn load_texture(path: &Path) -> Result<RgbaImage, AtlasError> {
    let open_err = |source| AtlasError::Open { path: path.to_path_buf(), source };
    let decoded = ImageReader::open(path)
        .map_err(ImageError::IoError)
        .and_then(|r| r.with_guessed_format().map_err(ImageError::IoError))
        .and_then(|r| r.decode())
        .map_err(open_err)?;
    Ok(decoded.to_rgba8())
}

pub fn build_atlas(cfg: &AtlasConfig) -> Result<AtlasArtifact, AtlasError> {
    let layout = AtlasLayout::vertical(&cfg.textures, cfg.tile_size)?;
    let mut images = Vec::with_capacity(layout.tiles.len());
    for tile in &layout.tiles {
        let path = cfg.texture_path(&tile.name);
        let img = load_texture(&path)?;
        info!("texture {} is {}x{}", tile.name, img.width(), img.height());
        if img.width() != cfg.tile_size || img.height() != cfg.tile_size {
            debug!(
                "texture {} is not {}px square; cropping/padding to tile",
                tile.name, cfg.tile_size
            );
        }
        debug!("texture {} offset y={}", tile.name, tile.px.y);
        images.push(img);
    }
    let image = compose_strip(&layout, &images)?;
    info!("atlas is {}x{} ({} tiles)", image.width(), image.height(), layout.tiles.len());
    Ok(AtlasArtifact { image, manifest: layout.manifest() })
}

fn ensure_parent(path: &Path) -> Result<(), AtlasError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|source| AtlasError::Io { path: parent.to_path_buf(), source }),
        _ => Ok(()),
    }
}

pub fn write_outputs(artifact: &AtlasArtifact, cfg: &AtlasConfig) -> Result<(), AtlasError> {
    ensure_parent(&cfg.output)?;
    artifact
        .image
        .save_with_format(&cfg.output, ImageFormat::Png)
        .map_err(|source| AtlasError::Encode { path: cfg.output.clone(), source })?;
    info!("wrote {}", cfg.output.display());
    if let Some(manifest_path) = &cfg.manifest {
        ensure_parent(manifest_path)?;
        let js = serde_json::to_string_pretty(&artifact.manifest)?;
        fs::write(manifest_path, js)
            .map_err(|source| AtlasError::Io { path: manifest_path.clone(), source })?;
        info!("wrote {}", manifest_path.display());
    }
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<AtlasManifest, AtlasError> {
    let txt = fs::read_to_string(path)
        .map_err(|source| AtlasError::Io { path: path.to_path_buf(), source })?;
    Ok(serde_json::from_str(&txt)?)
}

/// Read an atlas back and check it is a well formed one-tile-wide strip.
pub fn inspect(png: &Path, manifest: Option<&Path>) -> Result<Inspection, AtlasError> {
    let img = load_texture(png)?;
    let (w, h) = img.dimensions();
    if w == 0 || h % w != 0 {
        return Err(AtlasError::Malformed(format!(
            "{}x{} is not a vertical strip of square tiles",
            w, h
        )));
    }
    let tile_count = h / w;
    let names = match manifest {
        Some(p) => {
            let m = read_manifest(p)?;
            if m.tile_size != w || m.atlas_width != w || m.atlas_height != h {
                return Err(AtlasError::Malformed(format!(
                    "manifest says {}x{} at {}px tiles, image is {}x{}",
                    m.atlas_width, m.atlas_height, m.tile_size, w, h
                )));
            }
            if m.tiles.len() != tile_count as usize {
                return Err(AtlasError::Malformed(format!(
                    "manifest lists {} tiles, image holds {}",
                    m.tiles.len(),
                    tile_count
                )));
            }
            Some(m.tiles.into_iter().map(|t| t.name).collect())
        }
        None => None,
    };
    Ok(Inspection { atlas_dim: (w, h), tile_size: w, tile_count, names })
}
