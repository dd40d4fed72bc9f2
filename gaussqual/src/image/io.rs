use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::DynamicImage;
use tiff::decoder::DecodingResult;

use super::GreyImage;
use crate::error::{Error, Result};

/// Loads a single-channel image, keeping grey values at their stored scale.
///
/// TIFF files go through the TIFF decoder so 16/32-bit integer and float
/// slices keep their values. Other formats use the `image` crate; colour
/// images are converted to luma.
pub fn load_grey_image<P: AsRef<Path>>(path: P) -> Result<GreyImage> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let image = match extension.as_deref() {
        Some("tif") | Some("tiff") => load_tiff(path)?,
        _ => load_with_image_crate(path)?,
    };

    tracing::trace!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Loaded grey image"
    );
    Ok(image)
}

fn load_tiff(path: &Path) -> Result<GreyImage> {
    let tiff_err = |source| Error::Tiff {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut decoder = tiff::decoder::Decoder::new(BufReader::new(file))
        .map_err(tiff_err)?
        .with_limits(tiff::decoder::Limits::unlimited());

    match decoder.colortype().map_err(tiff_err)? {
        tiff::ColorType::Gray(_) => {}
        other => {
            return Err(Error::UnsupportedImage {
                path: path.to_path_buf(),
                reason: format!("expected a greyscale TIFF, got {other:?}"),
            });
        }
    }

    let (width, height) = decoder.dimensions().map_err(tiff_err)?;
    let pixels: Vec<f32> = match decoder.read_image().map_err(tiff_err)? {
        DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F16(buf) => buf.into_iter().map(|v| v.to_f32()).collect(),
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
    };

    GreyImage::new(width as usize, height as usize, pixels)
}

fn load_with_image_crate(path: &Path) -> Result<GreyImage> {
    let img = image::open(path).map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = (img.width() as usize, img.height() as usize);
    let pixels: Vec<f32> = match img {
        DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
        DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
        DynamicImage::ImageLumaA8(buf) => buf.pixels().map(|p| f32::from(p.0[0])).collect(),
        DynamicImage::ImageLumaA16(buf) => buf.pixels().map(|p| f32::from(p.0[0])).collect(),
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img
            .to_luma8()
            .into_raw()
            .into_iter()
            .map(f32::from)
            .collect(),
        DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgba16(_) => img
            .to_luma16()
            .into_raw()
            .into_iter()
            .map(f32::from)
            .collect(),
        other => other.to_luma32f().into_raw(),
    };

    GreyImage::new(width, height, pixels)
}
