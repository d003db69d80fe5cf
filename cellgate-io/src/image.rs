//! TIFF channel and mask reading.
//!
//! Multi-channel images store one page per marker; masks are single-page
//! integer label images where 0 is background.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};

use crate::{Error, Result};

/// Per-pixel values of one image plane, row-major as `(rows, columns)`.
pub type Plane = Array2<f32>;
/// Label per pixel of a segmentation mask.
pub type LabelMask = Array2<u32>;

fn open(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn to_f32(result: DecodingResult) -> Result<Vec<f32>> {
    Ok(match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => return Err(Error::InvalidFormat("unsupported sample format".into())),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_labels(result: DecodingResult) -> Result<Vec<u32>> {
    Ok(match result {
        DecodingResult::U8(v) => v.into_iter().map(u32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(u32::from).collect(),
        DecodingResult::U32(v) => v,
        DecodingResult::U64(v) => v.into_iter().map(|x| x as u32).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x.max(0) as u32).collect(),
        DecodingResult::F32(v) => v.into_iter().map(|x| x.max(0.0) as u32).collect(),
        _ => {
            return Err(Error::InvalidFormat(
                "mask must hold integer labels".into(),
            ))
        }
    })
}

fn shape(decoder: &mut Decoder<BufReader<File>>) -> Result<(usize, usize)> {
    let (width, height) = decoder.dimensions()?;
    Ok((height as usize, width as usize))
}

/// Number of pages in a TIFF file.
///
/// # Errors
/// Returns [`Error::Io`] or [`Error::Tiff`].
pub fn page_count(path: &Path) -> Result<usize> {
    let mut decoder = open(path)?;
    let mut count = 1;
    while decoder.more_images() {
        decoder.next_image()?;
        count += 1;
    }
    Ok(count)
}

/// Reads one page of a multi-channel image.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] if the file has fewer pages than
/// `channel + 1` or an unsupported sample type, and [`Error::Shape`] for
/// multi-sample (RGB) pages.
pub fn read_channel(path: &Path, channel: usize) -> Result<Plane> {
    let mut decoder = open(path)?;
    for page in 0..channel {
        if !decoder.more_images() {
            return Err(Error::InvalidFormat(format!(
                "{} has {} pages, channel {channel} requested",
                path.display(),
                page + 1
            )));
        }
        decoder.next_image()?;
    }
    let dims = shape(&mut decoder)?;
    let data = to_f32(decoder.read_image()?)?;
    log::debug!(
        "read channel {channel} of {} ({}x{})",
        path.display(),
        dims.1,
        dims.0
    );
    Ok(Array2::from_shape_vec(dims, data)?)
}

/// Reads the first page of a label mask.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] for an unsupported sample type and
/// [`Error::Shape`] for multi-sample pages.
pub fn read_mask(path: &Path) -> Result<LabelMask> {
    let mut decoder = open(path)?;
    let dims = shape(&mut decoder)?;
    let data = to_labels(decoder.read_image()?)?;
    Ok(Array2::from_shape_vec(dims, data)?)
}

/// Pixels on the border of a labelled cell: non-background pixels with a
/// 4-neighbour of a different label, or on the image edge.
#[must_use]
pub fn mask_outline(mask: &LabelMask) -> Array2<bool> {
    let (rows, cols) = mask.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let label = mask[[r, c]];
        if label == 0 {
            return false;
        }
        r == 0
            || c == 0
            || r + 1 == rows
            || c + 1 == cols
            || mask[[r - 1, c]] != label
            || mask[[r + 1, c]] != label
            || mask[[r, c - 1]] != label
            || mask[[r, c + 1]] != label
    })
}

/// Lower and upper intensity at the given quantiles, for contrast limits.
///
/// Non-finite values are ignored. Returns `None` for an empty plane.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn contrast_limits(plane: &Plane, low: f64, high: f64) -> Option<(f32, f32)> {
    let mut values: Vec<f32> = plane.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let last = values.len() - 1;
    let at = |q: f64| values[((q.clamp(0.0, 1.0) * last as f64).round() as usize).min(last)];
    Some((at(low), at(high)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use tempfile::TempDir;
    use tiff::encoder::{colortype, TiffEncoder};

    fn write_pages(path: &Path, pages: &[Vec<u16>], width: u32, height: u32) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        for page in pages {
            encoder
                .write_image::<colortype::Gray16>(width, height, page)
                .unwrap();
        }
    }

    #[test]
    fn test_read_channel_pages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("img.tif");
        write_pages(&path, &[vec![1, 2, 3, 4, 5, 6], vec![10, 20, 30, 40, 50, 60]], 3, 2);

        assert_eq!(page_count(&path).unwrap(), 2);
        let plane = read_channel(&path, 1).unwrap();
        assert_eq!(plane.dim(), (2, 3));
        assert_relative_eq!(plane[[1, 0]], 40.0);
        assert!(matches!(
            read_channel(&path, 2),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_read_mask() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mask.tif");
        write_pages(&path, &[vec![0, 7, 7, 0]], 2, 2);
        let mask = read_mask(&path).unwrap();
        assert_eq!(mask, array![[0, 7], [7, 0]]);
    }

    #[test]
    fn test_mask_outline() {
        let mask: LabelMask = array![
            [0, 0, 0, 0, 0],
            [0, 1, 1, 1, 0],
            [0, 1, 1, 1, 0],
            [0, 1, 1, 1, 0],
            [0, 0, 0, 0, 0],
        ];
        let outline = mask_outline(&mask);
        assert!(outline[[1, 1]]);
        assert!(!outline[[2, 2]]);
        assert!(!outline[[0, 0]]);
    }

    #[test]
    fn test_contrast_limits() {
        let plane: Plane = array![[0.0, 1.0], [2.0, f32::NAN]];
        assert_eq!(contrast_limits(&plane, 0.0, 1.0), Some((0.0, 2.0)));
        assert!(contrast_limits(&Plane::zeros((0, 0)), 0.0, 1.0).is_none());
    }
}
