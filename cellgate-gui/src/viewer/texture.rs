//! Texture generation for the image view.

use cellgate_io::Plane;
use egui::ColorImage;
use ndarray::Array2;

use crate::viewer::Colormap;

/// One image plane with its tint and contrast limits.
pub struct ChannelLayer<'a> {
    pub plane: &'a Plane,
    pub colormap: Colormap,
    pub limits: (f32, f32),
}

impl ChannelLayer<'_> {
    fn normalized(&self, value: f32) -> f32 {
        let (lo, hi) = self.limits;
        if !value.is_finite() || hi <= lo {
            return 0.0;
        }
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

/// Blends channel layers additively and paints the mask outline on top.
///
/// The first layer sets the image size; layers or outlines of another size
/// are skipped. Returns `None` without layers.
#[must_use]
pub fn compose_image(
    layers: &[ChannelLayer<'_>],
    outline: Option<&Array2<bool>>,
    outline_color: [u8; 3],
) -> Option<ColorImage> {
    let dim = layers.first()?.plane.dim();
    let (rows, cols) = dim;
    let mut rgb = vec![0u16; rows * cols * 3];

    for layer in layers {
        if layer.plane.dim() != dim {
            log::warn!(
                "skipping layer of size {:?}, expected {:?}",
                layer.plane.dim(),
                dim
            );
            continue;
        }
        for ((r, c), &value) in layer.plane.indexed_iter() {
            let color = layer.colormap.apply(layer.normalized(value));
            let offset = (r * cols + c) * 3;
            for (slot, channel) in rgb[offset..offset + 3].iter_mut().zip(color) {
                *slot = (*slot + u16::from(channel)).min(255);
            }
        }
    }

    let mut pixels = Vec::with_capacity(rows * cols * 4);
    for px in rgb.chunks_exact(3) {
        for &channel in px {
            pixels.push(u8::try_from(channel).unwrap_or(u8::MAX));
        }
        pixels.push(255);
    }

    if let Some(mask) = outline.filter(|m| m.dim() == dim) {
        for ((r, c), &edge) in mask.indexed_iter() {
            if edge {
                let offset = (r * cols + c) * 4;
                pixels[offset..offset + 3].copy_from_slice(&outline_color);
            }
        }
    }

    Some(ColorImage::from_rgba_unmultiplied([cols, rows], &pixels))
}
