//! Image layer display.

mod colormap;
mod texture;

pub use colormap::Colormap;
pub use texture::{compose_image, ChannelLayer};
