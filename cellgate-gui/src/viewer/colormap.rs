//! Channel tints for additive image compositing.

use crate::util::f32_to_u8;

/// Available tints for a fluorescence channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    /// Black to green.
    Green,
    /// Black to magenta.
    Magenta,
    /// Black to cyan.
    Cyan,
    /// Black to white.
    Grayscale,
}

impl std::fmt::Display for Colormap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Colormap::Green => write!(f, "Green"),
            Colormap::Magenta => write!(f, "Magenta"),
            Colormap::Cyan => write!(f, "Cyan"),
            Colormap::Grayscale => write!(f, "Grayscale"),
        }
    }
}

impl Colormap {
    pub const ALL: [Colormap; 4] = [
        Colormap::Green,
        Colormap::Magenta,
        Colormap::Cyan,
        Colormap::Grayscale,
    ];

    /// Apply the colormap to a normalized value [0, 1] and return RGB bytes.
    #[must_use]
    pub fn apply(self, val: f32) -> [u8; 3] {
        let v = f32_to_u8(val.clamp(0.0, 1.0) * 255.0);
        match self {
            Colormap::Green => [0, v, 0],
            Colormap::Magenta => [v, 0, v],
            Colormap::Cyan => [0, v, v],
            Colormap::Grayscale => [v, v, v],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_clamps() {
        assert_eq!(Colormap::Green.apply(1.0), [0, 255, 0]);
        assert_eq!(Colormap::Magenta.apply(2.0), [255, 0, 255]);
        assert_eq!(Colormap::Grayscale.apply(-1.0), [0, 0, 0]);
    }
}
