// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Colors, palettes, and scalar color maps for the visual passes.

use serde::Deserialize;

/// Color type for visualization. Deserializes from an `[r, g, b]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Red color.
    pub const RED: Color = Color(255, 0, 0);
    /// Green color.
    pub const GREEN: Color = Color(0, 255, 0);
    /// Blue color.
    pub const BLUE: Color = Color(0, 0, 255);
    /// White color.
    pub const WHITE: Color = Color(255, 255, 255);
    /// Black color.
    pub const BLACK: Color = Color(0, 0, 0);
    /// Cyan color.
    pub const CYAN: Color = Color(0, 255, 255);

    /// Create a new color from RGB values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Scale each channel by `factor` in [0, 1].
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(
            (f32::from(self.0) * factor) as u8,
            (f32::from(self.1) * factor) as u8,
            (f32::from(self.2) * factor) as u8,
        )
    }

    /// Convert to an `image` RGB pixel.
    #[must_use]
    pub const fn rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.0, self.1, self.2])
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self(r, g, b)
    }
}

/// Scalar-to-color mapping used by the heatmap pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMap {
    /// Perceptually uniform rainbow (default).
    #[default]
    Turbo,
    /// Classic jet ramp.
    Jet,
}

impl ColorMap {
    /// Map a normalized scalar in [0, 1] to a color.
    #[must_use]
    pub fn map(self, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Turbo => turbo(t),
            Self::Jet => jet(t),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

/// Polynomial approximation of the Turbo color map.
fn turbo(t: f32) -> Color {
    let r = 0.135_721_38
        + t * (4.615_392_6
            + t * (-42.660_323 + t * (132.131_08 + t * (-152.942_39 + t * 59.286_38))));
    let g = 0.091_402_61
        + t * (2.194_188_4
            + t * (4.842_966_6 + t * (-14.185_033 + t * (4.277_298_6 + t * 2.829_566_0))));
    let b = 0.106_673_30
        + t * (12.641_946
            + t * (-60.582_05 + t * (110.362_77 + t * (-89.903_11 + t * 27.348_25))));
    Color(channel(r), channel(g), channel(b))
}

/// Classic jet ramp.
fn jet(t: f32) -> Color {
    let r = 1.5 - (4.0 * t - 3.0).abs();
    let g = 1.5 - (4.0 * t - 2.0).abs();
    let b = 1.5 - (4.0 * t - 1.0).abs();
    Color(channel(r), channel(g), channel(b))
}
