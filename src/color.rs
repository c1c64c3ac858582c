//! Sand colours: float RGBA, tolerant matching, highlight/fade helpers and the block palette.

use serde::{Deserialize, Serialize};

/// Default per-channel tolerance for "same colour" checks.
pub const DEFAULT_COLOR_TOLERANCE: f32 = 0.1;

/// Linear RGBA colour with channels nominally in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    /// Sentinel stored in every empty cell.
    pub const CLEAR: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Per-channel match on r, g, b (alpha ignored).
    ///
    /// Not transitive: `a ≈ b` and `b ≈ c` does not imply `a ≈ c`. Regions are
    /// assumed chromatically homogeneous enough that this never shows.
    pub fn matches(&self, other: &Self, tolerance: f32) -> bool {
        (self.r - other.r).abs() < tolerance
            && (self.g - other.g).abs() < tolerance
            && (self.b - other.b).abs() < tolerance
    }

    /// Multiply rgb by `intensity`, keeping alpha; channels clamp at 1.0.
    pub fn brightened(&self, intensity: f32) -> Self {
        Self::new(
            (self.r * intensity).min(1.0),
            (self.g * intensity).min(1.0),
            (self.b * intensity).min(1.0),
            self.a,
        )
    }

    pub fn with_alpha(&self, a: f32) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Component-wise interpolation, `t` clamped to `0..=1`.
    pub fn lerp(&self, to: &Self, t: f32) -> Self {
        if t >= 1.0 {
            return *to;
        }
        let t = t.max(0.0);
        Self::new(
            self.r + (to.r - self.r) * t,
            self.g + (to.g - self.g) * t,
            self.b + (to.b - self.b) * t,
            self.a + (to.a - self.a) * t,
        )
    }

    /// 8-bit rgb after alpha-blending over `bg`.
    pub fn blend_over(&self, bg: (u8, u8, u8)) -> (u8, u8, u8) {
        let a = self.a.clamp(0.0, 1.0);
        let mix = |c: f32, b: u8| {
            let b = f32::from(b) / 255.0;
            ((c.clamp(0.0, 1.0) * a + b * (1.0 - a)) * 255.0).round() as u8
        };
        (mix(self.r, bg.0), mix(self.g, bg.1), mix(self.b, bg.2))
    }
}

pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

pub fn ease_in_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Named block colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SandColor {
    Green,
    Blue,
    Yellow,
    Red,
    Pink,
    Purple,
    Orange,
    Cyan,
}

impl SandColor {
    pub const ALL: [Self; 8] = [
        Self::Green,
        Self::Blue,
        Self::Yellow,
        Self::Red,
        Self::Pink,
        Self::Purple,
        Self::Orange,
        Self::Cyan,
    ];

    /// Starting set before any colour is unlocked.
    pub const BASE: [Self; 4] = [Self::Green, Self::Blue, Self::Yellow, Self::Red];

    pub fn rgba(&self) -> Rgba {
        match self {
            Self::Green => Rgba::rgb(0.0, 1.0, 0.1),
            Self::Blue => Rgba::rgb(0.1, 0.4, 1.0),
            Self::Yellow => Rgba::rgb(1.0, 0.92, 0.016),
            Self::Red => Rgba::rgb(1.0, 0.1, 0.1),
            Self::Pink => Rgba::rgb(1.0, 0.4, 0.7),
            Self::Purple => Rgba::rgb(0.6, 0.2, 0.8),
            Self::Orange => Rgba::rgb(1.0, 0.5, 0.0),
            Self::Cyan => Rgba::rgb(0.0, 0.8, 0.8),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Pink => "pink",
            Self::Purple => "purple",
            Self::Orange => "orange",
            Self::Cyan => "cyan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_within_tolerance() {
        let a = Rgba::rgb(0.5, 0.5, 0.5);
        assert!(a.matches(&Rgba::rgb(0.55, 0.45, 0.59), 0.1));
        assert!(!a.matches(&Rgba::rgb(0.61, 0.5, 0.5), 0.1));
    }

    #[test]
    fn test_matches_ignores_alpha() {
        let a = SandColor::Red.rgba();
        assert!(a.matches(&a.with_alpha(0.0), DEFAULT_COLOR_TOLERANCE));
    }

    #[test]
    fn test_matching_is_not_transitive() {
        let a = Rgba::rgb(0.50, 0.5, 0.5);
        let b = Rgba::rgb(0.58, 0.5, 0.5);
        let c = Rgba::rgb(0.66, 0.5, 0.5);
        assert!(a.matches(&b, 0.1));
        assert!(b.matches(&c, 0.1));
        assert!(!a.matches(&c, 0.1));
    }

    #[test]
    fn test_brightened_clamps_and_keeps_alpha() {
        let c = Rgba::new(0.6, 0.2, 0.0, 0.7).brightened(2.0);
        assert_eq!(c, Rgba::new(1.0, 0.4, 0.0, 0.7));
    }

    #[test]
    fn test_palette_colours_are_distinct() {
        for (i, a) in SandColor::ALL.iter().enumerate() {
            for b in &SandColor::ALL[i + 1..] {
                assert!(!a.rgba().matches(&b.rgba(), DEFAULT_COLOR_TOLERANCE), "{a:?} ~ {b:?}");
            }
        }
    }

    #[test]
    fn test_blend_over_transparent_is_background() {
        assert_eq!(Rgba::CLEAR.blend_over((10, 20, 30)), (10, 20, 30));
        assert_eq!(Rgba::WHITE.blend_over((10, 20, 30)), (255, 255, 255));
    }

    #[test]
    fn test_easing_endpoints() {
        assert_eq!(ease_out_quad(0.0), 0.0);
        assert_eq!(ease_out_quad(1.0), 1.0);
        assert_eq!(ease_in_quad(0.5), 0.25);
        assert!(ease_out_quad(0.5) > 0.5);
    }
}
