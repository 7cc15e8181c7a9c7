//! RGB colors carried by pulses and diagnostic events.

use serde::{Deserialize, Serialize};

/// Lowest brightness an attenuated pulse color is allowed to reach.
const MIN_TINT: f32 = 0.2;

/// Linear RGB color with channels in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const PURPLE: Rgb = Rgb {
        r: 0x8b as f32 / 255.0,
        g: 0x5c as f32 / 255.0,
        b: 0xf6 as f32 / 255.0,
    };
    pub const BLUE: Rgb = Rgb {
        r: 0x3b as f32 / 255.0,
        g: 0x82 as f32 / 255.0,
        b: 0xf6 as f32 / 255.0,
    };
    pub const TURQUOISE: Rgb = Rgb {
        r: 0x4f as f32 / 255.0,
        g: 0xd1 as f32 / 255.0,
        b: 0xc5 as f32 / 255.0,
    };

    /// Palette cycled by the demo when no color is given.
    pub const PALETTE: [Rgb; 3] = [Rgb::PURPLE, Rgb::BLUE, Rgb::TURQUOISE];

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Build from a packed `0xRRGGBB` value.
    pub fn from_u32(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self::from_u32)
    }

    pub fn to_hex(&self) -> String {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }

    /// Dim the color according to how much energy a pulse retained.
    ///
    /// `fraction` is clamped to [0, 1]; a fully decayed pulse keeps
    /// `MIN_TINT` of its brightness so it stays visible.
    pub fn attenuate(&self, fraction: f64) -> Self {
        let f = fraction.clamp(0.0, 1.0) as f32;
        let scale = MIN_TINT + (1.0 - MIN_TINT) * f;
        Self::new(self.r * scale, self.g * scale, self.b * scale)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::PURPLE
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parse_and_format() {
        let c = Rgb::from_hex("#4fd1c5").unwrap();
        assert_eq!(c, Rgb::TURQUOISE);
        assert_eq!(c.to_hex(), "#4fd1c5");
        assert_eq!(Rgb::from_hex("3b82f6"), Some(Rgb::BLUE));
    }

    #[test]
    fn test_hex_parse_rejects_garbage() {
        assert!(Rgb::from_hex("#12345").is_none());
        assert!(Rgb::from_hex("zzzzzz").is_none());
    }

    #[test]
    fn test_attenuate_bounds() {
        let white = Rgb::new(1.0, 1.0, 1.0);
        assert_eq!(white.attenuate(1.0), white);

        let dim = white.attenuate(0.0);
        assert!((dim.r - MIN_TINT).abs() < 1e-6);

        // Out-of-range fractions are clamped
        assert_eq!(white.attenuate(3.0), white);
    }
}
