//! RGB colors with hex parsing and HSL lightness adjustment.

use serde::{Deserialize, Serialize};

/// An RGB color with components in [0, 1].
///
/// Serialized as a `#rrggbb` hex string, matching how colors are written in
/// scene configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value.
    pub fn from_u32(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    /// Parse `#rrggbb`, `rrggbb` or the short `#rgb` form.
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let digits = s.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(format!("Invalid hex color '{}'", s)),
        };
        let value = u32::from_str_radix(&expanded, 16)
            .map_err(|_| format!("Invalid hex color '{}'", s))?;
        Ok(Self::from_u32(value))
    }

    pub fn to_hex(&self) -> String {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Convert to (hue, saturation, lightness), all in [0, 1].
    pub fn to_hsl(&self) -> (f32, f32, f32) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let lightness = (max + min) / 2.0;

        if (max - min).abs() < f32::EPSILON {
            return (0.0, 0.0, lightness);
        }

        let delta = max - min;
        let saturation = if lightness <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };

        let hue = if max == self.r {
            (self.g - self.b) / delta + if self.g < self.b { 6.0 } else { 0.0 }
        } else if max == self.g {
            (self.b - self.r) / delta + 2.0
        } else {
            (self.r - self.g) / delta + 4.0
        };

        (hue / 6.0, saturation, lightness)
    }

    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);

        if s == 0.0 {
            return Self::new(l, l, l);
        }

        let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        Self::new(
            hue_to_rgb(p, q, h + 1.0 / 3.0),
            hue_to_rgb(p, q, h),
            hue_to_rgb(p, q, h - 1.0 / 3.0),
        )
    }

    /// Shift HSL lightness by `offset`, clamping the result to [0, 1].
    pub fn offset_lightness(&self, offset: f32) -> Self {
        let (h, s, l) = self.to_hsl();
        Self::from_hsl(h, s, (l + offset).clamp(0.0, 1.0))
    }
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        let c = Color::from_hex("#4a7c23").unwrap();
        assert!((c.r - 0x4a as f32 / 255.0).abs() < 1e-6);
        assert!((c.g - 0x7c as f32 / 255.0).abs() < 1e-6);
        assert!((c.b - 0x23 as f32 / 255.0).abs() < 1e-6);
        assert_eq!(c.to_hex(), "#4a7c23");
    }

    #[test]
    fn test_parse_short_hex() {
        assert_eq!(Color::from_hex("#fff").unwrap(), Color::new(1.0, 1.0, 1.0));
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("zzzzzz").is_err());
    }

    #[test]
    fn test_hsl_round_trip_keeps_color() {
        let c = Color::from_hex("#cfd8df").unwrap();
        let (h, s, l) = c.to_hsl();
        let back = Color::from_hsl(h, s, l);
        assert!((c.r - back.r).abs() < 1e-4);
        assert!((c.g - back.g).abs() < 1e-4);
        assert!((c.b - back.b).abs() < 1e-4);
    }

    #[test]
    fn test_offset_lightness_clamps() {
        let c = Color::from_hex("#4a7c23").unwrap();
        let white = c.offset_lightness(5.0);
        assert_eq!(white.to_hex(), "#ffffff");
        let black = c.offset_lightness(-5.0);
        assert_eq!(black.to_hex(), "#000000");

        let lighter = c.offset_lightness(0.1);
        assert!(lighter.to_hsl().2 > c.to_hsl().2);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let c: Color = serde_json::from_str("\"#3d6b1e\"").unwrap();
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#3d6b1e\"");
    }
}
