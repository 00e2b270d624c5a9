//! Spreadsheet color references and their CSS form.
//!
//! A color in styles.xml is one of: an ARGB literal, a theme slot with an
//! optional tint, an index into the legacy palette, or `auto`. Resolution
//! yields `#RRGGBB` (or `#RRGGBBAA` for partial alpha); [`css_color`] turns
//! that into an `rgb()`/`rgba()` function.

use serde::{Deserialize, Serialize};

/// Legacy 64-entry palette used by `indexed` colors.
pub const INDEXED_COLORS: [&str; 64] = [
    "#000000", "#FFFFFF", "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF",
    "#000000", "#FFFFFF", "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF",
    "#800000", "#008000", "#000080", "#808000", "#800080", "#008080", "#C0C0C0", "#808080",
    "#9999FF", "#993366", "#FFFFCC", "#CCFFFF", "#660066", "#FF8080", "#0066CC", "#CCCCFF",
    "#000080", "#FF00FF", "#FFFF00", "#00FFFF", "#800080", "#800000", "#008080", "#0000FF",
    "#00CCFF", "#CCFFFF", "#CCFFCC", "#FFFF99", "#99CCFF", "#FF99CC", "#CC99FF", "#FFCC99",
    "#3366FF", "#33CCCC", "#99CC00", "#FFCC00", "#FF9900", "#FF6600", "#666699", "#969696",
    "#003366", "#339966", "#003300", "#333300", "#993300", "#993366", "#333399", "#333333",
];

/// Palette index Excel reserves for the system foreground.
const SYSTEM_FOREGROUND: u32 = 64;

/// Default Office theme, in `theme` attribute order.
pub const DEFAULT_THEME_COLORS: [&str; 12] = [
    "#FFFFFF", "#000000", "#E7E6E6", "#44546A", "#4472C4", "#ED7D31", "#A5A5A5", "#FFC000",
    "#5B9BD5", "#70AD47", "#0563C1", "#954F72",
];

/// Raw attributes of a `<color>`, `<fgColor>` or `<bgColor>` element.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColorSpec {
    pub rgb: Option<String>,
    pub theme: Option<u32>,
    pub tint: Option<f64>,
    pub indexed: Option<u32>,
    pub auto: bool,
}

/// 8-bit channels plus optional alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Rgba {
    r: u8,
    g: u8,
    b: u8,
    a: Option<u8>,
}

impl Rgba {
    /// `#RRGGBB` or `#RRGGBBAA`, leading `#` optional.
    fn parse(text: &str) -> Option<Self> {
        let hex = text.trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |at: usize| {
            hex.get(at..at + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
        };
        let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
        let a = match hex.len() {
            6 => None,
            8 => Some(channel(6)?),
            _ => return None,
        };
        Some(Self { r, g, b, a })
    }

    /// Parse an ARGB literal as stored in styles.xml. Alpha `00` is how
    /// many producers write an opaque color, so it counts as opaque too.
    fn from_argb(text: &str) -> Option<Self> {
        let hex = text.trim_start_matches('#');
        match hex.len() {
            6 => Self::parse(hex),
            8 => {
                let (alpha, rgb) = hex.split_at(2);
                let alpha = u8::from_str_radix(alpha, 16).ok()?;
                let mut color = Self::parse(rgb)?;
                color.a = (alpha != 0x00 && alpha != 0xFF).then_some(alpha);
                Some(color)
            }
            _ => None,
        }
    }

    fn hex(self) -> String {
        match self.a {
            None => format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b),
            Some(a) => format!("#{:02X}{:02X}{:02X}{a:02X}", self.r, self.g, self.b),
        }
    }

    /// Hue, saturation and lightness, each in `0..=1`.
    fn to_hsl(self) -> (f64, f64, f64) {
        let [r, g, b] = [self.r, self.g, self.b].map(|c| f64::from(c) / 255.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let lightness = (max + min) / 2.0;
        let delta = max - min;
        if delta < f64::EPSILON {
            return (0.0, 0.0, lightness);
        }

        let saturation = if lightness > 0.5 {
            delta / (2.0 - max - min)
        } else {
            delta / (max + min)
        };
        let top = self.r.max(self.g).max(self.b);
        let sector = if top == self.r {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if top == self.g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };
        (sector / 6.0, saturation, lightness)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let to_byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        if saturation < f64::EPSILON {
            let v = to_byte(lightness);
            return Self {
                r: v,
                g: v,
                b: v,
                a: None,
            };
        }

        let q = if lightness < 0.5 {
            lightness * (1.0 + saturation)
        } else {
            lightness + saturation - lightness * saturation
        };
        let p = 2.0 * lightness - q;
        let channel = |t: f64| {
            let t = t.rem_euclid(1.0);
            let v = if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            };
            to_byte(v)
        };
        Self {
            r: channel(hue + 1.0 / 3.0),
            g: channel(hue),
            b: channel(hue - 1.0 / 3.0),
            a: None,
        }
    }

    /// Excel tint: negative values darken toward black, positive values
    /// lighten toward white, both by scaling HSL lightness.
    fn tinted(self, tint: f64) -> Self {
        let (h, s, l) = self.to_hsl();
        let l = if tint < 0.0 {
            l * (1.0 + tint)
        } else {
            l + (1.0 - l) * tint
        };
        Self::from_hsl(h, s, l)
    }
}

/// Resolve a color reference to `#RRGGBB`, or `#RRGGBBAA` for partial
/// alpha. `indexed_colors` is the workbook's custom palette, if any.
pub fn resolve_color(color: &ColorSpec, indexed_colors: Option<&[String]>) -> Option<String> {
    if let Some(rgb) = &color.rgb {
        return Rgba::from_argb(rgb).map(Rgba::hex);
    }

    if let Some(slot) = color.theme {
        let base = DEFAULT_THEME_COLORS.get(usize::try_from(slot).ok()?)?;
        return match color.tint.filter(|t| t.abs() > f64::EPSILON) {
            Some(tint) => Some(apply_tint(base, tint)),
            None => Some((*base).to_string()),
        };
    }

    if let Some(index) = color.indexed {
        if index == SYSTEM_FOREGROUND {
            return Some("#000000".to_string());
        }
        let slot = usize::try_from(index).ok()?;
        let custom = indexed_colors.and_then(|palette| palette.get(slot)).cloned();
        if custom.is_some() {
            return custom;
        }
        if let Some(color) = INDEXED_COLORS.get(slot) {
            return Some((*color).to_string());
        }
    }

    color.auto.then(|| "#000000".to_string())
}

/// CSS color function for a resolved `#RRGGBB` / `#RRGGBBAA` value.
pub fn css_color(hex_color: &str) -> Option<String> {
    let Rgba { r, g, b, a } = Rgba::parse(hex_color)?;
    Some(match a {
        None => format!("rgb({r}, {g}, {b})"),
        Some(a) => format!("rgba({r}, {g}, {b}, {:.2})", f64::from(a) / 255.0),
    })
}

/// Apply an Excel tint to `#RRGGBB`. Unparseable input comes back as is.
pub fn apply_tint(hex_color: &str, tint: f64) -> String {
    match Rgba::parse(hex_color) {
        Some(color) => color.tinted(tint).hex(),
        None => hex_color.to_string(),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn rgb(value: &str) -> ColorSpec {
        ColorSpec {
            rgb: Some(value.to_string()),
            ..ColorSpec::default()
        }
    }

    #[test_case("#000000", 0.5 => "#808080"; "lighten black")]
    #[test_case("#FFFFFF", -0.5 => "#808080"; "darken white")]
    #[test_case("#4472C4", 0.0 => "#4472C4"; "zero tint")]
    #[test_case("#4472C4", -1.0 => "#000000"; "full shade")]
    #[test_case("#4472C4", 1.0 => "#FFFFFF"; "full tint")]
    #[test_case("nope", 0.3 => "nope"; "garbage passes through")]
    fn tints(base: &str, tint: f64) -> String {
        apply_tint(base, tint)
    }

    #[test]
    fn hsl_round_trip() {
        for hex in ["#4472C4", "#ED7D31", "#70AD47", "#123456"] {
            let color = Rgba::parse(hex).unwrap();
            let (h, s, l) = color.to_hsl();
            assert_eq!(Rgba::from_hsl(h, s, l).hex(), hex);
        }
    }

    #[test_case("FFFFFF00" => Some("#FFFF00".to_string()); "argb opaque")]
    #[test_case("00FF0000" => Some("#FF0000".to_string()); "zero alpha treated opaque")]
    #[test_case("80112233" => Some("#11223380".to_string()); "partial alpha kept")]
    #[test_case("ff0000" => Some("#FF0000".to_string()); "plain rgb")]
    #[test_case("XYZ" => None; "garbage")]
    fn resolves_rgb(value: &str) -> Option<String> {
        resolve_color(&rgb(value), None)
    }

    #[test]
    fn resolves_theme_with_tint() {
        let color = ColorSpec {
            theme: Some(1),
            tint: Some(0.5),
            ..ColorSpec::default()
        };
        assert_eq!(resolve_color(&color, None), Some("#808080".to_string()));
        let plain = ColorSpec {
            theme: Some(4),
            ..ColorSpec::default()
        };
        assert_eq!(resolve_color(&plain, None), Some("#4472C4".to_string()));
        let missing = ColorSpec {
            theme: Some(40),
            ..ColorSpec::default()
        };
        assert_eq!(resolve_color(&missing, None), None);
    }

    #[test]
    fn resolves_indexed_with_custom_palette() {
        let color = ColorSpec {
            indexed: Some(2),
            ..ColorSpec::default()
        };
        assert_eq!(resolve_color(&color, None), Some("#FF0000".to_string()));
        let palette = vec!["#111111".to_string(); 3];
        assert_eq!(
            resolve_color(&color, Some(&palette)),
            Some("#111111".to_string())
        );
        let system = ColorSpec {
            indexed: Some(64),
            ..ColorSpec::default()
        };
        assert_eq!(resolve_color(&system, None), Some("#000000".to_string()));
    }

    #[test]
    fn auto_is_black() {
        let auto = ColorSpec {
            auto: true,
            ..ColorSpec::default()
        };
        assert_eq!(resolve_color(&auto, None), Some("#000000".to_string()));
        assert_eq!(resolve_color(&ColorSpec::default(), None), None);
    }

    #[test]
    fn css_functions() {
        assert_eq!(css_color("#FF8000").as_deref(), Some("rgb(255, 128, 0)"));
        assert_eq!(
            css_color("#00000080").as_deref(),
            Some("rgba(0, 0, 0, 0.50)")
        );
        assert_eq!(css_color("#12"), None);
    }
}
