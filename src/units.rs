//! Physical unit conversion.
//!
//! Spreadsheets mix several length units: row heights are stored in points,
//! column widths in character units that become pixels, page margins in
//! inches, paper sizes in millimetres and drawing anchors in EMU. Every
//! conversion here goes through points so that any pair of units agrees.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, XlhtmlError};

/// Screen resolution assumed when none is configured.
pub const DEFAULT_DPI: u32 = 96;
/// Points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;
/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;
/// English Metric Units per inch.
pub const EMU_PER_INCH: f64 = 914_400.0;
/// English Metric Units per centimetre.
pub const EMU_PER_CM: f64 = 360_000.0;
/// English Metric Units per point.
pub const EMU_PER_POINT: f64 = EMU_PER_INCH / POINTS_PER_INCH;

/// A physical length unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[serde(alias = "px")]
    Pixel,
    #[serde(alias = "pt")]
    Point,
    #[serde(alias = "in")]
    Inch,
    #[serde(alias = "mm")]
    Millimetre,
    Emu,
}

impl Unit {
    /// CSS-style suffix used when rendering a measurement.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Pixel => "px",
            Self::Point => "pt",
            Self::Inch => "in",
            Self::Millimetre => "mm",
            Self::Emu => "emu",
        }
    }

    /// Number of points in one of this unit at `dpi`.
    fn points_per_unit(self, dpi: u32) -> f64 {
        match self {
            Self::Pixel => POINTS_PER_INCH / f64::from(dpi),
            Self::Point => 1.0,
            Self::Inch => POINTS_PER_INCH,
            Self::Millimetre => POINTS_PER_INCH / MM_PER_INCH,
            Self::Emu => 1.0 / EMU_PER_POINT,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

fn check_dpi(dpi: u32) -> Result<u32> {
    if dpi == 0 {
        return Err(XlhtmlError::InvalidDpi(dpi));
    }
    Ok(dpi)
}

fn check_finite(value: f64, unit: Unit) -> Result<f64> {
    if !value.is_finite() {
        return Err(XlhtmlError::InvalidUnitValue {
            value,
            unit: unit.suffix(),
        });
    }
    Ok(value)
}

/// Convert `value` in `unit` to points. Fails when the result overflows.
pub fn to_points(value: f64, unit: Unit, dpi: u32) -> Result<f64> {
    let value = check_finite(value, unit)?;
    let dpi = check_dpi(dpi)?;
    check_finite(value * unit.points_per_unit(dpi), Unit::Point)
}

/// Convert `points` to `unit`. Fails when the result overflows.
pub fn from_points(points: f64, unit: Unit, dpi: u32) -> Result<f64> {
    let points = check_finite(points, Unit::Point)?;
    let dpi = check_dpi(dpi)?;
    check_finite(points / unit.points_per_unit(dpi), unit)
}

/// Convert `value` from one unit to another through points.
pub fn convert(value: f64, from: Unit, to: Unit, dpi: u32) -> Result<f64> {
    from_points(to_points(value, from, dpi)?, to, dpi)
}

/// A length tagged with its unit and the resolution it was measured at.
///
/// Construction rejects non-finite values and a zero dpi, so every
/// conversion on an existing measurement is infallible.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Measurement {
    value: f64,
    unit: Unit,
    dpi: u32,
}

impl Measurement {
    pub fn new(value: f64, unit: Unit, dpi: u32) -> Result<Self> {
        Ok(Self {
            value: check_finite(value, unit)?,
            unit,
            dpi: check_dpi(dpi)?,
        })
    }

    pub fn px(value: f64) -> Result<Self> {
        Self::new(value, Unit::Pixel, DEFAULT_DPI)
    }

    pub fn pt(value: f64) -> Result<Self> {
        Self::new(value, Unit::Point, DEFAULT_DPI)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Value in points.
    pub fn points(&self) -> f64 {
        self.value * self.unit.points_per_unit(self.dpi)
    }

    /// The same length expressed in another unit.
    #[must_use]
    pub fn to(&self, unit: Unit) -> Self {
        Self {
            value: self.points() / unit.points_per_unit(self.dpi),
            unit,
            dpi: self.dpi,
        }
    }

    /// The same physical length re-expressed at a different resolution.
    pub fn with_dpi(&self, dpi: u32) -> Result<Self> {
        let dpi = check_dpi(dpi)?;
        Ok(Self {
            value: self.points() / self.unit.points_per_unit(dpi),
            unit: self.unit,
            dpi,
        })
    }

    /// Length in pixels, rounded the way a layout engine snaps to the grid.
    #[allow(clippy::cast_possible_truncation)]
    pub fn round_px(&self) -> i64 {
        let px = self.to(Unit::Pixel).value.round();
        px.clamp(i64::MIN as f64, i64::MAX as f64) as i64
    }

    /// Subtract a length in any unit, keeping this measurement's unit.
    #[must_use]
    pub fn minus(&self, other: &Self) -> Self {
        Self {
            value: (self.points() - other.points()) / self.unit.points_per_unit(self.dpi),
            unit: self.unit,
            dpi: self.dpi,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_fixed2(self.value), self.unit.suffix())
    }
}

/// Two decimal places, without a negative sign on zero.
pub(crate) fn format_fixed2(value: f64) -> String {
    let text = format!("{value:.2}");
    match text.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => text,
    }
}

/// Conversion context for one render pass: a resolution plus the unit
/// lengths are emitted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitConverter {
    dpi: u32,
    output: Unit,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            output: Unit::Point,
        }
    }
}

impl UnitConverter {
    pub fn new(dpi: u32, output: Unit) -> Result<Self> {
        Ok(Self {
            dpi: check_dpi(dpi)?,
            output,
        })
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn output(&self) -> Unit {
        self.output
    }

    pub fn convert(&self, value: f64, from: Unit, to: Unit) -> Result<f64> {
        convert(value, from, to, self.dpi)
    }

    pub fn measure(&self, value: f64, unit: Unit) -> Result<Measurement> {
        Measurement::new(value, unit, self.dpi)
    }

    /// `value` in `unit`, re-expressed in the output unit.
    pub fn output_length(&self, value: f64, unit: Unit) -> Result<Measurement> {
        Ok(self.measure(value, unit)?.to(self.output))
    }

    pub fn px_to_pt(&self, px: f64) -> Result<f64> {
        self.convert(px, Unit::Pixel, Unit::Point)
    }

    pub fn pt_to_px(&self, pt: f64) -> Result<f64> {
        self.convert(pt, Unit::Point, Unit::Pixel)
    }

    pub fn emu_to_px(&self, emu: f64) -> Result<f64> {
        self.convert(emu, Unit::Emu, Unit::Pixel)
    }
}

/// Pixel width of a column stored as `chars` character units.
///
/// Uses the column-width formula from ECMA-376 Part 1 §18.3.1.13 with the
/// maximum digit width of the workbook's default font.
#[allow(clippy::cast_possible_truncation)]
pub fn column_chars_to_px(chars: f64, digit_width: f64) -> f64 {
    if !chars.is_finite() || chars <= 0.0 || digit_width <= 0.0 {
        return 0.0;
    }
    let padding = (128.0 / digit_width).trunc();
    ((256.0 * chars + padding) / 256.0 * digit_width).trunc()
}

/// Maximum digit width in pixels for a font at 11pt, 96 dpi.
///
/// Falls back to 7.0 (Calibri) if the font is unknown.
pub fn digit_width_for_font(font_name: &str) -> f64 {
    match font_name {
        "Arial" => 6.5,
        "Times New Roman" => 5.7,
        "Verdana" => 7.5,
        "Consolas" => 7.7,
        "Courier New" => 7.3,
        "Tahoma" => 6.8,
        "Georgia" => 6.2,
        _ => 7.0,
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
    use proptest::prelude::*;
    use test_case::test_case;

    fn close(a: f64, b: f64) -> bool {
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b).abs() <= 1e-6 * scale
    }

    #[test_case(72.0, Unit::Point, Unit::Pixel, 96 => "96.00"; "72pt is 96px at 96dpi")]
    #[test_case(96.0, Unit::Pixel, Unit::Inch, 96 => "1.00"; "96px is one inch")]
    #[test_case(1.0, Unit::Inch, Unit::Point, 96 => "72.00"; "inch to points")]
    #[test_case(25.4, Unit::Millimetre, Unit::Point, 96 => "72.00"; "inch of millimetres")]
    #[test_case(914_400.0, Unit::Emu, Unit::Inch, 96 => "1.00"; "emu per inch")]
    #[test_case(360_000.0, Unit::Emu, Unit::Millimetre, 96 => "10.00"; "emu per centimetre")]
    #[test_case(12_700.0, Unit::Emu, Unit::Point, 300 => "1.00"; "emu per point")]
    #[test_case(3.0, Unit::Pixel, Unit::Point, 96 => "2.25"; "content inset")]
    #[test_case(72.0, Unit::Point, Unit::Pixel, 144 => "144.00"; "high dpi")]
    fn converts_between_units(value: f64, from: Unit, to: Unit, dpi: u32) -> String {
        format_fixed2(convert(value, from, to, dpi).unwrap())
    }

    const UNITS: [Unit; 5] = [
        Unit::Pixel,
        Unit::Point,
        Unit::Inch,
        Unit::Millimetre,
        Unit::Emu,
    ];

    fn finite_f64() -> impl Strategy<Value = f64> {
        prop::num::f64::POSITIVE
            | prop::num::f64::NEGATIVE
            | prop::num::f64::NORMAL
            | prop::num::f64::SUBNORMAL
            | prop::num::f64::ZERO
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            failure_persistence: None,
            ..ProptestConfig::default()
        })]

        #[test]
        fn round_trips_every_pair(
            v in finite_f64(),
            dpi in 1u32..=1200,
            from in prop::sample::select(UNITS.to_vec()),
            to in prop::sample::select(UNITS.to_vec()),
        ) {
            match convert(v, from, to, dpi).and_then(|there| convert(there, to, from, dpi)) {
                Ok(back) => prop_assert!(close(v, back), "{v} {from} -> {to} -> {back} at {dpi}dpi"),
                // Only magnitudes near f64::MAX can overflow a single conversion.
                Err(e) => {
                    prop_assert!(matches!(e, XlhtmlError::InvalidUnitValue { .. }), "unexpected error: {e:?}");
                    prop_assert!(v.abs() > 1e290, "{v} {from} -> {to} failed at {dpi}dpi");
                }
            }
        }

        #[test]
        fn pixel_point_pixel_is_exact_enough(v in -1.0e12f64..1.0e12, dpi in 1u32..=1200) {
            let conv = UnitConverter::new(dpi, Unit::Point).unwrap();
            let back = conv.pt_to_px(conv.px_to_pt(v).unwrap()).unwrap();
            prop_assert!(close(v, back));
        }
    }

    #[test]
    fn overflowing_conversion_is_rejected() {
        assert!(matches!(
            convert(f64::MAX, Unit::Inch, Unit::Emu, 96),
            Err(XlhtmlError::InvalidUnitValue { unit: "emu", .. })
        ));
    }

    #[test_case(f64::NAN; "nan")]
    #[test_case(f64::INFINITY; "positive infinity")]
    #[test_case(f64::NEG_INFINITY; "negative infinity")]
    fn rejects_non_finite(value: f64) {
        assert!(matches!(
            Measurement::px(value),
            Err(XlhtmlError::InvalidUnitValue { unit: "px", .. })
        ));
        assert!(matches!(
            convert(value, Unit::Inch, Unit::Point, 96),
            Err(XlhtmlError::InvalidUnitValue { unit: "in", .. })
        ));
    }

    #[test]
    fn rejects_zero_dpi() {
        assert!(matches!(
            Measurement::new(1.0, Unit::Point, 0),
            Err(XlhtmlError::InvalidDpi(0))
        ));
        assert!(UnitConverter::new(0, Unit::Pixel).is_err());
    }

    #[test_case(12.344, Unit::Pixel => "12.34px")]
    #[test_case(12.345_1, Unit::Pixel => "12.35px")]
    #[test_case(11.0, Unit::Point => "11.00pt")]
    #[test_case(-0.001, Unit::Point => "0.00pt")]
    #[test_case(-1.5, Unit::Millimetre => "-1.50mm")]
    fn renders_two_decimals(value: f64, unit: Unit) -> String {
        Measurement::new(value, unit, DEFAULT_DPI).unwrap().to_string()
    }

    #[test]
    fn measurement_conversion_is_new_value() {
        let pt = Measurement::pt(15.0).unwrap();
        let px = pt.to(Unit::Pixel);
        assert_eq!(pt.value(), 15.0);
        assert_eq!(px.unit(), Unit::Pixel);
        assert!(close(px.value(), 20.0));
        assert_eq!(px.round_px(), 20);
    }

    #[test]
    fn minus_keeps_unit() {
        let height = Measurement::pt(30.0).unwrap();
        let inset = Measurement::px(3.0).unwrap();
        assert_eq!(height.minus(&inset).to_string(), "27.75pt");
    }

    #[test]
    fn with_dpi_keeps_physical_length() {
        let px = Measurement::px(96.0).unwrap().with_dpi(192).unwrap();
        assert!(close(px.value(), 192.0));
        assert!(close(px.points(), 36.0));
    }

    #[test]
    fn converter_emits_output_unit() {
        let conv = UnitConverter::new(96, Unit::Pixel).unwrap();
        assert_eq!(
            conv.output_length(15.0, Unit::Point).unwrap().to_string(),
            "20.00px"
        );
        assert!(close(conv.emu_to_px(9525.0).unwrap(), 1.0));
    }

    #[test_case(9.140_625, 7.0 => 64.0; "calibri default column")]
    #[test_case(10.0, 7.0 => 70.0; "ten characters")]
    #[test_case(0.0, 7.0 => 0.0; "hidden column")]
    fn column_width_pixels(chars: f64, digit: f64) -> f64 {
        column_chars_to_px(chars, digit)
    }
}
