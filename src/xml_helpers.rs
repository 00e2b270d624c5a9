//! Attribute access on quick-xml start tags.
//!
//! Values are entity-decoded, so `name="A &amp; B"` reads as `A & B`.
//! Lookups by qualified name must match the prefix exactly; the `_local`
//! variants ignore it, which is what relationship ids (`r:id`, `r:embed`)
//! need since the prefix bound to the namespace varies between producers.

use std::str::FromStr;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesStart;

use crate::color::ColorSpec;

fn decoded(attr: &Attribute<'_>) -> Option<String> {
    attr.unescape_value().ok().map(|v| v.into_owned())
}

fn find_attr(e: &BytesStart, key: &[u8], local: bool) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        let name = if local {
            attr.key.local_name().into_inner()
        } else {
            attr.key.into_inner()
        };
        if name == key {
            decoded(&attr)
        } else {
            None
        }
    })
}

/// Attribute value by qualified name.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    find_attr(e, key, false)
}

/// Attribute value by local name, whatever its prefix.
pub fn attr_string_local(e: &BytesStart, key: &[u8]) -> Option<String> {
    find_attr(e, key, true)
}

/// Attribute parsed with `FromStr`; `None` when missing or malformed.
pub fn attr_parse<T: FromStr>(e: &BytesStart, key: &[u8]) -> Option<T> {
    attr_string(e, key)?.trim().parse().ok()
}

pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_parse(e, key)
}

pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_parse::<f64>(e, key).filter(|v| v.is_finite())
}

/// XML schema boolean: `1`/`true` or `0`/`false`. Anything else is `None`.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    match attr_string(e, key)?.as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

/// The `val` attribute most SpreadsheetML property elements use.
pub fn attr_val(e: &BytesStart) -> Option<String> {
    attr_string(e, b"val")
}

pub fn attr_val_f64(e: &BytesStart) -> Option<f64> {
    attr_f64(e, b"val")
}

/// Color reference of a `<color>`, `<fgColor>` or `<bgColor>` element.
pub fn parse_color_attrs(e: &BytesStart) -> ColorSpec {
    ColorSpec {
        rgb: attr_string(e, b"rgb"),
        theme: attr_u32(e, b"theme"),
        tint: attr_f64(e, b"tint"),
        indexed: attr_u32(e, b"indexed"),
        auto: attr_bool(e, b"auto").unwrap_or(false),
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

    fn tag<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
        BytesStart::new(name).with_attributes(attrs.iter().copied())
    }

    #[test]
    fn qualified_and_local_names() {
        let blip = tag("a:blip", &[("r:embed", "rId3")]);
        assert_eq!(attr_string_local(&blip, b"embed").as_deref(), Some("rId3"));
        assert_eq!(attr_string(&blip, b"embed"), None);
        assert_eq!(attr_string(&blip, b"r:embed").as_deref(), Some("rId3"));
    }

    #[test]
    fn values_are_unescaped() {
        let raw = r#"xdr:cNvPr name="Q&amp;A &lt;1&gt;""#;
        let pr = BytesStart::from_content(raw, "xdr:cNvPr".len());
        assert_eq!(attr_string(&pr, b"name").as_deref(), Some("Q&A <1>"));
    }

    #[test]
    fn numbers() {
        let row = tag("row", &[("r", "42"), ("ht", "20.25"), ("spans", "x")]);
        assert_eq!(attr_u32(&row, b"r"), Some(42));
        assert_eq!(attr_f64(&row, b"ht"), Some(20.25));
        assert_eq!(attr_u32(&row, b"ht"), None);
        assert_eq!(attr_f64(&row, b"spans"), None);
        assert_eq!(attr_f64(&tag("row", &[("ht", "NaN")]), b"ht"), None);
    }

    #[test]
    fn booleans() {
        let e = tag("b", &[("a", "1"), ("b", "0"), ("c", "true"), ("d", "yes")]);
        assert_eq!(attr_bool(&e, b"a"), Some(true));
        assert_eq!(attr_bool(&e, b"b"), Some(false));
        assert_eq!(attr_bool(&e, b"c"), Some(true));
        assert_eq!(attr_bool(&e, b"d"), None);
        assert_eq!(attr_bool(&e, b"missing"), None);
    }

    #[test]
    fn color_reference() {
        let color = parse_color_attrs(&tag("color", &[("theme", "4"), ("tint", "-0.25")]));
        assert_eq!(color.rgb, None);
        assert_eq!(color.theme, Some(4));
        assert_eq!(color.tint, Some(-0.25));
        assert!(!color.auto);
        assert_eq!(attr_val_f64(&tag("sz", &[("val", "12")])), Some(12.0));
    }
}
