//! Immutable style declaration sets and their canonical keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Result, XlhtmlError};
use crate::units::{format_fixed2, Measurement};

/// A declaration value. Every variant renders to a single CSS token string.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StyleValue {
    Text(String),
    Number(f64),
    Length(Measurement),
}

impl StyleValue {
    /// Render to the exact string used in both the canonical key and the
    /// emitted rule. Fails for values that would break rule syntax.
    pub fn render(&self) -> std::result::Result<String, &'static str> {
        match self {
            Self::Text(text) => {
                if text.trim().is_empty() {
                    return Err("empty value");
                }
                if text.contains([';', '{', '}', '\n', '\r']) {
                    return Err("value contains a CSS delimiter");
                }
                Ok(text.clone())
            }
            Self::Number(n) => {
                if !n.is_finite() {
                    return Err("non-finite number");
                }
                Ok(format_number(*n))
            }
            Self::Length(m) => Ok(m.to_string()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract().abs() < f64::EPSILON && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        format_fixed2(n)
    }
}

impl From<&str> for StyleValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for StyleValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Measurement> for StyleValue {
    fn from(m: Measurement) -> Self {
        Self::Length(m)
    }
}

/// An unordered set of `name: value` declarations.
///
/// Names are unique and kept sorted, so two sets built in different orders
/// compare equal and produce the same canonical key. There is no way to
/// mutate a set in place; [`StyleDeclarations::with`] and
/// [`StyleDeclarations::without`] return new sets.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StyleDeclarations {
    entries: BTreeMap<String, StyleValue>,
}

impl StyleDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DeclarationsBuilder {
        DeclarationsBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&StyleValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Declarations in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A copy with `name` set to `value`.
    #[must_use]
    pub fn with(&self, name: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(name.into(), value.into());
        Self { entries }
    }

    /// A copy without `name`.
    #[must_use]
    pub fn without(&self, name: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(name);
        Self { entries }
    }

    /// Inline `style` attribute text: `a: 1; b: 2`.
    pub fn to_inline(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let rendered = value
                .render()
                .map_err(|reason| XlhtmlError::unstable("inline", name, reason))?;
            parts.push(format!("{name}: {rendered}"));
        }
        Ok(parts.join("; "))
    }
}

impl<K: Into<String>, V: Into<StyleValue>> FromIterator<(K, V)> for StyleDeclarations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Collects declarations for one element, then freezes them.
#[derive(Debug, Default)]
pub struct DeclarationsBuilder {
    entries: BTreeMap<String, StyleValue>,
}

impl DeclarationsBuilder {
    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.entries.insert(name.into(), value.into());
        self
    }

    /// Set only when `value` is present.
    #[must_use]
    pub fn set_opt<V: Into<StyleValue>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(name, v),
            None => self,
        }
    }

    /// Set the same value under several names.
    #[must_use]
    pub fn set_all(mut self, names: &[&str], value: &StyleValue) -> Self {
        for name in names {
            self.entries.insert((*name).to_string(), value.clone());
        }
        self
    }

    pub fn build(self) -> StyleDeclarations {
        StyleDeclarations {
            entries: self.entries,
        }
    }
}

/// Order-independent identity of a declaration set.
///
/// The text is every `name:value;` pair in name order. Names are restricted
/// to CSS property characters and values may not contain `;`, so distinct
/// sets can never produce the same key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey(String);

/// Why a declaration set has no canonical key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnstableValue {
    pub name: String,
    pub reason: &'static str,
}

impl UnstableValue {
    pub fn into_error(self, element: &str) -> XlhtmlError {
        XlhtmlError::unstable(element, &self.name, self.reason)
    }
}

fn is_property_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl CanonicalKey {
    /// Canonicalize a declaration set.
    pub fn of(declarations: &StyleDeclarations) -> std::result::Result<Self, UnstableValue> {
        let mut key = String::new();
        for (name, value) in declarations.iter() {
            if !is_property_name(name) {
                return Err(UnstableValue {
                    name: name.to_string(),
                    reason: "invalid property name",
                });
            }
            let rendered = value.render().map_err(|reason| UnstableValue {
                name: name.to_string(),
                reason,
            })?;
            key.push_str(name);
            key.push(':');
            key.push_str(&rendered);
            key.push(';');
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
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

    #[test]
    fn key_ignores_insertion_order() {
        let a = StyleDeclarations::builder()
            .set("color", "red")
            .set("height", Measurement::pt(15.0).unwrap())
            .build();
        let b = StyleDeclarations::builder()
            .set("height", Measurement::pt(15.0).unwrap())
            .set("color", "red")
            .build();
        assert_eq!(a, b);
        assert_eq!(
            CanonicalKey::of(&a).unwrap(),
            CanonicalKey::of(&b).unwrap()
        );
        assert_eq!(
            CanonicalKey::of(&a).unwrap().as_str(),
            "color:red;height:15.00pt;"
        );
    }

    #[test]
    fn empty_set_has_empty_key() {
        let key = CanonicalKey::of(&StyleDeclarations::new()).unwrap();
        assert_eq!(key.as_str(), "");
    }

    #[test]
    fn different_values_different_keys() {
        let a: StyleDeclarations = [("color", "red")].into_iter().collect();
        let b: StyleDeclarations = [("color", "blue")].into_iter().collect();
        assert_ne!(CanonicalKey::of(&a).unwrap(), CanonicalKey::of(&b).unwrap());
    }

    #[test_case(StyleValue::Text("a;b".into()) ; "semicolon")]
    #[test_case(StyleValue::Text("{".into()) ; "brace")]
    #[test_case(StyleValue::Text("line\nbreak".into()) ; "newline")]
    #[test_case(StyleValue::Text("  ".into()) ; "blank")]
    #[test_case(StyleValue::Number(f64::NAN) ; "nan")]
    fn unstable_values_rejected(value: StyleValue) {
        let decls = StyleDeclarations::new().with("color", value);
        let err = CanonicalKey::of(&decls).unwrap_err();
        assert_eq!(err.name, "color");
    }

    #[test]
    fn invalid_name_rejected() {
        let decls = StyleDeclarations::new().with("co lor", "red");
        assert_eq!(
            CanonicalKey::of(&decls).unwrap_err().reason,
            "invalid property name"
        );
    }

    #[test_case(400.0 => "400")]
    #[test_case(1.5 => "1.50")]
    #[test_case(-2.0 => "-2")]
    fn numbers_render_stably(n: f64) -> String {
        StyleValue::Number(n).render().unwrap()
    }

    #[test]
    fn with_returns_new_set() {
        let base = StyleDeclarations::new().with("color", "red");
        let changed = base.with("color", "blue");
        assert_eq!(base.get("color"), Some(&StyleValue::from("red")));
        assert_eq!(changed.get("color"), Some(&StyleValue::from("blue")));
        assert!(!changed.without("color").contains("color"));
    }

    #[test]
    fn inline_text() {
        let decls = StyleDeclarations::builder()
            .set("width", "10px")
            .set("height", "5pt")
            .build();
        assert_eq!(decls.to_inline().unwrap(), "height: 5pt; width: 10px");
    }
}
