//! A small HTML element tree.
//!
//! Elements carry their inline declarations separately from their class
//! list, so the renderer can decide late whether a set is written inline or
//! replaced by a deduplicated class.

use std::fmt::Write as _;

use crate::css::StyleDeclarations;
use crate::error::Result;

/// Void elements never get a closing tag.
const VOID_TAGS: [&str; 4] = ["img", "br", "hr", "meta"];

/// Escape text content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HtmlElement {
    /// Key used by style passes; never written to the markup.
    pub id: Option<String>,
    pub tag: String,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    /// Written as a `style` attribute when non-empty.
    pub style: StyleDeclarations,
    pub children: Vec<HtmlElement>,
    pub text: Option<String>,
}

impl HtmlElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: StyleDeclarations) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: HtmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.classes.iter().any(|c| c == class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Depth-first visit of this element and its descendants.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut HtmlElement)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }

    pub fn walk(&self, f: &mut impl FnMut(&HtmlElement)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Serialize to markup. Fails if an inline declaration cannot render.
    pub fn to_html(&self) -> Result<String> {
        let mut out = String::new();
        self.write_html(&mut out)?;
        Ok(out)
    }

    fn write_html(&self, out: &mut String) -> Result<()> {
        out.push('<');
        out.push_str(&self.tag);
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape_html(&self.classes.join(" ")));
        }
        for (name, value) in &self.attrs {
            let _ = write!(out, " {name}=\"{}\"", escape_html(value));
        }
        if !self.style.is_empty() {
            let _ = write!(out, " style=\"{}\"", escape_html(&self.style.to_inline()?));
        }
        out.push('>');

        if VOID_TAGS.contains(&self.tag.as_str()) {
            return Ok(());
        }
        if let Some(text) = &self.text {
            out.push_str(&escape_html(text));
        }
        for child in &self.children {
            child.write_html(out)?;
        }
        let _ = write!(out, "</{}>", self.tag);
        Ok(())
    }
}

/// A complete rendered document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HtmlPage {
    pub title: String,
    /// Stylesheet blocks, written in order inside one `<style>` element.
    pub styles: Vec<String>,
    pub body: Vec<HtmlElement>,
}

impl HtmlPage {
    /// Markup of the body elements only.
    pub fn body_html(&self) -> Result<String> {
        let mut out = String::new();
        for element in &self.body {
            out.push_str(&element.to_html()?);
        }
        Ok(out)
    }

    pub fn stylesheet(&self) -> String {
        self.styles
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_html(&self) -> Result<String> {
        let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(out, "<title>{}</title>", escape_html(&self.title));
        let _ = writeln!(out, "<style>\n{}\n</style>", self.stylesheet());
        out.push_str("</head>\n<body>\n");
        out.push_str(&self.body_html()?);
        out.push_str("\n</body>\n</html>\n");
        Ok(out)
    }
}
