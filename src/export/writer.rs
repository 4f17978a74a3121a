//! Indented XML element emission.
//!
//! Output goes into a `String` that is pre-sized by the caller; nesting depth
//! is tracked here so writers only deal with elements and attributes.

use std::fmt::Write;

/// A start or empty element under construction.
#[derive(Debug, Clone)]
pub struct Tag {
    name: &'static str,
    attrs: Vec<(&'static str, String)>,
}

impl Tag {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attrs: Vec::new(),
        }
    }

    /// Append an attribute. Values are escaped when written.
    pub fn attr(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((key, value.into()));
        self
    }

    /// Append an attribute only when `value` is present.
    pub fn attr_opt(self, key: &'static str, value: Option<String>) -> Self {
        match value {
            Some(v) => self.attr(key, v),
            None => self,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.name);
        for (key, value) in &self.attrs {
            // MFString values carry double quotes; single-quote those
            // attributes so they stay readable.
            let quote = if value.contains('"') && !value.contains('\'') {
                '\''
            } else {
                '"'
            };
            write!(out, " {}={}", key, quote).unwrap();
            escape_into(out, value, quote);
            out.push(quote);
        }
    }
}

fn escape_into(out: &mut String, value: &str, quote: char) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quote == '"' => out.push_str("&quot;"),
            '\'' if quote == '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

/// Writes tab-indented markup into a string buffer.
#[derive(Debug, Default)]
pub struct MarkupWriter {
    out: String,
    depth: usize,
}

impl MarkupWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            depth: 0,
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push('\t');
        }
    }

    /// Write a verbatim line (XML declaration, DOCTYPE).
    pub fn raw_line(&mut self, line: &str) {
        self.indent();
        self.out.push_str(line);
        self.out.push('\n');
    }

    /// Write `<Name ... />`.
    pub fn empty(&mut self, tag: Tag) {
        self.indent();
        tag.write_into(&mut self.out);
        self.out.push_str(" />\n");
    }

    /// Write `<Name ...>` and nest subsequent output one level deeper.
    pub fn start(&mut self, tag: Tag) {
        self.indent();
        tag.write_into(&mut self.out);
        self.out.push_str(">\n");
        self.depth += 1;
    }

    /// Close the element opened by the matching [`start`](Self::start).
    pub fn end(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        writeln!(self.out, "</{}>", name).unwrap();
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_elements() {
        let mut w = MarkupWriter::new();
        w.start(Tag::new("Group").attr("DEF", "G_Cube"));
        w.empty(Tag::new("Shape"));
        w.end("Group");
        assert_eq!(w.as_str(), "<Group DEF=\"G_Cube\">\n\t<Shape />\n</Group>\n");
        assert_eq!(w.depth(), 0);
    }

    #[test]
    fn test_attribute_escaping() {
        let mut w = MarkupWriter::new();
        w.empty(Tag::new("meta").attr("content", "a<b & c>d"));
        assert_eq!(w.as_str(), "<meta content=\"a&lt;b &amp; c&gt;d\" />\n");
    }

    #[test]
    fn test_quoted_values_use_single_quotes() {
        let mut w = MarkupWriter::new();
        w.empty(Tag::new("ImageTexture").attr("url", "\"a.png\" \"/tmp/a.png\""));
        assert_eq!(w.as_str(), "<ImageTexture url='\"a.png\" \"/tmp/a.png\"' />\n");
    }

    #[test]
    fn test_mixed_quotes_escaped() {
        let mut w = MarkupWriter::new();
        w.empty(Tag::new("meta").attr("content", "it's \"x\""));
        assert_eq!(w.as_str(), "<meta content=\"it's &quot;x&quot;\" />\n");
    }

    #[test]
    fn test_optional_attribute() {
        let mut w = MarkupWriter::new();
        w.empty(
            Tag::new("IndexedFaceSet")
                .attr_opt("creaseAngle", None)
                .attr_opt("solid", Some("false".to_string())),
        );
        assert_eq!(w.as_str(), "<IndexedFaceSet solid=\"false\" />\n");
    }
}
