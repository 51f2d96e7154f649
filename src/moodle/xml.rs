#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! A thin element writer over `quick-xml`, shaped for Moodle's
//! `<field><text>..</text></field>` layout.

use std::io::Cursor;

use anyhow::{Context, Result};
use quick_xml::{
    Writer,
    events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

/// Terminator of a CDATA section; it cannot appear inside one.
const CDATA_END: &str = "]]>";

/// Writes an indented XML document into memory.
pub struct XmlWriter {
    /// The underlying writer.
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    /// Starts a UTF-8 document.
    pub fn new() -> Result<Self> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .context("Write error: declaration")?;
        Ok(Self { writer })
    }

    /// Opens `<name attrs..>`.
    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.writer
            .write_event(Event::Start(start))
            .with_context(|| format!("Write error: <{name}>"))?;
        Ok(())
    }

    /// Closes `</name>`.
    pub fn close(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .with_context(|| format!("Write error: </{name}>"))?;
        Ok(())
    }

    /// Writes `<name>value</name>`, escaping `value`. An empty value still
    /// gets an explicit closing tag.
    pub fn text(&mut self, name: &str, value: &str) -> Result<()> {
        self.open(name, &[])?;
        self.writer
            .write_event(Event::Text(BytesText::new(value)))
            .with_context(|| format!("Write error: text of <{name}>"))?;
        self.close(name)
    }

    /// Writes `<name>` holding `value` as CDATA sections, split wherever
    /// `value` contains `]]>`.
    pub fn cdata(&mut self, name: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return self.text(name, value);
        }

        self.open(name, &[])?;
        for section in cdata_sections(value) {
            self.writer
                .write_event(Event::CData(BytesCData::new(section)))
                .with_context(|| format!("Write error: CDATA of <{name}>"))?;
        }
        self.close(name)
    }

    /// Writes `<name attrs..><text>value</text></name>`.
    pub fn wrapped_text(&mut self, name: &str, attrs: &[(&str, &str)], value: &str) -> Result<()> {
        self.open(name, attrs)?;
        self.text("text", value)?;
        self.close(name)
    }

    /// Writes `<name attrs..><text><![CDATA[value]]></text></name>`.
    pub fn wrapped_cdata(&mut self, name: &str, attrs: &[(&str, &str)], value: &str) -> Result<()> {
        self.open(name, attrs)?;
        self.cdata("text", value)?;
        self.close(name)
    }

    /// Returns the document text.
    pub fn finish(self) -> Result<String> {
        let mut bytes = self.writer.into_inner().into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).context("Generated XML is not valid UTF-8")
    }
}

/// Splits `value` so that no section contains `]]>`: the terminator is cut
/// between its `]]` and its `>`.
fn cdata_sections(value: &str) -> Vec<String> {
    let parts: Vec<&str> = value.split(CDATA_END).collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let head = if i > 0 { ">" } else { "" };
            let tail = if i < last { "]]" } else { "" };
            format!("{head}{part}{tail}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_cdata_terminator() {
        assert_eq!(cdata_sections("plain"), vec!["plain"]);
        assert_eq!(cdata_sections("a]]>b"), vec!["a]]", ">b"]);
        assert_eq!(cdata_sections("]]>"), vec!["]]", ">"]);
    }

    #[test]
    fn writes_nested_text_and_cdata() {
        let mut xml = XmlWriter::new().expect("writer");
        xml.open("question", &[("type", "coderunner")]).expect("open");
        xml.wrapped_text("name", &[], "a < b").expect("name");
        xml.wrapped_cdata("questiontext", &[("format", "html")], "<p>x]]>y</p>")
            .expect("text");
        xml.text("hidden", "").expect("hidden");
        xml.close("question").expect("close");
        let out = xml.finish().expect("finish");

        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(out.contains("<question type=\"coderunner\">"));
        assert!(out.contains("<text>a &lt; b</text>"));
        assert!(out.contains("<text><![CDATA[<p>x]]]]><![CDATA[>y</p>]]></text>"));
        assert!(out.contains("<hidden></hidden>"));
    }
}
