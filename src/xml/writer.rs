/*!
 * TMX serialization.
 *
 * Structural elements (`tu`, `tuv`, `prop`, `note`, `seg`) are laid out on
 * their own lines with configurable indentation. Segment content is mixed
 * content and is always written inline, byte for byte.
 */

use quick_xml::escape::{escape, partial_escape};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::Result;
use crate::model::{Element, Header, Node, Note, Property, Segment, TranslationUnit, TranslationUnitVariant};

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
pub const TMX_DOCTYPE: &str = r#"<!DOCTYPE tmx PUBLIC "-//LISA OSCAR:1998//DTD for Translation Memory eXchange//EN" "tmx14.dtd">"#;

/// Whitespace policy for structural elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub indent: usize,
    pub newlines: bool,
}

impl Layout {
    /// Single line, used for the store's internal representation
    pub fn compact() -> Self {
        Self {
            indent: 0,
            newlines: false,
        }
    }

    /// One structural element per line, `indent` spaces per level
    pub fn pretty(indent: usize) -> Self {
        Self {
            indent,
            newlines: true,
        }
    }

    fn open_line(&self, out: &mut String, level: usize) {
        if self.newlines {
            out.extend(std::iter::repeat_n(' ', self.indent * level));
        }
    }

    fn close_line(&self, out: &mut String) {
        if self.newlines {
            out.push('\n');
        }
    }
}

fn push_attributes<'a, I>(out: &mut String, attributes: I)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    for (key, value) in attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value));
        out.push('"');
    }
}

/// Write inline content without any added whitespace
pub fn write_nodes(out: &mut String, nodes: &[Node]) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
            Node::Element(element) => write_element(out, element),
        }
    }
}

/// Write one element compactly
pub fn write_element(out: &mut String, element: &Element) {
    out.push_str(&start_tag(element));
    if element.children.is_empty() {
        out.pop();
        out.push_str("/>");
    } else {
        write_nodes(out, &element.children);
        out.push_str(&end_tag(element));
    }
}

/// `<name attr="...">` for an element
pub fn start_tag(element: &Element) -> String {
    let mut out = String::new();
    out.push('<');
    out.push_str(&element.name);
    push_attributes(
        &mut out,
        element.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    );
    out.push('>');
    out
}

/// `</name>` for an element
pub fn end_tag(element: &Element) -> String {
    format!("</{}>", element.name)
}

pub fn element_to_string(element: &Element) -> String {
    let mut out = String::new();
    write_element(&mut out, element);
    out
}

/// `<seg>...</seg>`
pub fn segment_to_string(segment: &Segment) -> String {
    let mut out = String::from("<seg>");
    write_nodes(&mut out, segment.nodes());
    out.push_str("</seg>");
    out
}

fn write_props(out: &mut String, props: &[Property], layout: &Layout, level: usize) {
    for prop in props {
        layout.open_line(out, level);
        out.push_str("<prop");
        push_attributes(out, [("type", prop.kind.as_str())]);
        if let Some(lang) = &prop.lang {
            push_attributes(out, [("xml:lang", lang.as_str())]);
        }
        push_attributes(
            out,
            prop.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        );
        out.push('>');
        out.push_str(&partial_escape(prop.value.as_str()));
        out.push_str("</prop>");
        layout.close_line(out);
    }
}

fn write_notes(out: &mut String, notes: &[Note], layout: &Layout, level: usize) {
    for note in notes {
        layout.open_line(out, level);
        out.push_str("<note");
        if let Some(lang) = &note.lang {
            push_attributes(out, [("xml:lang", lang.as_str())]);
        }
        push_attributes(
            out,
            note.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        );
        out.push('>');
        out.push_str(&partial_escape(note.text.as_str()));
        out.push_str("</note>");
        layout.close_line(out);
    }
}

/// Serialize a variant; `with_lang` controls the `xml:lang` attribute
pub fn write_variant(
    out: &mut String,
    variant: &TranslationUnitVariant,
    with_lang: bool,
    layout: &Layout,
    level: usize,
) {
    layout.open_line(out, level);
    out.push_str("<tuv");
    if with_lang {
        push_attributes(out, [("xml:lang", variant.lang.as_str())]);
    }
    push_attributes(
        out,
        variant.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    );
    out.push('>');
    layout.close_line(out);
    write_props(out, &variant.props, layout, level + 1);
    write_notes(out, &variant.notes, layout, level + 1);
    layout.open_line(out, level + 1);
    out.push_str(&segment_to_string(&variant.segment));
    layout.close_line(out);
    layout.open_line(out, level);
    out.push_str("</tuv>");
    layout.close_line(out);
}

/// Serialize a unit with its variants in language order
pub fn write_unit(out: &mut String, unit: &TranslationUnit, layout: &Layout, level: usize) {
    layout.open_line(out, level);
    out.push_str("<tu");
    if !unit.id.is_empty() {
        push_attributes(out, [("tuid", unit.id.as_str())]);
    }
    push_attributes(
        out,
        unit.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    );
    out.push('>');
    layout.close_line(out);
    write_props(out, &unit.props, layout, level + 1);
    write_notes(out, &unit.notes, layout, level + 1);
    for variant in unit.variants.values() {
        write_variant(out, variant, true, layout, level + 1);
    }
    layout.open_line(out, level);
    out.push_str("</tu>");
    layout.close_line(out);
}

pub fn unit_to_string(unit: &TranslationUnit, layout: &Layout) -> String {
    let mut out = String::new();
    write_unit(&mut out, unit, layout, 0);
    out
}

/// Serialize a variant without its language, as stored in a language column
pub fn variant_to_stored_string(variant: &TranslationUnitVariant) -> String {
    let mut out = String::new();
    write_variant(&mut out, variant, false, &Layout::compact(), 0);
    out
}

/// Serialize the header element
pub fn write_header(out: &mut String, header: &Header, layout: &Layout, level: usize) {
    layout.open_line(out, level);
    out.push_str("<header");
    push_attributes(
        out,
        header.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    );
    if header.props.is_empty() && header.notes.is_empty() && header.extensions.is_empty() {
        out.push_str("/>");
        layout.close_line(out);
        return;
    }
    out.push('>');
    layout.close_line(out);
    write_props(out, &header.props, layout, level + 1);
    write_notes(out, &header.notes, layout, level + 1);
    for extension in &header.extensions {
        layout.open_line(out, level + 1);
        write_element(out, extension);
        layout.close_line(out);
    }
    layout.open_line(out, level);
    out.push_str("</header>");
    layout.close_line(out);
}

pub fn header_to_string(header: &Header) -> String {
    let mut out = String::new();
    write_header(&mut out, header, &Layout::compact(), 0);
    out
}

/// Streaming TMX document writer
pub struct TmxWriter<W: Write> {
    out: W,
    layout: Layout,
    units_written: usize,
    scratch: String,
}

impl TmxWriter<BufWriter<File>> {
    /// Create (or truncate) a TMX file
    pub fn create<P: AsRef<Path>>(path: P, indentation: usize) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file), indentation))
    }
}

impl<W: Write> TmxWriter<W> {
    pub fn new(out: W, indentation: usize) -> Self {
        Self {
            out,
            layout: Layout::pretty(indentation),
            units_written: 0,
            scratch: String::new(),
        }
    }

    /// Write prolog, root element, header and the opening `<body>`
    pub fn begin(&mut self, header: &Header) -> Result<()> {
        self.scratch.clear();
        self.scratch.push_str(XML_DECLARATION);
        self.scratch.push('\n');
        self.scratch.push_str(TMX_DOCTYPE);
        self.scratch.push('\n');
        self.scratch.push_str("<tmx version=\"1.4\">\n");
        write_header(&mut self.scratch, header, &self.layout, 1);
        self.layout.open_line(&mut self.scratch, 1);
        self.scratch.push_str("<body>\n");
        self.out.write_all(self.scratch.as_bytes())?;
        Ok(())
    }

    /// Write one unit; units without variants are skipped and return false
    pub fn write_unit(&mut self, unit: &TranslationUnit) -> Result<bool> {
        if unit.variants.is_empty() {
            return Ok(false);
        }
        self.scratch.clear();
        write_unit(&mut self.scratch, unit, &self.layout, 2);
        self.out.write_all(self.scratch.as_bytes())?;
        self.units_written += 1;
        Ok(true)
    }

    pub fn units_written(&self) -> usize {
        self.units_written
    }

    /// Close `<body>` and `<tmx>`, flush, and hand back the sink
    pub fn finish(mut self) -> Result<W> {
        self.scratch.clear();
        self.layout.open_line(&mut self.scratch, 1);
        self.scratch.push_str("</body>\n</tmx>\n");
        self.out.write_all(self.scratch.as_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }
}
