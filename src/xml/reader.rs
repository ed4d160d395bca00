/*!
 * Pull-based TMX reader.
 *
 * The reader walks the document with quick-xml and materializes one `<tu>`
 * subtree at a time, so memory use is bounded by the largest unit rather than
 * by the corpus.
 */

use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::errors::{Result, TmxError, malformed};
use crate::language_utils;
use crate::model::{
    Element, Header, Node, Note, Property, Segment, TranslationUnit, TranslationUnitVariant,
};

/// Items produced while reading a TMX document
#[derive(Debug, Clone)]
pub enum TmxEvent {
    /// The `<header>` element
    Header(Header),
    /// One `<tu>`, possibly without any usable variant
    Unit(TranslationUnit),
}

/// Streaming reader over a TMX document
pub struct TmxReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    subtree_buf: Vec<u8>,
    version: Option<String>,
    units_read: usize,
    variants_dropped: usize,
}

impl TmxReader<BufReader<File>> {
    /// Open a TMX file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TmxReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: Reader::from_reader(source),
            buf: Vec::new(),
            subtree_buf: Vec::new(),
            version: None,
            units_read: 0,
            variants_dropped: 0,
        }
    }

    /// `version` attribute of the root element, once seen
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Number of `<tu>` elements read so far
    pub fn units_read(&self) -> usize {
        self.units_read
    }

    /// Number of `<tuv>` elements dropped for a missing or invalid language
    pub fn variants_dropped(&self) -> usize {
        self.variants_dropped
    }

    /// Read until the next header or unit; `None` at end of document
    pub fn next_event(&mut self) -> Result<Option<TmxEvent>> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"tmx" => {
                        let root = start_element(&e)?;
                        self.version = root.attribute("version").map(str::to_string);
                        debug!("TMX version {:?}", self.version);
                    }
                    b"header" => {
                        let root = start_element(&e)?;
                        let element =
                            read_subtree(&mut self.reader, &mut self.subtree_buf, root)?;
                        return Ok(Some(TmxEvent::Header(header_from_element(element))));
                    }
                    b"tu" => {
                        let root = start_element(&e)?;
                        let element =
                            read_subtree(&mut self.reader, &mut self.subtree_buf, root)?;
                        self.units_read += 1;
                        let (unit, dropped) = unit_from_element(element);
                        self.variants_dropped += dropped;
                        return Ok(Some(TmxEvent::Unit(unit)));
                    }
                    _ => {}
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"header" => {
                        let element = start_element(&e)?;
                        return Ok(Some(TmxEvent::Header(header_from_element(element))));
                    }
                    b"tu" => {
                        let element = start_element(&e)?;
                        self.units_read += 1;
                        let (unit, dropped) = unit_from_element(element);
                        self.variants_dropped += dropped;
                        return Ok(Some(TmxEvent::Unit(unit)));
                    }
                    _ => {}
                },
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for TmxReader<R> {
    type Item = Result<TmxEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// Parse a standalone XML fragment into its root element
pub fn parse_element(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();
    let mut subtree_buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let root = start_element(&e)?;
                return read_subtree(&mut reader, &mut subtree_buf, root);
            }
            Event::Empty(e) => return start_element(&e),
            Event::Eof => return Err(TmxError::Malformed("empty XML fragment".to_string())),
            _ => {}
        }
    }
}

/// Parse `<seg>...</seg>` markup into a segment
pub fn parse_segment(xml: &str) -> Result<Segment> {
    let element = parse_element(xml)?;
    if element.name != "seg" {
        return Err(TmxError::Malformed(format!(
            "expected <seg>, found <{}>",
            element.name
        )));
    }
    Ok(Segment::new(element.children))
}

fn start_element(start: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(malformed)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(malformed)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn push_child(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Read the content of `root` up to its end tag
fn read_subtree<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    root: Element,
) -> Result<Element> {
    let mut stack = vec![root];
    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => stack.push(start_element(&e)?),
            Event::Empty(e) => {
                let element = start_element(&e)?;
                push_child(&mut stack, Node::Element(element));
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(malformed)?.into_owned();
                push_child(&mut stack, Node::Text(text));
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                push_child(&mut stack, Node::Text(text));
            }
            Event::End(_) => {
                let done = stack
                    .pop()
                    .ok_or_else(|| TmxError::Malformed("unbalanced end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(done)),
                    None => return Ok(done),
                }
            }
            Event::Eof => {
                return Err(TmxError::Malformed(format!(
                    "unexpected end of document inside <{}>",
                    stack.first().map(|e| e.name.as_str()).unwrap_or("?")
                )));
            }
            _ => {}
        }
    }
}

fn property_from_element(mut element: Element) -> Property {
    let kind = element.remove_attribute("type").unwrap_or_default();
    let lang = element.remove_attribute("xml:lang");
    let value = element.text();
    Property {
        kind,
        lang,
        attributes: element.attributes,
        value,
    }
}

fn note_from_element(mut element: Element) -> Note {
    let lang = element.remove_attribute("xml:lang");
    let text = element.text();
    Note {
        lang,
        attributes: element.attributes,
        text,
    }
}

/// Build the corpus header from a `<header>` element
pub fn header_from_element(element: Element) -> Header {
    let mut header = Header {
        attributes: element.attributes,
        props: Vec::new(),
        notes: Vec::new(),
        extensions: Vec::new(),
    };
    for child in element.children {
        if let Node::Element(child) = child {
            match child.name.as_str() {
                "prop" => header.props.push(property_from_element(child)),
                "note" => header.notes.push(note_from_element(child)),
                _ => header.extensions.push(child),
            }
        }
    }
    header
}

/// Build a variant from a `<tuv>` element; `None` without a valid language
pub fn variant_from_element(mut element: Element, lang: Option<&str>) -> Option<TranslationUnitVariant> {
    let declared = element
        .remove_attribute("xml:lang")
        .or_else(|| element.remove_attribute("lang"));
    let lang = match lang {
        Some(lang) => lang.to_string(),
        None => declared?.trim().to_string(),
    };
    if !language_utils::is_valid_language_code(&lang) {
        return None;
    }
    let mut variant = TranslationUnitVariant::new(lang, Segment::default());
    variant.attributes = element.attributes;
    for child in element.children {
        if let Node::Element(child) = child {
            match child.name.as_str() {
                "prop" => variant.props.push(property_from_element(child)),
                "note" => variant.notes.push(note_from_element(child)),
                "seg" => variant.segment = Segment::new(child.children),
                _ => {}
            }
        }
    }
    Some(variant)
}

/// Build a unit from a `<tu>` element, returning how many variants were dropped
pub fn unit_from_element(mut element: Element) -> (TranslationUnit, usize) {
    let mut unit = TranslationUnit::new(element.remove_attribute("tuid").unwrap_or_default());
    unit.attributes = element.attributes;
    let mut dropped = 0;
    for child in element.children {
        if let Node::Element(child) = child {
            match child.name.as_str() {
                "prop" => unit.props.push(property_from_element(child)),
                "note" => unit.notes.push(note_from_element(child)),
                "tuv" => match variant_from_element(child, None) {
                    Some(variant) => {
                        let lang = variant.lang.clone();
                        if !unit.add_variant(variant) {
                            warn!("Unit {:?} repeats language {}, keeping the first", unit.id, lang);
                            dropped += 1;
                        }
                    }
                    None => {
                        warn!("Dropping <tuv> without a valid language in unit {:?}", unit.id);
                        dropped += 1;
                    }
                },
                _ => {}
            }
        }
    }
    (unit, dropped)
}
