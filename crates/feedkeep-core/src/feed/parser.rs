use chrono::Utc;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::models::NewItem;
use crate::{Error, Result};

/// Entry grammar detected in a feed document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `<item>` entries (RSS)
    Rss,
    /// `<entry>` entries (Atom)
    Atom,
}

impl Dialect {
    fn entry_tag(self) -> &'static str {
        match self {
            Dialect::Rss => "item",
            Dialect::Atom => "entry",
        }
    }
}

/// Candidate items extracted from a feed document
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    /// `None` when the document holds neither `<item>` nor `<entry>` elements
    pub dialect: Option<Dialect>,
    pub items: Vec<NewItem>,
}

#[derive(Debug)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| xml_error(format!("bad attribute on <{}>: {}", name, e)))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| xml_error(format!("bad attribute value on <{}>: {}", name, e)))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All descendants named `name`, in document order
    fn descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if let Node::Element(el) = child {
                if el.name == name {
                    out.push(el);
                }
                el.descendants(name, out);
            }
        }
    }

    /// First descendant named `name`, in document order
    fn find(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if let Node::Element(el) = child {
                if el.name == name {
                    return Some(el);
                }
                if let Some(found) = el.find(name) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Trimmed text of the first descendant named `name`, empty if absent
    fn child_text(&self, name: &str) -> String {
        self.find(name)
            .map(|el| el.text_content().trim().to_string())
            .unwrap_or_default()
    }
}

fn xml_error(message: impl Into<String>) -> Error {
    Error::FeedParse(format!("XML parsing error: {}", message.into()))
}

/// Place a finished element under its parent, or make it the document root
fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        Ok(())
    } else if root.is_some() {
        Err(xml_error(format!(
            "junk after document element: <{}>",
            element.name
        )))
    } else {
        *root = Some(element);
        Ok(())
    }
}

fn push_text(stack: &mut [Element], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Text(text.to_string()));
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(xml_error("text outside of the document element")),
    }
}

/// Build an element tree, rejecting anything that is not well-formed XML
fn parse_document(content: &str) -> Result<Element> {
    let mut reader = Reader::from_str(content.trim_start_matches('\u{feff}'));
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err(xml_error("more than one document element"));
                }
                stack.push(Element::from_start(&e)?);
            }
            Ok(Event::Empty(e)) => {
                let element = Element::from_start(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(e)) => {
                let element = stack.pop().ok_or_else(|| {
                    xml_error(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.local_name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| xml_error(e.to_string()))?;
                push_text(&mut stack, &text)?;
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                push_text(&mut stack, &text)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(e.to_string())),
        }
    }

    if let Some(open) = stack.last() {
        return Err(xml_error(format!("unclosed element <{}>", open.name)));
    }

    root.ok_or_else(|| xml_error("no document element"))
}

/// Entries of the given dialect, including the root itself if it matches
fn entries_of(root: &Element, dialect: Dialect) -> Vec<&Element> {
    let tag = dialect.entry_tag();
    let mut out = Vec::new();
    if root.name == tag {
        out.push(root);
    }
    root.descendants(tag, &mut out);
    out
}

fn entry_to_item(entry: &Element, site: &str, now_ms: i64) -> Option<NewItem> {
    let title = entry.child_text("title");

    let mut link = entry.child_text("link");
    if link.is_empty() {
        // Atom carries the link in <link href="..."/>
        link = entry
            .find("link")
            .and_then(|el| el.attribute("href"))
            .map(|href| href.trim().to_string())
            .unwrap_or_default();
    }

    if title.is_empty() || link.is_empty() {
        return None;
    }

    let comments = entry.child_text("comments");

    Some(NewItem {
        title,
        url: link,
        comments: (!comments.is_empty()).then_some(comments),
        site: site.to_string(),
        is_read: false,
        is_starred: false,
        date_added: now_ms,
    })
}

/// Parse a feed document into candidate items for `site`.
///
/// `<item>` entries are used when present, `<entry>` entries otherwise.
/// Entries without a title or a link are dropped; malformed XML is an error.
pub fn parse_feed(content: &str, site: &str) -> Result<ParsedFeed> {
    let root = parse_document(content)?;
    let now_ms = Utc::now().timestamp_millis();

    let (dialect, entries) = match entries_of(&root, Dialect::Rss) {
        items if !items.is_empty() => (Some(Dialect::Rss), items),
        _ => match entries_of(&root, Dialect::Atom) {
            entries if !entries.is_empty() => (Some(Dialect::Atom), entries),
            _ => (None, Vec::new()),
        },
    };

    let items = entries
        .into_iter()
        .filter_map(|entry| entry_to_item(entry, site, now_ms))
        .collect();

    Ok(ParsedFeed { dialect, items })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rss_items() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
          <channel>
            <title>Test Blog</title>
            <link>https://example.com/</link>
            <item>
              <title>First Post</title>
              <link>https://example.com/1</link>
              <comments>https://example.com/1#comments</comments>
            </item>
            <item>
              <title> Second Post </title>
              <link>
                https://example.com/2
              </link>
            </item>
          </channel>
        </rss>"#;

        let parsed = parse_feed(xml, "Test Blog").unwrap();

        assert_eq!(parsed.dialect, Some(Dialect::Rss));
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].title, "First Post");
        assert_eq!(parsed.items[0].url, "https://example.com/1");
        assert_eq!(
            parsed.items[0].comments.as_deref(),
            Some("https://example.com/1#comments")
        );
        assert_eq!(parsed.items[0].site, "Test Blog");
        assert!(!parsed.items[0].is_read);
        assert!(!parsed.items[0].is_starred);
        assert_eq!(parsed.items[1].title, "Second Post");
        assert_eq!(parsed.items[1].url, "https://example.com/2");
        assert_eq!(parsed.items[1].comments, None);
    }

    #[test]
    fn test_atom_fallback_with_href_links() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
          <title>Atom Blog</title>
          <link href="https://example.com/"/>
          <entry>
            <title>Atom Post</title>
            <link rel="alternate" href="https://example.com/atom/1"/>
            <id>urn:post:1</id>
          </entry>
        </feed>"#;

        let parsed = parse_feed(xml, "Atom Blog").unwrap();

        assert_eq!(parsed.dialect, Some(Dialect::Atom));
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].title, "Atom Post");
        assert_eq!(parsed.items[0].url, "https://example.com/atom/1");
    }

    #[test]
    fn test_items_take_precedence_over_entries() {
        let xml = r#"<root>
          <entry><title>Entry</title><link>https://example.com/e</link></entry>
          <item><title>Item</title><link>https://example.com/i</link></item>
        </root>"#;

        let parsed = parse_feed(xml, "Mixed").unwrap();

        assert_eq!(parsed.dialect, Some(Dialect::Rss));
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].title, "Item");
    }

    #[test]
    fn test_incomplete_entries_are_skipped() {
        let xml = r#"<rss><channel>
          <item><link>https://example.com/no-title</link></item>
          <item><title>No link</title></item>
          <item><title>   </title><link>https://example.com/blank-title</link></item>
          <item><title>Kept</title><link>https://example.com/kept</link></item>
        </channel></rss>"#;

        let parsed = parse_feed(xml, "Site").unwrap();

        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].title, "Kept");
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = r#"<rss><channel><item>
          <title><![CDATA[Rust & <friends>]]></title>
          <link>https://example.com/?a=1&amp;b=2</link>
        </item></channel></rss>"#;

        let parsed = parse_feed(xml, "Site").unwrap();

        assert_eq!(parsed.items[0].title, "Rust & <friends>");
        assert_eq!(parsed.items[0].url, "https://example.com/?a=1&b=2");
    }

    #[test]
    fn test_prefixed_elements_match_on_local_name() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
          <rss:item xmlns:rss="http://purl.org/rss/1.0/">
            <rss:title>Prefixed</rss:title>
            <rss:link>https://example.com/p</rss:link>
          </rss:item>
        </rdf:RDF>"#;

        let parsed = parse_feed(xml, "Site").unwrap();

        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].url, "https://example.com/p");
    }

    #[test]
    fn test_no_entries() {
        let xml = r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;

        let parsed = parse_feed(xml, "Empty").unwrap();

        assert_eq!(parsed.dialect, None);
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn test_mismatched_tag_is_error() {
        let xml = "<rss><channel><item><title>x</item></channel></rss>";
        assert!(matches!(parse_feed(xml, "Site"), Err(Error::FeedParse(_))));
    }

    #[test]
    fn test_unclosed_document_is_error() {
        let xml = "<rss><channel><item><title>x</title>";
        assert!(matches!(parse_feed(xml, "Site"), Err(Error::FeedParse(_))));
    }

    #[test]
    fn test_html_page_is_error() {
        let html = "<!DOCTYPE html><html><body><p>Just a moment...<br></body></html>";
        assert!(parse_feed(html, "Site").is_err());
    }

    #[test]
    fn test_plain_text_is_error() {
        assert!(parse_feed("404 page not found", "Site").is_err());
        assert!(parse_feed("", "Site").is_err());
    }

    #[test]
    fn test_two_roots_is_error() {
        let xml = "<rss></rss><rss></rss>";
        assert!(parse_feed(xml, "Site").is_err());
    }
}
