//! Markup documents with directive comments
//!
//! Each node of a page or component is written as
//!
//! ```text
//! <!-- @strata {"key":"…", …} -->
//! <div class="main">
//!   <!-- @strata {"key":"…"} -->
//!   hello&#32;
//! </div>
//! ```
//!
//! The directive carries the reconciliation key and every deployment
//! attribute; the markup carries the tag, plain attributes and text.
//! Newlines and indentation between nodes are formatting only: text and
//! comment bodies escape newlines, tabs and edge spaces, so trimming raw
//! whitespace never changes content.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_core::errors::ExError;

use super::manifest::AclDoc;
use crate::errors::{markup_error, Result};

const DIRECTIVE_OPEN: &str = "<!-- @strata ";
const DIRECTIVE_CLOSE: &str = " -->";
const COMPONENT_TAG: &str = "strata:component";
const TEMPLATE_TAG: &str = "strata:template";
const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDoc {
    pub data_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// Deployment attributes of one node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directive {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<String>,
    #[serde(flatten)]
    pub acl: AclDoc,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub show_locales: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hide_locales: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingDoc>,
    /// Template body of a template node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Directive {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<MarkupNode>,
    },
    Text(String),
    Comment(String),
    Template,
    /// Reference to a shared component by reconciliation key
    Placement { src: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupNode {
    pub directive: Directive,
    pub kind: MarkupKind,
}

impl MarkupNode {
    /// Call `f` on this node and every descendant, depth first
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a MarkupNode)) {
        f(self);
        if let MarkupKind::Element { children, .. } = &self.kind {
            for child in children {
                child.walk(f);
            }
        }
    }
}

pub fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
        && !tag.starts_with("strata:")
}

pub fn is_valid_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' || c == '@')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '@'))
}

// ===== Writing =====

/// Serialize a node sequence into a markup document
///
/// # Errors
/// Returns a serialization error for a tag or attribute name that the
/// document syntax cannot carry.
pub fn write_document(nodes: &[MarkupNode]) -> Result<String> {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, 0, node)?;
    }
    Ok(out)
}

fn write_node(out: &mut String, depth: usize, node: &MarkupNode) -> Result<()> {
    let indent = INDENT.repeat(depth);
    let directive = serde_json::to_string(&node.directive)
        .map_err(|e| markup_error(0, e.to_string()))?
        .replace('>', "\\u003e");
    out.push_str(&indent);
    out.push_str(DIRECTIVE_OPEN);
    out.push_str(&directive);
    out.push_str(DIRECTIVE_CLOSE);
    out.push('\n');

    out.push_str(&indent);
    match &node.kind {
        MarkupKind::Element {
            tag,
            attributes,
            children,
        } => {
            if !is_valid_tag(tag) {
                return Err(markup_error(0, format!("cannot write element tag '{}'", tag)));
            }
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                if !is_valid_attribute_name(name) {
                    return Err(markup_error(
                        0,
                        format!("cannot write attribute name '{}' on <{}>", name, tag),
                    ));
                }
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            out.push('>');
            if !children.is_empty() {
                out.push('\n');
                for child in children {
                    write_node(out, depth + 1, child)?;
                }
                out.push_str(&indent);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push_str(">\n");
        }
        MarkupKind::Text(text) => {
            out.push_str(&escape_text(text));
            out.push('\n');
        }
        MarkupKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(&escape_text(text));
            out.push_str("-->\n");
        }
        MarkupKind::Template => {
            out.push_str(&format!("<{}></{}>\n", TEMPLATE_TAG, TEMPLATE_TAG));
        }
        MarkupKind::Placement { src } => {
            out.push_str(&format!(
                "<{} src=\"{}\"></{}>\n",
                COMPONENT_TAG,
                escape_attribute(src),
                COMPONENT_TAG
            ));
        }
    }
    Ok(())
}

fn escape_common(c: char, out: &mut String) -> bool {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '\n' => out.push_str("&#10;"),
        '\r' => out.push_str("&#13;"),
        '\t' => out.push_str("&#9;"),
        _ => return false,
    }
    true
}

/// Escape character data; spaces at either edge become `&#32;`
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let last = text.chars().count().saturating_sub(1);
    for (i, c) in text.chars().enumerate() {
        if escape_common(c, &mut out) {
            continue;
        }
        if c.is_whitespace() && (i == 0 || i == last) {
            out.push_str(&format!("&#{};", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '"' {
            out.push_str("&quot;");
        } else if !escape_common(c, &mut out) {
            out.push(c);
        }
    }
    out
}

// ===== Parsing =====

/// Parse a markup document into its node sequence
///
/// # Errors
/// Returns a serialization error naming the line of the first syntax error.
pub fn parse_document(text: &str) -> Result<Vec<MarkupNode>> {
    let mut parser = Parser { src: text, pos: 0 };
    let nodes = parser.nodes(None)?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(parser.error("unexpected content after document end"));
    }
    Ok(nodes)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn line(&self) -> usize {
        self.src[..self.pos].matches('\n').count() + 1
    }

    fn error(&self, reason: impl Into<String>) -> ExError {
        markup_error(self.line(), reason)
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, literal: &str) -> Result<()> {
        if self.eat(literal) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", literal)))
        }
    }

    /// Consume up to (not including) `terminator`
    fn take_until(&mut self, terminator: &str) -> Result<&'a str> {
        match self.rest().find(terminator) {
            Some(at) => {
                let taken = &self.rest()[..at];
                self.pos += at;
                Ok(taken)
            }
            None => Err(self.error(format!("missing '{}'", terminator))),
        }
    }

    /// Nodes until end of input (`closing == None`) or `</closing>`
    fn nodes(&mut self, closing: Option<&str>) -> Result<Vec<MarkupNode>> {
        let mut nodes = Vec::new();
        loop {
            self.skip_ws();
            if self.rest().is_empty() {
                return match closing {
                    None => Ok(nodes),
                    Some(tag) => Err(self.error(format!("unclosed <{}>", tag))),
                };
            }
            if self.rest().starts_with("</") {
                return match closing {
                    Some(tag) => {
                        self.expect("</")?;
                        self.expect(tag)?;
                        self.skip_ws();
                        self.expect(">")?;
                        Ok(nodes)
                    }
                    None => Err(self.error("closing tag without open element")),
                };
            }
            nodes.push(self.node()?);
        }
    }

    fn directive(&mut self) -> Result<Directive> {
        if !self.eat(DIRECTIVE_OPEN) {
            return Err(self.error("expected a directive comment before every node"));
        }
        let json = self.take_until("-->")?;
        let directive: Directive = serde_json::from_str(json.trim_end())
            .map_err(|e| self.error(format!("bad directive: {}", e)))?;
        self.expect("-->")?;
        if directive.key.is_empty() {
            return Err(self.error("directive without key"));
        }
        Ok(directive)
    }

    fn node(&mut self) -> Result<MarkupNode> {
        let directive = self.directive()?;
        self.skip_ws();
        let rest = self.rest();

        let kind = if rest.is_empty() || rest.starts_with(DIRECTIVE_OPEN) || rest.starts_with("</")
        {
            MarkupKind::Text(String::new())
        } else if self.eat("<!--") {
            let body = self.take_until("-->")?;
            self.expect("-->")?;
            MarkupKind::Comment(self.unescape(body)?)
        } else if rest.starts_with('<') {
            self.element()?
        } else {
            let raw = self.take_until_or_end('<');
            MarkupKind::Text(self.unescape(raw.trim_end())?)
        };

        Ok(MarkupNode { directive, kind })
    }

    fn take_until_or_end(&mut self, c: char) -> &'a str {
        let rest = self.rest();
        let at = rest.find(c).unwrap_or(rest.len());
        self.pos += at;
        &rest[..at]
    }

    fn name(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn element(&mut self) -> Result<MarkupKind> {
        self.expect("<")?;
        let tag = self.name().to_string();
        if tag.is_empty() {
            return Err(self.error("element without tag name"));
        }

        let mut attributes = BTreeMap::new();
        let self_closing = loop {
            self.skip_ws();
            if self.eat("/>") {
                break true;
            }
            if self.eat(">") {
                break false;
            }
            let name = self.name().to_string();
            if name.is_empty() {
                return Err(self.error(format!("malformed attribute in <{}>", tag)));
            }
            self.skip_ws();
            self.expect("=")?;
            self.skip_ws();
            self.expect("\"")?;
            let raw = self.take_until("\"")?;
            self.expect("\"")?;
            let value = self.unescape(raw)?;
            if attributes.insert(name.clone(), value).is_some() {
                return Err(self.error(format!("attribute '{}' repeated in <{}>", name, tag)));
            }
        };

        let children = if self_closing {
            Vec::new()
        } else {
            self.nodes(Some(&tag))?
        };

        match tag.as_str() {
            COMPONENT_TAG => {
                if !children.is_empty() {
                    return Err(self.error("component placement cannot have children"));
                }
                let src = attributes
                    .remove("src")
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| self.error("component placement without src"))?;
                Ok(MarkupKind::Placement { src })
            }
            TEMPLATE_TAG => {
                if !children.is_empty() {
                    return Err(self.error("template element cannot have children"));
                }
                Ok(MarkupKind::Template)
            }
            _ => Ok(MarkupKind::Element {
                tag,
                attributes,
                children,
            }),
        }
    }

    fn unescape(&self, raw: &str) -> Result<String> {
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(amp) = rest.find('&') {
            out.push_str(&rest[..amp]);
            let after = &rest[amp + 1..];
            let semi = after
                .find(';')
                .ok_or_else(|| self.error("unterminated character reference"))?;
            let entity = &after[..semi];
            let decoded = match entity {
                "amp" => '&',
                "lt" => '<',
                "gt" => '>',
                "quot" => '"',
                "apos" => '\'',
                _ => {
                    let code = if let Some(hex) = entity
                        .strip_prefix("#x")
                        .or_else(|| entity.strip_prefix("#X"))
                    {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse::<u32>().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32).ok_or_else(|| {
                        self.error(format!("unknown character reference '&{};'", entity))
                    })?
                }
            };
            out.push(decoded);
            rest = &after[semi + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(key: &str, tag: &str, children: Vec<MarkupNode>) -> MarkupNode {
        MarkupNode {
            directive: Directive::new(key),
            kind: MarkupKind::Element {
                tag: tag.to_string(),
                attributes: BTreeMap::new(),
                children,
            },
        }
    }

    fn text(key: &str, value: &str) -> MarkupNode {
        MarkupNode {
            directive: Directive::new(key),
            kind: MarkupKind::Text(value.to_string()),
        }
    }

    #[test]
    fn test_document_layout() {
        let mut div = element("d1", "div", vec![text("t1", "hello")]);
        if let MarkupKind::Element { attributes, .. } = &mut div.kind {
            attributes.insert("class".to_string(), "main".to_string());
            attributes.insert("id".to_string(), "x".to_string());
        }
        let doc = write_document(&[div]).unwrap();
        assert_eq!(
            doc,
            "<!-- @strata {\"key\":\"d1\"} -->\n\
             <div class=\"main\" id=\"x\">\n  \
             <!-- @strata {\"key\":\"t1\"} -->\n  \
             hello\n\
             </div>\n"
        );
    }

    #[test]
    fn test_whitespace_and_specials_survive() {
        let nodes = vec![
            text("a", "  two\nlines\t& <tags>  "),
            text("b", ""),
            MarkupNode {
                directive: Directive::new("c"),
                kind: MarkupKind::Comment(" @strata not a directive --> ".to_string()),
            },
            text("d", "x"),
        ];
        let doc = write_document(&nodes).unwrap();
        assert_eq!(parse_document(&doc).unwrap(), nodes);
    }

    #[test]
    fn test_directive_fields_cannot_close_comment() {
        let mut node = element("k", "div", Vec::new());
        node.directive.show = Some("a --> b".to_string());
        node.directive.acl.grants.insert("editors".to_string(), "rw".to_string());
        let doc = write_document(&[node.clone()]).unwrap();
        assert!(!doc.lines().next().unwrap().contains("a -->"));
        assert_eq!(parse_document(&doc).unwrap(), vec![node]);
    }

    #[test]
    fn test_placement_and_template() {
        let nodes = vec![
            MarkupNode {
                directive: Directive::new("p"),
                kind: MarkupKind::Placement {
                    src: "comp1".to_string(),
                },
            },
            MarkupNode {
                directive: Directive {
                    content: Some("{{ title }}".to_string()),
                    ..Directive::new("t")
                },
                kind: MarkupKind::Template,
            },
        ];
        let doc = write_document(&nodes).unwrap();
        assert!(doc.contains("<strata:component src=\"comp1\"></strata:component>"));
        assert_eq!(parse_document(&doc).unwrap(), nodes);
    }

    #[test]
    fn test_hand_edited_self_closing_element() {
        let doc = "<!-- @strata {\"key\":\"k\"} -->\n<br />\n";
        let nodes = parse_document(doc).unwrap();
        assert_eq!(nodes, vec![element("k", "br", Vec::new())]);
    }

    #[test]
    fn test_errors_name_the_line() {
        let doc = "<!-- @strata {\"key\":\"k\"} -->\n<div>\n  plain\n</div>\n";
        let err = parse_document(doc).unwrap_err();
        assert!(err.message().contains("line 3"), "{}", err.message());

        assert!(parse_document("<!-- @strata {\"key\":\"k\"} -->\n<div>\n").is_err());
        assert!(parse_document("<!-- @strata {} -->\n<div></div>\n").is_err());
        assert!(parse_document("<!-- @strata {\"key\":\"k\"} -->\n<strata:component></strata:component>").is_err());
    }

    #[test]
    fn test_invalid_names_refused_on_write() {
        let bad_tag = element("k", "strata:component", Vec::new());
        assert!(write_document(&[bad_tag]).is_err());

        let mut bad_attr = element("k", "div", Vec::new());
        if let MarkupKind::Element { attributes, .. } = &mut bad_attr.kind {
            attributes.insert("a b".to_string(), "v".to_string());
        }
        assert!(write_document(&[bad_attr]).is_err());
    }
}
