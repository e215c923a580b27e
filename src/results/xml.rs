// src/results/xml.rs

//! Indented XML serialisation of result trees, using `quick-xml`.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::{AgentError, Result};
use crate::results::ResultNode;

/// Serialise `node` as a standalone, indented XML document.
pub fn to_xml_string(node: &ResultNode) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(xml_error)?;
    write_node(&mut writer, node)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| AgentError::ResultError(format!("serialised result is not UTF-8: {e}")))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &ResultNode) -> Result<()> {
    let mut start = BytesStart::new(node.name.as_str());
    for (key, value) in &node.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if node.children.is_empty() && node.text.is_none() {
        writer.write_event(Event::Empty(start)).map_err(xml_error)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    if let Some(text) = &node.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)?;
    }
    for child in &node.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name.as_str())))
        .map_err(xml_error)?;

    Ok(())
}

/// Parse a result document back into a tree.
///
/// Whitespace-only text is dropped; the document must have exactly one
/// root element.
pub fn parse_result_xml(xml: &str) -> Result<ResultNode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<ResultNode> = Vec::new();
    let mut root: Option<ResultNode> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => stack.push(node_from_start(&e)?),
            Event::Empty(e) => {
                let node = node_from_start(&e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| {
                    AgentError::ResultError("unbalanced closing tag".to_string())
                })?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(t) => {
                let raw = std::str::from_utf8(&t)
                    .map_err(|e| AgentError::ResultError(e.to_string()))?;
                let text = unescape(raw).map_err(xml_error)?;
                push_text(&mut stack, &text);
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                push_text(&mut stack, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(AgentError::ResultError(format!(
            "unclosed element <{}>",
            stack.last().map(|n| n.name.as_str()).unwrap_or_default()
        )));
    }

    root.ok_or_else(|| AgentError::ResultError("document has no root element".to_string()))
}

fn node_from_start(e: &BytesStart<'_>) -> Result<ResultNode> {
    let mut node = ResultNode::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = std::str::from_utf8(&attr.value)
            .map_err(|e| AgentError::ResultError(e.to_string()))?;
        let value = unescape(raw).map_err(xml_error)?;
        node.attributes.push((key, value.into_owned()));
    }
    Ok(node)
}

fn attach(
    stack: &mut [ResultNode],
    root: &mut Option<ResultNode>,
    node: ResultNode,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => {
            return Err(AgentError::ResultError(format!(
                "second root element <{}>",
                node.name
            )));
        }
    }
    Ok(())
}

fn push_text(stack: &mut [ResultNode], text: &str) {
    if let Some(top) = stack.last_mut() {
        top.text.get_or_insert_with(String::new).push_str(text);
    }
}

fn xml_error(e: impl std::fmt::Display) -> AgentError {
    AgentError::ResultError(format!("XML error: {e}"))
}
