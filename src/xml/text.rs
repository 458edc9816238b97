//! XML text <-> [`Element`] tree through quick-xml.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::Element;
use crate::error::{PsiError, Result};

fn syntax(msg: impl std::fmt::Display) -> PsiError {
    PsiError::XmlSyntax(msg.to_string())
}

fn start_element(e: &BytesStart<'_>) -> Result<Element> {
    let qname = e.name();
    let name = std::str::from_utf8(qname.as_ref()).map_err(syntax)?;
    let mut element = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(syntax)?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(syntax)?;
        let value = attr.unescape_value().map_err(syntax)?;
        element.set_attribute(key, value.into_owned());
    }
    Ok(element)
}

fn close_element(stack: &mut Vec<Element>, root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.push_child(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(syntax("more than one root element")),
    }
    Ok(())
}

/// Parses a document and returns its root element. Comments, processing
/// instructions and the XML declaration are skipped.
pub fn parse_document(text: &str) -> Result<Element> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(start_element(&e)?),
            Ok(Event::Empty(e)) => {
                let element = start_element(&e)?;
                close_element(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| syntax("unbalanced end tag"))?;
                close_element(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(t)) => {
                let value = t.unescape().map_err(syntax)?;
                match stack.last_mut() {
                    Some(top) => top.append_text(&value),
                    None if value.trim().is_empty() => {}
                    None => return Err(syntax("character data outside root element")),
                }
            }
            Ok(Event::CData(c)) => {
                let value = std::str::from_utf8(c.as_ref()).map_err(syntax)?;
                if let Some(top) = stack.last_mut() {
                    top.append_text(value);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(syntax(format!(
                    "at position {}: {e}",
                    reader.error_position()
                )));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(syntax(format!("unclosed element <{}>", open.name())));
    }
    root.ok_or_else(|| syntax("no root element"))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name());
    for (key, value) in element.attributes() {
        start.push_attribute((key, value));
    }

    if element.children().is_empty() && element.text().is_empty() {
        writer.write_event(Event::Empty(start)).map_err(syntax)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(syntax)?;
    if !element.text().is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(element.text())))
            .map_err(syntax)?;
    }
    for child in element.children() {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name())))
        .map_err(syntax)?;
    Ok(())
}

/// Serializes `root` as an indented UTF-8 document.
pub fn to_document(root: &Element) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(syntax)?;
    write_element(&mut writer, root)?;
    String::from_utf8(writer.into_inner()).map_err(syntax)
}
