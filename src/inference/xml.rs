use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::InferenceError;

struct Element {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>, position: u64) -> Result<Self, InferenceError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
        let mut children = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| InferenceError::Xml {
                position,
                message: e.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            if key == "xmlns" || key.starts_with("xmlns:") {
                continue;
            }
            let value = attr.unescape_value().map_err(|e| InferenceError::Xml {
                position,
                message: e.to_string(),
            })?;
            let local = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
            children.insert(format!("@{local}"), Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            children,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim().to_string();
        if self.children.is_empty() {
            return (self.name, Value::String(text));
        }
        let mut children = self.children;
        if !text.is_empty() {
            children.insert("#text".to_string(), Value::String(text));
        }
        (self.name, Value::Object(children))
    }
}

/// Attach a child element; a repeated tag turns into an array.
fn attach(parent: &mut Map<String, Value>, name: String, value: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

/// Map an XML document onto a JSON-like tree.
///
/// Returns the root tag name and its value. Attributes become `@name`
/// keys, repeated child tags become arrays, text next to attributes or
/// children is kept under `#text`, and text-only elements become strings.
pub fn xml_to_document(xml: &str) -> Result<(String, Value), InferenceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| InferenceError::Xml {
            position: reader.error_position() as u64,
            message: e.to_string(),
        })?;
        match event {
            Event::Start(ref e) => stack.push(Element::open(e, position)?),
            Event::Empty(ref e) => {
                let (name, value) = Element::open(e, position)?.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::Text(ref t) => {
                let text = t.unescape().map_err(|e| InferenceError::Xml {
                    position,
                    message: e.to_string(),
                })?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(ref c) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(c));
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(InferenceError::Xml {
                        position,
                        message: "unexpected closing tag".to_string(),
                    });
                };
                let (name, value) = element.close();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, value),
                    None => root = Some((name, value)),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(InferenceError::InvalidStructure(
            "document ended inside an element".to_string(),
        ));
    }
    root.ok_or_else(|| InferenceError::InvalidStructure("no root element".to_string()))
}
