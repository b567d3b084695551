use crate::domain::model::{ApiResponse, QueryConfig, Record};
use crate::utils::error::{ApiError, Result};
use crate::utils::jsonp::jsonp_callback_filter;
use serde_json::Value;

/// Keys written as attributes of the enclosing element instead of children.
const XML_ATTRIBUTES: &[&str] = &["id"];

/// Output encoders selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Xml,
    Html,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "xml" => Some(OutputFormat::Xml),
            "html" | "htm" => Some(OutputFormat::Html),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Json => "application/json",
            OutputFormat::Xml => "text/xml",
            OutputFormat::Html => "text/html",
        }
    }

    pub fn render(self, records: &[Record]) -> Result<String> {
        match self {
            OutputFormat::Json => to_json(records),
            OutputFormat::Xml => to_xml(records),
            OutputFormat::Html => Ok(to_html(records)),
        }
    }
}

/// MIME type registered for a format name, if any.
pub fn content_type_for(name: &str) -> Option<&'static str> {
    OutputFormat::from_name(name).map(OutputFormat::content_type)
}

pub fn to_json(records: &[Record]) -> Result<String> {
    Ok(serde_json::to_string(records)?)
}

/// Replace the five XML special characters with entities.
pub fn xml_entities(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[derive(Debug, Default)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

pub fn to_xml(records: &[Record]) -> Result<String> {
    let tree = serde_json::to_value(records)?;
    let mut root = XmlElement::new("records");
    encode_xml(&tree, &mut root);
    Ok(tidy_xml(&root))
}

// 遞迴建立節點；縮排只在最外層的 tidy_xml 做一次
fn encode_xml(value: &Value, parent: &mut XmlElement) {
    let entries: Vec<(String, &Value)> = match value {
        Value::Array(items) => items.iter().map(|v| ("record".to_string(), v)).collect(),
        Value::Object(map) => map.iter().map(|(k, v)| (element_name(k), v)).collect(),
        scalar => {
            parent.text = Some(scalar_text(scalar));
            return;
        }
    };

    for (name, value) in entries {
        if XML_ATTRIBUTES.contains(&name.as_str()) {
            parent.attributes.push((name, scalar_text(value)));
        } else if value.is_object() || value.is_array() {
            let mut child = XmlElement::new(name);
            encode_xml(value, &mut child);
            parent.children.push(child);
        } else {
            let mut child = XmlElement::new(name);
            child.text = Some(scalar_text(value));
            parent.children.push(child);
        }
    }
}

/// Turn a field key into a well-formed XML element name.
///
/// All-digit keys (array indices) become `record`. Otherwise characters that
/// are not XML name characters become `_`, and a leading `_` is added when
/// the key does not start with a name-start character (`2024_sales` ->
/// `_2024_sales`).
fn element_name(key: &str) -> String {
    if key.is_empty() || key.chars().all(|c| c.is_ascii_digit()) {
        return "record".to_string();
    }

    let mut name: String = key
        .chars()
        .map(|c| if is_name_char(c) { c } else { '_' })
        .collect();
    if !name.starts_with(is_name_start_char) {
        name.insert(0, '_');
    }
    name
}

// XML 1.0 (fifth edition) NameStartChar, without ':'
fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn tidy_xml(root: &XmlElement) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n");
    write_element(root, 0, &mut out);
    out
}

fn write_element(element: &XmlElement, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push_str(&format!(" {}=\"{}\"", key, xml_entities(value)));
    }

    let text = element.text.as_deref().unwrap_or_default();
    if element.children.is_empty() && text.is_empty() {
        out.push_str("/>\n");
        return;
    }
    out.push('>');

    if element.children.is_empty() {
        out.push_str(&xml_entities(text));
    } else {
        out.push('\n');
        for child in &element.children {
            write_element(child, depth + 1, out);
        }
        out.push_str(&indent);
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push_str(">\n");
}

/// Render records as an HTML table; the column order comes from the first
/// record. Values are emitted as-is.
pub fn to_html(records: &[Record]) -> String {
    let headers: Vec<&str> = records
        .first()
        .map(|record| record.keys().collect())
        .unwrap_or_default();

    let mut output = String::from("<table>\n<thead>\n<tr>");
    for header in &headers {
        output.push_str(&format!("\t<th>{}</th>", header));
    }
    output.push_str("</tr>\n</thead>\n<tbody>");

    for record in records {
        output.push_str("<tr>\n");
        for header in &headers {
            output.push_str(&format!("\t<td>{}</td>\n", record.get(header).unwrap_or_default()));
        }
        output.push_str("</tr>\n");
    }

    output.push_str("</tbody>\n</table>");
    output
}

pub fn wrap_jsonp(callback: &str, payload: &str) -> String {
    format!("{}({});", callback, payload)
}

/// Serialize records as requested by `config`.
///
/// An unregistered output format yields [`ApiError::FormatNotFound`], which
/// the caller may treat as "no output".
pub fn render_response(records: &[Record], config: &QueryConfig) -> Result<ApiResponse> {
    let format = OutputFormat::from_name(&config.output_format).ok_or_else(|| {
        tracing::warn!("Unknown output format: {:?}", config.output_format);
        ApiError::FormatNotFound {
            format: config.output_format.clone(),
        }
    })?;

    let mut body = format.render(records)?;

    // 輸出前再檢查一次 callback
    let callback = config.jsonp_callback.as_deref().and_then(jsonp_callback_filter);
    if let (OutputFormat::Json, Some(callback)) = (format, callback) {
        body = wrap_jsonp(callback, &body);
    }

    Ok(ApiResponse {
        body,
        content_type: format.content_type(),
    })
}
