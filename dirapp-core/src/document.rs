//! XML ⇄ keyed-tree conversion for `applicationHost.config`.
//!
//! # Keyed form
//!
//! An element becomes a JSON object. Attributes are string members, child
//! elements are members named after the tag, and character data lives under
//! [`TEXT_KEY`]. A tag that occurs once is stored as a bare object; a tag that
//! occurs more than once is stored as an array:
//!
//! ```text
//! <site name="a"><application path="/"/></site>
//!   => {"name": "a", "application": {"path": "/"}}
//! <site name="a"><application path="/"/><application path="/x"/></site>
//!   => {"name": "a", "application": [{"path": "/"}, {"path": "/x"}]}
//! ```
//!
//! This module is the only place that knows about that collapse. Readers go
//! through [`as_list`]; writers go through [`collapse`], which folds a
//! one-element result back into a bare object so the tree always equals what
//! re-parsing the written file would yield.
//!
//! # Fidelity
//!
//! Writing re-derives the whole file from the tree. Attribute values and their
//! order, element order and text survive. When differently named siblings are
//! interleaved (`<add/><remove/><add/>`), the parent records the tag sequence
//! under [`ORDER_KEY`] and the writer follows it. Comments, processing
//! instructions, the doctype and the original whitespace layout are lost.

use std::collections::HashMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use crate::types::{Application, Site, SiteApplication, SiteName, VirtualDirectory};

/// Member name holding an element's character data.
pub const TEXT_KEY: &str = "$t";

/// Member listing child tag names in document order. Present only when the
/// grouped-by-name layout of the map would not reproduce that order.
pub const ORDER_KEY: &str = "$order";

const ROOT_ELEMENT: &str = "configuration";
const SITES_PATH: [&str; 2] = ["system.applicationHost", "sites"];

// ---------------------------------------------------------------------------
// 1. Collapse / expand
// ---------------------------------------------------------------------------

/// Normalize a collapsible member into a sequence.
///
/// Absent and null members are empty, a bare value is a one-element list.
pub fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Fold a sequence back into its persisted shape.
///
/// Empty is `None`, a single item is returned bare, anything longer stays a list.
pub fn collapse(mut items: Vec<Value>) -> Option<Value> {
    match items.len() {
        0 => None,
        1 => items.pop(),
        _ => Some(Value::Array(items)),
    }
}

fn take_list(map: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match map.get_mut(key) {
        Some(slot) => match std::mem::take(slot) {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        },
        None => Vec::new(),
    }
}

// An emptied member is left as `Null` in place rather than removed, so the
// member order of the surrounding element is untouched. Null is skipped on write.
fn put_list(map: &mut Map<String, Value>, key: &str, items: Vec<Value>) {
    let value = collapse(items).unwrap_or(Value::Null);
    match map.get_mut(key) {
        Some(slot) => *slot = value,
        None if !value.is_null() => {
            map.insert(key.to_string(), value);
        }
        None => {}
    }
}

/// Record one more `key` child, placed after the last existing one.
fn insert_order_slot(map: &mut Map<String, Value>, key: &str) {
    if let Some(Value::Array(order)) = map.get_mut(ORDER_KEY) {
        let at = order
            .iter()
            .rposition(|name| name.as_str() == Some(key))
            .map_or(order.len(), |index| index + 1);
        order.insert(at, Value::String(key.to_string()));
    }
}

/// Forget the `nth` `key` child.
fn remove_order_slot(map: &mut Map<String, Value>, key: &str, nth: usize) {
    if let Some(Value::Array(order)) = map.get_mut(ORDER_KEY) {
        let position = order
            .iter()
            .enumerate()
            .filter(|(_, name)| name.as_str() == Some(key))
            .nth(nth)
            .map(|(index, _)| index);
        if let Some(index) = position {
            order.remove(index);
        }
    }
}

/// `true` when every tag's children are contiguous.
fn is_grouped(names: &[String]) -> bool {
    names.iter().enumerate().all(|(index, name)| {
        index == 0
            || names[index - 1] == *name
            || !names[..index - 1].contains(name)
    })
}

fn attr<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}

// ---------------------------------------------------------------------------
// 2. Generic XML document
// ---------------------------------------------------------------------------

/// A parsed XML file in keyed form.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    declaration: bool,
    root_name: String,
    root: Map<String, Value>,
}

impl XmlDocument {
    pub fn parse(xml: &str) -> Result<Self, String> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<OpenElement> = Vec::new();
        let mut root = None;
        let mut declaration = false;

        loop {
            match reader.read_event() {
                Ok(Event::Decl(_)) => declaration = true,
                Ok(Event::Start(start)) => stack.push(open_element(&start)?),
                Ok(Event::Empty(start)) => {
                    let element = open_element(&start)?;
                    close_element(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| "closing tag without an open element".to_string())?;
                    close_element(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(text)) => {
                    let text = text.unescape().map_err(|e| e.to_string())?;
                    append_text(&mut stack, &text);
                }
                Ok(Event::CData(data)) => {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    append_text(&mut stack, &text);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    return Err(format!(
                        "XML error at position {}: {err}",
                        reader.buffer_position()
                    ))
                }
            }
        }

        if let Some(open) = stack.last() {
            return Err(format!("element <{}> is never closed", open.name));
        }
        let (root_name, root) = root.ok_or_else(|| "document has no root element".to_string())?;
        Ok(Self {
            declaration,
            root_name,
            root,
        })
    }

    pub fn to_xml(&self) -> Result<String, String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        if self.declaration {
            emit(
                &mut writer,
                Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
            )?;
        }
        write_element(&mut writer, &self.root_name, &self.root)?;
        let mut xml = String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())?;
        xml.push('\n');
        Ok(xml)
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Follow single (bare-object) children from the root.
    pub fn child(&self, path: &[&str]) -> Option<&Map<String, Value>> {
        path.iter()
            .try_fold(&self.root, |map, key| map.get(*key)?.as_object())
    }

    fn child_mut(&mut self, path: &[&str]) -> Option<&mut Map<String, Value>> {
        let mut map = &mut self.root;
        for key in path {
            map = map.get_mut(*key)?.as_object_mut()?;
        }
        Some(map)
    }
}

/// An element whose end tag has not been read yet.
struct OpenElement {
    name: String,
    map: Map<String, Value>,
    children: Vec<String>,
}

fn open_element(start: &BytesStart<'_>) -> Result<OpenElement, String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut map = Map::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| format!("bad attribute on <{name}>: {e}"))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| format!("bad attribute value on <{name}>: {e}"))?
            .into_owned();
        map.insert(key, Value::String(value));
    }
    Ok(OpenElement {
        name,
        map,
        children: Vec::new(),
    })
}

fn close_element(
    stack: &mut [OpenElement],
    root: &mut Option<(String, Map<String, Value>)>,
    element: OpenElement,
) -> Result<(), String> {
    let OpenElement {
        name,
        mut map,
        children,
    } = element;
    if !is_grouped(&children) {
        let order = children.into_iter().map(Value::String).collect();
        map.insert(ORDER_KEY.to_string(), Value::Array(order));
    }
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(name.clone());
            push_child(&mut parent.map, name, Value::Object(map));
            Ok(())
        }
        None if root.is_some() => Err(format!("second root element <{name}>")),
        None => {
            *root = Some((name, map));
            Ok(())
        }
    }
}

fn push_child(parent: &mut Map<String, Value>, name: String, child: Value) {
    match parent.get_mut(&name) {
        None => {
            parent.insert(name, child);
        }
        Some(Value::Array(items)) => items.push(child),
        Some(slot) => {
            let first = std::mem::take(slot);
            *slot = Value::Array(vec![first, child]);
        }
    }
}

fn append_text(stack: &mut [OpenElement], text: &str) {
    let Some(OpenElement { map, .. }) = stack.last_mut().filter(|_| !text.is_empty()) else {
        return;
    };
    match map.get_mut(TEXT_KEY) {
        Some(Value::String(existing)) => existing.push_str(text),
        _ => {
            map.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    map: &Map<String, Value>,
) -> Result<(), String> {
    let mut start = BytesStart::new(name);
    let mut has_children = false;
    for (key, value) in map {
        if key == TEXT_KEY || key == ORDER_KEY {
            continue;
        }
        match value {
            Value::String(s) => start.push_attribute((key.as_str(), s.as_str())),
            Value::Number(n) => start.push_attribute((key.as_str(), n.to_string().as_str())),
            Value::Bool(b) => start.push_attribute((key.as_str(), b.to_string().as_str())),
            Value::Object(_) | Value::Array(_) => has_children = true,
            Value::Null => {}
        }
    }

    let text = attr(map, TEXT_KEY);
    if !has_children && text.is_none() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    if let Some(text) = text {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    write_children(writer, map)?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn child_elements(value: &Value) -> Vec<&Map<String, Value>> {
    match value {
        Value::Object(child) => vec![child],
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

fn write_children(writer: &mut Writer<Vec<u8>>, map: &Map<String, Value>) -> Result<(), String> {
    let mut written: HashMap<&str, usize> = HashMap::new();
    if let Some(order) = map.get(ORDER_KEY).and_then(Value::as_array) {
        for name in order.iter().filter_map(Value::as_str) {
            let next = written.entry(name).or_insert(0);
            let children = map.get(name).map(child_elements).unwrap_or_default();
            if let Some(child) = children.get(*next) {
                write_element(writer, name, child)?;
                *next += 1;
            }
        }
    }
    for (key, value) in map {
        if key == ORDER_KEY {
            continue;
        }
        let skip = written.get(key.as_str()).copied().unwrap_or(0);
        for child in child_elements(value).into_iter().skip(skip) {
            write_element(writer, key, child)?;
        }
    }
    Ok(())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// 3. applicationHost view
// ---------------------------------------------------------------------------

/// `applicationHost.config` in keyed form, validated to contain a sites section.
#[derive(Debug, Clone, PartialEq)]
pub struct AppHostDocument {
    xml: XmlDocument,
}

impl AppHostDocument {
    /// Parse and check the shape every query relies on.
    pub fn parse(xml: &str) -> Result<Self, String> {
        let xml = XmlDocument::parse(xml)?;
        if xml.root_name() != ROOT_ELEMENT {
            return Err(format!(
                "root element is <{}>, expected <{ROOT_ELEMENT}>",
                xml.root_name()
            ));
        }
        let sites = xml
            .child(&SITES_PATH)
            .ok_or_else(|| format!("missing single <{}> section", SITES_PATH.join("/")))?;
        for entry in as_list(sites.get("site")) {
            site_from_value(entry)?;
        }
        Ok(Self { xml })
    }

    pub fn to_xml(&self) -> Result<String, String> {
        self.xml.to_xml()
    }

    pub fn xml(&self) -> &XmlDocument {
        &self.xml
    }

    /// All sites in document order.
    pub fn sites(&self) -> Vec<Site> {
        self.xml
            .child(&SITES_PATH)
            .map(|sites| {
                as_list(sites.get("site"))
                    .into_iter()
                    .filter_map(|entry| site_from_value(entry).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn site(&self, name: &str) -> Option<Site> {
        self.sites().into_iter().find(|site| site.name.0 == name)
    }

    /// Append an application with a single `/` virtual directory.
    ///
    /// `None` if the site does not exist, `Some(false)` if the path is taken.
    pub fn insert_application(&mut self, site: &str, app: &SiteApplication) -> Option<bool> {
        let entry = self.site_entry_mut(site)?;
        let mut apps = take_list(entry, "application");
        let exists = apps
            .iter()
            .any(|a| a.as_object().and_then(|m| attr(m, "path")) == Some(app.path.as_str()));
        if !exists {
            apps.push(application_value(app));
            insert_order_slot(entry, "application");
        }
        put_list(entry, "application", apps);
        Some(!exists)
    }

    /// Drop the application at `path`.
    ///
    /// `None` if the site does not exist, `Some(false)` if nothing matched.
    pub fn remove_application(&mut self, site: &str, path: &str) -> Option<bool> {
        let entry = self.site_entry_mut(site)?;
        let mut apps = take_list(entry, "application");
        let matching: Vec<usize> = apps
            .iter()
            .enumerate()
            .filter(|(_, a)| a.as_object().and_then(|m| attr(m, "path")) == Some(path))
            .map(|(index, _)| index)
            .collect();
        for &index in matching.iter().rev() {
            apps.remove(index);
            remove_order_slot(entry, "application", index);
        }
        put_list(entry, "application", apps);
        Some(!matching.is_empty())
    }

    fn site_entry_mut(&mut self, name: &str) -> Option<&mut Map<String, Value>> {
        let sites = self.xml.child_mut(&SITES_PATH)?;
        match sites.get_mut("site")? {
            Value::Object(map) => {
                let matches = attr(map, "name") == Some(name);
                matches.then_some(map)
            }
            Value::Array(items) => items
                .iter_mut()
                .filter_map(Value::as_object_mut)
                .find(|map| attr(map, "name") == Some(name)),
            _ => None,
        }
    }
}

fn site_from_value(value: &Value) -> Result<Site, String> {
    let map = value
        .as_object()
        .ok_or_else(|| "<site> entry is not an element".to_string())?;
    let name = attr(map, "name").ok_or_else(|| "<site> without a name".to_string())?;
    let applications = as_list(map.get("application"))
        .into_iter()
        .map(|entry| application_from_value(name, entry))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Site {
        name: SiteName::from(name),
        id: attr(map, "id").map(str::to_owned),
        applications,
    })
}

fn application_from_value(site: &str, value: &Value) -> Result<Application, String> {
    let map = value
        .as_object()
        .ok_or_else(|| format!("<application> in site '{site}' is not an element"))?;
    let path = attr(map, "path")
        .ok_or_else(|| format!("<application> without a path in site '{site}'"))?;
    let virtual_directories = as_list(map.get("virtualDirectory"))
        .into_iter()
        .map(|entry| {
            let vd = entry.as_object().ok_or_else(|| {
                format!("<virtualDirectory> under '{site}{path}' is not an element")
            })?;
            Ok(VirtualDirectory {
                path: attr(vd, "path")
                    .ok_or_else(|| format!("<virtualDirectory> without a path under '{site}{path}'"))?
                    .to_string(),
                physical_path: attr(vd, "physicalPath").unwrap_or_default().into(),
            })
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(Application {
        path: path.to_string(),
        pool: attr(map, "applicationPool").map(str::to_owned),
        virtual_directories,
    })
}

fn application_value(app: &SiteApplication) -> Value {
    let mut map = Map::new();
    map.insert("path".into(), Value::String(app.path.clone()));
    if let Some(pool) = &app.pool {
        map.insert("applicationPool".into(), Value::String(pool.clone()));
    }
    let mut vdir = Map::new();
    vdir.insert("path".into(), Value::String("/".into()));
    vdir.insert(
        "physicalPath".into(),
        Value::String(app.physical_path.display().to_string()),
    );
    map.insert("virtualDirectory".into(), Value::Object(vdir));
    Value::Object(map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    const ONE_APP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<configuration>
    <!-- comment that is not preserved -->
    <system.applicationHost>
        <sites>
            <site name="Default Web Site" id="1">
                <application path="/" applicationPool="DefaultAppPool">
                    <virtualDirectory path="/" physicalPath="C:\inetpub\wwwroot" />
                </application>
                <bindings>
                    <binding protocol="http" bindingInformation="*:80:" />
                </bindings>
            </site>
        </sites>
    </system.applicationHost>
</configuration>
"#;

    fn child_app(path: &str) -> SiteApplication {
        SiteApplication {
            path: path.to_string(),
            pool: Some("DefaultAppPool".into()),
            physical_path: PathBuf::from(format!("C:\\inetpub\\wwwroot{}", path.replace('/', "\\"))),
        }
    }

    fn application_member(doc: &AppHostDocument) -> Value {
        doc.xml()
            .child(&SITES_PATH)
            .and_then(|s| s.get("site"))
            .and_then(|s| s.get("application"))
            .cloned()
            .unwrap_or(Value::Null)
    }

    #[test]
    fn as_list_normalizes_every_shape() {
        assert!(as_list(None).is_empty());
        assert!(as_list(Some(&Value::Null)).is_empty());
        assert_eq!(as_list(Some(&json!({"path": "/"}))).len(), 1);
        assert_eq!(as_list(Some(&json!([{"path": "/"}, {"path": "/a"}]))).len(), 2);
    }

    #[test]
    fn collapse_folds_single_item() {
        assert_eq!(collapse(vec![]), None);
        assert_eq!(collapse(vec![json!(1)]), Some(json!(1)));
        assert_eq!(collapse(vec![json!(1), json!(2)]), Some(json!([1, 2])));
    }

    #[test]
    fn single_application_is_bare_in_tree_but_a_list_when_read() {
        let doc = AppHostDocument::parse(ONE_APP).expect("parse");
        assert!(application_member(&doc).is_object());
        let site = doc.site("Default Web Site").expect("site");
        assert_eq!(site.applications.len(), 1);
        assert_eq!(site.applications[0].pool.as_deref(), Some("DefaultAppPool"));
        assert_eq!(
            site.applications[0].virtual_directories[0].physical_path,
            PathBuf::from("C:\\inetpub\\wwwroot")
        );
    }

    #[test]
    fn insert_expands_and_remove_recollapses() {
        let mut doc = AppHostDocument::parse(ONE_APP).expect("parse");
        let original = application_member(&doc);

        assert_eq!(doc.insert_application("Default Web Site", &child_app("/shop")), Some(true));
        assert!(application_member(&doc).is_array());
        assert_eq!(doc.site("Default Web Site").expect("site").applications.len(), 2);

        assert_eq!(doc.remove_application("Default Web Site", "/shop"), Some(true));
        assert_eq!(application_member(&doc), original);
        assert_eq!(doc.site("Default Web Site").expect("site").applications.len(), 1);
    }

    #[test]
    fn insert_duplicate_path_is_rejected_without_change() {
        let mut doc = AppHostDocument::parse(ONE_APP).expect("parse");
        let before = doc.clone();
        assert_eq!(doc.insert_application("Default Web Site", &child_app("/")), Some(false));
        assert_eq!(doc, before);
    }

    #[test]
    fn mutations_on_unknown_site_return_none() {
        let mut doc = AppHostDocument::parse(ONE_APP).expect("parse");
        assert_eq!(doc.insert_application("Nope", &child_app("/a")), None);
        assert_eq!(doc.remove_application("Nope", "/a"), None);
    }

    #[test]
    fn written_document_reparses_to_same_tree_and_keeps_unknown_elements() {
        let mut doc = AppHostDocument::parse(ONE_APP).expect("parse");
        doc.insert_application("Default Web Site", &child_app("/a&b"))
            .expect("site");
        let xml = doc.to_xml().expect("write");

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("bindingInformation=\"*:80:\""));
        assert!(xml.contains("path=\"/a&amp;b\""));
        assert!(!xml.contains("comment that is not preserved"));

        let reparsed = AppHostDocument::parse(&xml).expect("reparse");
        assert_eq!(reparsed, doc);
    }

    fn positions(xml: &str, needles: &[&str]) -> Vec<usize> {
        needles
            .iter()
            .map(|needle| xml.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
            .collect()
    }

    #[test]
    fn interleaved_siblings_keep_document_order() {
        let xml = r#"<configuration><system.webServer><modules>
            <add name="first" />
            <remove name="first" />
            <add name="first" type="Replacement" />
        </modules></system.webServer></configuration>"#;
        let doc = XmlDocument::parse(xml).expect("parse");
        let written = doc.to_xml().expect("write");

        let at = positions(
            &written,
            &["<add name=\"first\"/>", "<remove", "type=\"Replacement\""],
        );
        assert!(at[0] < at[1] && at[1] < at[2], "reordered:\n{written}");
        assert!(!written.contains(ORDER_KEY));

        let reparsed = XmlDocument::parse(&written).expect("reparse");
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn grouped_siblings_record_no_order() {
        let doc = AppHostDocument::parse(ONE_APP).expect("parse");
        let site = doc
            .xml()
            .child(&SITES_PATH)
            .and_then(|s| s.get("site"))
            .and_then(Value::as_object)
            .expect("site");
        assert!(!site.contains_key(ORDER_KEY));
    }

    #[test]
    fn applications_split_by_other_elements_stay_in_place() {
        let xml = r#"<configuration><system.applicationHost><sites>
            <site name="s" id="1">
                <application path="/"><virtualDirectory path="/" physicalPath="C:\s" /></application>
                <bindings><binding protocol="http" bindingInformation="*:80:" /></bindings>
                <application path="/a"><virtualDirectory path="/" physicalPath="C:\s\a" /></application>
                <logFile directory="C:\logs" />
            </site>
        </sites></system.applicationHost></configuration>"#;
        let mut doc = AppHostDocument::parse(xml).expect("parse");

        assert_eq!(doc.insert_application("s", &child_app("/b")), Some(true));
        let written = doc.to_xml().expect("write");
        let at = positions(
            &written,
            &["path=\"/\"", "<bindings", "path=\"/a\"", "path=\"/b\"", "<logFile"],
        );
        assert!(at.windows(2).all(|w| w[0] < w[1]), "reordered:\n{written}");
        assert_eq!(AppHostDocument::parse(&written).expect("reparse"), doc);

        assert_eq!(doc.remove_application("s", "/a"), Some(true));
        let written = doc.to_xml().expect("write");
        assert!(!written.contains("path=\"/a\""));
        let at = positions(
            &written,
            &["path=\"/\"", "<bindings", "path=\"/b\"", "<logFile"],
        );
        assert!(at.windows(2).all(|w| w[0] < w[1]), "reordered:\n{written}");
        assert_eq!(AppHostDocument::parse(&written).expect("reparse"), doc);
    }

    #[test]
    fn text_content_survives_round_trip() {
        let doc = XmlDocument::parse("<root><note lang=\"en\">a &lt; b</note></root>").expect("parse");
        assert_eq!(doc.root()["note"][TEXT_KEY], json!("a < b"));
        let reparsed = XmlDocument::parse(&doc.to_xml().expect("write")).expect("reparse");
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = AppHostDocument::parse("<settings/>").unwrap_err();
        assert!(err.contains("configuration"), "got: {err}");
    }

    #[test]
    fn missing_sites_section_is_rejected() {
        let err = AppHostDocument::parse("<configuration><system.webServer/></configuration>")
            .unwrap_err();
        assert!(err.contains("sites"), "got: {err}");
    }

    #[test]
    fn application_without_path_is_rejected() {
        let xml = r#"<configuration><system.applicationHost><sites>
            <site name="s"><application applicationPool="p"/></site>
        </sites></system.applicationHost></configuration>"#;
        let err = AppHostDocument::parse(xml).unwrap_err();
        assert!(err.contains("without a path"), "got: {err}");
    }

    #[test]
    fn unbalanced_xml_is_rejected() {
        assert!(XmlDocument::parse("<configuration><sites>").is_err());
        assert!(XmlDocument::parse("").is_err());
    }

    #[test]
    fn empty_sites_section_has_no_sites() {
        let doc = AppHostDocument::parse(
            "<configuration><system.applicationHost><sites/></system.applicationHost></configuration>",
        )
        .expect("parse");
        assert!(doc.sites().is_empty());
    }
}
