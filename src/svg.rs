use crate::error::{Result, StatsError};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// A value destined for the text node with `id`, right-aligned to `width`
/// characters by the dot leader in the sibling node `<id>_dots`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub id: &'static str,
    pub value: String,
    pub width: usize,
}

impl Field {
    pub fn new(id: &'static str, value: impl Into<String>, width: usize) -> Self {
        Self {
            id,
            value: value.into(),
            width,
        }
    }

    pub fn dots_id(&self) -> String {
        format!("{}_dots", self.id)
    }

    pub fn dot_leader(&self) -> String {
        match self.width.saturating_sub(self.value.chars().count()) {
            0 => String::new(),
            1 => " ".to_string(),
            2 => ". ".to_string(),
            n => format!(" {} ", ".".repeat(n)),
        }
    }
}

/// Replace the leading text of every element whose `id` is a key of
/// `replacements`. Returns the new document and the ids that were found.
pub fn patch(document: &str, replacements: &HashMap<String, String>) -> Result<(String, HashSet<String>)> {
    let mut reader = Reader::from_str(document);
    let mut writer = Writer::new(Vec::with_capacity(document.len()));
    let mut found = HashSet::new();
    let mut skipping_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| StatsError::Template(format!("at byte {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Eof => break,
            Event::Text(_) | Event::CData(_) if skipping_text => continue,
            Event::Start(start) => {
                skipping_text = false;
                let replacement = element_id(&start).and_then(|id| replacements.get_key_value(id.as_str()));
                write(&mut writer, Event::Start(start.clone()))?;
                if let Some((id, text)) = replacement {
                    found.insert(id.clone());
                    write(&mut writer, Event::Text(BytesText::new(text)))?;
                    skipping_text = true;
                }
            }
            Event::Empty(empty) => {
                skipping_text = false;
                match element_id(&empty).and_then(|id| replacements.get_key_value(id.as_str())) {
                    Some((id, text)) => {
                        found.insert(id.clone());
                        write(&mut writer, Event::Start(empty.clone()))?;
                        write(&mut writer, Event::Text(BytesText::new(text)))?;
                        write(&mut writer, Event::End(empty.to_end()))?;
                    }
                    None => write(&mut writer, Event::Empty(empty))?,
                }
            }
            other => {
                skipping_text = false;
                write(&mut writer, other)?;
            }
        }
    }

    let bytes = writer.into_inner();
    let patched = String::from_utf8(bytes).map_err(|e| StatsError::Template(e.to_string()))?;
    Ok((patched, found))
}

fn element_id(start: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    let attr = start.try_get_attribute("id").ok().flatten()?;
    std::str::from_utf8(&attr.value).ok().map(str::to_string)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| StatsError::Template(e.to_string()))
}

/// Patch a template on disk. A missing template is skipped with a warning.
pub fn patch_file<P: AsRef<Path>>(path: P, fields: &[Field]) -> Result<bool> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(path = %path.display(), "template not found, skipping");
        return Ok(false);
    }

    let mut replacements = HashMap::new();
    for field in fields {
        replacements.insert(field.id.to_string(), field.value.clone());
        replacements.insert(field.dots_id(), field.dot_leader());
    }

    let document = fs::read_to_string(path)?;
    let (patched, found) = patch(&document, &replacements)?;
    for field in fields {
        if !found.contains(field.id) {
            tracing::warn!(path = %path.display(), id = field.id, "element id not found in template");
        }
    }
    fs::write(path, patched)?;
    tracing::info!(path = %path.display(), fields = found.len(), "template updated");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn replaces_text_of_matching_ids_only() {
        let doc = r#"<svg xmlns="http://www.w3.org/2000/svg"><text><tspan id="repo_data">0</tspan> / <tspan id="other">keep</tspan></text></svg>"#;
        let (out, found) = patch(doc, &map(&[("repo_data", "42")])).unwrap();
        assert_eq!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text><tspan id="repo_data">42</tspan> / <tspan id="other">keep</tspan></text></svg>"#
        );
        assert!(found.contains("repo_data"));
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn self_closing_target_gains_text_and_values_are_escaped() {
        let doc = r#"<svg><tspan id="loc_add"/></svg>"#;
        let (out, _) = patch(doc, &map(&[("loc_add", "<1,000>")])).unwrap();
        assert_eq!(out, r#"<svg><tspan id="loc_add">&lt;1,000&gt;</tspan></svg>"#);
    }

    #[test]
    fn keeps_declaration_and_child_elements() {
        let doc = "<?xml version='1.0' encoding='utf-8'?>\n<svg><text id=\"a\">old<tspan>child</tspan></text></svg>";
        let (out, _) = patch(doc, &map(&[("a", "new")])).unwrap();
        assert_eq!(
            out,
            "<?xml version='1.0' encoding='utf-8'?>\n<svg><text id=\"a\">new<tspan>child</tspan></text></svg>"
        );
    }

    #[test]
    fn dot_leader_pads_to_width() {
        assert_eq!(Field::new("x", "12345", 5).dot_leader(), "");
        assert_eq!(Field::new("x", "1234", 5).dot_leader(), " ");
        assert_eq!(Field::new("x", "123", 5).dot_leader(), ". ");
        assert_eq!(Field::new("x", "1", 5).dot_leader(), " .... ");
        assert_eq!(Field::new("x", "too long", 2).dot_leader(), "");
    }

    #[test]
    fn patch_file_writes_values_and_dots() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("card.svg");
        fs::write(
            &path,
            r#"<svg><tspan id="star_data_dots">x</tspan><tspan id="star_data">0</tspan></svg>"#,
        )
        .unwrap();
        let updated = patch_file(&path, &[Field::new("star_data", "7", 4)]).unwrap();
        assert!(updated);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            r#"<svg><tspan id="star_data_dots"> ... </tspan><tspan id="star_data">7</tspan></svg>"#
        );
    }

    #[test]
    fn missing_template_is_not_an_error() {
        let dir = tempdir().unwrap();
        assert!(!patch_file(dir.path().join("nope.svg"), &[]).unwrap());
    }
}
