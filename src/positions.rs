//! Position records and the coordinates file they are stored in.
//!
//! A coordinates file is a JSON object mapping field name to `[x, y, size]`
//! in PDF points (origin bottom-left). The reader also accepts the object
//! form `{"x": .., "y": .., "size": ..}` with `size` optional.

use std::fs;
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, SerializeTuple, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{CardError, Result};

/// Font size used when an object-form entry omits `size`.
pub const DEFAULT_FONT_SIZE: u32 = 12;

/// Where one field's text is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRecord {
    pub x: f64,
    pub y: f64,
    pub font_size: u32,
}

impl PositionRecord {
    pub fn new(x: f64, y: f64, font_size: u32) -> Self {
        PositionRecord { x, y, font_size }
    }
}

impl Serialize for PositionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut triple = serializer.serialize_tuple(3)?;
        triple.serialize_element(&self.x)?;
        triple.serialize_element(&self.y)?;
        triple.serialize_element(&self.font_size)?;
        triple.end()
    }
}

/// Field name → position, kept in insertion order so saved files list
/// fields in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionMap {
    entries: Vec<(String, PositionRecord)>,
}

impl PositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&PositionRecord> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, record)| record)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut PositionRecord> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == field)
            .map(|(_, record)| record)
    }

    /// Inserts or replaces; a replaced entry keeps its original slot.
    pub fn insert(&mut self, field: impl Into<String>, record: PositionRecord) {
        let field = field.into();
        match self.get_mut(&field) {
            Some(existing) => *existing = record,
            None => self.entries.push((field, record)),
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<PositionRecord> {
        let idx = self.entries.iter().position(|(name, _)| name == field)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PositionRecord)> {
        self.entries
            .iter()
            .map(|(name, record)| (name.as_str(), record))
    }
}

impl Serialize for PositionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, record) in &self.entries {
            map.serialize_entry(name, record)?;
        }
        map.end()
    }
}

/// Reads a JSON file whose root must be an object.
pub fn load_json_object(path: &Path) -> Result<Map<String, Value>> {
    let text = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&text)? {
        Value::Object(map) => Ok(map),
        _ => Err(CardError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

/// Converts raw coordinates JSON into position records, rejecting any
/// entry that is neither a 3+ element array nor an `{x, y}` object.
pub fn normalize_positions(raw: &Map<String, Value>) -> Result<PositionMap> {
    let mut positions = PositionMap::new();
    for (field, value) in raw {
        let invalid = || CardError::InvalidPosition {
            field: field.clone(),
            value: value.to_string(),
        };
        let (x, y, size) = match value {
            Value::Array(items) if items.len() >= 3 => (&items[0], &items[1], Some(&items[2])),
            Value::Object(obj) => match (obj.get("x"), obj.get("y")) {
                (Some(x), Some(y)) => (x, y, obj.get("size")),
                _ => return Err(invalid()),
            },
            _ => return Err(invalid()),
        };
        let x = finite(x).ok_or_else(invalid)?;
        let y = finite(y).ok_or_else(invalid)?;
        let font_size = match size {
            Some(size) => font_size(size).ok_or_else(invalid)?,
            None => DEFAULT_FONT_SIZE,
        };
        debug!(field = %field, x, y, font_size, "position loaded");
        positions.insert(field.clone(), PositionRecord::new(x, y, font_size));
    }
    Ok(positions)
}

fn finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite())
}

fn font_size(value: &Value) -> Option<u32> {
    let size = finite(value)?.trunc();
    if size >= 1.0 && size <= u32::MAX as f64 {
        Some(size as u32)
    } else {
        None
    }
}

/// Reads and normalizes a coordinates file.
pub fn load_positions(path: &Path) -> Result<PositionMap> {
    let raw = load_json_object(path)?;
    normalize_positions(&raw)
}

/// Writes the coordinates file as pretty JSON (UTF-8, non-ASCII kept as-is).
pub fn save_positions(path: &Path, positions: &PositionMap) -> Result<()> {
    let json = serde_json::to_string_pretty(positions)?;
    fs::write(path, json)?;
    info!(path = %path.display(), fields = positions.len(), "coordinates saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn accepts_array_and_object_forms() {
        let raw = as_map(json!({
            "姓名": [100.5, 700.25, 14],
            "职能": {"x": 50, "y": 60},
            "现实": {"x": 1.0, "y": 2.0, "size": 9},
        }));
        let positions = normalize_positions(&raw).unwrap();
        assert_eq!(positions.get("姓名"), Some(&PositionRecord::new(100.5, 700.25, 14)));
        assert_eq!(positions.get("职能"), Some(&PositionRecord::new(50.0, 60.0, 12)));
        assert_eq!(positions.get("现实"), Some(&PositionRecord::new(1.0, 2.0, 9)));
    }

    #[test]
    fn short_array_names_the_field() {
        let raw = as_map(json!({"Name": [1, 2]}));
        let err = normalize_positions(&raw).unwrap_err();
        assert!(matches!(err, CardError::InvalidPosition { ref field, .. } if field == "Name"));
        assert!(err.to_string().contains("Name"));
    }

    #[test]
    fn object_without_y_is_rejected() {
        let raw = as_map(json!({"Name": {"x": 3}}));
        assert!(normalize_positions(&raw).is_err());
    }

    #[test]
    fn non_numeric_and_zero_size_are_rejected() {
        assert!(normalize_positions(&as_map(json!({"A": ["1", 2, 12]}))).is_err());
        assert!(normalize_positions(&as_map(json!({"A": [1, 2, 0]}))).is_err());
    }

    #[test]
    fn fractional_size_truncates() {
        let positions = normalize_positions(&as_map(json!({"A": [1, 2, 10.9]}))).unwrap();
        assert_eq!(positions.get("A").unwrap().font_size, 10);
    }

    #[test]
    fn non_object_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.json");
        fs::write(&path, "[[1, 2, 3]]").unwrap();
        assert!(matches!(
            load_json_object(&path),
            Err(CardError::NotAnObject { .. })
        ));
    }

    #[test]
    fn save_keeps_pick_order_and_triples() {
        let mut positions = PositionMap::new();
        positions.insert("b", PositionRecord::new(10.0, 20.5, 12));
        positions.insert("a", PositionRecord::new(1.25, 2.0, 8));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        save_positions(&path, &positions).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.find("\"b\"").unwrap() < text.find("\"a\"").unwrap());
        let reloaded = load_positions(&path).unwrap();
        assert_eq!(reloaded.get("a"), positions.get("a"));
        assert_eq!(reloaded.get("b"), positions.get("b"));
    }

    #[test]
    fn insert_replaces_in_place_and_remove_drops() {
        let mut positions = PositionMap::new();
        positions.insert("a", PositionRecord::new(1.0, 1.0, 12));
        positions.insert("b", PositionRecord::new(2.0, 2.0, 12));
        positions.insert("a", PositionRecord::new(3.0, 3.0, 12));
        let names: Vec<_> = positions.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(positions.remove("a").unwrap().x, 3.0);
        assert_eq!(positions.len(), 1);
        assert!(positions.remove("a").is_none());
    }
}
