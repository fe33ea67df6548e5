//! Sequential field picking, independent of any window.

use std::path::Path;

use tracing::info;

use crate::coords::PageGeometry;
use crate::error::Result;
use crate::fields::AlignmentGroups;
use crate::positions::{PositionMap, PositionRecord, save_positions};

/// What a single input did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Recorded {
        field: String,
        position: PositionRecord,
        /// The last field was just filled; the coordinates file is due.
        completed: bool,
    },
    Undone {
        field: String,
    },
    Ignored,
}

#[derive(Debug, Clone)]
pub struct PickerSession {
    fields: Vec<String>,
    geometry: PageGeometry,
    font_size: u32,
    groups: AlignmentGroups,
    cursor: usize,
    positions: PositionMap,
}

impl PickerSession {
    pub fn new(
        fields: Vec<String>,
        geometry: PageGeometry,
        font_size: u32,
        groups: AlignmentGroups,
    ) -> Self {
        PickerSession {
            fields,
            geometry,
            font_size,
            groups,
            cursor: 0,
            positions: PositionMap::new(),
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Index of the field being prompted; equals the field count once done.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_field(&self) -> Option<&str> {
        self.fields.get(self.cursor).map(String::as_str)
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.fields.len()
    }

    pub fn positions(&self) -> &PositionMap {
        &self.positions
    }

    /// Primary click at canvas pixel `(cx, cy)`.
    pub fn pick(&mut self, cx: f64, cy: f64) -> Transition {
        let Some(field) = self.current_field().map(String::from) else {
            return Transition::Ignored;
        };
        let (x, y) = self.geometry.pick(cx, cy);
        let position = PositionRecord::new(x, y, self.font_size);
        self.positions.insert(field.clone(), position);
        self.cursor += 1;
        Transition::Recorded {
            field,
            position,
            completed: self.is_done(),
        }
    }

    /// Secondary click: step back one field and forget its position.
    /// Also allowed after completion, which reopens picking.
    pub fn undo(&mut self) -> Transition {
        if self.cursor == 0 {
            return Transition::Ignored;
        }
        self.cursor -= 1;
        let field = self.fields[self.cursor].clone();
        self.positions.remove(&field);
        Transition::Undone { field }
    }

    /// Aligned copy of the positions for saving, or `None` if nothing has
    /// been picked yet.
    pub fn finalize(&self) -> Option<PositionMap> {
        if self.positions.is_empty() {
            return None;
        }
        let mut aligned = self.positions.clone();
        self.groups.apply(&mut aligned);
        Some(aligned)
    }

    /// Writes the aligned positions to `path` and returns them. Nothing is
    /// written while the session is empty.
    pub fn save(&self, path: &Path) -> Result<Option<PositionMap>> {
        let Some(positions) = self.finalize() else {
            info!("no positions picked, nothing saved");
            return Ok(None);
        };
        save_positions(path, &positions)?;
        Ok(Some(positions))
    }

    pub fn title(&self) -> String {
        match self.current_field() {
            Some(field) => format!("Pick: {field} (click to place)"),
            None => "Picking complete".to_string(),
        }
    }

    pub fn hint(&self) -> String {
        match self.current_field() {
            Some(field) => format!(
                "Field: {field}  |  left click: place  |  right click: undo  |  wheel: scroll  |  middle drag: pan  |  Esc: quit"
            ),
            None => "Picking complete, the window can be closed.".to_string(),
        }
    }
}
