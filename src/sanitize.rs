//! Filename-safe text and the auto-derived output path.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::fields::{FIELD_ANOMALY, FIELD_DUTY, FIELD_NAME};
use crate::overlay::display_value;

pub const MAX_PART_LEN: usize = 50;

const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn is_edge_junk(c: char) -> bool {
    matches!(c, '.' | '_' | ' ')
}

/// Makes `value` usable as part of a file name. `fallback` is used when
/// nothing survives and is expected to be clean already.
pub fn safe_filename_part(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    let source = if trimmed.is_empty() { fallback } else { trimmed };

    let replaced: String = source
        .chars()
        .map(|c| {
            if FORBIDDEN.contains(&c) || (c as u32) < 32 {
                '_'
            } else {
                c
            }
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join("_");

    let mut part = finish(&collapsed);
    if part.is_empty() {
        part = finish(fallback);
    }
    part
}

// Truncation can expose a trailing '_' or '.', so strip again afterwards.
fn finish(value: &str) -> String {
    let stripped = value.trim_matches(is_edge_junk);
    let truncated: String = stripped.chars().take(MAX_PART_LEN).collect();
    truncated.trim_end_matches(is_edge_junk).to_string()
}

/// `{name}_{anomaly}_{duty}_{timestamp}.pdf` inside `output_dir`, which is
/// created if missing.
pub fn default_output_path(data: &Map<String, Value>, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let part = |field: &str, fallback: &str| {
        let value = data.get(field).map(display_value).unwrap_or_default();
        safe_filename_part(&value, fallback)
    };
    let name = part(FIELD_NAME, "未知姓名");
    let anomaly = part(FIELD_ANOMALY, "未知异常体");
    let duty = part(FIELD_DUTY, "未知职能");
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    Ok(output_dir.join(format!("{name}_{anomaly}_{duty}_{stamp}.pdf")))
}
