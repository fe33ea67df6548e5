//! Field names and the column alignment applied after picking.

use std::str::FromStr;

use crate::coords::round2;
use crate::error::CardError;
use crate::positions::PositionMap;

/// Agent name.
pub const FIELD_NAME: &str = "姓名";
/// Anomaly type.
pub const FIELD_ANOMALY: &str = "异常体";
/// Duty / function.
pub const FIELD_DUTY: &str = "职能";

/// Built-in fields in prompting order.
pub const DEFAULT_FIELDS: [&str; 9] = [
    FIELD_NAME,
    "机构头衔",
    "机构评级",
    FIELD_ANOMALY,
    "现实",
    FIELD_DUTY,
    "现实触发器",
    "过载解除",
    "首要指令",
];

/// Parses a comma-separated override list, falling back to the built-in
/// fields when no list (or only blanks) is given.
pub fn parse_field_list(keys: Option<&str>) -> Vec<String> {
    let parsed: Vec<String> = keys
        .map(|keys| {
            keys.split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    if parsed.is_empty() {
        DEFAULT_FIELDS.iter().map(|key| key.to_string()).collect()
    } else {
        parsed
    }
}

/// Fields whose x coordinate is forced to match the first member of their
/// group, so each group lines up in one column.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentGroups(pub Vec<Vec<String>>);

impl Default for AlignmentGroups {
    fn default() -> Self {
        AlignmentGroups(
            DEFAULT_FIELDS
                .chunks(3)
                .map(|group| group.iter().map(|key| key.to_string()).collect())
                .collect(),
        )
    }
}

/// `"a,b,c;d,e,f"`: groups separated by `;`, members by `,`.
impl FromStr for AlignmentGroups {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups: Vec<Vec<String>> = s
            .split(';')
            .map(|group| {
                group
                    .split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect();
        if groups.is_empty() {
            return Err(CardError::Config(format!("no alignment groups in {s:?}")));
        }
        Ok(AlignmentGroups(groups))
    }
}

impl AlignmentGroups {
    /// Copies each group's first x onto the rest of the group. Missing
    /// members, including a missing first member, are skipped.
    pub fn apply(&self, positions: &mut PositionMap) {
        for group in &self.0 {
            let Some((base, rest)) = group.split_first() else {
                continue;
            };
            let Some(base_x) = positions.get(base).map(|record| round2(record.x)) else {
                continue;
            };
            for key in rest {
                if let Some(record) = positions.get_mut(key) {
                    record.x = base_x;
                }
            }
        }
    }
}
