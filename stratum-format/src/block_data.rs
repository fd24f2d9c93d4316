//! Block-data column codec: a JSON object mapping `"x,y,z"` to the cell's
//! structured-text payload.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::section::{BlockData, LocalPos};

/// `None` when there is nothing to persist.
pub fn encode(entries: &BTreeMap<LocalPos, BlockData>) -> Option<Value> {
    if entries.is_empty() {
        return None;
    }
    let map: Map<String, Value> = entries
        .iter()
        .map(|(pos, data)| (pos.to_string(), Value::String(data.0.clone())))
        .collect();
    Some(Value::Object(map))
}

/// Entries that cannot be understood are dropped and counted; the rest of
/// the section still loads.
pub fn decode(value: &Value) -> (BTreeMap<LocalPos, BlockData>, usize) {
    let mut entries = BTreeMap::new();
    let Some(map) = value.as_object() else {
        log::warn!("block data is not a JSON object, ignoring it");
        return (entries, 1);
    };

    let mut rejected = 0;
    for (key, payload) in map {
        let pos = match key.parse::<LocalPos>() {
            Ok(pos) => pos,
            Err(e) => {
                log::warn!("dropping block data entry: {}", e);
                rejected += 1;
                continue;
            }
        };
        match payload.as_str() {
            Some(text) => {
                entries.insert(pos, BlockData::new(text));
            }
            None => {
                log::warn!("dropping non-text block data payload at {}", pos);
                rejected += 1;
            }
        }
    }
    (entries, rejected)
}
