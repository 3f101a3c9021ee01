//! JSON cell description, for writing DAGs by hand
//!
//! ```json
//! {"bits": "b:101", "refs": [{"bits": "a3"}, {"bits": "x:b_"}]}
//! ```
//!
//! `bits` takes a `b:` binary literal or hex (optionally prefixed `x:`,
//! optionally `_`-tagged). A document is one cell or an array of roots.

use super::CellBag;
use crate::model::{BitString, Cell, Hash};
use crate::{Error, Result};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// One cell in the JSON description
///
/// Only JSON objects are accepted. Both fields are optional and unknown
/// keys are rejected.
#[derive(Clone, Debug, Default)]
pub struct CellJson {
    pub bits: String,
    pub refs: Vec<CellJson>,
}

const FIELDS: &[&str] = &["bits", "refs"];

impl<'de> Deserialize<'de> for CellJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(CellVisitor)
    }
}

struct CellVisitor;

impl<'de> Visitor<'de> for CellVisitor {
    type Value = CellJson;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a cell object with optional `bits` and `refs`")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<CellJson, A::Error> {
        let mut bits: Option<String> = None;
        let mut refs: Option<Vec<CellJson>> = None;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "bits" => {
                    if bits.is_some() {
                        return Err(de::Error::duplicate_field("bits"));
                    }
                    bits = Some(map.next_value()?);
                }
                "refs" => {
                    if refs.is_some() {
                        return Err(de::Error::duplicate_field("refs"));
                    }
                    refs = Some(map.next_value()?);
                }
                other => return Err(de::Error::unknown_field(other, FIELDS)),
            }
        }
        Ok(CellJson {
            bits: bits.unwrap_or_default(),
            refs: refs.unwrap_or_default(),
        })
    }
}

/// Parse a `bits` field
pub fn parse_bits(s: &str) -> Result<BitString> {
    if let Some(binary) = s.strip_prefix("b:") {
        BitString::from_binary(binary)
    } else {
        BitString::from_hex(s.strip_prefix("x:").unwrap_or(s))
    }
}

/// Builds cells from JSON, handing out one `Arc` per distinct hash
#[derive(Default)]
pub struct CellLoader {
    interned: HashMap<Hash, Arc<Cell>>,
}

impl CellLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, json: &CellJson) -> Result<Arc<Cell>> {
        let bits = parse_bits(&json.bits)?;
        let refs = json
            .refs
            .iter()
            .map(|r| self.load(r))
            .collect::<Result<Vec<_>>>()?;
        let cell = Cell::new(bits, refs)?;
        let interned = self
            .interned
            .entry(cell.hash())
            .or_insert_with(|| cell.into_arc());
        Ok(interned.clone())
    }

    /// Distinct cells built so far
    pub fn len(&self) -> usize {
        self.interned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interned.is_empty()
    }
}

/// Parse a JSON document into a bag
///
/// A top-level array is a list of roots and must not be empty; anything
/// else must be a single cell object.
pub fn bag_from_json(text: &str) -> Result<CellBag> {
    let doc: serde_json::Value = serde_json::from_str(text)?;
    let cells: Vec<CellJson> = if doc.is_array() {
        serde_json::from_value(doc)?
    } else {
        vec![serde_json::from_value(doc)?]
    };
    if cells.is_empty() {
        return Err(Error::EmptyDocument);
    }

    let mut loader = CellLoader::new();
    let roots = cells
        .iter()
        .map(|c| loader.load(c))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(roots = roots.len(), cells = loader.len(), "loaded JSON cells");
    Ok(CellBag::new(roots))
}

pub fn read_json(path: impl AsRef<Path>) -> Result<CellBag> {
    let text = std::fs::read_to_string(path)?;
    bag_from_json(&text)
}
