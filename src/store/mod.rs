//! Persistence for cell DAGs
//!
//! Bags are the compact binary container, deduplicated by content hash and
//! compressed with zstd. The JSON description is an authoring format that
//! loads into a bag.

mod bag;
mod json;

pub use bag::CellBag;
pub use json::{bag_from_json, parse_bits, read_json, CellJson, CellLoader};
