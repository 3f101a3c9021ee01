//! Bag of cells - a single-file container for one or more cell DAGs
//!
//! File format:
//! ```text
//! [HEADER: 12 bytes]
//!   - magic: 8 bytes ("CELLSTAT")
//!   - version: 4 bytes (u32 LE)
//!
//! [BODY: variable]
//!   - zstd-compressed bincode of { roots: [u32], cells: [RawCell] }
//! ```
//!
//! Every distinct cell is stored once. Cells are in topological order:
//! a reference always points at a higher index than the cell holding it.

use crate::model::{BitString, Cell, CellNode, Hash};
use crate::{Error, Result, MAGIC, VERSION};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

const HEADER_SIZE: usize = 12;
const COMPRESSION_LEVEL: i32 = 3;

#[derive(Serialize, Deserialize)]
struct RawCell {
    bit_len: u16,
    data: Vec<u8>,
    refs: Vec<u32>,
}

#[derive(Serialize, Deserialize)]
struct BagBody {
    roots: Vec<u32>,
    cells: Vec<RawCell>,
}

/// One or more root cells, with whatever they share
#[derive(Clone, Debug)]
pub struct CellBag {
    roots: Vec<Arc<Cell>>,
}

impl CellBag {
    /// Create a bag from its roots, in order
    pub fn new(roots: Vec<Arc<Cell>>) -> Self {
        CellBag { roots }
    }

    /// Create a bag holding one root
    pub fn single(root: Arc<Cell>) -> Self {
        CellBag { roots: vec![root] }
    }

    /// Get all roots
    pub fn roots(&self) -> &[Arc<Cell>] {
        &self.roots
    }

    /// Get the root at `index`, if any
    pub fn root(&self, index: usize) -> Option<&Arc<Cell>> {
        self.roots.get(index)
    }

    /// Number of distinct cells across all roots
    pub fn distinct_cells(&self) -> usize {
        topological_order(&self.roots).len()
    }

    /// Serialize to the on-disk representation
    pub fn encode(&self) -> Result<Vec<u8>> {
        let order = topological_order(&self.roots);
        let index: HashMap<Hash, u32> = order
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash(), i as u32))
            .collect();

        let cells = order
            .iter()
            .map(|c| RawCell {
                bit_len: c.bit_len() as u16,
                data: c.bits().as_bytes().to_vec(),
                refs: c.references().iter().map(|r| index[&r.hash()]).collect(),
            })
            .collect();
        let roots = self.roots.iter().map(|r| index[&r.hash()]).collect();

        let body = bincode::serialize(&BagBody { roots, cells })?;
        let mut output = Vec::with_capacity(HEADER_SIZE + body.len() / 2);
        output.extend_from_slice(MAGIC);
        output.extend_from_slice(&VERSION.to_le_bytes());
        output.extend(zstd::encode_all(body.as_slice(), COMPRESSION_LEVEL)?);

        tracing::debug!(
            roots = self.roots.len(),
            cells = order.len(),
            bytes = output.len(),
            "encoded cell bag"
        );
        Ok(output)
    }

    /// Parse the on-disk representation, validating structure as it goes
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::InvalidFile("File too short for header".into()));
        }
        if &data[0..8] != MAGIC {
            return Err(Error::InvalidFile("Invalid magic bytes".into()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&data[8..12]);
        let version = u32::from_le_bytes(version);
        if version != VERSION {
            return Err(Error::VersionMismatch {
                expected: VERSION,
                found: version,
            });
        }

        let body = zstd::decode_all(&data[HEADER_SIZE..])?;
        let body: BagBody = bincode::deserialize(&body)?;

        let count = body.cells.len();
        let mut built: Vec<Option<Arc<Cell>>> = vec![None; count];
        for (i, raw) in body.cells.into_iter().enumerate().rev() {
            let bits = BitString::from_bytes(&raw.data, usize::from(raw.bit_len))
                .map_err(|e| Error::Corruption(format!("cell {i}: {e}")))?;
            let mut refs = Vec::with_capacity(raw.refs.len());
            for r in raw.refs {
                let r = r as usize;
                if r <= i || r >= count {
                    return Err(Error::Corruption(format!(
                        "cell {i} references {r} outside ({i}, {count})"
                    )));
                }
                let child = built[r]
                    .clone()
                    .ok_or_else(|| Error::Corruption(format!("cell {r} missing")))?;
                refs.push(child);
            }
            let cell =
                Cell::new(bits, refs).map_err(|e| Error::Corruption(format!("cell {i}: {e}")))?;
            tracing::trace!(index = i, hash = %cell.hash().short(), "decoded cell");
            built[i] = Some(cell.into_arc());
        }

        let roots = body
            .roots
            .iter()
            .map(|&r| {
                built
                    .get(r as usize)
                    .cloned()
                    .flatten()
                    .ok_or_else(|| Error::Corruption(format!("root {r} out of range")))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(roots = roots.len(), cells = count, "decoded cell bag");
        Ok(CellBag { roots })
    }

    /// Encode and write to `path`
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.encode()?)?;
        Ok(())
    }

    /// Read and decode the bag at `path`
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        CellBag::decode(&data)
    }
}

/// Distinct cells reachable from `roots`, parents before children
fn topological_order(roots: &[Arc<Cell>]) -> Vec<Arc<Cell>> {
    let mut seen = HashSet::new();
    let mut post_order = Vec::new();

    for root in roots {
        if !seen.insert(root.hash()) {
            continue;
        }
        let mut stack: Vec<(&Arc<Cell>, usize)> = vec![(root, 0)];
        while let Some(top) = stack.last_mut() {
            let cell = top.0;
            match cell.references().get(top.1) {
                Some(child) => {
                    top.1 += 1;
                    if seen.insert(child.hash()) {
                        stack.push((child, 0));
                    }
                }
                None => {
                    post_order.push(cell.clone());
                    stack.pop();
                }
            }
        }
    }

    post_order.reverse();
    post_order
}
