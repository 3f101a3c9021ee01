//! Cell - an immutable, content-addressed tree node

use super::{BitString, Hash};
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Maximum payload bits a single cell may hold
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a single cell may hold
pub const MAX_CELL_REFS: usize = 4;

/// What the stats collector needs from a node type
///
/// Implementors must uphold two contracts the collector relies on without
/// checking: the graph reachable through `refs` is acyclic, and equal
/// `repr_hash` values imply equal children.
pub trait CellNode: Sized {
    /// Number of payload bits stored in this node alone
    fn bit_len(&self) -> usize;

    /// Child references, in order
    fn refs(&self) -> &[Arc<Self>];

    /// Content-derived identifier used for deduplication
    fn repr_hash(&self) -> Hash;
}

/// An immutable cell: a bit payload plus ordered references to other cells
///
/// The hash covers the bit length, the payload and every child hash in
/// order, and is computed once when the cell is built. Cells share
/// children through `Arc`, so one cell may be reachable by many paths.
pub struct Cell {
    bits: BitString,
    refs: Vec<Arc<Cell>>,
    hash: Hash,
    depth: u32,
}

impl Cell {
    /// Build a cell, enforcing the bit and reference limits
    pub fn new(bits: BitString, refs: Vec<Arc<Cell>>) -> Result<Self> {
        if bits.len() > MAX_CELL_BITS {
            return Err(Error::CellOverflow(format!(
                "{} bits exceeds the limit of {}",
                bits.len(),
                MAX_CELL_BITS
            )));
        }
        if refs.len() > MAX_CELL_REFS {
            return Err(Error::CellOverflow(format!(
                "{} refs exceeds the limit of {}",
                refs.len(),
                MAX_CELL_REFS
            )));
        }

        Ok(Cell::assemble(bits, refs))
    }

    // Callers have already checked the limits.
    fn assemble(bits: BitString, refs: Vec<Arc<Cell>>) -> Self {
        let bit_len = (bits.len() as u16).to_be_bytes();
        let ref_count = [refs.len() as u8];
        let mut parts: Vec<&[u8]> = Vec::with_capacity(3 + refs.len());
        parts.push(&bit_len);
        parts.push(&ref_count);
        parts.push(bits.as_bytes());
        for r in &refs {
            parts.push(r.hash.as_bytes());
        }
        let hash = Hash::digest_many(&parts);
        let depth = refs.iter().map(|r| r.depth + 1).max().unwrap_or(0);

        Cell {
            bits,
            refs,
            hash,
            depth,
        }
    }

    /// A cell with no payload and no references
    pub fn empty() -> Self {
        Cell::assemble(BitString::new(), Vec::new())
    }

    /// A cell with a payload and no references
    pub fn leaf(bits: BitString) -> Result<Self> {
        Cell::new(bits, Vec::new())
    }

    /// Start building a cell incrementally
    pub fn builder() -> CellBuilder {
        CellBuilder::new()
    }

    /// Get the payload
    pub fn bits(&self) -> &BitString {
        &self.bits
    }

    /// Get the child references, in order
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Get the content hash
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Length of the longest reference chain below this cell
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Wrap for sharing as a child of other cells
    pub fn into_arc(self) -> Arc<Cell> {
        Arc::new(self)
    }
}

impl CellNode for Cell {
    fn bit_len(&self) -> usize {
        self.bits.len()
    }

    fn refs(&self) -> &[Arc<Self>] {
        &self.refs
    }

    fn repr_hash(&self) -> Hash {
        self.hash
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("hash", &self.hash)
            .field("bits", &self.bits)
            .field("refs", &self.refs.len())
            .finish()
    }
}

// Long reference chains would otherwise be freed by one nested drop per
// level. Unlink uniquely owned children onto a heap stack instead.
impl Drop for Cell {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.refs);
        while let Some(child) = pending.pop() {
            if let Ok(mut cell) = Arc::try_unwrap(child) {
                pending.append(&mut cell.refs);
            }
        }
    }
}

/// Incremental builder for a single cell
#[derive(Default)]
pub struct CellBuilder {
    bits: BitString,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_bits(&self, extra: usize) -> Result<()> {
        if self.bits.len() + extra > MAX_CELL_BITS {
            return Err(Error::CellOverflow(format!(
                "cannot store {} more bits, {} of {} used",
                extra,
                self.bits.len(),
                MAX_CELL_BITS
            )));
        }
        Ok(())
    }

    /// Store a single bit
    pub fn store_bit(mut self, bit: bool) -> Result<Self> {
        self.ensure_bits(1)?;
        self.bits.push(bit);
        Ok(self)
    }

    /// Store the low `bits` bits of `value`
    pub fn store_uint(mut self, value: u64, bits: usize) -> Result<Self> {
        if bits < 64 && value >> bits != 0 {
            return Err(Error::CellOverflow(format!(
                "value {value} does not fit in {bits} bits"
            )));
        }
        self.ensure_bits(bits)?;
        self.bits.push_uint(value, bits);
        Ok(self)
    }

    /// Store whole bytes, most significant bit first
    pub fn store_bytes(mut self, bytes: &[u8]) -> Result<Self> {
        self.ensure_bits(bytes.len() * 8)?;
        self.bits.push_bytes(bytes);
        Ok(self)
    }

    /// Store every bit of another bit string
    pub fn store_bits(mut self, bits: &BitString) -> Result<Self> {
        self.ensure_bits(bits.len())?;
        self.bits.extend_from(bits);
        Ok(self)
    }

    /// Add a child reference
    pub fn store_ref(mut self, cell: Arc<Cell>) -> Result<Self> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(Error::CellOverflow(format!(
                "cannot store more than {MAX_CELL_REFS} refs"
            )));
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// Get the number of bits stored so far
    pub fn bits_used(&self) -> usize {
        self.bits.len()
    }

    /// Finish the cell
    pub fn build(self) -> Result<Cell> {
        Cell::new(self.bits, self.refs)
    }
}
