//! Cell data model: payload bits, content hashes and the cell itself

mod bits;
mod cell;
mod hash;

pub use bits::BitString;
pub use cell::{Cell, CellBuilder, CellNode, MAX_CELL_BITS, MAX_CELL_REFS};
pub use hash::Hash;
