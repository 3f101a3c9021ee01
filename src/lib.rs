//! # cell_stats
//!
//! Storage-size accounting for content-addressed cell DAGs.
//!
//! A cell holds up to 1023 payload bits and up to four references to other
//! cells. Because cells are identified by the hash of their content, one
//! cell can be reachable through many paths. cell_stats measures such a
//! graph two ways:
//!
//! - **Deduplicated**: every distinct content hash counts once
//! - **Raw**: every reachable occurrence counts, repeats included
//!
//! ## Example
//!
//! ```
//! use cell_stats::{collect, BitString, Cell, CollectOptions, StorageStats};
//! use std::collections::HashSet;
//!
//! let leaf = Cell::leaf(BitString::from_binary("10101")?)?.into_arc();
//! let root = Cell::new(BitString::from_binary("1111111111")?, vec![leaf.clone(), leaf])?;
//!
//! let mut visited = HashSet::new();
//! let dedup = collect(&root, &mut visited, CollectOptions::deduplicated());
//! assert_eq!(dedup, StorageStats::new(15u32, 2u32));
//!
//! let raw = collect(&root, &mut HashSet::new(), CollectOptions::raw());
//! assert_eq!(raw, StorageStats::new(20u32, 3u32));
//! # Ok::<(), cell_stats::Error>(())
//! ```

pub mod model;
pub mod report;
pub mod stats;
pub mod store;

mod error;

pub use error::{Error, Result};
pub use model::{BitString, Cell, CellBuilder, CellNode, Hash};
pub use report::{code_size, report_code_size, CodeSizeReport, ReportSink, SizeMode, TextSink};
pub use stats::{
    collect, collect_deduplicated, collect_many, collect_raw, CollectOptions, StorageStats,
};
pub use store::CellBag;

/// Bag file format version
pub const VERSION: u32 = 1;

/// Magic bytes for bag file identification
pub const MAGIC: &[u8; 8] = b"CELLSTAT";
