//! Block-level cooperative algorithms.

mod scan;

pub use scan::{BlockScan, ScanStorage};
