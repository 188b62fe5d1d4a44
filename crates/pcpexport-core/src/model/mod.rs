//! Data models for raw counter snapshots.
//!
//! - [`system`]: per-category counter records
//! - [`snapshot`]: a full sample of every category, and the current/previous
//!   double buffer

mod snapshot;
mod system;

pub use snapshot::{DoubleBuffer, Snapshot};
pub use system::{
    CpuStats, Duplex, IoStats, IrqStats, KtablesStats, MemoryStats, NetDevStats, NetEdevStats,
    NfsClientStats, NfsServerStats, PagingStats, PcswStats, QueueStats, SerialStats, SwapStats,
};
