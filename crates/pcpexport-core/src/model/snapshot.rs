//! Snapshot of every category at one sampling instant, and the two-slot
//! buffer that holds the current and previous samples.

use serde::{Deserialize, Serialize};

use super::system::{
    CpuStats, IoStats, IrqStats, KtablesStats, MemoryStats, NetDevStats, NetEdevStats,
    NfsClientStats, NfsServerStats, PagingStats, PcswStats, QueueStats, SerialStats, SwapStats,
};
use crate::delta::Interval;

/// All category records captured at one sampling instant.
///
/// Multi-entity categories are positionally addressed vectors. For `cpu`,
/// index 0 is the aggregate "all" pseudo-CPU and index `N + 1` is CPU `N`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct Snapshot {
    /// Unix timestamp (seconds) of the sample.
    pub timestamp: i64,

    /// Machine uptime in hundredths of a second when the sample was taken.
    pub uptime_cs: u64,

    pub cpu: Vec<CpuStats>,
    pub pcsw: PcswStats,
    pub irq: IrqStats,
    pub swap: SwapStats,
    pub paging: PagingStats,
    pub io: IoStats,
    pub memory: MemoryStats,
    pub ktables: KtablesStats,
    pub queue: QueueStats,
    pub net_dev: Vec<NetDevStats>,
    pub net_edev: Vec<NetEdevStats>,
    pub serial: Vec<SerialStats>,
    pub nfs: NfsClientStats,
    pub nfsd: NfsServerStats,
}

impl Snapshot {
    /// Elapsed time since `prev` was sampled.
    pub fn interval_since(&self, prev: &Snapshot) -> Interval {
        Interval::between(prev.uptime_cs, self.uptime_cs)
    }
}

/// Which of the two slots holds the newer sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    A,
    B,
}

impl Slot {
    fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }
}

/// Two fixed slots with a role tag telling which one is current.
///
/// The owner decides when roles flip. Until a second sample has been stored
/// the previous slot holds `T::default()`, which exporters read as all-zero
/// counters.
#[derive(Debug, Clone)]
pub struct DoubleBuffer<T> {
    slots: [T; 2],
    current: Slot,
    samples: u64,
}

impl<T: Default> Default for DoubleBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> DoubleBuffer<T> {
    pub fn new() -> Self {
        Self {
            slots: [T::default(), T::default()],
            current: Slot::A,
            samples: 0,
        }
    }
}

impl<T> DoubleBuffer<T> {
    pub fn current(&self) -> &T {
        &self.slots[self.current.index()]
    }

    pub fn previous(&self) -> &T {
        &self.slots[self.current.other().index()]
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.slots[self.current.index()]
    }

    /// Returns `(current, previous)`.
    pub fn pair(&self) -> (&T, &T) {
        (self.current(), self.previous())
    }

    /// Flips roles: the current slot becomes the previous one.
    pub fn swap(&mut self) {
        self.current = self.current.other();
    }

    /// Stores a new sample: flips roles, then overwrites the slot that held
    /// the oldest sample.
    pub fn push(&mut self, sample: T) {
        if self.samples > 0 {
            self.swap();
        }
        self.slots[self.current.index()] = sample;
        self.samples += 1;
    }

    /// True until two samples have been pushed, i.e. while the previous slot
    /// still holds the zero state.
    pub fn is_first_period(&self) -> bool {
        self.samples < 2
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}
