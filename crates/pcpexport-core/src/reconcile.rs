//! Matching current-period entities with their previous-period records.
//!
//! Two strategies coexist and must stay distinct because they decide
//! different things for an entity without a previous record:
//!
//! - [`InterfaceRegistry`] (network interfaces): lookup by name. An unknown
//!   name is a newly registered device and gets an all-zero previous record,
//!   so it reports zero-based rates on its first appearance.
//! - [`circular_scan`] (serial lines): scan from the same position, wrapping
//!   around, comparing the line number. No match means the line is skipped
//!   for this period.

use std::collections::HashMap;

use crate::model::{NetDevStats, NetEdevStats};

/// Previous-period counterpart of a current entity.
#[derive(Debug, PartialEq, Eq)]
pub enum Prev<'a, T> {
    /// Found at `index` in the previous snapshot.
    Matched { index: usize, record: &'a T },
    /// No usable previous record: counters read as zero.
    Absent,
}

impl<T> Clone for Prev<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Prev<'_, T> {}

impl<'a, T> Prev<'a, T> {
    /// The matched record, or `zero` when absent.
    pub fn or_zero<'b>(self, zero: &'b T) -> &'b T
    where
        'a: 'b,
    {
        match self {
            Prev::Matched { record, .. } => record,
            Prev::Absent => zero,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Prev::Matched { index, .. } => Some(*index),
            Prev::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Prev::Absent)
    }
}

/// A device identified by its interface name.
pub trait RegisteredDevice {
    fn interface(&self) -> &str;

    /// True when the counters show the device was unregistered and registered
    /// again since `prev` was sampled.
    fn reregistered_since(&self, _prev: &Self) -> bool {
        false
    }
}

/// Half of the counter range: a counter above this that appears to go
/// backwards most likely wrapped.
const WRAP_THRESHOLD: u64 = u64::MAX >> 1;

impl RegisteredDevice for NetDevStats {
    fn interface(&self) -> &str {
        &self.interface
    }

    fn reregistered_since(&self, prev: &Self) -> bool {
        let decreased = self.rx_packets < prev.rx_packets
            || self.tx_packets < prev.tx_packets
            || self.rx_bytes < prev.rx_bytes
            || self.tx_bytes < prev.tx_bytes
            || self.rx_compressed < prev.rx_compressed
            || self.tx_compressed < prev.tx_compressed
            || self.multicast < prev.multicast;
        if !decreased {
            return false;
        }

        // Bytes went down while packets went up (or the reverse), from a
        // large previous value: one counter wrapped, the device stayed.
        let wrapped = (self.rx_bytes > prev.rx_bytes
            && self.rx_packets < prev.rx_packets
            && prev.rx_packets > WRAP_THRESHOLD)
            || (self.tx_bytes > prev.tx_bytes
                && self.tx_packets < prev.tx_packets
                && prev.tx_packets > WRAP_THRESHOLD)
            || (self.rx_packets > prev.rx_packets
                && self.rx_bytes < prev.rx_bytes
                && prev.rx_bytes > WRAP_THRESHOLD)
            || (self.tx_packets > prev.tx_packets
                && self.tx_bytes < prev.tx_bytes
                && prev.tx_bytes > WRAP_THRESHOLD);
        !wrapped
    }
}

impl RegisteredDevice for NetEdevStats {
    fn interface(&self) -> &str {
        &self.interface
    }
}

/// Name-to-index registry over the previous snapshot of a device category.
pub struct InterfaceRegistry<'a, T> {
    prev: &'a [T],
    by_name: HashMap<&'a str, usize>,
}

impl<'a, T: RegisteredDevice> InterfaceRegistry<'a, T> {
    pub fn new(prev: &'a [T]) -> Self {
        let mut by_name = HashMap::with_capacity(prev.len());
        for (i, dev) in prev.iter().enumerate() {
            by_name.entry(dev.interface()).or_insert(i);
        }
        Self { prev, by_name }
    }

    /// Previous record for `curr`, or [`Prev::Absent`] for a newly
    /// registered (or re-registered) device.
    pub fn lookup(&self, curr: &T) -> Prev<'a, T> {
        let Some(&index) = self.by_name.get(curr.interface()) else {
            return Prev::Absent;
        };
        let record = &self.prev[index];
        if curr.reregistered_since(record) {
            return Prev::Absent;
        }
        Prev::Matched { index, record }
    }
}

/// Circular search of `prev` for the record whose key equals `key`.
///
/// Starts at `pos` (clamped to the last previous index) and wraps around
/// once. Returns `None` for an empty previous snapshot or when no record
/// matches.
pub fn circular_scan<'a, T, K, F>(
    prev: &'a [T],
    pos: usize,
    key: &K,
    key_of: F,
) -> Option<(usize, &'a T)>
where
    K: PartialEq + ?Sized,
    F: Fn(&T) -> &K,
{
    if prev.is_empty() {
        return None;
    }
    let start = pos.min(prev.len() - 1);
    let mut j = start;
    loop {
        let candidate = &prev[j];
        if key_of(candidate) == key {
            return Some((j, candidate));
        }
        j += 1;
        if j >= prev.len() {
            j = 0;
        }
        if j == start {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SerialStats;

    fn dev(name: &str, rx_bytes: u64, rx_packets: u64) -> NetDevStats {
        NetDevStats {
            interface: name.to_string(),
            rx_bytes,
            rx_packets,
            ..Default::default()
        }
    }

    fn line(n: u32) -> SerialStats {
        SerialStats {
            line: n,
            ..Default::default()
        }
    }

    #[test]
    fn registry_matches_by_name_not_position() {
        let prev = vec![dev("lo", 10, 1), dev("eth0", 20, 2)];
        let reg = InterfaceRegistry::new(&prev);

        let m = reg.lookup(&dev("eth0", 30, 3));
        assert_eq!(m.index(), Some(1));
        let m = reg.lookup(&dev("lo", 30, 3));
        assert_eq!(m.index(), Some(0));
    }

    #[test]
    fn registry_unknown_name_is_absent() {
        let prev = vec![dev("eth0", 20, 2)];
        let reg = InterfaceRegistry::new(&prev);
        assert!(reg.lookup(&dev("eth1", 5, 5)).is_absent());

        let empty: Vec<NetDevStats> = Vec::new();
        let reg = InterfaceRegistry::new(&empty);
        assert!(reg.lookup(&dev("eth0", 5, 5)).is_absent());
    }

    #[test]
    fn registry_counter_drop_means_reregistered() {
        let prev = vec![dev("eth0", 1_000, 100)];
        let reg = InterfaceRegistry::new(&prev);
        assert!(reg.lookup(&dev("eth0", 10, 1)).is_absent());
    }

    #[test]
    fn registry_single_counter_wrap_keeps_match() {
        let prev = vec![dev("eth0", 1_000, u64::MAX - 5)];
        let reg = InterfaceRegistry::new(&prev);
        // bytes still grow, packets wrapped from near the top of the range
        let m = reg.lookup(&dev("eth0", 2_000, 3));
        assert_eq!(m.index(), Some(0));
    }

    #[test]
    fn edev_never_reregisters() {
        let prev = vec![NetEdevStats {
            interface: "eth0".into(),
            rx_errors: 50,
            ..Default::default()
        }];
        let reg = InterfaceRegistry::new(&prev);
        let curr = NetEdevStats {
            interface: "eth0".into(),
            rx_errors: 1,
            ..Default::default()
        };
        assert_eq!(reg.lookup(&curr).index(), Some(0));
    }

    #[test]
    fn or_zero_falls_back() {
        let zero = NetDevStats::default();
        let rec = dev("eth0", 1, 1);
        let m = Prev::Matched {
            index: 0,
            record: &rec,
        };
        assert_eq!(m.or_zero(&zero).rx_bytes, 1);
        assert_eq!(Prev::<NetDevStats>::Absent.or_zero(&zero).rx_bytes, 0);
    }

    #[test]
    fn scan_finds_line_at_other_position() {
        let prev = vec![line(3), line(4), line(5)];
        let found = circular_scan(&prev, 2, &3, |s| &s.line);
        assert_eq!(found.map(|(i, _)| i), Some(0));
    }

    #[test]
    fn scan_clamps_start_beyond_previous_len() {
        let prev = vec![line(3), line(4)];
        let found = circular_scan(&prev, 10, &4, |s| &s.line);
        assert_eq!(found.map(|(i, _)| i), Some(1));
        let found = circular_scan(&prev, 10, &3, |s| &s.line);
        assert_eq!(found.map(|(i, _)| i), Some(0));
    }

    #[test]
    fn scan_without_match_is_none() {
        let prev = vec![line(3), line(4), line(5)];
        assert!(circular_scan(&prev, 0, &7, |s| &s.line).is_none());
        let empty: Vec<SerialStats> = Vec::new();
        assert!(circular_scan(&empty, 0, &3, |s| &s.line).is_none());
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let prev = vec![dev("lo", 1, 1), dev("eth0", 2, 2)];
        let curr = vec![dev("eth0", 3, 3), dev("eth1", 1, 1), dev("lo", 2, 2)];
        let run = || {
            let reg = InterfaceRegistry::new(&prev);
            curr.iter().map(|c| reg.lookup(c).index()).collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, vec![Some(1), None, Some(0)]);
        assert_eq!(first, run());

        let lines_prev = vec![line(1), line(2)];
        let lines_curr = vec![line(2), line(9)];
        let scan = || {
            lines_curr
                .iter()
                .enumerate()
                .map(|(i, c)| circular_scan(&lines_prev, i, &c.line, |s| &s.line).map(|(j, _)| j))
                .collect::<Vec<_>>()
        };
        assert_eq!(scan(), vec![Some(1), None]);
        assert_eq!(scan(), scan());
    }
}
