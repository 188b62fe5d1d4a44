//! Raw counter records, one struct per statistics category.
//!
//! These are the values a collector captures at one sampling instant. Counters
//! are cumulative since boot (or since device registration); gauges are
//! instantaneous. Nothing here is normalised: exporters turn pairs of these
//! records into rates.

use serde::{Deserialize, Serialize};

/// CPU time counters from /proc/stat.
///
/// Source: `/proc/stat` (`cpu` line for the aggregate, `cpuN` lines per CPU)
///
/// All values are in jiffies. `user` and `nice` already include `guest` and
/// `guest_nice` respectively.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CpuStats {
    /// Time spent in user mode.
    /// Source: `/proc/stat` column 1
    pub user: u64,

    /// Time spent in user mode with low priority.
    /// Source: `/proc/stat` column 2
    pub nice: u64,

    /// Time spent in kernel mode.
    /// Source: `/proc/stat` column 3
    pub sys: u64,

    /// Time spent idle.
    /// Source: `/proc/stat` column 4
    pub idle: u64,

    /// Time waiting for I/O to complete.
    /// Source: `/proc/stat` column 5
    pub iowait: u64,

    /// Time servicing hardware interrupts.
    /// Source: `/proc/stat` column 6
    pub hardirq: u64,

    /// Time servicing software interrupts.
    /// Source: `/proc/stat` column 7
    pub softirq: u64,

    /// Time stolen by the hypervisor.
    /// Source: `/proc/stat` column 8
    pub steal: u64,

    /// Time spent running a virtual CPU for guests.
    /// Source: `/proc/stat` column 9
    pub guest: u64,

    /// Time spent running a niced guest.
    /// Source: `/proc/stat` column 10
    pub guest_nice: u64,
}

impl CpuStats {
    /// Total jiffies, excluding guest time already counted in user/nice.
    pub fn total_jiffies(&self) -> u64 {
        self.user
            .wrapping_add(self.nice)
            .wrapping_add(self.sys)
            .wrapping_add(self.idle)
            .wrapping_add(self.iowait)
            .wrapping_add(self.hardirq)
            .wrapping_add(self.softirq)
            .wrapping_add(self.steal)
    }

    /// Field-wise sum, used to rebuild the aggregate from individual CPUs.
    pub fn accumulate(&mut self, other: &CpuStats) {
        self.user = self.user.wrapping_add(other.user);
        self.nice = self.nice.wrapping_add(other.nice);
        self.sys = self.sys.wrapping_add(other.sys);
        self.idle = self.idle.wrapping_add(other.idle);
        self.iowait = self.iowait.wrapping_add(other.iowait);
        self.hardirq = self.hardirq.wrapping_add(other.hardirq);
        self.softirq = self.softirq.wrapping_add(other.softirq);
        self.steal = self.steal.wrapping_add(other.steal);
        self.guest = self.guest.wrapping_add(other.guest);
        self.guest_nice = self.guest_nice.wrapping_add(other.guest_nice);
    }
}

/// Task creation and context switch counters.
///
/// Source: `ctxt` and `processes` lines in `/proc/stat`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PcswStats {
    pub context_switch: u64,
    pub processes: u64,
}

/// Total interrupt counter.
///
/// Source: first field of the `intr` line in `/proc/stat`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct IrqStats {
    pub irq_nr: u64,
}

/// Swapping counters (pages).
///
/// Source: `pswpin`, `pswpout` in `/proc/vmstat`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SwapStats {
    pub pswpin: u64,
    pub pswpout: u64,
}

/// Paging counters.
///
/// Source: `/proc/vmstat`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PagingStats {
    /// Kilobytes paged in from disk.
    pub pgpgin: u64,
    /// Kilobytes paged out to disk.
    pub pgpgout: u64,
    /// Page faults (minor + major).
    pub pgfault: u64,
    /// Major page faults.
    pub pgmajfault: u64,
    /// Pages placed on the free list.
    pub pgfree: u64,
    /// Pages scanned by kswapd.
    pub pgscan_kswapd: u64,
    /// Pages scanned directly.
    pub pgscan_direct: u64,
    /// Pages reclaimed from the page cache and swap cache.
    pub pgsteal: u64,
}

/// Whole-system block I/O counters.
///
/// Source: summed over devices in `/proc/diskstats`
///
/// Block counts are in 512-byte sectors.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct IoStats {
    /// Total I/O requests (reads + writes + discards).
    pub total_io: u64,
    pub read_io: u64,
    pub write_io: u64,
    pub discard_io: u64,
    pub read_blocks: u64,
    pub write_blocks: u64,
    pub discard_blocks: u64,
}

/// Memory and swap utilisation (gauges, kilobytes).
///
/// Source: `/proc/meminfo`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MemoryStats {
    /// Source: `MemTotal`
    pub total_kb: u64,
    /// Source: `MemFree`
    pub free_kb: u64,
    /// Source: `MemAvailable`
    pub available_kb: u64,
    /// Source: `Buffers`
    pub buffers_kb: u64,
    /// Source: `Cached`
    pub cached_kb: u64,
    /// Source: `Committed_AS`
    pub commit_kb: u64,
    /// Source: `Active`
    pub active_kb: u64,
    /// Source: `Inactive`
    pub inactive_kb: u64,
    /// Source: `Dirty`
    pub dirty_kb: u64,
    /// Source: `AnonPages`
    pub anon_pages_kb: u64,
    /// Source: `Slab`
    pub slab_kb: u64,
    /// Source: `KernelStack`
    pub kernel_stack_kb: u64,
    /// Source: `PageTables`
    pub page_tables_kb: u64,
    /// Source: `VmallocUsed`
    pub vmalloc_used_kb: u64,
    /// Source: `SwapTotal`
    pub swap_total_kb: u64,
    /// Source: `SwapFree`
    pub swap_free_kb: u64,
    /// Source: `SwapCached`
    pub swap_cached_kb: u64,
}

/// Kernel table sizes (gauges).
///
/// Sources: `/proc/sys/fs/dentry-state`, `/proc/sys/fs/file-nr`,
/// `/proc/sys/fs/inode-state`, `/proc/sys/kernel/pty/nr`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct KtablesStats {
    pub dentry_stat: u64,
    pub file_used: u64,
    pub inode_used: u64,
    pub pty_nr: u64,
}

/// Run queue and load averages.
///
/// Source: `/proc/loadavg`, `procs_blocked` in `/proc/stat`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct QueueStats {
    pub nr_running: u64,
    pub nr_threads: u64,
    pub procs_blocked: u64,
    /// Load averages in hundredths (fixed point, `153` means `1.53`).
    pub load_avg_1: u32,
    pub load_avg_5: u32,
    pub load_avg_15: u32,
}

/// Link duplex mode as reported by `/sys/class/net/<iface>/duplex`.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Duplex {
    #[default]
    Unknown,
    Half,
    Full,
}

/// Network interface traffic counters.
///
/// Source: `/proc/net/dev`, link speed and duplex from `/sys/class/net/`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, enp0s3, ...).
    pub interface: String,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_compressed: u64,
    pub tx_compressed: u64,
    pub multicast: u64,
    /// Nominal link speed in Mbit/s, `0` when unknown.
    pub speed: u32,
    pub duplex: Duplex,
}

/// Network interface error counters.
///
/// Source: `/proc/net/dev`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct NetEdevStats {
    pub interface: String,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub collisions: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub tx_carrier_errors: u64,
    pub rx_frame_errors: u64,
    pub rx_fifo_errors: u64,
    pub tx_fifo_errors: u64,
}

/// Serial line counters.
///
/// Source: `/proc/tty/driver/serial`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct SerialStats {
    /// Line number, the identity of the entity across snapshots.
    pub line: u32,
    pub rx: u64,
    pub tx: u64,
    pub frame: u64,
    pub parity: u64,
    pub brk: u64,
    pub overrun: u64,
}

/// NFS client RPC counters.
///
/// Source: `/proc/net/rpc/nfs`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct NfsClientStats {
    pub rpc_count: u64,
    pub rpc_retrans: u64,
    pub read: u64,
    pub write: u64,
    pub access: u64,
    pub getattr: u64,
}

/// NFS server RPC counters.
///
/// Source: `/proc/net/rpc/nfsd`
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(default)]
pub struct NfsServerStats {
    pub rpc_count: u64,
    pub rpc_bad: u64,
    pub net_count: u64,
    pub net_udp: u64,
    pub net_tcp: u64,
    /// Reply cache hits.
    pub rc_hits: u64,
    /// Reply cache misses.
    pub rc_misses: u64,
    pub read: u64,
    pub write: u64,
    pub access: u64,
    pub getattr: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_total_excludes_guest() {
        let c = CpuStats {
            user: 10,
            nice: 1,
            sys: 2,
            idle: 100,
            iowait: 3,
            hardirq: 4,
            softirq: 5,
            steal: 6,
            guest: 7,
            guest_nice: 1,
        };
        assert_eq!(c.total_jiffies(), 131);
    }

    #[test]
    fn cpu_accumulate_sums_every_field() {
        let mut all = CpuStats::default();
        let c = CpuStats {
            user: 1,
            nice: 2,
            sys: 3,
            idle: 4,
            iowait: 5,
            hardirq: 6,
            softirq: 7,
            steal: 8,
            guest: 9,
            guest_nice: 10,
        };
        all.accumulate(&c);
        all.accumulate(&c);
        assert_eq!(all.user, 2);
        assert_eq!(all.guest_nice, 20);
        assert_eq!(all.total_jiffies(), 2 * c.total_jiffies());
    }

    #[test]
    fn records_deserialize_with_missing_fields() {
        let dev: NetDevStats =
            serde_json::from_str(r#"{"interface":"eth0","rx_bytes":10,"duplex":"full"}"#).unwrap();
        assert_eq!(dev.interface, "eth0");
        assert_eq!(dev.rx_bytes, 10);
        assert_eq!(dev.tx_bytes, 0);
        assert_eq!(dev.duplex, Duplex::Full);
    }
}
