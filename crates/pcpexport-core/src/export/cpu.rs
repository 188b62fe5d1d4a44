//! CPU utilisation percentages.
//!
//! Entity 0 is the aggregate "all" pseudo-CPU, entity `N + 1` is CPU `N`
//! (labelled `cpuN`). Percentages are shares of the jiffies elapsed on that
//! CPU, so every CPU carries its own interval; an interval of zero means the
//! CPU was tickless for the whole period.

use crate::delta::busy_percent;
use crate::model::CpuStats;
use crate::sink::Emitter;
use crate::visibility::{CpuBitmap, CpuSelection};

/// Metric names in emission order: (aggregate, per-CPU).
const CPU_METRICS: [(&str, &str); 10] = [
    ("kernel.all.cpu.user", "kernel.percpu.cpu.user"),
    ("kernel.all.cpu.nice", "kernel.percpu.cpu.nice"),
    ("kernel.all.cpu.sys", "kernel.percpu.cpu.sys"),
    ("kernel.all.cpu.iowait", "kernel.percpu.cpu.iowait"),
    ("kernel.all.cpu.steal", "kernel.percpu.cpu.steal"),
    ("kernel.all.cpu.hardirq", "kernel.percpu.cpu.hardirq"),
    ("kernel.all.cpu.softirq", "kernel.percpu.cpu.softirq"),
    ("kernel.all.cpu.guest", "kernel.percpu.cpu.guest"),
    ("kernel.all.cpu.guest_nice", "kernel.percpu.cpu.guest_nice"),
    ("kernel.all.cpu.idle", "kernel.percpu.cpu.idle"),
];

/// Index of idle in [`CPU_METRICS`].
const IDLE: usize = 9;

/// Counters this close to `u64::MAX` that go backwards wrapped; anything
/// else going backwards is a CPU that came back online.
const WRAP_MARGIN: u64 = 0x7ffff;

/// Aggregate figures for one period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuTotals {
    /// Aggregate counters for the current sample.
    pub curr: CpuStats,
    /// Aggregate counters for the previous sample.
    pub prev: CpuStats,
    /// Jiffies elapsed for the aggregate, never zero.
    pub interval: u64,
    /// Entity indices of CPUs found offline in the current sample.
    pub offline: CpuBitmap,
}

/// Previous record as used for the deltas.
///
/// When a CPU comes back online the kernel restarts idle and iowait from
/// zero while other fields keep counting, so a decrease of those two is
/// read as a restart from zero.
pub fn effective_prev(curr: &CpuStats, prev: &CpuStats) -> CpuStats {
    let mut p = prev.clone();
    if curr.idle < p.idle && p.idle < u64::MAX - WRAP_MARGIN {
        p.idle = 0;
    }
    if curr.iowait < p.iowait && p.iowait < u64::MAX - WRAP_MARGIN {
        p.iowait = 0;
    }
    p
}

/// Jiffies elapsed on one CPU between `prev` and `curr`.
///
/// Guest time is already part of user/nice. When `user - guest` (or
/// `nice - guest_nice`) went backwards, the kernel over-reported guest time
/// and the difference is added back to the interval. Zero means tickless.
pub fn per_cpu_interval(curr: &CpuStats, prev: &CpuStats) -> u64 {
    let mut ishift: u64 = 0;

    let (cu, pu) = (
        curr.user.saturating_sub(curr.guest),
        prev.user.saturating_sub(prev.guest),
    );
    if cu < pu {
        ishift += pu - cu;
    }
    let (cn, pn) = (
        curr.nice.saturating_sub(curr.guest_nice),
        prev.nice.saturating_sub(prev.guest_nice),
    );
    if cn < pn {
        ishift += pn - cn;
    }

    let itv = curr.total_jiffies() as i128 - prev.total_jiffies() as i128 + ishift as i128;
    itv.clamp(0, u64::MAX as i128) as u64
}

/// Builds the aggregate record and interval, and finds offline CPUs.
///
/// With a single entity (uniprocessor) the aggregate line is used as-is and
/// its own interval applies. Otherwise the aggregate is rebuilt as the sum of
/// online CPUs and its interval is the sum of their intervals. A CPU whose
/// current counters are all zero is offline. The aggregate can never be
/// tickless: a zero interval is forced to 1.
pub fn global_cpu_statistics(curr: &[CpuStats], prev: &[CpuStats]) -> CpuTotals {
    let zero = CpuStats::default();
    let mut totals = CpuTotals::default();

    if curr.len() <= 1 {
        let c = curr.first().unwrap_or(&zero);
        let p = effective_prev(c, prev.first().unwrap_or(&zero));
        totals.interval = per_cpu_interval(c, &p);
        totals.curr = c.clone();
        totals.prev = p;
    } else {
        for (i, c) in curr.iter().enumerate().skip(1) {
            if c.total_jiffies() == 0 {
                totals.offline.set(i);
                continue;
            }
            let p = effective_prev(c, prev.get(i).unwrap_or(&zero));
            totals.curr.accumulate(c);
            totals.prev.accumulate(&p);
            totals.interval = totals.interval.saturating_add(per_cpu_interval(c, &p));
        }
    }

    if totals.interval == 0 {
        totals.interval = 1;
    }
    totals
}

/// Percentages in [`CPU_METRICS`] order.
fn cpu_percentages(c: &CpuStats, p: &CpuStats, itv: u64) -> [f64; 10] {
    [
        busy_percent(
            p.user.saturating_sub(p.guest),
            c.user.saturating_sub(c.guest),
            itv,
        ),
        busy_percent(
            p.nice.saturating_sub(p.guest_nice),
            c.nice.saturating_sub(c.guest_nice),
            itv,
        ),
        busy_percent(p.sys, c.sys, itv),
        busy_percent(p.iowait, c.iowait, itv),
        busy_percent(p.steal, c.steal, itv),
        busy_percent(p.hardirq, c.hardirq, itv),
        busy_percent(p.softirq, c.softirq, itv),
        busy_percent(p.guest, c.guest, itv),
        busy_percent(p.guest_nice, c.guest_nice, itv),
        busy_percent(p.idle, c.idle, itv),
    ]
}

/// Exports CPU percentages for every visible, online CPU.
pub fn export_cpu(
    curr: &[CpuStats],
    prev: &[CpuStats],
    selection: &CpuSelection,
    out: &mut Emitter<'_>,
) {
    let zero = CpuStats::default();
    let totals = global_cpu_statistics(curr, prev);

    for (i, c) in curr.iter().enumerate() {
        if !selection.is_visible(i) || totals.offline.is_set(i) {
            continue;
        }

        if i == 0 {
            let values = cpu_percentages(&totals.curr, &totals.prev, totals.interval);
            for ((name, _), v) in CPU_METRICS.iter().zip(values) {
                out.float(name, None, v);
            }
            continue;
        }

        let label = format!("cpu{}", i - 1);
        let p = effective_prev(c, prev.get(i).unwrap_or(&zero));
        let itv = per_cpu_interval(c, &p);

        if itv == 0 {
            for (k, (_, name)) in CPU_METRICS.iter().enumerate() {
                out.text(name, Some(label.as_str()), if k == IDLE { "100" } else { "0" });
            }
            continue;
        }

        let values = cpu_percentages(c, &p, itv);
        for ((_, name), v) in CPU_METRICS.iter().zip(values) {
            out.float(name, Some(label.as_str()), v);
        }
    }
}
