//! Single-entity rate categories: task creation and context switches,
//! interrupts, swapping, paging, NFS client and NFS server, plus the global
//! I/O counters.
//!
//! Each category is a table mapping a metric name to the counter it is
//! computed from. Every field is an independent per-second rate.

use crate::delta::{Interval, per_sec};
use crate::model::{
    IoStats, IrqStats, NfsClientStats, NfsServerStats, PagingStats, PcswStats, SwapStats,
};
use crate::sink::Emitter;

type Field<T> = (&'static str, fn(&T) -> u64);

const PCSW: [Field<PcswStats>; 2] = [
    ("kernel.all.pswitch", |s| s.context_switch),
    ("kernel.all.proc", |s| s.processes),
];

const IRQ: [Field<IrqStats>; 1] = [("kernel.all.intr", |s| s.irq_nr)];

const SWAP: [Field<SwapStats>; 2] = [
    ("swap.pagesin", |s| s.pswpin),
    ("swap.pagesout", |s| s.pswpout),
];

const PAGING: [Field<PagingStats>; 8] = [
    ("mem.vmstat.pgpgin", |s| s.pgpgin),
    ("mem.vmstat.pgpgout", |s| s.pgpgout),
    ("mem.vmstat.pgfault", |s| s.pgfault),
    ("mem.vmstat.pgmajfault", |s| s.pgmajfault),
    ("mem.vmstat.pgfree", |s| s.pgfree),
    ("mem.vmstat.pgscank", |s| s.pgscan_kswapd),
    ("mem.vmstat.pgscand", |s| s.pgscan_direct),
    ("mem.vmstat.pgsteal", |s| s.pgsteal),
];

const NFS: [Field<NfsClientStats>; 6] = [
    ("network.fs.client.call", |s| s.rpc_count),
    ("network.fs.client.retrans", |s| s.rpc_retrans),
    ("network.fs.client.read", |s| s.read),
    ("network.fs.client.write", |s| s.write),
    ("network.fs.client.access", |s| s.access),
    ("network.fs.client.getattr", |s| s.getattr),
];

const NFSD: [Field<NfsServerStats>; 11] = [
    ("network.fs.server.call", |s| s.rpc_count),
    ("network.fs.server.badcall", |s| s.rpc_bad),
    ("network.fs.server.packets", |s| s.net_count),
    ("network.fs.server.udp", |s| s.net_udp),
    ("network.fs.server.tcp", |s| s.net_tcp),
    ("network.fs.server.hits", |s| s.rc_hits),
    ("network.fs.server.misses", |s| s.rc_misses),
    ("network.fs.server.read", |s| s.read),
    ("network.fs.server.write", |s| s.write),
    ("network.fs.server.access", |s| s.access),
    ("network.fs.server.getattr", |s| s.getattr),
];

/// Request counts, in requests per second.
const IO_REQUESTS: [Field<IoStats>; 4] = [
    ("disk.all.total", |s| s.total_io),
    ("disk.all.read", |s| s.read_io),
    ("disk.all.write", |s| s.write_io),
    ("disk.all.discard", |s| s.discard_io),
];

/// Sector counts; the rate is halved to get kilobytes per second.
const IO_SECTORS: [Field<IoStats>; 3] = [
    ("disk.all.read_bytes", |s| s.read_blocks),
    ("disk.all.write_bytes", |s| s.write_blocks),
    ("disk.all.discard_bytes", |s| s.discard_blocks),
];

fn export_rates<T>(fields: &[Field<T>], curr: &T, prev: &T, itv: Interval, out: &mut Emitter<'_>) {
    for (name, get) in fields {
        out.float(name, None, per_sec(get(prev), get(curr), itv));
    }
}

pub fn export_pcsw(curr: &PcswStats, prev: &PcswStats, itv: Interval, out: &mut Emitter<'_>) {
    export_rates(&PCSW, curr, prev, itv, out);
}

pub fn export_irq(curr: &IrqStats, prev: &IrqStats, itv: Interval, out: &mut Emitter<'_>) {
    export_rates(&IRQ, curr, prev, itv, out);
}

pub fn export_swap(curr: &SwapStats, prev: &SwapStats, itv: Interval, out: &mut Emitter<'_>) {
    export_rates(&SWAP, curr, prev, itv, out);
}

pub fn export_paging(
    curr: &PagingStats,
    prev: &PagingStats,
    itv: Interval,
    out: &mut Emitter<'_>,
) {
    export_rates(&PAGING, curr, prev, itv, out);
}

pub fn export_nfs(
    curr: &NfsClientStats,
    prev: &NfsClientStats,
    itv: Interval,
    out: &mut Emitter<'_>,
) {
    export_rates(&NFS, curr, prev, itv, out);
}

pub fn export_nfsd(
    curr: &NfsServerStats,
    prev: &NfsServerStats,
    itv: Interval,
    out: &mut Emitter<'_>,
) {
    export_rates(&NFSD, curr, prev, itv, out);
}

/// Global I/O request and transfer rates.
pub fn export_io(curr: &IoStats, prev: &IoStats, itv: Interval, out: &mut Emitter<'_>) {
    export_rates(&IO_REQUESTS, curr, prev, itv, out);
    for (name, get) in &IO_SECTORS {
        out.float(name, None, per_sec(get(prev), get(curr), itv) / 2.0);
    }
}
