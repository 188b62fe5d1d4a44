//! Kernel table sizes and run queue gauges. No rate math.

use crate::model::{KtablesStats, QueueStats};
use crate::sink::Emitter;

pub fn export_ktables(k: &KtablesStats, out: &mut Emitter<'_>) {
    out.count("vfs.dentry.count", None, k.dentry_stat);
    out.count("vfs.files.count", None, k.file_used);
    out.count("vfs.inodes.count", None, k.inode_used);
    out.count("kernel.all.pty", None, k.pty_nr);
}

/// Queue lengths plus the three load averages, converted from hundredths.
pub fn export_queue(q: &QueueStats, out: &mut Emitter<'_>) {
    out.count("proc.runq.runnable", None, q.nr_running);
    out.count("proc.nprocs", None, q.nr_threads);
    out.count("proc.blocked", None, q.procs_blocked);

    let loads = [
        ("1 min", q.load_avg_1),
        ("5 min", q.load_avg_5),
        ("15 min", q.load_avg_15),
    ];
    for (instance, load) in loads {
        out.float("kernel.all.load", Some(instance), f64::from(load) / 100.0);
    }
}
