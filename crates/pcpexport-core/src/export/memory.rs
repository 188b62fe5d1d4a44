//! Memory and swap utilisation gauges.

use crate::config::MemoryOptions;
use crate::delta::share_percent;
use crate::model::MemoryStats;
use crate::sink::Emitter;

/// Memory not counted as used: free, buffers, page cache and slab, clamped so
/// it never exceeds the total.
pub fn unused_kb(m: &MemoryStats) -> u64 {
    m.free_kb
        .saturating_add(m.buffers_kb)
        .saturating_add(m.cached_kb)
        .saturating_add(m.slab_kb)
        .min(m.total_kb)
}

/// Exports the fields selected by `opts` from the current sample.
pub fn export_memory(m: &MemoryStats, opts: &MemoryOptions, out: &mut Emitter<'_>) {
    if opts.memory {
        let used = m.total_kb - unused_kb(m);

        out.count("mem.util.free", None, m.free_kb);
        out.count("mem.util.available", None, m.available_kb);
        out.count("mem.util.used", None, used);
        out.float("mem.util.used_pct", None, share_percent(used, m.total_kb));
        out.count("mem.util.buffers", None, m.buffers_kb);
        out.count("mem.util.cached", None, m.cached_kb);
        out.count("mem.util.commit", None, m.commit_kb);
        out.float(
            "mem.util.commit_pct",
            None,
            share_percent(m.commit_kb, m.total_kb.saturating_add(m.swap_total_kb)),
        );
        out.count("mem.util.active", None, m.active_kb);
        out.count("mem.util.inactive", None, m.inactive_kb);
        out.count("mem.util.dirty", None, m.dirty_kb);

        if opts.all {
            out.count("mem.util.anonpages", None, m.anon_pages_kb);
            out.count("mem.util.slab", None, m.slab_kb);
            out.count("mem.util.stack", None, m.kernel_stack_kb);
            out.count("mem.util.pageTables", None, m.page_tables_kb);
            out.count("mem.util.vmused", None, m.vmalloc_used_kb);
        }
    }

    if opts.swap {
        let used = m.swap_total_kb.saturating_sub(m.swap_free_kb);

        out.count("mem.util.swapFree", None, m.swap_free_kb);
        out.count("mem.util.swapUsed", None, used);
        out.float(
            "mem.util.swapUsed_pct",
            None,
            share_percent(used, m.swap_total_kb),
        );
        out.count("mem.util.swapCached", None, m.swap_cached_kb);
        out.float(
            "mem.util.swapCached_pct",
            None,
            share_percent(m.swap_cached_kb, used),
        );
    }
}
