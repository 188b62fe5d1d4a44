//! Per-category exporters and the pass that runs them over one period.
//!
//! Every exporter is a pure function of (current, previous, interval): it
//! reads the two snapshots, never mutates them, and emits through an
//! [`Emitter`]. Nothing is returned and nothing can fail.

mod cpu;
mod memory;
mod net;
mod scalar;
mod serial;
mod tables;

pub use cpu::{CpuTotals, effective_prev, export_cpu, global_cpu_statistics, per_cpu_interval};
pub use memory::{export_memory, unused_kb};
pub use net::{LinkUtilization, NominalSpeed, export_net_dev, export_net_edev};
pub use scalar::{export_io, export_irq, export_nfs, export_nfsd, export_paging, export_pcsw, export_swap};
pub use serial::export_serial;
pub use tables::{export_ktables, export_queue};

use tracing::debug;

use crate::config::{Activity, ExportConfig};
use crate::delta::Interval;
use crate::model::{DoubleBuffer, Snapshot};
use crate::sink::{Emitter, MetricSink};
use crate::visibility::{CpuSelection, DeviceFilter};

/// Number of values emitted per activity during one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub per_activity: Vec<(Activity, usize)>,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.per_activity.iter().map(|(_, n)| n).sum()
    }

    /// Values emitted for `activity`, `0` if it did not run.
    pub fn count(&self, activity: Activity) -> usize {
        self.per_activity
            .iter()
            .find(|(a, _)| *a == activity)
            .map_or(0, |(_, n)| *n)
    }
}

/// Everything an exporter needs besides the two snapshots.
pub struct ExportContext<'a, L: ?Sized> {
    pub config: &'a ExportConfig,
    pub cpus: CpuSelection,
    pub devices: DeviceFilter,
    pub link: &'a L,
    pub interval: Interval,
}

impl<'a, L: LinkUtilization + ?Sized> ExportContext<'a, L> {
    pub fn with_link(config: &'a ExportConfig, link: &'a L, interval: Interval) -> Self {
        Self {
            config,
            cpus: config.cpu_selection(),
            devices: config.device_filter(),
            link,
            interval,
        }
    }
}

/// Runs one activity over a (current, previous) pair.
pub fn export_activity<L: LinkUtilization + ?Sized>(
    activity: Activity,
    curr: &Snapshot,
    prev: &Snapshot,
    ctx: &ExportContext<'_, L>,
    out: &mut Emitter<'_>,
) {
    let itv = ctx.interval;
    match activity {
        Activity::Cpu => export_cpu(&curr.cpu, &prev.cpu, &ctx.cpus, out),
        Activity::Pcsw => export_pcsw(&curr.pcsw, &prev.pcsw, itv, out),
        Activity::Irq => export_irq(&curr.irq, &prev.irq, itv, out),
        Activity::Swap => export_swap(&curr.swap, &prev.swap, itv, out),
        Activity::Paging => export_paging(&curr.paging, &prev.paging, itv, out),
        Activity::Io => export_io(&curr.io, &prev.io, itv, out),
        Activity::Memory => export_memory(&curr.memory, &ctx.config.memory, out),
        Activity::Ktables => export_ktables(&curr.ktables, out),
        Activity::Queue => export_queue(&curr.queue, out),
        Activity::NetDev => {
            export_net_dev(&curr.net_dev, &prev.net_dev, &ctx.devices, ctx.link, itv, out)
        }
        Activity::NetEdev => {
            export_net_edev(&curr.net_edev, &prev.net_edev, &ctx.devices, itv, out)
        }
        Activity::Serial => export_serial(&curr.serial, &prev.serial, itv, out),
        Activity::Nfs => export_nfs(&curr.nfs, &prev.nfs, itv, out),
        Activity::Nfsd => export_nfsd(&curr.nfsd, &prev.nfsd, itv, out),
    }
}

/// Exports every configured activity, in [`Activity`] order, for the pair
/// held by `snapshots`.
pub fn export_period(
    snapshots: &DoubleBuffer<Snapshot>,
    config: &ExportConfig,
    sink: &mut dyn MetricSink,
) -> ExportSummary {
    let (curr, prev) = snapshots.pair();
    export_pair(curr, prev, config, &NominalSpeed, sink)
}

/// Same as [`export_period`] with an explicit pair and utilisation helper.
pub fn export_pair<L: LinkUtilization + ?Sized>(
    curr: &Snapshot,
    prev: &Snapshot,
    config: &ExportConfig,
    link: &L,
    sink: &mut dyn MetricSink,
) -> ExportSummary {
    let ctx = ExportContext::with_link(config, link, curr.interval_since(prev));
    let mut summary = ExportSummary::default();

    for activity in Activity::ALL {
        if !config.is_enabled(activity) {
            continue;
        }
        let mut out = Emitter::new(&mut *sink);
        export_activity(activity, curr, prev, &ctx, &mut out);
        let values = out.emitted();
        debug!(activity = %activity, values, "exported");
        summary.per_activity.push((activity, values));
    }

    summary
}
