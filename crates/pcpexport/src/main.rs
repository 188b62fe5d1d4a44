//! pcpexport - replays recorded system activity snapshots as named metrics.
//!
//! Every pair of consecutive snapshots is one period: the exporters turn the
//! counters into rates and gauges and the values are written to stdout, one
//! `name[instance] value` line each, or as one JSON object per period.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use pcpexport_core::config::{Activity, ConfigError, ExportConfig};
use pcpexport_core::export::{ExportSummary, export_period};
use pcpexport_core::model::{DoubleBuffer, Snapshot};
use pcpexport_core::sink::{MetricRecord, MetricSink, RecordingSink, WriteErrors, WriterSink};
use pcpexport_core::source::load_series;

// ── CLI ──────────────────────────────────────────────────────────────────────

/// Replays a snapshot series through the metric exporters.
#[derive(Parser)]
#[command(
    name = "pcpexport",
    about = "Export recorded system activity snapshots as metrics",
    version
)]
struct Args {
    /// Snapshot series: JSON array or JSON Lines, optionally .zst compressed.
    path: PathBuf,

    /// JSON export config. Command-line options below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated activities to export (cpu, pcsw, irq, swap, paging,
    /// io, memory, ktables, queue, net-dev, net-edev, serial, nfs, nfsd, all).
    #[arg(short = 'A', long)]
    activities: Option<String>,

    /// CPUs to export, comma-separated. The aggregate is always exported.
    #[arg(long, value_delimiter = ',')]
    cpus: Vec<usize>,

    /// Network interfaces to export, comma-separated.
    #[arg(long = "iface", value_delimiter = ',')]
    interfaces: Vec<String>,

    /// Also export extended memory fields.
    #[arg(long)]
    mem_all: bool,

    /// Skip memory utilisation fields.
    #[arg(long)]
    no_memory: bool,

    /// Skip swap utilisation fields.
    #[arg(long)]
    no_swap: bool,

    /// Export the first sample against an all-zero previous sample instead of
    /// only using it as the baseline.
    #[arg(long)]
    include_first: bool,

    /// Output one JSON object per period.
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is warn level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["pcpexport", "pcpexport_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    // stdout carries the metrics
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file (or defaults) with command-line overrides applied.
fn build_config(args: &Args) -> Result<ExportConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };

    if let Some(list) = &args.activities {
        config.activities = Activity::parse_list(list)?;
    }
    if !args.cpus.is_empty() {
        config.cpus = Some(args.cpus.clone());
    }
    if !args.interfaces.is_empty() {
        config.interfaces = Some(args.interfaces.clone());
    }
    if args.mem_all {
        config.memory.all = true;
    }
    if args.no_memory {
        config.memory.memory = false;
    }
    if args.no_swap {
        config.memory.swap = false;
    }
    Ok(config)
}

fn fmt_ts(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

// ── Replay ───────────────────────────────────────────────────────────────────

/// Receives the output of each exported period.
trait PeriodOutput {
    fn begin(&mut self, snapshot: &Snapshot);
    fn sink(&mut self) -> &mut dyn MetricSink;
    fn end(&mut self);
}

/// `# <time>` header followed by one line per value.
struct TextOutput<W: Write> {
    sink: WriterSink<W>,
}

impl<W: Write> PeriodOutput for TextOutput<W> {
    fn begin(&mut self, snapshot: &Snapshot) {
        self.sink.comment(&fmt_ts(snapshot.timestamp));
    }

    fn sink(&mut self) -> &mut dyn MetricSink {
        &mut self.sink
    }

    fn end(&mut self) {}
}

#[derive(Serialize)]
struct JsonPeriod<'a> {
    timestamp: i64,
    time: String,
    metrics: &'a [MetricRecord],
}

/// One JSON object per period.
struct JsonOutput<W: Write> {
    out: W,
    timestamp: i64,
    records: RecordingSink,
    errors: WriteErrors,
}

impl<W: Write> PeriodOutput for JsonOutput<W> {
    fn begin(&mut self, snapshot: &Snapshot) {
        self.timestamp = snapshot.timestamp;
        self.records.clear();
    }

    fn sink(&mut self) -> &mut dyn MetricSink {
        &mut self.records
    }

    fn end(&mut self) {
        let period = JsonPeriod {
            timestamp: self.timestamp,
            time: fmt_ts(self.timestamp),
            metrics: &self.records.records,
        };
        let res = serde_json::to_writer(&mut self.out, &period)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(self.out));
        if let Err(e) = res {
            self.errors.record(&e, "period");
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ReplayStats {
    periods: usize,
    values: usize,
}

/// Feeds `series` through a double buffer and exports every period.
fn replay(
    series: Vec<Snapshot>,
    config: &ExportConfig,
    include_first: bool,
    output: &mut dyn PeriodOutput,
) -> ReplayStats {
    let mut buffer = DoubleBuffer::new();
    let mut stats = ReplayStats::default();

    for snapshot in series {
        buffer.push(snapshot);
        let (curr, prev) = buffer.pair();

        if buffer.is_first_period() && !include_first {
            debug!(timestamp = curr.timestamp, "baseline sample");
            continue;
        }
        if curr.uptime_cs < prev.uptime_cs {
            warn!(
                prev_uptime = prev.uptime_cs,
                curr_uptime = curr.uptime_cs,
                "uptime went backwards, rates for this period are zero"
            );
        }

        output.begin(curr);
        let summary: ExportSummary = export_period(&buffer, config, output.sink());
        output.end();

        stats.periods += 1;
        stats.values += summary.total();
    }

    stats
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let series = match load_series(&args.path) {
        Ok(series) => series,
        Err(e) => {
            error!(path = %args.path.display(), error = %e, "failed to load snapshots");
            std::process::exit(1);
        }
    };
    if series.is_empty() {
        warn!(path = %args.path.display(), "no snapshots in input");
        return;
    }
    info!(
        snapshots = series.len(),
        activities = config.activities.len(),
        "replaying"
    );

    let stdout = BufWriter::new(std::io::stdout().lock());
    let (stats, write_errors) = if args.json {
        let mut output = JsonOutput {
            out: stdout,
            timestamp: 0,
            records: RecordingSink::new(),
            errors: WriteErrors::new(),
        };
        let stats = replay(series, &config, args.include_first, &mut output);
        if let Err(e) = output.out.flush() {
            output.errors.record(&e, "output");
        }
        (stats, output.errors.count())
    } else {
        let mut output = TextOutput {
            sink: WriterSink::new(stdout),
        };
        let stats = replay(series, &config, args.include_first, &mut output);
        output.sink.flush();
        (stats, output.sink.write_errors())
    };

    info!(
        periods = stats.periods,
        values = stats.values,
        write_errors,
        "done"
    );
    if write_errors > 0 {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcpexport_core::model::PcswStats;

    fn sample(uptime_cs: u64, switches: u64) -> Snapshot {
        Snapshot {
            timestamp: 1_700_000_000 + (uptime_cs / 100) as i64,
            uptime_cs,
            pcsw: PcswStats {
                context_switch: switches,
                processes: 0,
            },
            ..Default::default()
        }
    }

    fn pcsw_only() -> ExportConfig {
        ExportConfig {
            activities: vec![Activity::Pcsw],
            ..Default::default()
        }
    }

    fn text_output() -> TextOutput<Vec<u8>> {
        TextOutput {
            sink: WriterSink::new(Vec::new()),
        }
    }

    #[test]
    fn first_sample_is_baseline() {
        let series = vec![sample(100, 0), sample(200, 50), sample(400, 250)];
        let mut output = text_output();
        let stats = replay(series, &pcsw_only(), false, &mut output);

        assert_eq!(
            stats,
            ReplayStats {
                periods: 2,
                values: 4
            }
        );
        let text = String::from_utf8(output.sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("# 2023-11-14"));
        assert_eq!(lines[1], "kernel.all.pswitch 50.000000");
        assert_eq!(lines[4], "kernel.all.pswitch 100.000000");
    }

    #[test]
    fn include_first_exports_against_zero() {
        let series = vec![sample(100, 30)];
        let mut output = text_output();
        let stats = replay(series, &pcsw_only(), true, &mut output);
        assert_eq!(stats.periods, 1);
        let text = String::from_utf8(output.sink.into_inner()).unwrap();
        assert!(text.contains("kernel.all.pswitch 30.000000\n"));
    }

    #[test]
    fn json_output_one_object_per_period() {
        let series = vec![sample(100, 0), sample(200, 10)];
        let mut output = JsonOutput {
            out: Vec::new(),
            timestamp: 0,
            records: RecordingSink::new(),
            errors: WriteErrors::new(),
        };
        replay(series, &pcsw_only(), false, &mut output);

        let text = String::from_utf8(output.out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let v: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(v["timestamp"], 1_700_000_002);
        assert_eq!(v["metrics"][0]["name"], "kernel.all.pswitch");
        assert_eq!(v["metrics"][0]["instance"], serde_json::Value::Null);
        assert_eq!(v["metrics"][0]["value"], "10.000000");
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_output_counts_failed_periods() {
        let series = vec![sample(100, 0), sample(200, 10), sample(300, 20)];
        let mut output = JsonOutput {
            out: FullDisk,
            timestamp: 0,
            records: RecordingSink::new(),
            errors: WriteErrors::new(),
        };
        let stats = replay(series, &pcsw_only(), false, &mut output);
        assert_eq!(stats.periods, 2);
        assert_eq!(output.errors.count(), 2);
    }

    #[test]
    fn cli_overrides_config() {
        let args = Args::parse_from([
            "pcpexport",
            "series.json",
            "-A",
            "memory,cpu",
            "--cpus",
            "0,2",
            "--iface",
            "eth0",
            "--mem-all",
            "--no-swap",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.activities, vec![Activity::Cpu, Activity::Memory]);
        assert_eq!(config.cpus, Some(vec![0, 2]));
        assert_eq!(config.interfaces, Some(vec!["eth0".to_string()]));
        assert!(config.memory.memory && config.memory.all && !config.memory.swap);
    }

    #[test]
    fn unknown_activity_is_rejected() {
        let args = Args::parse_from(["pcpexport", "series.json", "-A", "bogus"]);
        assert!(matches!(
            build_config(&args),
            Err(ConfigError::UnknownActivity(_))
        ));
    }
}
