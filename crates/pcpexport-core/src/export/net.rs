//! Network interface traffic and error rates.
//!
//! Interfaces are matched by name through [`InterfaceRegistry`]. An interface
//! missing from the previous snapshot (or re-registered since) is compared
//! against an all-zero record. The allow-list is applied before matching.

use crate::delta::{Interval, per_sec};
use crate::model::{Duplex, NetDevStats, NetEdevStats};
use crate::reconcile::InterfaceRegistry;
use crate::sink::Emitter;
use crate::visibility::DeviceFilter;

/// Derives link utilisation (percent) from observed byte rates.
pub trait LinkUtilization {
    fn utilization(&self, dev: &NetDevStats, rx_bytes_per_sec: f64, tx_bytes_per_sec: f64) -> f64;
}

/// Utilisation against the nominal link speed and duplex mode.
///
/// Full duplex compares the busier direction with the link speed; half
/// duplex (or unknown) compares the sum of both directions. A link with no
/// known speed reports `0.0`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NominalSpeed;

impl LinkUtilization for NominalSpeed {
    fn utilization(&self, dev: &NetDevStats, rx_bytes_per_sec: f64, tx_bytes_per_sec: f64) -> f64 {
        if dev.speed == 0 {
            return 0.0;
        }
        let bits_per_sec = f64::from(dev.speed) * 1_000_000.0;
        let bytes = match dev.duplex {
            Duplex::Full => rx_bytes_per_sec.max(tx_bytes_per_sec),
            Duplex::Half | Duplex::Unknown => rx_bytes_per_sec + tx_bytes_per_sec,
        };
        bytes * 800.0 / bits_per_sec
    }
}

pub fn export_net_dev<L: LinkUtilization + ?Sized>(
    curr: &[NetDevStats],
    prev: &[NetDevStats],
    filter: &DeviceFilter,
    link: &L,
    itv: Interval,
    out: &mut Emitter<'_>,
) {
    let zero = NetDevStats::default();
    let registry = InterfaceRegistry::new(prev);

    for c in curr {
        if !filter.is_visible(&c.interface) {
            continue;
        }
        let p = registry.lookup(c).or_zero(&zero);
        let iface = Some(c.interface.as_str());

        let rx_bytes = per_sec(p.rx_bytes, c.rx_bytes, itv);
        let tx_bytes = per_sec(p.tx_bytes, c.tx_bytes, itv);
        let util = link.utilization(c, rx_bytes, tx_bytes);

        out.float(
            "network.interface.in.packets",
            iface,
            per_sec(p.rx_packets, c.rx_packets, itv),
        );
        out.float(
            "network.interface.out.packets",
            iface,
            per_sec(p.tx_packets, c.tx_packets, itv),
        );
        out.float("network.interface.in.bytes", iface, rx_bytes / 1024.0);
        out.float("network.interface.out.bytes", iface, tx_bytes / 1024.0);
        out.float(
            "network.interface.in.compressed",
            iface,
            per_sec(p.rx_compressed, c.rx_compressed, itv),
        );
        out.float(
            "network.interface.out.compressed",
            iface,
            per_sec(p.tx_compressed, c.tx_compressed, itv),
        );
        out.float(
            "network.interface.in.multicast",
            iface,
            per_sec(p.multicast, c.multicast, itv),
        );
        out.float("network.interface.util", iface, util);
    }
}

const EDEV: [(&str, fn(&NetEdevStats) -> u64); 9] = [
    ("network.interface.in.errors", |s| s.rx_errors),
    ("network.interface.out.errors", |s| s.tx_errors),
    ("network.interface.out.collisions", |s| s.collisions),
    ("network.interface.in.drops", |s| s.rx_dropped),
    ("network.interface.out.drops", |s| s.tx_dropped),
    ("network.interface.out.carrier", |s| s.tx_carrier_errors),
    ("network.interface.in.frame", |s| s.rx_frame_errors),
    ("network.interface.in.fifo", |s| s.rx_fifo_errors),
    ("network.interface.out.fifo", |s| s.tx_fifo_errors),
];

pub fn export_net_edev(
    curr: &[NetEdevStats],
    prev: &[NetEdevStats],
    filter: &DeviceFilter,
    itv: Interval,
    out: &mut Emitter<'_>,
) {
    let zero = NetEdevStats::default();
    let registry = InterfaceRegistry::new(prev);

    for c in curr {
        if !filter.is_visible(&c.interface) {
            continue;
        }
        let p = registry.lookup(c).or_zero(&zero);
        for (name, get) in &EDEV {
            out.float(name, Some(c.interface.as_str()), per_sec(get(p), get(c), itv));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    const ONE_SEC: Interval = Interval::from_centis(100);

    fn dev(name: &str, rx_bytes: u64, tx_bytes: u64, rx_packets: u64) -> NetDevStats {
        NetDevStats {
            interface: name.to_string(),
            rx_bytes,
            tx_bytes,
            rx_packets,
            ..Default::default()
        }
    }

    fn run_dev(curr: &[NetDevStats], prev: &[NetDevStats], filter: &DeviceFilter) -> RecordingSink {
        let mut sink = RecordingSink::new();
        export_net_dev(
            curr,
            prev,
            filter,
            &NominalSpeed,
            ONE_SEC,
            &mut Emitter::new(&mut sink),
        );
        sink
    }

    #[test]
    fn utilization_full_and_half_duplex() {
        let mut d = NetDevStats {
            speed: 1_000,
            duplex: Duplex::Full,
            ..Default::default()
        };
        // 12.5 MB/s is 100 Mbit/s, a tenth of the link
        assert!((NominalSpeed.utilization(&d, 12_500_000.0, 1_000.0) - 10.0).abs() < 1e-9);
        d.duplex = Duplex::Half;
        assert!(
            (NominalSpeed.utilization(&d, 12_500_000.0, 12_500_000.0) - 20.0).abs() < 1e-9
        );
        d.speed = 0;
        assert_eq!(NominalSpeed.utilization(&d, 1e9, 1e9), 0.0);
    }

    #[test]
    fn traffic_rates_and_kilobytes() {
        let prev = vec![dev("eth0", 1_024, 0, 10)];
        let curr = vec![dev("eth0", 1_024 + 2_048, 1_024, 30)];
        let sink = run_dev(&curr, &prev, &DeviceFilter::all());

        assert_eq!(sink.len(), 8);
        assert_eq!(sink.value("network.interface.in.bytes", Some("eth0")), Some(2.0));
        assert_eq!(sink.value("network.interface.out.bytes", Some("eth0")), Some(1.0));
        assert_eq!(
            sink.value("network.interface.in.packets", Some("eth0")),
            Some(20.0)
        );
        assert_eq!(sink.value("network.interface.util", Some("eth0")), Some(0.0));
    }

    #[test]
    fn new_interface_reports_from_zero_without_previous() {
        let prev = vec![dev("eth0", 100, 100, 1)];
        let curr = vec![dev("eth0", 100, 100, 1), dev("eth1", 0, 0, 0)];
        let sink = run_dev(&curr, &prev, &DeviceFilter::all());

        let eth1: Vec<_> = sink.for_instance("eth1").collect();
        assert_eq!(eth1.len(), 8);
        assert!(eth1.iter().all(|r| r.as_f64() == Some(0.0)));
    }

    #[test]
    fn new_interface_rates_are_against_zero() {
        let curr = vec![dev("eth1", 4_096, 0, 5)];
        let sink = run_dev(&curr, &[], &DeviceFilter::all());
        assert_eq!(sink.value("network.interface.in.bytes", Some("eth1")), Some(4.0));
        assert_eq!(sink.value("network.interface.in.packets", Some("eth1")), Some(5.0));
    }

    #[test]
    fn reordered_interfaces_match_by_name() {
        let prev = vec![dev("lo", 0, 0, 0), dev("eth0", 1_024, 0, 0)];
        let curr = vec![dev("eth0", 2_048, 0, 0), dev("lo", 0, 0, 0)];
        let sink = run_dev(&curr, &prev, &DeviceFilter::all());
        assert_eq!(sink.value("network.interface.in.bytes", Some("eth0")), Some(1.0));
    }

    #[test]
    fn filtered_interfaces_are_skipped() {
        let curr = vec![dev("lo", 1, 1, 1), dev("eth0", 1, 1, 1)];
        let sink = run_dev(&curr, &[], &DeviceFilter::only(["eth0"]));
        assert_eq!(sink.len(), 8);
        assert_eq!(sink.for_instance("lo").count(), 0);
    }

    #[test]
    fn edev_rates_and_regression() {
        let prev = vec![NetEdevStats {
            interface: "eth0".into(),
            rx_errors: 10,
            tx_dropped: 50,
            ..Default::default()
        }];
        let curr = vec![NetEdevStats {
            interface: "eth0".into(),
            rx_errors: 15,
            tx_dropped: 40,
            ..Default::default()
        }];
        let mut sink = RecordingSink::new();
        export_net_edev(
            &curr,
            &prev,
            &DeviceFilter::all(),
            ONE_SEC,
            &mut Emitter::new(&mut sink),
        );
        assert_eq!(sink.len(), 9);
        assert_eq!(sink.value("network.interface.in.errors", Some("eth0")), Some(5.0));
        assert_eq!(sink.value("network.interface.out.drops", Some("eth0")), Some(0.0));
    }

    fn edev(name: &str, rx_errors: u64, collisions: u64) -> NetEdevStats {
        NetEdevStats {
            interface: name.to_string(),
            rx_errors,
            collisions,
            ..Default::default()
        }
    }

    fn run_edev(
        curr: &[NetEdevStats],
        prev: &[NetEdevStats],
        filter: &DeviceFilter,
    ) -> RecordingSink {
        let mut sink = RecordingSink::new();
        export_net_edev(curr, prev, filter, ONE_SEC, &mut Emitter::new(&mut sink));
        sink
    }

    #[test]
    fn edev_new_interface_uses_zero_previous() {
        let prev = vec![edev("eth0", 100, 0)];
        let curr = vec![edev("eth0", 100, 0), edev("eth1", 0, 0), edev("eth2", 7, 3)];
        let sink = run_edev(&curr, &prev, &DeviceFilter::all());

        assert_eq!(sink.len(), 27);
        let eth1: Vec<_> = sink.for_instance("eth1").collect();
        assert_eq!(eth1.len(), 9);
        assert!(eth1.iter().all(|r| r.as_f64() == Some(0.0)));
        assert_eq!(sink.value("network.interface.in.errors", Some("eth2")), Some(7.0));
        assert_eq!(
            sink.value("network.interface.out.collisions", Some("eth2")),
            Some(3.0)
        );
    }

    #[test]
    fn edev_filtered_interfaces_are_skipped() {
        let prev = vec![edev("lo", 0, 0), edev("eth0", 0, 0)];
        let curr = vec![edev("lo", 5, 5), edev("eth0", 2, 0)];
        let sink = run_edev(&curr, &prev, &DeviceFilter::only(["eth0"]));

        assert_eq!(sink.len(), 9);
        assert_eq!(sink.for_instance("lo").count(), 0);
        assert_eq!(sink.value("network.interface.in.errors", Some("eth0")), Some(2.0));
    }
}
