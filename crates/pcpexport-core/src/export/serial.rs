//! Serial line interrupt and error rates.
//!
//! A line is exported only once a previous sample of the same line exists.

use crate::delta::{Interval, per_sec};
use crate::model::SerialStats;
use crate::reconcile::circular_scan;
use crate::sink::Emitter;

const SERIAL: [(&str, fn(&SerialStats) -> u64); 6] = [
    ("serial.in.interrupts", |s| s.rx),
    ("serial.out.interrupts", |s| s.tx),
    ("serial.frame", |s| s.frame),
    ("serial.parity", |s| s.parity),
    ("serial.breaks", |s| s.brk),
    ("serial.overrun", |s| s.overrun),
];

pub fn export_serial(
    curr: &[SerialStats],
    prev: &[SerialStats],
    itv: Interval,
    out: &mut Emitter<'_>,
) {
    for (i, c) in curr.iter().enumerate() {
        let Some((_, p)) = circular_scan(prev, i, &c.line, |s| &s.line) else {
            continue;
        };
        let label = format!("serial{}", c.line);
        for (name, get) in &SERIAL {
            out.float(name, Some(label.as_str()), per_sec(get(p), get(c), itv));
        }
    }
}
