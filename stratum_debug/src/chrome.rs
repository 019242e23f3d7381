// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format export.
//!
//! Converts bytes captured by [`RecorderSink`](crate::recorder::RecorderSink)
//! into JSON loadable by `chrome://tracing` or Perfetto. Phases become
//! duration events; everything else becomes instant events placed at the
//! latest timestamp seen.

use std::io::{self, Write};

use serde_json::{Map, Value, json};
use stratum_core::trace::PhaseKind;

use crate::recorder::{RecordedEvent, decode};

const PID: u32 = 1;
const TID: u32 = 1;

fn ts_us(nanos: u64) -> f64 {
    nanos as f64 / 1_000.0
}

fn instant(name: &str, ts: f64, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": "driver",
        "ts": ts,
        "pid": PID,
        "tid": TID,
        "s": "t",
        "args": args,
    })
}

/// Converts recorded trace bytes into Chrome trace JSON.
///
/// Decoding stops at the first malformed record; everything before it is
/// exported.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_ts = 0.0;

    for event in decode(bytes) {
        match event {
            RecordedEvent::Vsync(e) => {
                last_ts = ts_us(e.timestamp.nanos());
                events.push(instant(
                    "vsync",
                    last_ts,
                    json!({
                        "frame": e.frame_count,
                        "resample_ts_us": ts_us(e.resample_timestamp.nanos()),
                        "period_us": ts_us(e.vsync_period.nanos()),
                    }),
                ));
            }
            RecordedEvent::PhaseBegin(e) => {
                last_ts = ts_us(e.timestamp.nanos());
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "phase",
                    "ts": last_ts,
                    "pid": PID,
                    "tid": TID,
                    "args": { "frame": e.frame_count },
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                last_ts = ts_us(e.timestamp.nanos());
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "phase",
                    "ts": last_ts,
                    "pid": PID,
                    "tid": TID,
                }));
            }
            RecordedEvent::BuildPass(e) => events.push(instant(
                "build_pass",
                last_ts,
                json!({
                    "frame": e.frame_count,
                    "pass": e.pass,
                    "rebuilt": e.rebuilt,
                    "remaining": e.remaining,
                }),
            )),
            RecordedEvent::TouchFlush(e) => events.push(instant(
                "touch_flush",
                last_ts,
                json!({
                    "frame": e.frame_count,
                    "pointers": e.pointers,
                    "resampled": e.resampled,
                }),
            )),
            RecordedEvent::FrameSummary(s) => {
                let mut args = Map::new();
                args.insert("frame".into(), json!(s.frame_count));
                for phase in PhaseKind::ALL {
                    args.insert(
                        format!("{}_us", phase.name()),
                        json!(ts_us(s.phase(phase))),
                    );
                }
                args.insert("rebuild_passes".into(), json!(s.rebuild_passes));
                args.insert("rebuilt".into(), json!(s.rebuilt));
                args.insert("laid_out".into(), json!(s.laid_out));
                args.insert("rendered".into(), json!(s.rendered));
                args.insert("carried_over".into(), json!(s.carried_over));
                events.push(instant("frame_summary", last_ts, Value::Object(args)));
            }
            RecordedEvent::Rebuilt { frame_count, count } => events.push(instant(
                "rebuilt_components",
                last_ts,
                json!({ "frame": frame_count, "count": count }),
            )),
            RecordedEvent::LaidOut { frame_count, count } => events.push(instant(
                "laid_out_nodes",
                last_ts,
                json!({ "frame": frame_count, "count": count }),
            )),
        }
    }

    serde_json::to_writer_pretty(&mut *writer, &events)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    use stratum_core::time::{Duration, HostTime};
    use stratum_core::trace::{
        BuildPassEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, TraceSink, VsyncEvent,
    };

    use crate::recorder::RecorderSink;

    fn export_to_json(sink: &RecorderSink) -> Vec<Value> {
        let mut out = Vec::new();
        export(sink.as_bytes(), &mut out).expect("export to memory");
        serde_json::from_slice(&out).expect("valid JSON")
    }

    #[test]
    fn empty_recording_is_empty_array() {
        let events = export_to_json(&RecorderSink::new());
        assert!(events.is_empty(), "no records, no events");
    }

    #[test]
    fn phases_become_duration_events() {
        let mut sink = RecorderSink::new();
        sink.on_vsync(&VsyncEvent {
            frame_count: 1,
            timestamp: HostTime(1_000_000),
            resample_timestamp: HostTime(0),
            vsync_period: Duration(16_000_000),
        });
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_count: 1,
            phase: PhaseKind::Build,
            timestamp: HostTime(1_002_000),
        });
        sink.on_build_pass(&BuildPassEvent {
            frame_count: 1,
            pass: 1,
            rebuilt: 2,
            remaining: 0,
        });
        sink.on_phase_end(&PhaseEndEvent {
            frame_count: 1,
            phase: PhaseKind::Build,
            timestamp: HostTime(1_005_000),
        });

        let events = export_to_json(&sink);
        assert_eq!(events.len(), 4, "one JSON event per record");
        assert_eq!(events[0]["name"], "vsync");
        assert_eq!(events[0]["ts"], 1000.0);
        assert_eq!(events[1]["ph"], "B");
        assert_eq!(events[1]["name"], "build");
        assert_eq!(events[1]["ts"], 1002.0);
        assert_eq!(events[2]["ph"], "i");
        assert_eq!(events[2]["ts"], 1002.0, "instant sits at the last timestamp");
        assert_eq!(events[2]["args"]["rebuilt"], 2);
        assert_eq!(events[3]["ph"], "E");
        assert_eq!(events[3]["ts"], 1005.0);
    }

    #[test]
    fn summary_lists_every_phase() {
        let mut phase_nanos = [0; PhaseKind::COUNT];
        phase_nanos[PhaseKind::Touch.index()] = 3_000;
        let mut sink = RecorderSink::new();
        sink.on_frame_summary(&FrameSummary {
            frame_count: 5,
            timestamp: HostTime(0),
            phase_nanos,
            rebuild_passes: 1,
            rebuilt: 1,
            laid_out: 0,
            rendered: 0,
            carried_over: false,
        });

        let events = export_to_json(&sink);
        let args = &events[0]["args"];
        assert_eq!(args["touch_us"], 3.0);
        for phase in PhaseKind::ALL {
            assert!(
                args.get(format!("{}_us", phase.name())).is_some(),
                "missing {}",
                phase.name()
            );
        }
        assert_eq!(args["carried_over"], false);
    }
}
