//! Aggregation scenarios and invariants.

use std::cell::Cell;
use std::io;

use crate::common::{both, gather, mixed_snapshot, reference_snapshot};
use netstat::{
    Collector, Config, Connection, CountTable, Error, Label, MemorySink, Record, Report, Result,
    Scope, Sink, StaticSource, from_fn,
};

fn only(table: &CountTable, expected: &[(Label, u64)]) {
    for (label, count) in table.iter() {
        let want = expected
            .iter()
            .find(|(l, _)| *l == label)
            .map_or(0, |(_, c)| *c);
        assert_eq!(count, want, "{}", label);
    }
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_scenario_total() {
    let sink = gather(reference_snapshot(), Config::default());
    assert_eq!(sink.records().len(), 1);

    let record = sink.global().unwrap();
    assert!(record.tags().is_empty());
    only(
        &record.counts,
        &[(Label::Established, 2), (Label::UdpSocket, 1)],
    );
}

#[test]
fn test_scenario_per_remote() {
    let config = Config {
        emit_total: false,
        emit_per_remote: true,
        remote_allow_list: None,
    };
    let sink = gather(reference_snapshot(), config);
    assert_eq!(sink.records().len(), 2);
    assert!(sink.global().is_none());

    let https = sink.remote("10.0.0.1:443").unwrap();
    assert_eq!(https.tags().get("remoteAddr"), Some(&"10.0.0.1:443"));
    only(&https.counts, &[(Label::Established, 2)]);

    let dns = sink.remote("10.0.0.2:53").unwrap();
    only(&dns.counts, &[(Label::UdpSocket, 1)]);
}

#[test]
fn test_scenario_allow_list() {
    let config = Config {
        remote_allow_list: Some(vec!["10.0.0.2:53".into()]),
        ..Default::default()
    };
    let sink = gather(reference_snapshot(), config);
    assert_eq!(sink.records().len(), 1);
    only(&sink.global().unwrap().counts, &[(Label::UdpSocket, 1)]);
}

#[test]
fn test_scenario_empty_snapshot() {
    for config in [Config::default(), both()] {
        let sink = gather(Vec::new(), config);
        for record in sink.records() {
            assert!(record.counts.is_empty());
            assert_eq!(record.counts.iter().count(), Label::COUNT);
        }
    }

    // Per-remote only: no remotes seen, nothing emitted.
    let config = Config {
        emit_total: false,
        emit_per_remote: true,
        remote_allow_list: None,
    };
    assert!(gather(Vec::new(), config).records().is_empty());
}

#[test]
fn test_noop_config_emits_nothing() {
    let config = Config {
        emit_total: false,
        emit_per_remote: false,
        remote_allow_list: None,
    };
    let sink = gather(reference_snapshot(), config);
    assert!(sink.records().is_empty());
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_every_table_reports_every_label() {
    let sink = gather(mixed_snapshot(), both());
    assert!(!sink.records().is_empty());
    for record in sink.records() {
        let names: Vec<_> = record.counts.metrics().map(|(n, _)| n).collect();
        assert_eq!(names.len(), Label::COUNT);
        for label in Label::ALL {
            assert!(names.contains(&label.metric_name()));
        }
    }
}

#[test]
fn test_datagram_counts_only_as_udp() {
    let snapshot = vec![
        Connection::datagram("10.0.0.2", 53),
        Connection::datagram("10.0.0.2", 53),
    ];
    let sink = gather(snapshot, both());
    for record in sink.records() {
        only(&record.counts, &[(Label::UdpSocket, 2)]);
    }
}

#[test]
fn test_total_equals_sum_of_remotes() {
    for config in [
        both(),
        Config {
            remote_allow_list: Some(vec!["10.0.0.1:443".into(), "::1:9000".into()]),
            ..both()
        },
    ] {
        let report = Report::from_connections(&mixed_snapshot(), &config);
        let total = report.total.unwrap();
        assert_eq!(report.per_remote_sum(), total);
    }
}

#[test]
fn test_allow_list_excludes_everywhere() {
    let config = Config {
        remote_allow_list: Some(vec!["192.168.1.5:5432".into()]),
        ..both()
    };
    let sink = gather(mixed_snapshot(), config);

    let remotes: Vec<_> = sink
        .records()
        .iter()
        .filter_map(|r| r.scope.remote())
        .map(|k| k.as_str())
        .collect();
    assert_eq!(remotes, ["192.168.1.5:5432"]);

    only(
        &sink.global().unwrap().counts,
        &[
            (Label::CloseWait, 1),
            (Label::LastAck, 1),
            (Label::Closing, 1),
        ],
    );
}

#[test]
fn test_empty_allow_list_counts_everything() {
    let config = Config {
        remote_allow_list: Some(Vec::new()),
        ..Default::default()
    };
    let sink = gather(mixed_snapshot(), config);
    let total = &sink.global().unwrap().counts;
    assert_eq!(total.total(), mixed_snapshot().len() as u64);
}

#[test]
fn test_unrecognized_states_count_as_none() {
    let sink = gather(mixed_snapshot(), both());
    let total = &sink.global().unwrap().counts;
    // NONE, BOUND_INACTIVE and the empty state.
    assert_eq!(total[Label::Unknown], 3);
    assert_eq!(total[Label::Listen], 2);
    assert_eq!(total[Label::UdpSocket], 3);
    assert_eq!(total.total(), mixed_snapshot().len() as u64);

    let odd = sink.remote(":-1").unwrap();
    only(&odd.counts, &[(Label::Unknown, 1)]);
}

#[test]
fn test_identical_snapshots_identical_records() {
    let first = gather(mixed_snapshot(), both());
    let mut reversed = mixed_snapshot();
    reversed.reverse();
    let second = gather(reversed, both());
    assert_eq!(first.records(), second.records());
}

#[test]
fn test_global_record_is_last() {
    let sink = gather(mixed_snapshot(), both());
    let last = sink.records().last().unwrap();
    assert_eq!(last.scope, Scope::Global);
    assert_eq!(
        sink.records()
            .iter()
            .filter(|r| r.scope == Scope::Global)
            .count(),
        1
    );
}

// ============================================================================
// Failure handling
// ============================================================================

#[test]
fn test_source_failure_emits_nothing() {
    let source = from_fn(|| {
        Err(Error::source_unavailable(
            "listing connections",
            io::Error::from(io::ErrorKind::PermissionDenied),
        ))
    });
    let collector = Collector::new(source, both());
    let mut sink = MemorySink::new();

    let err = collector.gather(&mut sink).unwrap_err();
    assert!(err.is_source_unavailable());
    assert!(err.is_permission_denied());
    assert!(err.to_string().contains("listing connections"));
    assert!(sink.records().is_empty());
}

#[test]
fn test_failed_cycle_does_not_affect_next() {
    let calls = Cell::new(0);
    let source = from_fn(|| {
        calls.set(calls.get() + 1);
        if calls.get() == 1 {
            Err(Error::source_unavailable("listing", "transient"))
        } else {
            Ok(reference_snapshot())
        }
    });
    let collector = Collector::new(source, Config::default());
    let mut sink = MemorySink::new();

    assert!(collector.gather(&mut sink).is_err());
    assert_eq!(collector.gather(&mut sink).unwrap(), 1);
    only(
        &sink.global().unwrap().counts,
        &[(Label::Established, 2), (Label::UdpSocket, 1)],
    );
}

struct FailingSink {
    accepted: usize,
    limit: usize,
}

impl Sink for FailingSink {
    fn emit(&mut self, _record: &Record) -> Result<()> {
        if self.accepted == self.limit {
            return Err(Error::sink(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        self.accepted += 1;
        Ok(())
    }
}

#[test]
fn test_sink_failure_stops_cycle() {
    let collector = Collector::new(StaticSource::new(reference_snapshot()), both());
    let mut sink = FailingSink {
        accepted: 0,
        limit: 1,
    };
    let err = collector.gather(&mut sink).unwrap_err();
    assert!(matches!(err, Error::Sink { .. }));
    assert_eq!(sink.accepted, 1);
}
