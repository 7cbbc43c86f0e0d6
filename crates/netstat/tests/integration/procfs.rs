//! End-to-end cycles over fixture procfs tables.

use std::net::Ipv4Addr;

use crate::common::{ProcFixture, both};
use netstat::{Collector, Config, Label, LineProtocolSink, MemorySink, ProcNetSource, SnapshotSource};

const ESTABLISHED: u8 = 0x01;
const TIME_WAIT: u8 = 0x06;
const CLOSE: u8 = 0x07;
const LISTEN: u8 = 0x0A;

fn remote() -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, 1)
}

#[test]
fn test_procfs_cycle() {
    let fixture = ProcFixture::new();
    fixture.write(
        "tcp",
        &[
            (remote(), 443, ESTABLISHED),
            (remote(), 443, ESTABLISHED),
            (remote(), 443, TIME_WAIT),
            (Ipv4Addr::UNSPECIFIED, 0, LISTEN),
        ],
    );
    fixture.write("udp", &[(Ipv4Addr::new(10, 0, 0, 2), 53, CLOSE)]);

    let collector = Collector::new(ProcNetSource::with_root(fixture.path()), both());
    let mut sink = MemorySink::new();
    assert_eq!(collector.gather(&mut sink).unwrap(), 4);

    let total = &sink.global().unwrap().counts;
    assert_eq!(total[Label::Established], 2);
    assert_eq!(total[Label::TimeWait], 1);
    assert_eq!(total[Label::Listen], 1);
    assert_eq!(total[Label::UdpSocket], 1);
    assert_eq!(total[Label::Close], 0);

    let https = &sink.remote("10.0.0.1:443").unwrap().counts;
    assert_eq!(https[Label::Established], 2);
    assert_eq!(https[Label::TimeWait], 1);

    assert!(sink.remote("0.0.0.0:0").is_some());
    assert!(sink.remote("10.0.0.2:53").is_some());
}

#[test]
fn test_procfs_ipv6_tables_are_read() {
    let fixture = ProcFixture::new();
    fixture.write_raw(
        "tcp6",
        "  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n   0: 00000000000000000000000001000000:1F90 00000000000000000000000001000000:D431 01 00000000:00000000 00:00000000 00000000  1000        0 777 1 0000000000000000 20 4 30 10 -1\n",
    );

    let conns = ProcNetSource::with_root(fixture.path())
        .connections()
        .unwrap();
    assert_eq!(conns.len(), 1);
    assert_eq!(conns[0].remote_key().as_str(), "::1:54321");
}

#[test]
fn test_procfs_missing_ipv6_tables() {
    let fixture = ProcFixture::new();
    fixture.write("tcp", &[(remote(), 22, ESTABLISHED)]);

    let sink = {
        let collector = Collector::new(ProcNetSource::with_root(fixture.path()), Config::default());
        let mut sink = MemorySink::new();
        collector.gather(&mut sink).unwrap();
        sink
    };
    assert_eq!(sink.global().unwrap().counts[Label::Established], 1);
}

#[test]
fn test_procfs_missing_tcp_fails_cycle() {
    let fixture = ProcFixture::new();
    fixture.remove("tcp");

    let collector = Collector::new(ProcNetSource::with_root(fixture.path()), Config::default());
    let mut sink = MemorySink::new();
    let err = collector.gather(&mut sink).unwrap_err();
    assert!(err.is_source_unavailable());
    assert!(err.is_not_found());
    assert!(sink.records().is_empty());
}

#[test]
fn test_procfs_unknown_state_code() {
    let fixture = ProcFixture::new();
    fixture.write("tcp", &[(remote(), 443, 0x0F)]);

    let collector = Collector::new(ProcNetSource::with_root(fixture.path()), Config::default());
    let mut sink = MemorySink::new();
    collector.gather(&mut sink).unwrap();
    assert_eq!(sink.global().unwrap().counts[Label::Unknown], 1);
}

#[test]
fn test_procfs_to_line_protocol() {
    let fixture = ProcFixture::new();
    fixture.write("tcp", &[(remote(), 443, ESTABLISHED)]);

    let config = Config {
        emit_total: false,
        emit_per_remote: true,
        remote_allow_list: Some(vec!["10.0.0.1:443".into()]),
    };
    let collector = Collector::new(ProcNetSource::with_root(fixture.path()), config);
    let mut sink = LineProtocolSink::new(Vec::new());
    collector.gather(&mut sink).unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("netstat,remoteAddr=10.0.0.1:443 tcp_established=1i,"));
}

#[test]
fn test_procfs_ipv4_mapped_clients_share_ipv4_key() {
    let fixture = ProcFixture::new();
    fixture.write("tcp", &[(remote(), 443, ESTABLISHED)]);
    // ::ffff:10.0.0.1 port 443, as seen on a dual-stack listener.
    fixture.write_raw(
        "tcp6",
        "  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n   0: 00000000000000000000000000000000:1F90 0000000000000000FFFF00000100000A:01BB 01 00000000:00000000 00:00000000 00000000  1000        0 778 1 0000000000000000 20 4 30 10 -1\n",
    );

    let config = Config {
        emit_total: true,
        emit_per_remote: true,
        remote_allow_list: Some(vec!["10.0.0.1:443".into()]),
    };
    let collector = Collector::new(ProcNetSource::with_root(fixture.path()), config);
    let mut sink = MemorySink::new();
    assert_eq!(collector.gather(&mut sink).unwrap(), 2);

    assert_eq!(sink.remote("10.0.0.1:443").unwrap().counts[Label::Established], 2);
    assert_eq!(sink.global().unwrap().counts[Label::Established], 2);
}
