//! End-to-end behaviour of `SyslogTransport` against an in-process collector.

use std::{collections::HashSet, fs, io::Write, time::Duration};

use femtosyslog::{Facility, LogHandle, SyslogTransport, TransportConfig, TransportError};
use rstest::rstest;
use tempfile::TempDir;

mod test_utils;
use test_utils::{Collector, WAIT, collector, config_in, dead_addr, spill_dir, spilled_lines};

const INFO: i32 = 6;

fn dial(addr: &str, config: TransportConfig) -> SyslogTransport {
    SyslogTransport::dial_with_config("tcp", addr, INFO, config).expect("dial transport")
}

#[rstest]
fn full_batch_is_written_in_arrival_order(collector: Collector, spill_dir: TempDir) {
    let config = config_in(&spill_dir)
        .with_batch_size(3)
        .with_linger(Duration::from_secs(3600));
    let transport = dial(&collector.addr(), config);
    for msg in ["first", "second", "third"] {
        transport.write_string(msg).expect("write");
    }

    assert_eq!(
        collector.wait_for_lines(3, WAIT),
        ["<134>first", "<134>second", "<134>third"]
    );
    transport.close();
    assert_eq!(transport.stats().batches_sent, 1);
}

#[rstest]
fn close_flushes_partial_batch(collector: Collector, spill_dir: TempDir) {
    let config = config_in(&spill_dir)
        .with_batch_size(2)
        .with_linger(Duration::from_secs(3600));
    let transport = dial(&collector.addr(), config);
    for msg in ["a", "b", "c"] {
        transport.write_string(msg).expect("write");
    }

    assert_eq!(collector.wait_for_lines(2, WAIT), ["<134>a", "<134>b"]);
    transport.close();

    let mut lines = collector.wait_for_lines(3, WAIT);
    lines.sort();
    assert_eq!(lines, ["<134>a", "<134>b", "<134>c"]);
    assert!(spilled_lines(spill_dir.path()).is_empty());
}

#[rstest]
fn unreachable_collector_spills_every_message_once(spill_dir: TempDir) {
    let transport = dial(&dead_addr(), config_in(&spill_dir).with_batch_size(4));
    let expected: Vec<String> = (0..25).map(|i| format!("<134>message {i:02}")).collect();
    for i in 0..25 {
        transport.write_string(&format!("message {i:02}")).expect("write");
    }
    transport.close();

    assert_eq!(spilled_lines(spill_dir.path()), expected);
    let stats = transport.stats();
    assert_eq!(stats.accepted, 25);
    assert_eq!(stats.batches_sent, 0);
    assert_eq!(stats.batches_lost, 0);
    assert_eq!(stats.in_flight, 0);
}

#[rstest]
fn stored_batches_are_replayed_to_a_live_collector(collector: Collector, spill_dir: TempDir) {
    fs::write(spill_dir.path().join("1"), b"<134>from disk\n").expect("seed overflow file");
    let transport = dial(&collector.addr(), config_in(&spill_dir));

    assert_eq!(collector.wait_for_lines(1, WAIT), ["<134>from disk"]);
    transport.close();
    assert!(spilled_lines(spill_dir.path()).is_empty());
    assert_eq!(transport.stats().batches_replayed, 1);
}

#[rstest]
fn concurrent_sends_never_exceed_limit(collector: Collector, spill_dir: TempDir) {
    let config = config_in(&spill_dir).with_batch_size(1).with_max_in_flight(2);
    let transport = dial(&collector.addr(), config);
    for i in 0..200 {
        transport.write_string(&format!("{i:03}")).expect("write");
    }
    transport.close();

    let stats = transport.stats();
    assert!(stats.peak_in_flight <= 2, "peak was {}", stats.peak_in_flight);
    assert_eq!(stats.in_flight, 0);

    let spilled = spilled_lines(spill_dir.path());
    let delivered = collector.wait_for_lines(200 - spilled.len(), WAIT);
    let seen: HashSet<String> = delivered.into_iter().chain(spilled).collect();
    assert_eq!(seen.len(), 200);
}

#[rstest]
#[case("udp")]
#[case("unix")]
#[case("TCP")]
fn dial_rejects_other_networks(spill_dir: TempDir, #[case] network: &str) {
    let config = config_in(&spill_dir);
    let err = SyslogTransport::dial_with_config(network, &dead_addr(), INFO, config)
        .expect_err("network must be rejected");
    assert!(matches!(err, TransportError::UnsupportedNetwork(ref n) if n == network));
}

#[rstest]
#[case(-1)]
#[case(8)]
fn dial_rejects_out_of_range_severity(spill_dir: TempDir, #[case] severity: i32) {
    let config = config_in(&spill_dir);
    let err = SyslogTransport::dial_with_config("tcp", &dead_addr(), severity, config)
        .expect_err("severity must be rejected");
    assert!(matches!(err, TransportError::InvalidPriority(s) if s == severity));
}

#[rstest]
fn dial_rejects_invalid_config(spill_dir: TempDir) {
    let err = SyslogTransport::dial_with_config(
        "tcp",
        &dead_addr(),
        INFO,
        config_in(&spill_dir).with_batch_size(0),
    )
    .expect_err("zero batch size must be rejected");
    assert!(matches!(err, TransportError::InvalidConfig(_)));
}

#[rstest]
fn dial_fails_when_overflow_dir_cannot_be_created(spill_dir: TempDir) {
    let blocker = spill_dir.path().join("file");
    fs::write(&blocker, b"").expect("create blocking file");
    let config = config_in(&spill_dir).with_overflow_dir(blocker.join("overflow"));

    let err = SyslogTransport::dial_with_config("tcp", &dead_addr(), INFO, config)
        .expect_err("overflow dir must be rejected");
    assert!(matches!(err, TransportError::OverflowDir { .. }));
}

#[rstest]
fn writes_after_close_are_rejected(spill_dir: TempDir) {
    let transport = dial(&dead_addr(), config_in(&spill_dir));
    transport.close();
    transport.close();

    assert!(transport.is_closed());
    assert!(matches!(
        transport.write_string("late"),
        Err(TransportError::Closed)
    ));
    let err = (&transport).write(b"late").expect_err("io write after close");
    assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
}

#[rstest]
#[case("abc", 4)]
#[case("abc\n", 4)]
#[case("", 1)]
fn write_string_reports_terminated_length(
    spill_dir: TempDir,
    #[case] message: &str,
    #[case] expected: usize,
) {
    let transport = dial(&dead_addr(), config_in(&spill_dir));
    assert_eq!(transport.write_string(message).expect("write"), expected);
}

#[rstest]
fn facility_and_severity_form_the_prefix(collector: Collector, spill_dir: TempDir) {
    let config = config_in(&spill_dir).with_facility(Facility::User);
    let transport = SyslogTransport::dial_with_config("tcp", &collector.addr(), 3, config)
        .expect("dial transport");
    assert_eq!(transport.priority().code(), 11);

    transport.write_string("disk full").expect("write");
    assert_eq!(collector.wait_for_lines(1, WAIT), ["<11>disk full"]);
}

#[rstest]
fn io_write_and_log_handle_share_the_buffer(collector: Collector, spill_dir: TempDir) {
    let transport = dial(&collector.addr(), config_in(&spill_dir));
    (&transport).write_all(b"via io\n").expect("io write");
    let handle: &dyn LogHandle = &transport;
    handle.write_string("via handle").expect("handle write");
    handle.close().expect("close");

    let mut lines = collector.wait_for_lines(2, WAIT);
    lines.sort();
    assert_eq!(lines, ["<134>via handle", "<134>via io"]);
}

#[rstest]
fn dropping_the_transport_flushes_it(spill_dir: TempDir) {
    {
        let config = config_in(&spill_dir).with_linger(Duration::from_secs(3600));
        let transport = dial(&dead_addr(), config);
        transport.write_string("kept").expect("write");
    }
    assert_eq!(spilled_lines(spill_dir.path()), ["<134>kept"]);
}
