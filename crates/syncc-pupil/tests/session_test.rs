// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Session setup and procedure round trips against loopback capture hosts

mod common;

use common::FakeCapture;
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use syncc_config::{Endpoint, NetworkProfile, Role, SynccConfig, TimeoutsConfig};
use syncc_pupil::message::decode;
use syncc_pupil::{
    open_session, probe_endpoint, CalibrationDecision, CalibrationResult, DecisionSource,
    PupilError, PupilResult, RetryDecision, Session, Trigger,
};
use syncc_transports::Transport;

fn test_timeouts() -> TimeoutsConfig {
    TimeoutsConfig {
        probe_ms: 500,
        control_reply_ms: 2000,
        publish_ms: 500,
        telemetry_ms: 5000,
    }
}

fn config_for(master: &FakeCapture, slave: &FakeCapture) -> SynccConfig {
    let mut config = SynccConfig::default();
    config.network.profile = "loopback".to_string();
    config.network.profiles.insert(
        "loopback".to_string(),
        NetworkProfile {
            master: "127.0.0.1".to_string(),
            slave: "127.0.0.1".to_string(),
        },
    );
    config.network.master_port = master.control_port;
    config.network.slave_port = slave.control_port;
    config.timeouts = test_timeouts();
    config.clock.sync_offset = 0.0;
    config
}

struct Answers(Vec<RetryDecision>);

impl DecisionSource for Answers {
    fn await_decision(&mut self, _result: &CalibrationResult) -> PupilResult<RetryDecision> {
        if self.0.is_empty() {
            return Err(PupilError::DecisionInputClosed);
        }
        Ok(self.0.remove(0))
    }
}

/// Port discovery is exactly PUB_PORT then SUB_PORT, and the bus channels
/// connect to the announced ports
#[test]
fn test_open_session_discovers_ports_in_order() {
    let barrier = Arc::new(Barrier::new(2));
    let barrier_server = Arc::clone(&barrier);
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let responder_handle = thread::spawn(move || {
        let context = zmq::Context::new();
        let responder = context.socket(zmq::REP).unwrap();
        responder.bind(&format!("tcp://127.0.0.1:{}", port)).unwrap();
        barrier_server.wait();

        let mut seen = Vec::new();
        for reply in ["5556", "5557"] {
            let frames = responder.recv_multipart(0).unwrap();
            seen.push(String::from_utf8(frames[0].clone()).unwrap());
            responder.send(reply, 0).unwrap();
        }
        seen
    });

    barrier.wait();
    let endpoint = Endpoint::new(Role::Master, "127.0.0.1", port);
    let mut link = open_session(&endpoint, &test_timeouts()).unwrap();

    assert_eq!(responder_handle.join().unwrap(), vec!["PUB_PORT", "SUB_PORT"]);
    assert_eq!(link.pub_port(), 5556);
    assert_eq!(link.sub_port(), 5557);
    assert!(link.publisher().address().ends_with(":5556"));
    assert!(link.subscriber().address().ends_with(":5557"));
    assert!(link.subscriber().is_running());

    link.close();
    assert!(link.is_closed());
    assert!(!link.publisher().is_running());
    link.close();
}

#[test]
fn test_malformed_port_reply_fails_session() {
    let capture_port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let responder_handle = thread::spawn(move || {
        let context = zmq::Context::new();
        let responder = context.socket(zmq::REP).unwrap();
        responder.bind(&format!("tcp://127.0.0.1:{}", capture_port)).unwrap();
        responder.set_rcvtimeo(3000).unwrap();
        if responder.recv_multipart(0).is_ok() {
            responder.send("no such command", 0).unwrap();
        }
    });

    thread::sleep(Duration::from_millis(100));
    let endpoint = Endpoint::new(Role::Slave, "127.0.0.1", capture_port);
    let result = open_session(&endpoint, &test_timeouts());

    match result {
        Err(PupilError::Malformed { request, reply }) => {
            assert_eq!(request, "PUB_PORT");
            assert_eq!(reply, "no such command");
        }
        Err(other) => panic!("expected Malformed, got {:?}", other),
        Ok(_) => panic!("expected Malformed, got a session"),
    }
    responder_handle.join().unwrap();
}

#[test]
fn test_probe_unreachable_host_names_role() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let endpoint = Endpoint::new(Role::Slave, "127.0.0.1", port);

    match probe_endpoint(&endpoint, Duration::from_millis(300)) {
        Err(PupilError::Unreachable { role, address, .. }) => {
            assert_eq!(role, Role::Slave);
            assert_eq!(address, format!("127.0.0.1:{}", port));
        }
        other => panic!("expected Unreachable, got {:?}", other),
    }
}

#[test]
fn test_session_connect_fails_when_slave_missing() {
    let master = FakeCapture::start(10.0, vec![]);
    let mut config = SynccConfig::default();
    config.network.profile = "loopback".to_string();
    config.network.profiles.insert(
        "loopback".to_string(),
        NetworkProfile {
            master: "127.0.0.1".to_string(),
            slave: "127.0.0.1".to_string(),
        },
    );
    config.network.master_port = master.control_port;
    config.network.slave_port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    config.timeouts = test_timeouts();

    match Session::connect(&config) {
        Err(PupilError::Unreachable { role, .. }) => assert_eq!(role, Role::Slave),
        Err(other) => panic!("expected Unreachable, got {:?}", other),
        Ok(_) => panic!("slave should be unreachable"),
    }
}

/// Setup order: safety stop, plugins, round trip, clock reset
#[test]
fn test_establish_prepares_both_hosts() {
    let master = FakeCapture::start(100.5, vec![]);
    let slave = FakeCapture::start(7.0, vec![]);
    let config = config_for(&master, &slave);

    let mut session = Session::establish(&config).unwrap();

    assert_eq!(
        master.request_log(),
        vec![
            "PUB_PORT",
            "SUB_PORT",
            "notify.recording.should_stop|<bin>",
            "notify.start_plugin|<bin>",
            "notify.start_plugin|<bin>",
            "notify.start_plugin|<bin>",
            "notify.start_plugin|<bin>",
            "t",
            "T 0.0",
        ]
    );
    assert_eq!(
        slave.request_log(),
        vec![
            "PUB_PORT",
            "SUB_PORT",
            "notify.recording.should_stop|<bin>",
            "notify.start_plugin|<bin>",
            "notify.start_plugin|<bin>",
            "notify.start_plugin|<bin>",
            "notify.start_plugin|<bin>",
            "T 0.0",
        ]
    );

    // Slave plugins carry the slave arguments
    let time_sync = &slave.raw_requests()[4];
    #[derive(serde::Deserialize)]
    struct StartPlugin {
        subject: String,
        name: String,
        args: BTreeMap<String, syncc_config::PluginArg>,
    }
    let payload: StartPlugin = decode(&time_sync[1]).unwrap();
    assert_eq!(payload.subject, "start_plugin");
    assert_eq!(payload.name, "Time_Sync");
    assert_eq!(
        payload.args["node_name"],
        syncc_config::PluginArg::Text("sync_slave".to_string())
    );

    session.close();
    assert!(session.is_closed());
}

#[test]
fn test_annotations_reach_both_hosts_with_master_time() {
    let master = FakeCapture::start(4321.25, vec![]);
    let slave = FakeCapture::start(1.0, vec![]);
    let config = config_for(&master, &slave);
    let session = Session::connect(&config).unwrap();

    // Let the publish channels finish connecting
    thread::sleep(Duration::from_millis(200));

    let trigger = session.annotate("start_m1").unwrap();
    assert_eq!(trigger.timestamp, 4321.25);

    let on_master = master.wait_for_annotations(1, Duration::from_secs(2));
    let on_slave = slave.wait_for_annotations(1, Duration::from_secs(2));
    assert_eq!(on_master.len(), 1);
    assert_eq!(on_master, on_slave);
    assert_eq!(on_master[0].0, b"annotation");

    let received: Trigger = decode(&on_master[0].1).unwrap();
    assert_eq!(received, trigger);
    assert!(slave.request_log().iter().all(|r| r != "t"));
}

#[test]
fn test_recording_control_master_then_slave() {
    let master = FakeCapture::start(1.0, vec![]);
    let slave = FakeCapture::start(1.0, vec![]);
    let config = config_for(&master, &slave);
    let session = Session::connect(&config).unwrap();

    session.start_recording("2025_03_14_et_0915_123456").unwrap();
    session.stop_recording().unwrap();

    for host in [&master, &slave] {
        let requests = host.raw_requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[2][0], b"notify.recording.should_start");
        let payload: BTreeMap<String, String> = decode(&requests[2][1]).unwrap();
        assert_eq!(payload["session_name"], "2025_03_14_et_0915_123456");
        assert_eq!(payload["remote_notify"], "all");
        assert_eq!(requests[3], vec![b"r".to_vec()]);
    }
}

#[test]
fn test_calibration_retry_over_the_wire() {
    let master = FakeCapture::start(1.0, vec![]);
    let slave = FakeCapture::start(1.0, vec![(0.9, 0.05), (0.35, 0.04)]);
    let config = config_for(&master, &slave);
    let session = Session::connect(&config).unwrap();

    // Subscriptions must reach the host before telemetry is published
    thread::sleep(Duration::from_millis(200));

    let mut operator = Answers(vec![RetryDecision::Retry]);
    let outcome = session.calibrate(Role::Slave, &mut operator).unwrap();

    assert_eq!(outcome.decision, CalibrationDecision::Accepted);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.result.accuracy, 0.35);
    assert_eq!(outcome.result.precision, 0.04);
    assert!(operator.0.is_empty());
    assert_eq!(
        slave.request_log().iter().filter(|r| *r == "C").count(),
        2
    );
    assert!(master.request_log().iter().all(|r| r != "C"));
}

#[test]
fn test_close_is_idempotent() {
    let master = FakeCapture::start(1.0, vec![]);
    let slave = FakeCapture::start(1.0, vec![]);
    let config = config_for(&master, &slave);
    let mut session = Session::connect(&config).unwrap();

    session.close();
    assert!(session.is_closed());
    assert!(!session.master().control().client().is_running());
    assert!(!session.slave().subscriber().is_running());

    session.close();
    assert!(session.is_closed());
}
