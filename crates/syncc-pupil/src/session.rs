// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Session lifecycle for the master/slave pair of capture hosts
//!
//! A [`HostLink`] owns the three channels to one host and the ZMQ context
//! they share. A [`Session`] owns both links; nothing else keeps channel
//! handles, except the calibration monitor which borrows a subscribe
//! channel for one run.

use std::sync::Arc;
use std::time::Duration;
use syncc_config::{Endpoint, Role, SynccConfig, TimeoutsConfig};
use syncc_transports::prelude::*;
use tracing::{debug, info, warn};

use crate::annotation::send_annotation;
use crate::calibration::{CalibrationMonitor, CalibrationOutcome, CalibrationPolicy, DecisionSource};
use crate::control::{ControlChannel, PortKind};
use crate::error::{PupilError, PupilResult};
use crate::message::{Notification, Trigger, LOGGING_TOPIC};

/// Check that a capture host accepts connections on its control port
pub fn probe_endpoint(endpoint: &Endpoint, timeout: Duration) -> PupilResult<()> {
    match probe(&endpoint.address, endpoint.port, timeout) {
        Ok(()) => {
            info!(
                "[{}] Found Pupil Capture at {}:{}",
                endpoint.role, endpoint.address, endpoint.port
            );
            Ok(())
        }
        Err(TransportError::Unreachable { address, reason }) => Err(PupilError::Unreachable {
            role: endpoint.role,
            address,
            reason,
        }),
        Err(other) => Err(other.into()),
    }
}

/// Open the control channel, learn the host's bus ports (`PUB_PORT` then
/// `SUB_PORT`), and connect the publish and subscribe channels to them.
///
/// The subscribe channel is filtered to the `logging` topic.
pub fn open_session(endpoint: &Endpoint, timeouts: &TimeoutsConfig) -> PupilResult<HostLink> {
    let context = Arc::new(zmq::Context::new());

    let mut req = ZmqReq::new(
        Arc::clone(&context),
        ClientConfig::new(endpoint.control_address()),
    )?;
    req.start()?;
    let control = ControlChannel::new(req, endpoint.role, timeouts.control_reply_ms);

    let pub_port = control.query_port(PortKind::Publish)?;
    let sub_port = control.query_port(PortKind::Subscribe)?;
    debug!(
        "[{}] Bus ports: publish {} subscribe {}",
        endpoint.role, pub_port, sub_port
    );

    let mut publisher = ZmqPub::new(
        Arc::clone(&context),
        ClientConfig::new(endpoint.tcp_address(pub_port)).with_timeout_ms(timeouts.publish_ms),
    )?;
    publisher.start()?;

    let mut subscriber = ZmqSub::new(
        Arc::clone(&context),
        ClientConfig::new(endpoint.tcp_address(sub_port)),
    )?;
    subscriber.start()?;
    subscriber.subscribe(LOGGING_TOPIC.as_bytes())?;

    Ok(HostLink {
        endpoint: endpoint.clone(),
        context: Some(context),
        control,
        publisher,
        subscriber,
        pub_port,
        sub_port,
    })
}

/// The three channels to one capture host
pub struct HostLink {
    endpoint: Endpoint,
    context: Option<Arc<zmq::Context>>,
    control: ControlChannel<ZmqReq>,
    publisher: ZmqPub,
    subscriber: ZmqSub,
    pub_port: u16,
    sub_port: u16,
}

impl HostLink {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn role(&self) -> Role {
        self.endpoint.role
    }

    pub fn control(&self) -> &ControlChannel<ZmqReq> {
        &self.control
    }

    pub fn publisher(&self) -> &ZmqPub {
        &self.publisher
    }

    pub fn subscriber(&self) -> &ZmqSub {
        &self.subscriber
    }

    /// Port the host subscribes on (our publish channel)
    pub fn pub_port(&self) -> u16 {
        self.pub_port
    }

    /// Port the host publishes on (our subscribe channel)
    pub fn sub_port(&self) -> u16 {
        self.sub_port
    }

    pub fn is_closed(&self) -> bool {
        self.context.is_none()
    }

    /// Close every channel and release the context. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.context.is_none() {
            return;
        }

        let role = self.endpoint.role;
        if let Err(e) = self.subscriber.stop() {
            warn!("[{}] Failed to close subscribe channel: {}", role, e);
        }
        if let Err(e) = self.publisher.stop() {
            warn!("[{}] Failed to close publish channel: {}", role, e);
        }
        if let Err(e) = self.control.client_mut().stop() {
            warn!("[{}] Failed to close control channel: {}", role, e);
        }
        self.context = None;

        info!("[{}] Session closed", role);
    }
}

impl Drop for HostLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Probe a host, then open its channels
pub fn connect_host(endpoint: &Endpoint, timeouts: &TimeoutsConfig) -> PupilResult<HostLink> {
    probe_endpoint(endpoint, Duration::from_millis(timeouts.probe_ms))?;
    open_session(endpoint, timeouts)
}

/// Both capture hosts, connected and ready for the procedure.
///
/// Dropping a session closes both links.
pub struct Session {
    master: HostLink,
    slave: HostLink,
    policy: CalibrationPolicy,
    telemetry_timeout_ms: u64,
}

impl Session {
    /// Connect to both hosts without touching their state
    pub fn connect(config: &SynccConfig) -> PupilResult<Self> {
        let (master_endpoint, slave_endpoint) = config.endpoints()?;

        let master = connect_host(&master_endpoint, &config.timeouts)?;
        let slave = connect_host(&slave_endpoint, &config.timeouts)?;

        Ok(Self {
            master,
            slave,
            policy: CalibrationPolicy::from(&config.calibration),
            telemetry_timeout_ms: config.timeouts.telemetry_ms,
        })
    }

    /// Connect to both hosts and prepare them for recording
    pub fn establish(config: &SynccConfig) -> PupilResult<Self> {
        let session = Self::connect(config)?;
        session.prepare(config)?;
        Ok(session)
    }

    /// Stop any running recording, start the configured plugins, measure the
    /// control round trip and reset both clocks
    pub fn prepare(&self, config: &SynccConfig) -> PupilResult<()> {
        for link in self.links() {
            link.control.notify(&Notification::stop_recording())?;
        }

        for link in self.links() {
            for plugin in config.plugins_for(link.role()) {
                link.control.notify(&Notification::start_plugin(plugin))?;
            }
        }

        let delay = self.master.control.round_trip_delay()?;
        info!("[{}] Round trip command delay: {:?}", Role::Master, delay);

        for link in self.links() {
            let reply = link.control.set_time(config.clock.sync_offset)?;
            info!("[{}] Time sync: {}", link.role(), reply);
        }

        Ok(())
    }

    pub fn master(&self) -> &HostLink {
        &self.master
    }

    pub fn slave(&self) -> &HostLink {
        &self.slave
    }

    pub fn host(&self, role: Role) -> &HostLink {
        match role {
            Role::Master => &self.master,
            Role::Slave => &self.slave,
        }
    }

    /// Master first
    fn links(&self) -> [&HostLink; 2] {
        [&self.master, &self.slave]
    }

    /// Start recording on master, then slave
    pub fn start_recording(&self, session_name: &str) -> PupilResult<()> {
        for link in self.links() {
            link.control
                .notify(&Notification::start_recording(Some(session_name)))?;
        }
        info!("Recording started: {}", session_name);
        Ok(())
    }

    /// Stop recording on master, then slave
    pub fn stop_recording(&self) -> PupilResult<()> {
        for link in self.links() {
            let reply = link.control.stop_recording()?;
            info!("[{}] Stop recording: {}", link.role(), reply);
        }
        Ok(())
    }

    /// Annotate both recordings with the master clock
    pub fn annotate(&self, label: &str) -> PupilResult<Trigger> {
        send_annotation(
            &self.master.publisher,
            &self.slave.publisher,
            label,
            &self.master.control,
        )
    }

    /// Calibrate one host until accepted or overridden by the operator
    pub fn calibrate<D: DecisionSource + ?Sized>(
        &self,
        role: Role,
        decisions: &mut D,
    ) -> PupilResult<CalibrationOutcome> {
        let link = self.host(role);
        let mut monitor = CalibrationMonitor::new(self.policy, self.telemetry_timeout_ms);
        monitor.run(&link.control, &link.subscriber, decisions)
    }

    /// Close both links. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.master.close();
        self.slave.close();
    }

    pub fn is_closed(&self) -> bool {
        self.master.is_closed() && self.slave.is_closed()
    }
}
