//! Annotation protocol: one master-clock timestamp, two identical triggers

use syncc_config::Role;
use syncc_transports::{Publisher, RequestReplyClient};
use tracing::{info, warn};

use crate::control::ControlChannel;
use crate::error::PupilResult;
use crate::message::{encode, Trigger};

/// Publish a trigger as `[topic, msgpack(trigger)]`. Fire-and-forget.
pub fn publish<P: Publisher + ?Sized>(channel: &P, trigger: &Trigger) -> PupilResult<()> {
    let payload = encode(trigger)?;
    channel.publish(trigger.topic.as_bytes(), &payload)?;
    Ok(())
}

/// Stamp `label` with the master clock and publish it to master, then slave.
///
/// Both hosts receive byte-identical payloads. A failed clock query means
/// nothing is published at all.
pub fn send_annotation<M, S, C>(
    master_pub: &M,
    slave_pub: &S,
    label: &str,
    master_control: &ControlChannel<C>,
) -> PupilResult<Trigger>
where
    M: Publisher + ?Sized,
    S: Publisher + ?Sized,
    C: RequestReplyClient,
{
    if master_control.role() != Role::Master {
        warn!(
            "[ANNOTATION] '{}' timestamped with the {} clock",
            label,
            master_control.role()
        );
    }

    let timestamp = master_control.current_time()?;
    let trigger = Trigger::annotation(label, timestamp);

    publish(master_pub, &trigger)?;
    publish(slave_pub, &trigger)?;

    info!("[ANNOTATION] {} @ {}", label, timestamp);
    Ok(trigger)
}
