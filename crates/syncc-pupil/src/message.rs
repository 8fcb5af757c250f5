//! Message records exchanged with capture hosts, and their msgpack codec
//!
//! Every payload is a msgpack map with string keys. Field names are part of
//! the wire contract with the hosts and must not be renamed.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use syncc_config::{PluginArg, PluginSpec};

use crate::error::PupilResult;

/// Topic prefix of notification requests on the control channel
pub const NOTIFY_PREFIX: &str = "notify.";

/// Topic of annotation triggers on the publish channel
pub const ANNOTATION_TOPIC: &str = "annotation";

/// Topic prefix of host log records on the subscribe channel
pub const LOGGING_TOPIC: &str = "logging";

/// `remote_notify` value that makes a host forward the notification to
/// every peer in its group
pub const REMOTE_NOTIFY_ALL: &str = "all";

/// A notification sent over the control channel as `notify.<subject>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subject")]
pub enum Notification {
    #[serde(rename = "recording.should_start")]
    RecordingShouldStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_name: Option<String>,
        remote_notify: String,
    },

    #[serde(rename = "recording.should_stop")]
    RecordingShouldStop { remote_notify: String },

    #[serde(rename = "start_plugin")]
    StartPlugin {
        name: String,
        args: BTreeMap<String, PluginArg>,
    },
}

impl Notification {
    pub fn start_recording(session_name: Option<&str>) -> Self {
        Notification::RecordingShouldStart {
            session_name: session_name.map(str::to_string),
            remote_notify: REMOTE_NOTIFY_ALL.to_string(),
        }
    }

    pub fn stop_recording() -> Self {
        Notification::RecordingShouldStop {
            remote_notify: REMOTE_NOTIFY_ALL.to_string(),
        }
    }

    pub fn start_plugin(plugin: &PluginSpec) -> Self {
        Notification::StartPlugin {
            name: plugin.name.clone(),
            args: plugin.args.clone(),
        }
    }

    /// Value of the `subject` field
    pub fn subject(&self) -> &'static str {
        match self {
            Notification::RecordingShouldStart { .. } => "recording.should_start",
            Notification::RecordingShouldStop { .. } => "recording.should_stop",
            Notification::StartPlugin { .. } => "start_plugin",
        }
    }

    /// First frame of the control request: `notify.<subject>`
    pub fn topic(&self) -> String {
        format!("{}{}", NOTIFY_PREFIX, self.subject())
    }
}

/// A timestamped event marker injected into both hosts' recordings.
///
/// The timestamp is always taken from the master clock so the two
/// recordings can be aligned afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trigger {
    pub topic: String,
    pub label: String,
    pub timestamp: f64,
    pub duration: f64,
}

impl Trigger {
    /// Zero-duration annotation
    pub fn annotation(label: impl Into<String>, timestamp: f64) -> Self {
        Self {
            topic: ANNOTATION_TOPIC.to_string(),
            label: label.into(),
            timestamp,
            duration: 0.0,
        }
    }
}

/// A log record forwarded by a host on its `logging.*` topics.
///
/// Only `msg` is interpreted; the host sends many more fields, which are
/// accepted and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRecord {
    pub msg: String,
    #[serde(default)]
    pub levelname: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, IgnoredAny>,
}

impl LogRecord {
    /// Names of the fields that were received but not interpreted
    pub fn ignored_fields(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }
}

/// Encode a record as a msgpack map
pub fn encode<T: Serialize>(value: &T) -> PupilResult<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode a msgpack payload
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> PupilResult<T> {
    Ok(rmp_serde::from_slice(bytes)?)
}
