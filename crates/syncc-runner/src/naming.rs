//! Recording session names

use chrono::{DateTime, TimeZone};
use rand::Rng;

const SESSION_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_et_%H%M";

/// `YYYY_MM_DD_et_HHMM_<participant>`, the folder name both hosts record into
pub fn session_name<Tz>(participant: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}", at.format(SESSION_TIMESTAMP_FORMAT), participant)
}

/// Six-digit zero-padded participant id
pub fn random_participant_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:06}", rng.gen_range(0..1_000_000u32))
}
