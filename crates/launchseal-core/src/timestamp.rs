//! Signature timestamps in the .NET `DateTime` binary encoding
//!
//! Existing peers write the one-time-signature timestamp with
//! `DateTime.ToBinary()`: a little-endian `i64` whose low 62 bits count
//! 100 ns ticks since 0001-01-01T00:00:00 and whose top two bits hold the
//! `DateTimeKind`.
//!
//! ```text
//! bit 63-62  kind   00 = unspecified, 01 = UTC, 1x = local (rejected)
//! bit 61-0   ticks
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::LaunchError;

/// Ticks per second (one tick is 100 ns)
pub const TICKS_PER_SECOND: i64 = 10_000_000;

const NANOS_PER_TICK: u128 = 100;

/// Ticks at 1970-01-01T00:00:00Z
pub const TICKS_AT_UNIX_EPOCH: i64 = 621_355_968_000_000_000;

/// Ticks at 9999-12-31T23:59:59.9999999, the largest representable instant
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

const KIND_SHIFT: u32 = 62;
const KIND_UTC: u64 = 1 << KIND_SHIFT;
const TICKS_MASK: u64 = KIND_UTC - 1;

/// A UTC instant with 100 ns resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    ticks: i64,
}

impl Timestamp {
    /// Build from raw UTC ticks. Returns `None` outside `0..=MAX_TICKS`.
    pub fn from_ticks(ticks: i64) -> Option<Self> {
        (0..=MAX_TICKS).contains(&ticks).then_some(Self { ticks })
    }

    /// Convert a wall-clock time, clamping to the representable range.
    pub fn from_system_time(time: SystemTime) -> Self {
        let ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => {
                let delta = (after.as_nanos() / NANOS_PER_TICK).min(MAX_TICKS as u128) as i64;
                TICKS_AT_UNIX_EPOCH.saturating_add(delta).min(MAX_TICKS)
            },
            Err(before) => {
                let delta = (before.duration().as_nanos() / NANOS_PER_TICK)
                    .min(TICKS_AT_UNIX_EPOCH as u128) as i64;
                TICKS_AT_UNIX_EPOCH - delta
            },
        };
        Self { ticks }
    }

    /// Raw tick count.
    pub fn ticks(self) -> i64 {
        self.ticks
    }

    /// Encode as `DateTime.ToBinary()` with UTC kind.
    pub fn to_binary(self) -> i64 {
        (self.ticks as u64 | KIND_UTC) as i64
    }

    /// Decode a `DateTime.ToBinary()` value.
    ///
    /// UTC and unspecified kinds are read as UTC. Local-kind values depend on
    /// the writer's time zone and are rejected.
    pub fn from_binary(raw: i64) -> Result<Self, LaunchError> {
        let raw = raw as u64;
        let kind = raw >> KIND_SHIFT;
        if kind > 1 {
            return Err(LaunchError::invalid("timestamp", "local-time timestamps are not accepted"));
        }

        let ticks = (raw & TICKS_MASK) as i64;
        Self::from_ticks(ticks)
            .ok_or_else(|| LaunchError::invalid("timestamp", format!("{ticks} ticks out of range")))
    }

    /// Time elapsed from `self` to `now`, or `None` if `self` is in the future.
    pub fn age_at(self, now: Self) -> Option<Duration> {
        let elapsed = now.ticks.checked_sub(self.ticks)?;
        if elapsed < 0 {
            return None;
        }
        let secs = (elapsed / TICKS_PER_SECOND) as u64;
        let nanos = ((elapsed % TICKS_PER_SECOND) as u128 * NANOS_PER_TICK) as u32;
        Some(Duration::new(secs, nanos))
    }
}
