//! NTP timestamp in 64-bit fixed-point long format.

use core::ops::Sub;
use core::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Seconds between the NTP prime epoch "1900-01-01 00:00:00" and the UNIX
/// epoch "1970-01-01 00:00:00".
///
/// See <https://www.rfc-editor.org/rfc/rfc5905>.
pub const EPOCH_DELTA_SECONDS: u64 = 0x83AA_7E80;

const NSEC_IN_SEC: u64 = 1_000_000_000;
/// Length of one whole NTP fraction range, `2^32`.
const FRACTION_RANGE: u64 = 1 << 32;

/// An immutable NTP timestamp.
///
/// A NTP timestamp is a 64-bit, unsigned fixed-point number in seconds
/// relative to the prime epoch "1900-01-01 00:00:00": a 32-bit unsigned
/// seconds field spanning 136 years followed by a 32-bit fraction field
/// resolving 232 picoseconds. This type handles the fractional part at
/// nanosecond resolution.
///
/// Era 0 covers dates from the prime epoch up to "2036-02-07 06:28:15";
/// the seconds field then wraps around, so "2036-02-07 06:28:16" shares the
/// representation of "1900-01-01 00:00:00".
///
/// The only arithmetic operation defined on timestamps is subtraction. It
/// yields a signed [`TimeDelta`] ranging from 136 years in the past to 136
/// years in the future and is only meaningful for timestamps known to lie
/// within the same era; disambiguating across a wraparound needs an external
/// reference moment (see [`Packet::offset_at`](crate::Packet::offset_at)).
///
/// The default value is zero, a special case representing unknown or
/// unsynchronized time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from a raw NTP value in long format, with the
    /// first 32 bits being the seconds and the other 32 bits being the
    /// fraction of a second.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Creates a timestamp from the number of seconds since the prime epoch
    /// and a fraction of a second.
    #[must_use]
    pub const fn from_parts(seconds: u32, fraction: u32) -> Self {
        Self((seconds as u64) << 32 | fraction as u64)
    }

    /// Creates a timestamp from a duration since the prime epoch.
    /// Seconds beyond the 136-year era wrap around.
    #[must_use]
    pub fn from_duration(duration: Duration) -> Self {
        let fraction = (u64::from(duration.subsec_nanos()) << 32) / NSEC_IN_SEC;
        Self(duration.as_secs() << 32 | fraction)
    }

    /// Creates a timestamp from a wall-clock moment, shifting it by the
    /// fixed 1900-to-1970 epoch delta.
    #[must_use]
    pub fn from_datetime(moment: DateTime<Utc>) -> Self {
        #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
        let seconds = moment.timestamp().wrapping_add(EPOCH_DELTA_SECONDS as i64) as u64;
        // chrono smuggles leap seconds in as nanos >= 1e9
        let nanos = u64::from(moment.timestamp_subsec_nanos()) % NSEC_IN_SEC;
        Self(seconds << 32 | (nanos << 32) / NSEC_IN_SEC)
    }

    /// Returns the number of seconds of the NTP timestamp.
    #[must_use]
    pub const fn seconds(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the fraction of a second of the NTP timestamp.
    #[must_use]
    pub const fn fraction(&self) -> u32 {
        self.0 as u32
    }

    /// Returns the NTP timestamp in long format.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns the NTP timestamp as a duration since the prime epoch, with
    /// the fraction converted to nanoseconds.
    #[must_use]
    pub fn duration(&self) -> Duration {
        #[allow(clippy::cast_possible_truncation)]
        let nanos = (u64::from(self.fraction()) * NSEC_IN_SEC / FRACTION_RANGE) as u32;
        Duration::new(u64::from(self.seconds()), nanos)
    }
}

impl Sub for Timestamp {
    type Output = TimeDelta;

    /// Returns the result of subtracting `other` from this timestamp as a
    /// signed duration. Era-naive: correct only for timestamps within the
    /// same NTP era.
    fn sub(self, other: Self) -> TimeDelta {
        signed(self.duration()) - signed(other.duration())
    }
}

#[allow(clippy::cast_possible_wrap)]
fn signed(duration: Duration) -> TimeDelta {
    TimeDelta::seconds(duration.as_secs() as i64)
        + TimeDelta::nanoseconds(i64::from(duration.subsec_nanos()))
}
