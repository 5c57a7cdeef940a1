//! Raw NTP packet representation.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::coder;
use crate::timestamp::Timestamp;

/// NTP leap indicator bit mask of the packet's first byte.
const LI_MASK: u8 = 0b1100_0000;
/// NTP leap indicator bit mask shift value.
const LI_SHIFT: u8 = 6;
/// NTP version bit mask of the packet's first byte.
const VERSION_MASK: u8 = 0b0011_1000;
/// NTP version bit mask shift value.
const VERSION_SHIFT: u8 = 3;
/// NTP mode bit mask of the packet's first byte.
const MODE_MASK: u8 = 0b0000_0111;
/// NTP mode bit mask shift value.
const MODE_SHIFT: u8 = 0;

fn shifter(val: u8, mask: u8, shift: u8) -> u8 {
    (val & mask) >> shift
}

fn pointerize(data: [u8; Packet::SIZE]) -> Option<Arc<[u8; Packet::SIZE]>> {
    if data.iter().all(|&byte| byte == 0) {
        None
    } else {
        Some(Arc::new(data))
    }
}

/// An immutable raw NTP packet.
///
/// `Packet` holds only the required NTP fields (48 bytes) behind a shared
/// read-only buffer, so cloning is cheap and clones always compare equal.
///
/// A packet is null if all its data is zeros, and this can be checked with
/// [`is_null`](Packet::is_null). Both constructors collapse an all-zero
/// result to the null representation, so a packet explicitly built from
/// all-zero fields is indistinguishable from [`Packet::default`].
///
/// Delay and offset calculations can be carried out via
/// [`delay`](Packet::delay), [`offset`](Packet::offset), and
/// [`offset_at`](Packet::offset_at). The calculations are correct only if:
/// - the client clock is consistent across the departure and arrival of the
///   NTP packet, and
/// - the client clock is within 68 years of the server; otherwise the
///   returned offset is ambiguous and cannot be resolved correctly to a
///   real timestamp.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Packet {
    data: Option<Arc<[u8; Packet::SIZE]>>,
}

impl Packet {
    /// Size of a packet's underlying data in bytes.
    pub const SIZE: usize = 48;

    /// Constructs a NTP packet from the given field values.
    /// Values wider than their wire field are truncated.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn compose(
        leap: u8,
        version: u8,
        mode: u8,
        stratum: u8,
        poll: i8,
        precision: i8,
        root_delay: u32,
        root_dispersion: u32,
        reference_id: u32,
        reference_timestamp: u64,
        origin_timestamp: u64,
        receive_timestamp: u64,
        transmit_timestamp: u64,
    ) -> Self {
        let mut data = [0u8; Packet::SIZE];
        #[allow(clippy::cast_sign_loss)]
        {
            coder::serialize::<u8>(leap << LI_SHIFT | version << VERSION_SHIFT | mode, &mut data);
            coder::serialize::<u8>(stratum, &mut data[1..]);
            coder::serialize::<u8>(poll as u8, &mut data[2..]);
            coder::serialize::<u8>(precision as u8, &mut data[3..]);
        }
        coder::serialize::<u32>(root_delay, &mut data[4..]);
        coder::serialize::<u32>(root_dispersion, &mut data[8..]);
        coder::serialize::<u32>(reference_id, &mut data[12..]);
        coder::serialize::<u64>(reference_timestamp, &mut data[16..]);
        coder::serialize::<u64>(origin_timestamp, &mut data[24..]);
        coder::serialize::<u64>(receive_timestamp, &mut data[32..]);
        coder::serialize::<u64>(transmit_timestamp, &mut data[40..]);
        Self {
            data: pointerize(data),
        }
    }

    /// Constructs a NTP packet from the given raw data buffer.
    #[must_use]
    pub fn from_data(data: [u8; Packet::SIZE]) -> Self {
        Self {
            data: pointerize(data),
        }
    }

    /// Returns a raw data representation of the underlying packet.
    #[must_use]
    pub fn data(&self) -> [u8; Packet::SIZE] {
        self.data
            .as_ref()
            .map_or([0u8; Packet::SIZE], |data| **data)
    }

    /// Returns whether the underlying data is all zeros.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    /// Returns an integer warning of an impending leap second to be inserted
    /// or deleted in the last minute of the current month.
    ///
    /// | Value | Meaning                               |
    /// | ----- | ------------------------------------- |
    /// | 0     | no warning                            |
    /// | 1     | last minute of the day has 61 seconds |
    /// | 2     | last minute of the day has 59 seconds |
    /// | 3     | unknown (clock unsynchronized)        |
    #[must_use]
    pub fn leap(&self) -> u8 {
        self.data
            .as_ref()
            .map_or(0, |data| shifter(data[0], LI_MASK, LI_SHIFT))
    }

    /// Returns an unsigned integer representing the NTP version number.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.data
            .as_ref()
            .map_or(0, |data| shifter(data[0], VERSION_MASK, VERSION_SHIFT))
    }

    /// Returns an unsigned integer representing the relationship between two
    /// NTP speakers.
    ///
    /// | Value | Meaning                  |
    /// | ----- | ------------------------ |
    /// | 0     | reserved                 |
    /// | 1     | symmetric active         |
    /// | 2     | symmetric passive        |
    /// | 3     | client                   |
    /// | 4     | server                   |
    /// | 5     | broadcast                |
    /// | 6     | NTP control message      |
    /// | 7     | reserved for private use |
    #[must_use]
    pub fn mode(&self) -> u8 {
        self.data
            .as_ref()
            .map_or(0, |data| shifter(data[0], MODE_MASK, MODE_SHIFT))
    }

    /// Returns an unsigned integer representing the level of the server in
    /// the NTP hierarchy.
    ///
    /// | Value   | Meaning                                             |
    /// | ------- | --------------------------------------------------- |
    /// | 0       | unspecified or invalid                              |
    /// | 1       | primary server (e.g., equipped with a GPS receiver) |
    /// | 2..15   | secondary server (via NTP)                          |
    /// | 16      | unsynchronized                                      |
    /// | 17..255 | reserved                                            |
    #[must_use]
    pub fn stratum(&self) -> u8 {
        self.data.as_ref().map_or(0, |data| data[1])
    }

    /// Returns a signed integer representing the maximum interval between
    /// successive messages, in log2 seconds.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn poll(&self) -> i8 {
        self.data.as_ref().map_or(0, |data| data[2] as i8)
    }

    /// Returns a signed integer representing the precision of the system
    /// clock, in log2 seconds.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn precision(&self) -> i8 {
        self.data.as_ref().map_or(0, |data| data[3] as i8)
    }

    /// Returns the total round-trip delay to the reference clock, in NTP
    /// short format.
    #[must_use]
    pub fn root_delay(&self) -> u32 {
        self.data
            .as_ref()
            .map_or(0, |data| coder::deserialize(&data[4..]))
    }

    /// Returns the total dispersion to the reference clock, in NTP short
    /// format.
    #[must_use]
    pub fn root_dispersion(&self) -> u32 {
        self.data
            .as_ref()
            .map_or(0, |data| coder::deserialize(&data[8..]))
    }

    /// Returns a 32-bit code identifying the particular server or reference
    /// clock.
    #[must_use]
    pub fn reference_id(&self) -> u32 {
        self.data
            .as_ref()
            .map_or(0, |data| coder::deserialize(&data[12..]))
    }

    /// Returns the server's time at which the system clock was last set or
    /// corrected.
    #[must_use]
    pub fn reference_timestamp(&self) -> u64 {
        self.data
            .as_ref()
            .map_or(0, |data| coder::deserialize(&data[16..]))
    }

    /// Returns the client's time at which the packet departed to the server.
    #[must_use]
    pub fn origin_timestamp(&self) -> u64 {
        self.data
            .as_ref()
            .map_or(0, |data| coder::deserialize(&data[24..]))
    }

    /// Returns the server's time at which the packet arrived from the client.
    #[must_use]
    pub fn receive_timestamp(&self) -> u64 {
        self.data
            .as_ref()
            .map_or(0, |data| coder::deserialize(&data[32..]))
    }

    /// Returns the server's time at which the packet departed to the client.
    #[must_use]
    pub fn transmit_timestamp(&self) -> u64 {
        self.data
            .as_ref()
            .map_or(0, |data| coder::deserialize(&data[40..]))
    }

    /// Returns the round-trip delay of the NTP packet passed from client to
    /// server and back again.
    ///
    /// In some scenarios it is possible for the delay computation to become
    /// negative and mislead the subsequent computations, so the returned
    /// value has to be clamped or checked before further processing.
    ///
    /// `destination` is the client's time at which the packet arrived from
    /// the server, as a raw NTP timestamp.
    #[must_use]
    pub fn delay(&self, destination: u64) -> TimeDelta {
        Timestamp::new(destination.wrapping_sub(self.origin_timestamp()))
            - Timestamp::new(self.transmit_timestamp().wrapping_sub(self.receive_timestamp()))
    }

    /// Returns the time offset of the server relative to the client.
    ///
    /// The offset can range from 136 years in the past to 136 years in the
    /// future. However, because timestamps can belong to different eras,
    /// ambiguous values may be returned; this method works only with
    /// timestamps in the same era. Use [`offset_at`](Packet::offset_at) to
    /// get the correct offset for timestamps in adjacent eras.
    ///
    /// `destination` is the client's time at which the packet arrived from
    /// the server, as a raw NTP timestamp.
    #[must_use]
    pub fn offset(&self, destination: u64) -> TimeDelta {
        ((Timestamp::new(self.receive_timestamp()) - Timestamp::new(self.origin_timestamp()))
            + (Timestamp::new(self.transmit_timestamp()) - Timestamp::new(destination)))
            / 2
    }

    /// Returns the time offset of the server relative to the client,
    /// anchored to the given arrival moment so that timestamps in the same
    /// or adjacent eras resolve correctly.
    ///
    /// The offset can range from 68 years in the past to 68 years in the
    /// future, so the client clock must be set within 68 years of the server
    /// before the service is started.
    ///
    /// `destination` is the client's wall-clock time at which the packet
    /// arrived from the server.
    #[must_use]
    pub fn offset_at(&self, destination: DateTime<Utc>) -> TimeDelta {
        let raw = self.offset(Timestamp::from_datetime(destination).value());
        let whole = raw.num_seconds();
        // re-sign the seconds component modulo one NTP era
        #[allow(clippy::cast_possible_truncation)]
        let wrapped = whole as i32;
        TimeDelta::seconds(i64::from(wrapped)) + (raw - TimeDelta::seconds(whole))
    }

    /// Builds an outgoing client-mode (version 4) packet with the transmit
    /// timestamp set to the given moment.
    #[must_use]
    pub(crate) fn client(transmit: Timestamp) -> Self {
        Packet::compose(0, 4, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, transmit.value())
    }
}
