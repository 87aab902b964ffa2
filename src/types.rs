use core::mem;

#[cfg(any(feature = "defmt", feature = "log"))]
use crate::log::debug;

/// NTP mode value bit mask
pub(crate) const MODE_MASK: u8 = 0b0000_0111;
/// NTP mode bit mask shift value
pub(crate) const MODE_SHIFT: u8 = 0;
/// NTP version value bit mask
pub(crate) const VERSION_MASK: u8 = 0b0011_1000;
/// NTP version bit mask shift value
pub(crate) const VERSION_SHIFT: u8 = 3;
/// NTP LI (leap indicator) bit mask value
pub(crate) const LI_MASK: u8 = 0b1100_0000;
/// NTP LI bit mask shift value
pub(crate) const LI_SHIFT: u8 = 6;
/// Nanoseconds in second constant
pub(crate) const NSEC_IN_SEC: u32 = 1_000_000_000;
/// Microseconds in second constant
pub(crate) const USEC_IN_SEC: u32 = 1_000_000;
/// Milliseconds in second constant
pub(crate) const MSEC_IN_SEC: u32 = 1_000;

/// NTP wire codec result type
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the NTP wire codec.
///
/// Both conditions are local and recoverable; the codec never panics on
/// malformed input.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The input buffer holds fewer than the 48 bytes of a fixed NTP header
    Truncated,
    /// A bit-packed field (`leap`, `version` or `mode`) exceeds its wire width
    InvalidField,
}

/// NTP timestamp format (RFC 5905): 32-bit seconds since the 1900 epoch and
/// a 32-bit fraction counting 2⁻³²-second ticks.
///
/// Values are always kept in native byte order in memory. Byte-order
/// conversion happens exactly once per direction, inside
/// [`NtpMessage::to_wire`] and [`NtpMessage::from_wire`], so there is no
/// "currently reversed" state to track.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Seconds since 1900-01-01 00:00:00 UTC
    pub seconds: u32,
    /// Fractional part of the second, in units of 2⁻³² seconds
    pub fraction: u32,
}

impl Timestamp {
    /// Seconds between the NTP epoch (1900) and the UNIX epoch (1970),
    /// `(70 * 365 + 17) * 86400`. The `+ 17` covers the leap days in between.
    pub const NTP_TIMESTAMP_DELTA: u32 = 2_208_988_800;

    /// Create a timestamp from raw seconds and fraction values
    #[must_use]
    pub fn new(seconds: u32, fraction: u32) -> Self {
        Timestamp { seconds, fraction }
    }

    /// Convert the seconds count to seconds since the UNIX epoch.
    ///
    /// The result is masked to 31 bits, so values before 1970 or past the
    /// signed 32-bit range silently wrap instead of failing. The fraction
    /// field is discarded; use [`crate::fraction_to_microseconds`] and
    /// friends to keep sub-second precision.
    #[must_use]
    pub fn to_unix_seconds(&self) -> u32 {
        self.seconds.wrapping_sub(Self::NTP_TIMESTAMP_DELTA) & 0x7fff_ffff
    }

    /// Reset both fields to zero
    pub fn zero(&mut self) {
        *self = Timestamp::default();
    }

    /// Build an NTP timestamp from an initialized timestamp generator.
    ///
    /// [`NtpTimestampGenerator::init`] must have been called on the
    /// generator before this, so that both the seconds and the sub-second
    /// reads refer to the same clock sample.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn from_generator<T: NtpTimestampGenerator>(timestamp_gen: &T) -> Self {
        let seconds = timestamp_gen
            .timestamp_sec()
            .wrapping_add(u64::from(Self::NTP_TIMESTAMP_DELTA))
            as u32;
        let fraction = (u64::from(timestamp_gen.timestamp_subsec_micros())
            * u64::from(u32::MAX)
            / u64::from(USEC_IN_SEC)) as u32;

        Timestamp { seconds, fraction }
    }

    pub(crate) fn write_wire(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.seconds.to_be_bytes());
        buf[4..8].copy_from_slice(&self.fraction.to_be_bytes());
    }

    pub(crate) fn read_wire(buf: &[u8]) -> Self {
        let to_array_u32 = |x: &[u8]| {
            let mut tmp = [0u8; mem::size_of::<u32>()];
            tmp.copy_from_slice(x);
            tmp
        };

        Timestamp {
            seconds: u32::from_be_bytes(to_array_u32(&buf[0..4])),
            fraction: u32::from_be_bytes(to_array_u32(&buf[4..8])),
        }
    }
}

/// One NTP packet header, fields in host representation.
///
/// The bit-packed first octet of the wire format is kept unpacked here as
/// three plain integers; [`NtpMessage::to_wire`] packs them with explicit
/// shifts and masks and rejects out-of-width values, so no bit-field layout
/// rules are involved.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct NtpMessage {
    /// Leap second indicator, 2 bits on the wire. 0 = no warning,
    /// 1 = insert, 2 = delete, 3 = clock unsynchronized
    pub leap: u8,
    /// Protocol version, 3 bits on the wire
    pub version: u8,
    /// Association mode, 3 bits on the wire. 3 = client, 4 = server
    pub mode: u8,
    /// Distance from the reference clock. 0 = unspecified, 1 = primary,
    /// 2-15 = secondary, 16 = unsynchronized
    pub stratum: u8,
    /// Maximum poll interval, in log2 seconds
    pub poll: u8,
    /// Clock precision, in log2 seconds. The wire octet is stored as-is;
    /// RFC 5905 interprets it as signed
    pub precision: u8,
    /// Round-trip delay to the reference clock, NTP short format (16.16)
    pub root_delay: u32,
    /// Dispersion to the reference clock, NTP short format
    pub root_dispersion: u32,
    /// Reference identifier. A 4-byte ASCII string for stratum 1 servers,
    /// an IPv4 address or address hash otherwise
    pub ref_id: [u8; 4],
    /// Time the local clock was last set or corrected
    pub ref_timestamp: Timestamp,
    /// Send time of the request, copied verbatim from the request
    pub origin_timestamp: Timestamp,
    /// Receipt time of the request at the responder
    pub recv_timestamp: Timestamp,
    /// Send time of this message
    pub tx_timestamp: Timestamp,
}

impl NtpMessage {
    /// Size of the fixed NTP header on the wire. Extension fields and the
    /// authenticator that may follow are not modeled.
    pub const WIRE_SIZE: usize = 48;
    /// Client request mode
    pub const MODE_CLIENT: u8 = 3;
    /// Server response mode
    pub const MODE_SERVER: u8 = 4;
    /// Protocol version used for outgoing requests
    pub const PROTOCOL_VERSION: u8 = 3;

    /// Build a client request: mode 3, current protocol version, transmit
    /// timestamp taken from the generator, every other field zero.
    pub fn client_request<T: NtpTimestampGenerator>(
        mut timestamp_gen: T,
    ) -> NtpMessage {
        timestamp_gen.init();
        let tx_timestamp = Timestamp::from_generator(&timestamp_gen);

        #[cfg(any(feature = "defmt", feature = "log"))]
        debug!(
            "client request tx: {}.{}",
            tx_timestamp.seconds, tx_timestamp.fraction
        );

        NtpMessage {
            version: Self::PROTOCOL_VERSION,
            mode: Self::MODE_CLIENT,
            tx_timestamp,
            ..NtpMessage::default()
        }
    }

    /// Build a server response to `request`.
    ///
    /// The request's transmit timestamp is copied bit-for-bit into the
    /// response origin timestamp; that copy is the correlation mechanism
    /// clients use to match responses to requests, so it is never
    /// recomputed. The receive and transmit timestamps come from two
    /// separate generator reads, receipt first.
    ///
    /// `stratum`, `ref_id`, `root_delay` and `root_dispersion` describe the
    /// responder's clock source and are left for the caller to fill in.
    pub fn server_response<T: NtpTimestampGenerator>(
        request: &NtpMessage,
        mut timestamp_gen: T,
    ) -> NtpMessage {
        timestamp_gen.init();
        let recv_timestamp = Timestamp::from_generator(&timestamp_gen);
        timestamp_gen.init();
        let tx_timestamp = Timestamp::from_generator(&timestamp_gen);

        NtpMessage {
            version: request.version,
            mode: Self::MODE_SERVER,
            origin_timestamp: request.tx_timestamp,
            recv_timestamp,
            tx_timestamp,
            ..NtpMessage::default()
        }
    }

    /// Reset every field, including all four timestamps, to zero.
    ///
    /// Outbound messages start from this state so reserved and unused
    /// fields are deterministically zero on the wire.
    pub fn zero(&mut self) {
        *self = NtpMessage::default();
    }
}

/// A fixed NTP header in wire order, ready to hand to a transport.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawNtpMessage(pub [u8; NtpMessage::WIRE_SIZE]);

impl Default for RawNtpMessage {
    fn default() -> Self {
        RawNtpMessage([0u8; NtpMessage::WIRE_SIZE])
    }
}

impl AsRef<[u8]> for RawNtpMessage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&NtpMessage> for RawNtpMessage {
    type Error = Error;

    fn try_from(msg: &NtpMessage) -> Result<RawNtpMessage> {
        if msg.leap > LI_MASK >> LI_SHIFT
            || msg.version > VERSION_MASK >> VERSION_SHIFT
            || msg.mode > MODE_MASK
        {
            return Err(Error::InvalidField);
        }

        let mut buf = [0u8; NtpMessage::WIRE_SIZE];

        buf[0] = (msg.leap << LI_SHIFT)
            | (msg.version << VERSION_SHIFT)
            | (msg.mode << MODE_SHIFT);
        buf[1] = msg.stratum;
        buf[2] = msg.poll;
        buf[3] = msg.precision;
        buf[4..8].copy_from_slice(&msg.root_delay.to_be_bytes());
        buf[8..12].copy_from_slice(&msg.root_dispersion.to_be_bytes());
        buf[12..16].copy_from_slice(&msg.ref_id);
        msg.ref_timestamp.write_wire(&mut buf[16..24]);
        msg.origin_timestamp.write_wire(&mut buf[24..32]);
        msg.recv_timestamp.write_wire(&mut buf[32..40]);
        msg.tx_timestamp.write_wire(&mut buf[40..48]);

        Ok(RawNtpMessage(buf))
    }
}

impl From<&RawNtpMessage> for NtpMessage {
    fn from(raw: &RawNtpMessage) -> Self {
        let to_array_u32 = |x: &[u8]| {
            let mut tmp = [0u8; mem::size_of::<u32>()];
            tmp.copy_from_slice(x);
            tmp
        };
        let buf = &raw.0;

        NtpMessage {
            leap: (buf[0] & LI_MASK) >> LI_SHIFT,
            version: (buf[0] & VERSION_MASK) >> VERSION_SHIFT,
            mode: (buf[0] & MODE_MASK) >> MODE_SHIFT,
            stratum: buf[1],
            poll: buf[2],
            precision: buf[3],
            root_delay: u32::from_be_bytes(to_array_u32(&buf[4..8])),
            root_dispersion: u32::from_be_bytes(to_array_u32(&buf[8..12])),
            ref_id: to_array_u32(&buf[12..16]),
            ref_timestamp: Timestamp::read_wire(&buf[16..24]),
            origin_timestamp: Timestamp::read_wire(&buf[24..32]),
            recv_timestamp: Timestamp::read_wire(&buf[32..40]),
            tx_timestamp: Timestamp::read_wire(&buf[40..48]),
        }
    }
}

/// A trait encapsulating timestamp generator's operations
///
/// Under `no_std` there may be no portable way to read the current time, so
/// the clock source is a trait the embedder implements. All timestamps are
/// counted from the UNIX epoch "_1970-01-01 00:00:00 UTC_"; the codec adds
/// the NTP epoch delta itself.
pub trait NtpTimestampGenerator {
    /// Sample the clock. Expected to be called once before each
    /// `timestamp_sec`/`timestamp_subsec_micros` pair so both refer to the
    /// same instant.
    fn init(&mut self);

    /// Returns timestamp in seconds since UNIX EPOCH for the initialized generator
    fn timestamp_sec(&self) -> u64;

    /// Returns the fractional part of the timestamp in whole microseconds.
    /// That method **should not** return microseconds since UNIX EPOCH
    fn timestamp_subsec_micros(&self) -> u32;
}

#[cfg(feature = "std")]
/// Supplementary module with the boilerplate every `std` embedder would
/// otherwise re-implement.
mod sup {
    use std::time::{Duration, SystemTime};

    use crate::NtpTimestampGenerator;

    /// Standard library timestamp generator that reads `std::time`
    #[derive(Copy, Clone, Default)]
    pub struct StdTimestampGen {
        duration: Duration,
    }

    impl NtpTimestampGenerator for StdTimestampGen {
        fn init(&mut self) {
            self.duration = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap();
        }

        fn timestamp_sec(&self) -> u64 {
            self.duration.as_secs()
        }

        fn timestamp_subsec_micros(&self) -> u32 {
            self.duration.subsec_micros()
        }
    }
}

#[cfg(feature = "std")]
pub use sup::*;
