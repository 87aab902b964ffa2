//! NTP wire message codec
//!
//! # Overview
//!
//! This crate encodes and decodes the fixed 48-byte NTP message header
//! defined by [RFC 5905](https://datatracker.ietf.org/doc/html/rfc5905),
//! including its embedded fixed-point timestamps. It is pure data
//! transformation: no sockets, no clock filtering, no offset math. A
//! transport hands [`NtpMessage::from_wire`] the bytes it received and sends
//! whatever [`NtpMessage::to_wire`] produces, and a clock source implements
//! [`NtpTimestampGenerator`] to stamp outgoing messages.
//!
//! ## Features
//!
//! - `std`: standard library clock source ([`StdTimestampGen`])
//! - `log`: library debug output during decoding
//! - `defmt`: like `log`, but through `defmt` for embedded targets
//! - `utils`: `chrono` calendar-time conversions
//!
//! # Byte order
//!
//! In-memory values are always in native order; the wire buffer is always
//! big-endian. The conversion happens exactly once in each direction, inside
//! `to_wire`/`from_wire`, so callers never track which order a message is
//! currently in.
//!
//! # Example
//!
//! ```rust
//! use ntp_wire::{NtpMessage, StdTimestampGen};
//!
//! let request = NtpMessage::client_request(StdTimestampGen::default());
//! let wire = request.to_wire().expect("fields are in range");
//!
//! // ... send wire.as_ref() over UDP port 123, receive a reply ...
//!
//! let echoed = NtpMessage::from_wire(wire.as_ref()).unwrap();
//! assert_eq!(echoed, request);
//! ```
#![cfg_attr(not(feature = "std"), no_std)]

mod log;
mod types;
#[cfg(feature = "utils")]
pub mod utils;

pub use crate::types::*;

#[cfg(any(feature = "defmt", feature = "log"))]
use crate::log::debug;

impl NtpMessage {
    /// Encode the message into the 48-byte wire representation.
    ///
    /// The `leap`/`version`/`mode` fields are packed into the leading octet
    /// (bits 7-6, 5-3 and 2-0 respectively, per RFC 5905 §7.3) and every
    /// multi-byte field is written big-endian. Encoding either yields the
    /// full header or nothing; there are no partial writes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] if `leap > 3`, `version > 7` or
    /// `mode > 7`, since those values cannot fit their wire width.
    pub fn to_wire(&self) -> Result<RawNtpMessage> {
        RawNtpMessage::try_from(self)
    }

    /// Decode a message from received bytes.
    ///
    /// Only the first [`NtpMessage::WIRE_SIZE`] bytes are read; optional
    /// extension fields and the authenticator that may follow are ignored,
    /// not rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Truncated`] if `buf` holds fewer than 48 bytes.
    pub fn from_wire(buf: &[u8]) -> Result<NtpMessage> {
        let Some(header) = buf.get(..Self::WIRE_SIZE) else {
            return Err(Error::Truncated);
        };

        let mut raw = RawNtpMessage::default();
        raw.0.copy_from_slice(header);
        let message = NtpMessage::from(&raw);

        #[cfg(any(feature = "defmt", feature = "log"))]
        debug_ntp_message(&message);

        Ok(message)
    }
}

// Plain `{}` formatting only, so the dump works through defmt as well.
#[cfg(any(feature = "defmt", feature = "log"))]
fn debug_ntp_message(message: &NtpMessage) {
    debug!("| Mode:\t\t{}", message.mode);
    debug!("| Version:\t{}", message.version);
    debug!("| Leap:\t\t{}", message.leap);
    debug!("| Stratum:\t{}", message.stratum);
    debug!("| Poll:\t\t{}", message.poll);
    debug!("| Precision:\t\t{}", message.precision);
    debug!("| Root delay:\t\t{}", message.root_delay);
    debug!("| Root dispersion:\t{}", message.root_dispersion);
    debug!("| Reference ID:\t\t{}", u32::from_be_bytes(message.ref_id));
    debug!(
        "| Reference timestamp:\t{}.{}",
        message.ref_timestamp.seconds, message.ref_timestamp.fraction
    );
    debug!(
        "| Origin timestamp:\t{}.{}",
        message.origin_timestamp.seconds, message.origin_timestamp.fraction
    );
    debug!(
        "| Receive timestamp:\t{}.{}",
        message.recv_timestamp.seconds, message.recv_timestamp.fraction
    );
    debug!(
        "| Transmit timestamp:\t{}.{}",
        message.tx_timestamp.seconds, message.tx_timestamp.fraction
    );
}

/// Convert second fraction value to milliseconds value
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn fraction_to_milliseconds(sec_fraction: u32) -> u32 {
    (u64::from(sec_fraction) * u64::from(MSEC_IN_SEC) / u64::from(u32::MAX))
        as u32
}

/// Convert second fraction value to microseconds value
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn fraction_to_microseconds(sec_fraction: u32) -> u32 {
    (u64::from(sec_fraction) * u64::from(USEC_IN_SEC) / u64::from(u32::MAX))
        as u32
}

/// Convert second fraction value to nanoseconds value
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn fraction_to_nanoseconds(sec_fraction: u32) -> u32 {
    (u64::from(sec_fraction) * u64::from(NSEC_IN_SEC) / u64::from(u32::MAX))
        as u32
}

#[cfg(test)]
mod ntp_wire_codec_tests {
    use crate::{Error, NtpMessage, Timestamp};

    // Stratum-1 CDMA server response captured on the wire.
    const SERVER_RESPONSE: [u8; 48] = [
        0x14, 0x01, 0x03, 0xf0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x18, b'C', b'D', b'M', b'A', 0xd7, 0xbc, 0x80, 0x69, 0xc6, 0xa9,
        0x2e, 0x63, 0xd7, 0xbb, 0xb1, 0xc2, 0x9f, 0x2f, 0x78, 0x00, 0xd7,
        0xbc, 0x80, 0x71, 0x2d, 0xec, 0xe6, 0x2d, 0xd7, 0xbc, 0x80, 0x71,
        0x2e, 0x23, 0x9e, 0x6c,
    ];

    #[test]
    fn test_decode_known_response() {
        let message = NtpMessage::from_wire(&SERVER_RESPONSE).unwrap();

        assert_eq!(message.leap, 0);
        assert_eq!(message.version, 2);
        assert_eq!(message.mode, NtpMessage::MODE_SERVER);
        assert_eq!(message.stratum, 1);
        assert_eq!(message.poll, 3);
        assert_eq!(message.precision, 0xf0);
        assert_eq!(message.root_delay, 0);
        assert_eq!(message.root_dispersion, 24);
        assert_eq!(&message.ref_id, b"CDMA");
        assert_eq!(
            message.ref_timestamp,
            Timestamp::new(3_619_455_081, 3_332_976_227)
        );
        assert_eq!(
            message.origin_timestamp,
            Timestamp::new(3_619_402_178, 2_670_688_256)
        );
        assert_eq!(
            message.recv_timestamp,
            Timestamp::new(3_619_455_089, 770_500_141)
        );
        assert_eq!(
            message.tx_timestamp,
            Timestamp::new(3_619_455_089, 774_086_252)
        );
    }

    #[test]
    fn test_wire_roundtrip() {
        let message = NtpMessage::from_wire(&SERVER_RESPONSE).unwrap();
        let encoded = message.to_wire().unwrap();

        assert_eq!(encoded.0, SERVER_RESPONSE);
    }

    #[test]
    fn test_message_roundtrip() {
        let message = NtpMessage {
            leap: 1,
            version: 4,
            mode: NtpMessage::MODE_CLIENT,
            stratum: 2,
            poll: 6,
            precision: 0xe9,
            root_delay: 0x0001_2345,
            root_dispersion: 0x0000_00ff,
            ref_id: [192, 168, 1, 1],
            ref_timestamp: Timestamp::new(0xdead_beef, 0x0123_4567),
            origin_timestamp: Timestamp::new(1, 2),
            recv_timestamp: Timestamp::new(3, 4),
            tx_timestamp: Timestamp::new(u32::MAX, u32::MAX),
        };

        let decoded = NtpMessage::from_wire(&message.to_wire().unwrap().0);
        assert_eq!(decoded, Ok(message));
    }

    #[test]
    fn test_bit_packing() {
        let message = NtpMessage {
            leap: 2,
            version: 4,
            mode: 3,
            ..NtpMessage::default()
        };
        let encoded = message.to_wire().unwrap();

        assert_eq!(encoded.0[0], 0b10_100_011);
        assert_eq!(encoded.0[0], 0xa3);
    }

    #[test]
    fn test_invalid_fields_rejected() {
        let oversized = [
            NtpMessage {
                leap: 4,
                ..NtpMessage::default()
            },
            NtpMessage {
                version: 8,
                ..NtpMessage::default()
            },
            NtpMessage {
                mode: 8,
                ..NtpMessage::default()
            },
        ];

        for message in &oversized {
            assert_eq!(message.to_wire(), Err(Error::InvalidField));
        }

        // maximum in-range values still encode
        let message = NtpMessage {
            leap: 3,
            version: 7,
            mode: 7,
            ..NtpMessage::default()
        };
        assert_eq!(message.to_wire().unwrap().0[0], 0xff);
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(
            NtpMessage::from_wire(&SERVER_RESPONSE[..47]),
            Err(Error::Truncated)
        );
        assert_eq!(NtpMessage::from_wire(&[]), Err(Error::Truncated));
        assert!(NtpMessage::from_wire(&[0u8; 48]).is_ok());
    }

    #[test]
    fn test_extension_bytes_ignored() {
        let mut extended = [0u8; 68];
        extended[..48].copy_from_slice(&SERVER_RESPONSE);
        extended[48..].fill(0xaa);

        let message = NtpMessage::from_wire(&extended).unwrap();
        assert_eq!(message.to_wire().unwrap().0, SERVER_RESPONSE);
    }
}

#[cfg(test)]
mod ntp_wire_timestamp_tests {
    use crate::{
        fraction_to_microseconds, fraction_to_milliseconds,
        fraction_to_nanoseconds, NtpTimestampGenerator, Timestamp,
    };

    #[derive(Copy, Clone, Default)]
    struct FixedTimestampGen {
        sec: u64,
        micros: u32,
    }

    impl NtpTimestampGenerator for FixedTimestampGen {
        fn init(&mut self) {}

        fn timestamp_sec(&self) -> u64 {
            self.sec
        }

        fn timestamp_subsec_micros(&self) -> u32 {
            self.micros
        }
    }

    #[test]
    fn test_unix_epoch_converts_to_zero() {
        let ts = Timestamp::new(Timestamp::NTP_TIMESTAMP_DELTA, 0);
        assert_eq!(ts.to_unix_seconds(), 0);
    }

    #[test]
    fn test_unix_conversion_discards_fraction() {
        let ts = Timestamp::new(Timestamp::NTP_TIMESTAMP_DELTA + 5, u32::MAX);
        assert_eq!(ts.to_unix_seconds(), 5);
    }

    #[test]
    fn test_unix_conversion_wraps_silently() {
        // Known limitation: out-of-range values wrap under the 31-bit mask
        // instead of failing.
        let ts = Timestamp::new(0xffff_ffff, 0);
        assert_eq!(ts.to_unix_seconds(), 2_085_978_495);

        let pre_epoch = Timestamp::new(0, 0);
        assert_eq!(pre_epoch.to_unix_seconds(), 2_085_978_496);
    }

    #[test]
    fn test_zero() {
        let mut ts = Timestamp::new(123, 456);
        ts.zero();
        assert_eq!(ts, Timestamp::default());
    }

    #[test]
    fn test_from_generator() {
        let gen = FixedTimestampGen {
            sec: 0,
            micros: 500_000,
        };
        let ts = Timestamp::from_generator(&gen);

        assert_eq!(ts.seconds, Timestamp::NTP_TIMESTAMP_DELTA);
        // half a second scaled into 2^-32 units
        assert_eq!(ts.fraction, u32::MAX / 2);
    }

    #[test]
    fn test_fraction_conversions() {
        assert_eq!(fraction_to_milliseconds(u32::MAX - 1), 999);
        assert_eq!(fraction_to_microseconds(u32::MAX - 1), 999_999);
        assert_eq!(fraction_to_nanoseconds(u32::MAX - 1), 999_999_999);
        assert_eq!(fraction_to_milliseconds(0), 0);
        assert_eq!(fraction_to_microseconds(0), 0);
        assert_eq!(fraction_to_nanoseconds(0), 0);
    }
}
