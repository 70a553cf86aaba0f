//this file contains the wire layout of the probes exchanged between the peers
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::ProbeError;

pub const HEADER_SIZE: usize = 8 + 8; // 16 bytes
pub const PROBE_SIZE: usize = 1000;

/// Datagram one peer sends to the other to end the session.
pub const TERMINATION_SENTINEL: [u8; 9] = *b"terminate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeHeader {
    pub seq: i64,           // sequence number, starts at 0
    pub sent_at_nanos: i64, // nanoseconds since UNIX_EPOCH at encode time
}

impl ProbeHeader {
    pub fn new(seq: i64, sent_at_nanos: i64) -> Self {
        Self { seq, sent_at_nanos }
    }

    pub fn write_header(&self, buffer: &mut [u8]) {
        assert!(buffer.len() >= HEADER_SIZE);

        buffer[0..8].copy_from_slice(&self.seq.to_be_bytes());
        buffer[8..16].copy_from_slice(&self.sent_at_nanos.to_be_bytes());
    }

    pub fn read_header(buffer: &[u8]) -> Result<Self, ProbeError> {
        if buffer.len() < HEADER_SIZE {
            return Err(ProbeError::Malformed { len: buffer.len() });
        }

        let mut seq = [0u8; 8];
        let mut sent = [0u8; 8];
        seq.copy_from_slice(&buffer[0..8]);
        sent.copy_from_slice(&buffer[8..16]);

        Ok(Self {
            seq: i64::from_be_bytes(seq),
            sent_at_nanos: i64::from_be_bytes(sent),
        })
    }
}

/// What a datagram from the peer turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datagram {
    Sentinel,
    Probe(ProbeHeader),
}

/// Builds a full probe: header stamped with the current time, then the
/// `"Packet <seq> from <label>"` note, then zeros up to [`PROBE_SIZE`].
pub fn encode_probe(seq: i64, label: &str) -> [u8; PROBE_SIZE] {
    let mut buf = [0u8; PROBE_SIZE];

    ProbeHeader::new(seq, now_nanos()).write_header(&mut buf);

    let note = format!("Packet {} from {}", seq, label);
    let room = PROBE_SIZE - HEADER_SIZE;
    let take = note.len().min(room);
    buf[HEADER_SIZE..HEADER_SIZE + take].copy_from_slice(&note.as_bytes()[..take]);

    buf
}

pub fn decode_probe(buffer: &[u8]) -> Result<ProbeHeader, ProbeError> {
    ProbeHeader::read_header(buffer)
}

/// The text carried after the header, without the zero padding.
pub fn probe_note(buffer: &[u8]) -> String {
    if buffer.len() <= HEADER_SIZE {
        return String::new();
    }
    let body = &buffer[HEADER_SIZE..];
    let end = body.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&body[..end]).into_owned()
}

pub fn is_termination_sentinel(buffer: &[u8]) -> bool {
    buffer == TERMINATION_SENTINEL
}

pub fn classify(buffer: &[u8]) -> Result<Datagram, ProbeError> {
    if is_termination_sentinel(buffer) {
        return Ok(Datagram::Sentinel);
    }
    decode_probe(buffer).map(Datagram::Probe)
}

// helper functions

/// Nanoseconds since UNIX_EPOCH. Both peers stamp with this clock, so latency
/// is only meaningful when their wall clocks agree.
pub fn now_nanos() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i64,
        Err(e) => -(e.duration().as_nanos() as i64),
    }
}

/// Whole milliseconds between a send stamp and `now`, truncated toward zero.
/// A stamp from a non-conforming datagram can be anything, so the difference
/// wraps instead of overflowing.
pub fn latency_ms(sent_at_nanos: i64, now: i64) -> i64 {
    now.wrapping_sub(sent_at_nanos) / 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_is_always_full_size() {
        for seq in [0, 1, 999, i64::MAX] {
            let buf = encode_probe(seq, "alice");
            assert_eq!(buf.len(), PROBE_SIZE);
            assert_eq!(decode_probe(&buf).unwrap().seq, seq);
        }
    }

    #[test]
    fn test_decode_keeps_sequence_for_a_stream() {
        for seq in 0..500 {
            let buf = encode_probe(seq, "bob");
            let header = decode_probe(&buf).unwrap();
            assert_eq!(header.seq, seq);
        }
    }

    #[test]
    fn test_timestamp_taken_at_encode() {
        let before = now_nanos();
        let buf = encode_probe(7, "bob");
        let after = now_nanos();

        let header = decode_probe(&buf).unwrap();
        assert!(header.sent_at_nanos >= before && header.sent_at_nanos <= after);
    }

    #[test]
    fn test_note_text() {
        let buf = encode_probe(42, "room-1");
        assert_eq!(probe_note(&buf), "Packet 42 from room-1");
    }

    #[test]
    fn test_long_label_is_truncated() {
        let label = "x".repeat(2 * PROBE_SIZE);
        let buf = encode_probe(3, &label);
        assert_eq!(buf.len(), PROBE_SIZE);
        assert_eq!(probe_note(&buf).len(), PROBE_SIZE - HEADER_SIZE);
    }

    #[test]
    fn test_sentinel_detection() {
        assert!(is_termination_sentinel(b"terminate"));
        assert!(!is_termination_sentinel(b"terminat"));
        assert!(!is_termination_sentinel(b"terminate\0"));
        assert!(!is_termination_sentinel(b"TERMINATE"));
        assert!(!is_termination_sentinel(&encode_probe(0, "terminate")));

        let mut padded = [0u8; PROBE_SIZE];
        padded[..9].copy_from_slice(&TERMINATION_SENTINEL);
        assert!(!is_termination_sentinel(&padded));
    }

    #[test]
    fn test_short_datagram_is_malformed() {
        assert!(matches!(
            decode_probe(&[1, 2, 3]),
            Err(ProbeError::Malformed { len: 3 })
        ));
        assert!(matches!(
            classify(b"hello"),
            Err(ProbeError::Malformed { len: 5 })
        ));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&TERMINATION_SENTINEL).unwrap(), Datagram::Sentinel);

        let header = ProbeHeader::new(5, 123);
        let mut buf = [0u8; HEADER_SIZE];
        header.write_header(&mut buf);
        assert_eq!(classify(&buf).unwrap(), Datagram::Probe(header));
    }

    #[test]
    fn test_latency_truncates_toward_zero() {
        assert_eq!(latency_ms(0, 1_999_999), 1);
        assert_eq!(latency_ms(0, 10_000_000), 10);
        assert_eq!(latency_ms(1_999_999, 0), -1);
    }

    #[test]
    fn test_latency_with_extreme_stamps_does_not_overflow() {
        let _ = latency_ms(i64::MIN, now_nanos());
        let _ = latency_ms(i64::MAX, -now_nanos());
        assert_eq!(latency_ms(i64::MIN, i64::MIN), 0);
    }
}
