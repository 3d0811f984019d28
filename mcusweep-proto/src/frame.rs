//! Frame encoding and decoding
//!
//! Wire format:
//! - 2 bytes: header `55 AA`
//! - 1 byte: command id
//! - 2 bytes: payload length (little-endian)
//! - N bytes: payload
//! - 1 byte: checksum, the mod-256 sum of every preceding byte

use crate::CommandId;

/// Fixed frame header
pub const HEADER: [u8; 2] = [0x55, 0xAA];

/// Header + command + length + checksum
pub const MIN_FRAME_LEN: usize = 6;

/// Largest payload the 16-bit length field can describe
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Errors from building or parsing a frame
///
/// Everything except `PayloadTooLong` means the bytes on the wire are not a
/// trustworthy frame and must be discarded as a whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame too short: {0} bytes, need at least 6")]
    TooShort(usize),
    #[error("bad frame header: {0:02x?}")]
    BadHeader([u8; 2]),
    #[error("declared payload length {declared} but {actual} payload bytes present")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("checksum mismatch: computed {computed:#04x}, frame carries {received:#04x}")]
    ChecksumMismatch { computed: u8, received: u8 },
    #[error("payload of {0} bytes does not fit the 16-bit length field")]
    PayloadTooLong(usize),
}

impl FrameError {
    /// True when the error came from parsing received bytes
    pub fn is_malformed(&self) -> bool {
        !matches!(self, FrameError::PayloadTooLong(_))
    }
}

/// One vendor protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: CommandId,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(command: CommandId, payload: Vec<u8>) -> Self {
        Self { command, payload }
    }

    /// Frame with an empty payload, as used by every handshake query
    pub fn query(command: CommandId) -> Self {
        Self::new(command, Vec::new())
    }

    /// SEND_COMMAND frame carrying a 24-bit search value
    pub fn send_value(value: u32) -> Self {
        Self::new(CommandId::SEND_COMMAND, value_payload(value).to_vec())
    }

    /// Size of the frame once encoded
    pub fn encoded_len(&self) -> usize {
        MIN_FRAME_LEN + self.payload.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        encode(self.command, &self.payload)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
        decode(data)
    }
}

/// Mod-256 sum of `bytes`
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Encode a frame for `command` carrying `payload`
pub fn encode(command: CommandId, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let len = u16::try_from(payload.len())
        .map_err(|_| FrameError::PayloadTooLong(payload.len()))?;

    let mut buf = Vec::with_capacity(MIN_FRAME_LEN + payload.len());
    buf.extend_from_slice(&HEADER);
    buf.push(command.0);
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(payload);
    buf.push(checksum(&buf));
    Ok(buf)
}

/// Decode exactly one frame from `data`
///
/// Trailing bytes, short buffers and bad checksums are all rejected; there
/// is no attempt to resynchronise on a later header.
pub fn decode(data: &[u8]) -> Result<Frame, FrameError> {
    if data.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort(data.len()));
    }

    let header = [data[0], data[1]];
    if header != HEADER {
        return Err(FrameError::BadHeader(header));
    }

    let declared = u16::from_le_bytes([data[3], data[4]]) as usize;
    let actual = data.len() - MIN_FRAME_LEN;
    if declared != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }

    let (body, trailer) = data.split_at(data.len() - 1);
    let computed = checksum(body);
    let received = trailer[0];
    if computed != received {
        return Err(FrameError::ChecksumMismatch { computed, received });
    }

    Ok(Frame {
        command: CommandId(data[2]),
        payload: data[5..5 + declared].to_vec(),
    })
}

/// 24-bit big-endian encoding of a search value; bits above 23 are dropped
pub fn value_payload(value: u32) -> [u8; 3] {
    let [_, hi, mid, lo] = value.to_be_bytes();
    [hi, mid, lo]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn heartbeat_bytes() {
        assert_eq!(
            encode(CommandId::HEARTBEAT, &[]).unwrap(),
            vec![0x55, 0xAA, 0x00, 0x00, 0x00, 0xFF]
        );
    }

    #[test]
    fn mcu_info_and_working_mode_bytes() {
        assert_eq!(
            encode(CommandId::MCU_INFO, &[]).unwrap(),
            vec![0x55, 0xAA, 0x01, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            encode(CommandId::WORKING_MODE, &[]).unwrap(),
            vec![0x55, 0xAA, 0x02, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn send_value_bytes() {
        // 0x55+0xAA+0x06+0x03+0x00+0x12+0x34+0x56 = 0x1A4 -> 0xA4
        assert_eq!(
            Frame::send_value(0x123456).to_bytes().unwrap(),
            vec![0x55, 0xAA, 0x06, 0x03, 0x00, 0x12, 0x34, 0x56, 0xA4]
        );
    }

    #[test]
    fn length_is_little_endian() {
        let payload = vec![0u8; 0x0102];
        let bytes = encode(CommandId(0x07), &payload).unwrap();
        assert_eq!(&bytes[3..5], &[0x02, 0x01]);
        assert_eq!(bytes.len(), MIN_FRAME_LEN + 0x0102);
    }

    #[test]
    fn roundtrip() {
        let cases = [
            Frame::query(CommandId::HEARTBEAT),
            Frame::send_value(1),
            Frame::send_value(0xFFFFFF),
            Frame::new(CommandId(0xE8), (0..=255).collect()),
            Frame::new(CommandId(0x07), vec![0xAB; MAX_PAYLOAD_LEN]),
        ];
        for frame in cases {
            let bytes = frame.to_bytes().unwrap();
            assert_eq!(decode(&bytes).unwrap(), frame);
        }
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let payload = vec![0u8; MAX_PAYLOAD_LEN + 1];
        let err = encode(CommandId::SEND_COMMAND, &payload).unwrap_err();
        assert_eq!(err, FrameError::PayloadTooLong(MAX_PAYLOAD_LEN + 1));
        assert!(!err.is_malformed());
    }

    #[test]
    fn any_single_byte_change_is_detected() {
        let original = Frame::send_value(0x00ABCD).to_bytes().unwrap();
        for pos in 0..original.len() {
            for flip in [0x01u8, 0x80, 0xFF] {
                let mut corrupted = original.clone();
                corrupted[pos] ^= flip;
                let err = decode(&corrupted).unwrap_err();
                assert!(err.is_malformed(), "byte {pos} flip {flip:#04x}: {err:?}");
            }
        }
    }

    #[test]
    fn short_input() {
        assert_eq!(decode(&[]), Err(FrameError::TooShort(0)));
        assert_eq!(decode(&[0x55, 0xAA, 0, 0, 0]), Err(FrameError::TooShort(5)));
    }

    #[test]
    fn trailing_bytes_are_a_length_mismatch() {
        let mut bytes = encode(CommandId::HEARTBEAT, &[]).unwrap();
        bytes.push(0x00);
        assert_eq!(
            decode(&bytes),
            Err(FrameError::LengthMismatch { declared: 0, actual: 1 })
        );
    }

    #[test]
    fn checksum_ignores_its_own_byte() {
        let bytes = encode(CommandId::MCU_INFO, &[1, 2, 3]).unwrap();
        let (body, last) = bytes.split_at(bytes.len() - 1);
        assert_eq!(checksum(body), last[0]);
    }

    #[test]
    fn checksum_wraps() {
        assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
        assert_eq!(checksum(&[0x80; 4]), 0x00);
    }

    #[test]
    fn value_payload_is_big_endian() {
        assert_eq!(value_payload(1), [0x00, 0x00, 0x01]);
        assert_eq!(value_payload(0x0A0B0C), [0x0A, 0x0B, 0x0C]);
        assert_eq!(value_payload(0xFFFFFF), [0xFF, 0xFF, 0xFF]);
    }
}
