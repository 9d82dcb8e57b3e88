//! Length-prefixed, checksummed wire frame: the on-the-wire representation of one RPC
//! request or response.
//!
//! Layout: `START(1) pk_len(4) msg_id_len(4) msg_id method_len(4) method_name
//! error_code(4) err_info_len(4) err_info payload checksum(4) END(1)`. Length fields are
//! big-endian; the checksum is the XOR of the frame's bytes read as native-endian 32-bit
//! words with the checksum slot itself zeroed.

use crate::buffer::Buffer;

const START_MARKER: u8 = 0x02;
const END_MARKER: u8 = 0x03;

// start + pk_len + 4 length fields (msg_id, method, err_info each contribute one, plus
// error_code) + checksum + end, with all variable fields empty.
const MIN_FRAME_LEN: usize = 1 + 4 + 4 + 4 + 4 + 4 + 4 + 1;

/// A decoded or to-be-encoded RPC frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Opaque call identifier, unique per in-flight call on a connection.
    pub msg_id: String,
    /// Fully qualified `Service.Method` name.
    pub method_name: String,
    /// Zero on success; a member of `rpc`'s error taxonomy otherwise.
    pub error_code: i32,
    /// Human-readable detail for a non-zero error code.
    pub error_info: String,
    /// Opaque serialized request or response body.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Builds a success frame carrying `payload`.
    pub fn response(msg_id: impl Into<String>, method_name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            msg_id: msg_id.into(),
            method_name: method_name.into(),
            error_code: 0,
            error_info: String::new(),
            payload,
        }
    }

    /// Builds an error frame; the payload is left empty.
    pub fn error(
        msg_id: impl Into<String>,
        method_name: impl Into<String>,
        error_code: i32,
        error_info: impl Into<String>,
    ) -> Self {
        Self {
            msg_id: msg_id.into(),
            method_name: method_name.into(),
            error_code,
            error_info: error_info.into(),
            payload: Vec::new(),
        }
    }

    /// Serializes this frame to its on-the-wire byte representation.
    pub fn encode(&self) -> Vec<u8> {
        let msg_id = self.msg_id.as_bytes();
        let method = self.method_name.as_bytes();
        let err_info = self.error_info.as_bytes();

        let pk_len = MIN_FRAME_LEN + msg_id.len() + method.len() + err_info.len() + self.payload.len();

        let mut buf = Vec::with_capacity(pk_len);
        buf.push(START_MARKER);
        buf.extend_from_slice(&(pk_len as u32).to_be_bytes());
        buf.extend_from_slice(&(msg_id.len() as u32).to_be_bytes());
        buf.extend_from_slice(msg_id);
        buf.extend_from_slice(&(method.len() as u32).to_be_bytes());
        buf.extend_from_slice(method);
        buf.extend_from_slice(&self.error_code.to_be_bytes());
        buf.extend_from_slice(&(err_info.len() as u32).to_be_bytes());
        buf.extend_from_slice(err_info);
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&[0u8; 4]);
        buf.push(END_MARKER);

        debug_assert_eq!(buf.len(), pk_len);

        let checksum = checksum_xor(&buf);
        let checksum_pos = buf.len() - 5;
        buf[checksum_pos..checksum_pos + 4].copy_from_slice(&checksum.to_ne_bytes());
        buf
    }

    /// Pulls one decoded frame out of `buffer`, if one is fully available.
    ///
    /// Any bytes preceding the next start marker are discarded. A frame with an invalid
    /// end marker, truncated fields, or a checksum mismatch is dropped in its entirety
    /// (the whole declared packet length is skipped, not just the offending byte) and
    /// decoding resumes scanning for the next start marker.
    pub fn decode(buffer: &mut Buffer) -> Option<Frame> {
        loop {
            let skip = match buffer.as_read_slice().iter().position(|&b| b == START_MARKER) {
                Some(offset) => offset,
                None => {
                    let len = buffer.readable();
                    buffer.advance_read(len);
                    return None;
                }
            };
            if skip > 0 {
                buffer.advance_read(skip);
            }

            let available = buffer.as_read_slice();
            if available.len() < 5 {
                return None;
            }

            let pk_len = u32::from_be_bytes([available[1], available[2], available[3], available[4]]) as usize;
            if pk_len < MIN_FRAME_LEN {
                // Not a real frame; drop the marker byte and keep scanning.
                buffer.advance_read(1);
                continue;
            }
            if available.len() < pk_len {
                return None;
            }

            let frame_bytes = available[..pk_len].to_vec();
            buffer.advance_read(pk_len);

            match parse_frame(&frame_bytes) {
                Some(frame) => return Some(frame),
                None => continue,
            }
        }
    }
}

fn parse_frame(bytes: &[u8]) -> Option<Frame> {
    let len = bytes.len();
    if bytes[len - 1] != END_MARKER {
        return None;
    }

    let checksum_pos = len - 5;
    let stored = u32::from_ne_bytes(bytes[checksum_pos..checksum_pos + 4].try_into().ok()?);
    let mut scratch = bytes.to_vec();
    scratch[checksum_pos..checksum_pos + 4].copy_from_slice(&[0u8; 4]);
    if checksum_xor(&scratch) != stored {
        return None;
    }

    let end = checksum_pos;
    let mut pos = 5usize;

    let msg_id_len = read_u32(bytes, pos, end)? as usize;
    pos += 4;
    let msg_id = read_string(bytes, pos, msg_id_len, end)?;
    pos += msg_id_len;

    let method_len = read_u32(bytes, pos, end)? as usize;
    pos += 4;
    let method_name = read_string(bytes, pos, method_len, end)?;
    pos += method_len;

    let error_code = read_i32(bytes, pos, end)?;
    pos += 4;

    let err_info_len = read_u32(bytes, pos, end)? as usize;
    pos += 4;
    let error_info = read_string(bytes, pos, err_info_len, end)?;
    pos += err_info_len;

    if pos > end {
        return None;
    }
    let payload = bytes[pos..end].to_vec();

    Some(Frame {
        msg_id,
        method_name,
        error_code,
        error_info,
        payload,
    })
}

fn read_u32(bytes: &[u8], pos: usize, end: usize) -> Option<u32> {
    if pos + 4 > end {
        return None;
    }
    Some(u32::from_be_bytes(bytes[pos..pos + 4].try_into().ok()?))
}

fn read_i32(bytes: &[u8], pos: usize, end: usize) -> Option<i32> {
    read_u32(bytes, pos, end).map(|v| v as i32)
}

fn read_string(bytes: &[u8], pos: usize, len: usize, end: usize) -> Option<String> {
    if pos + len > end {
        return None;
    }
    String::from_utf8(bytes[pos..pos + len].to_vec()).ok()
}

/// XOR of `data` read as successive native-endian 32-bit words, zero-padding a trailing
/// partial word. Matches the checksum convention used on the wire: no byte-swapping is
/// applied to the checksum itself, only to the length fields.
fn checksum_xor(data: &[u8]) -> u32 {
    let mut acc = 0u32;
    let chunks = data.chunks_exact(4);
    let remainder = chunks.remainder();
    for chunk in chunks {
        acc ^= u32::from_ne_bytes(chunk.try_into().unwrap());
    }
    if !remainder.is_empty() {
        let mut last = [0u8; 4];
        last[..remainder.len()].copy_from_slice(remainder);
        acc ^= u32::from_ne_bytes(last);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::response("00000000000000000001", "Order.makeOrder", b"payload-bytes".to_vec())
    }

    #[test]
    fn encode_decode_round_trips() {
        let frame = sample();
        let bytes = frame.encode();
        let mut buf = Buffer::new(64);
        buf.write_bytes(&bytes);
        let decoded = Frame::decode(&mut buf).expect("frame decodes");
        assert_eq!(decoded, frame);
        assert_eq!(buf.readable(), 0);
    }

    #[test]
    fn split_reads_yield_exactly_one_frame() {
        let frame = sample();
        let bytes = frame.encode();
        let mut buf = Buffer::new(64);
        for byte in &bytes[..bytes.len() - 1] {
            buf.write_bytes(&[*byte]);
            assert!(Frame::decode(&mut buf).is_none());
        }
        buf.write_bytes(&bytes[bytes.len() - 1..]);
        let decoded = Frame::decode(&mut buf).expect("frame decodes after final byte");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn garbage_prefix_is_discarded() {
        let frame = sample();
        let mut bytes = vec![0xAA, 0xBB, 0xCC];
        bytes.extend(frame.encode());
        let mut buf = Buffer::new(64);
        buf.write_bytes(&bytes);
        let decoded = Frame::decode(&mut buf).expect("frame decodes past garbage");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn single_bit_checksum_mutation_is_rejected() {
        let frame = sample();
        let mut bytes = frame.encode();
        let last = bytes.len() - 1;
        bytes[last - 2] ^= 0x01; // flip a bit inside the checksum field
        let mut buf = Buffer::new(64);
        buf.write_bytes(&bytes);
        assert!(Frame::decode(&mut buf).is_none());
    }

    #[test]
    fn two_back_to_back_frames_both_decode() {
        let a = sample();
        let b = Frame::error("2", "Order.makeOrder", 1000_0008, "not found");
        let mut bytes = a.encode();
        bytes.extend(b.encode());
        let mut buf = Buffer::new(128);
        buf.write_bytes(&bytes);
        assert_eq!(Frame::decode(&mut buf), Some(a));
        assert_eq!(Frame::decode(&mut buf), Some(b));
        assert_eq!(Frame::decode(&mut buf), None);
    }
}
