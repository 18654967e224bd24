// nettick - Tick-driven TCP application host over a pluggable wire protocol
// Copyright (C) 2026  nettick contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::SerializerError;

/// External collaborator: the on-wire message codec.
///
/// The core only calls through this trait; it never assumes a concrete
/// wire format. Frames are read back-to-back out of a single receive
/// buffer, so `size_from_buffer` must report exactly how many bytes the
/// next frame occupies without consuming more than that.
pub trait MessageSerializer: Send + Sync + 'static {
    type Message: Send + 'static;

    /// Total bytes the framed message would occupy once serialized.
    fn size_from_message(&self, message: &Self::Message) -> usize;

    /// Inspects the leading header at `buf` and returns the length of the
    /// next whole frame, without consuming the buffer.
    fn size_from_buffer(&self, buf: &[u8]) -> Result<usize, SerializerError>;

    /// Writes exactly `size_from_message(message)` bytes into `out`.
    fn serialize(&self, message: &Self::Message, out: &mut BytesMut);

    /// Consumes exactly `size_from_buffer(buf)` bytes and produces a
    /// message.
    fn deserialize(&self, buf: &[u8]) -> Result<Self::Message, SerializerError>;
}

/// Length-prefixed framing over opaque payloads: a 4-byte little-endian
/// length header followed by that many bytes of body. This is the default
/// serializer a [`crate::builder::HostBuilder`] installs when the caller
/// does not supply one of their own.
pub struct BytesSerializer;

pub const FRAME_HEADER_LEN: usize = 4;

impl MessageSerializer for BytesSerializer {
    type Message = Bytes;

    fn size_from_message(&self, message: &Self::Message) -> usize {
        FRAME_HEADER_LEN + message.len()
    }

    fn size_from_buffer(&self, buf: &[u8]) -> Result<usize, SerializerError> {
        if buf.len() < FRAME_HEADER_LEN {
            return Err(SerializerError::Incomplete);
        }

        let mut header = &buf[..FRAME_HEADER_LEN];
        let body_len = header.get_u32_le() as usize;
        let total = FRAME_HEADER_LEN + body_len;

        if buf.len() < total {
            return Err(SerializerError::Incomplete);
        }

        Ok(total)
    }

    fn serialize(&self, message: &Self::Message, out: &mut BytesMut) {
        out.put_u32_le(message.len() as u32);
        out.put_slice(message);
    }

    fn deserialize(&self, buf: &[u8]) -> Result<Self::Message, SerializerError> {
        if buf.len() < FRAME_HEADER_LEN {
            return Err(SerializerError::Incomplete);
        }

        let mut header = &buf[..FRAME_HEADER_LEN];
        let body_len = header.get_u32_le() as usize;

        let body = buf
            .get(FRAME_HEADER_LEN..FRAME_HEADER_LEN + body_len)
            .ok_or(SerializerError::Incomplete)?;

        Ok(Bytes::copy_from_slice(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_message() {
        let serializer = BytesSerializer;
        let message = Bytes::from_static(b"ping");

        let mut buf = BytesMut::new();
        serializer.serialize(&message, &mut buf);

        let size = serializer.size_from_buffer(&buf).unwrap();
        assert_eq!(size, serializer.size_from_message(&message));

        let decoded = serializer.deserialize(&buf[..size]).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn reports_incomplete_on_short_buffer() {
        let serializer = BytesSerializer;

        assert!(matches!(
            serializer.size_from_buffer(&[0u8, 1]),
            Err(SerializerError::Incomplete)
        ));
    }

    #[test]
    fn back_to_back_frames_advance_independently() {
        let serializer = BytesSerializer;

        let mut buf = BytesMut::new();
        serializer.serialize(&Bytes::from_static(b"a"), &mut buf);
        serializer.serialize(&Bytes::from_static(b"bb"), &mut buf);

        let first_len = serializer.size_from_buffer(&buf).unwrap();
        let first = serializer.deserialize(&buf[..first_len]).unwrap();
        assert_eq!(first, Bytes::from_static(b"a"));

        let rest = &buf[first_len..];
        let second_len = serializer.size_from_buffer(rest).unwrap();
        let second = serializer.deserialize(&rest[..second_len]).unwrap();
        assert_eq!(second, Bytes::from_static(b"bb"));
    }
}
