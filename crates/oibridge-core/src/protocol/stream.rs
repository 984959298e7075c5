//! Streaming frame encoding/decoding
//!
//! Frame format:
//! - 1 byte: header (19)
//! - 1 byte: payload length N
//! - N bytes: payload of `(packet id, value bytes)` pairs
//! - 1 byte: checksum, chosen so that all bytes after the header sum to 0 mod 256

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{ProtocolError, MAX_STREAM_PAYLOAD};
use crate::sensors::{packet_length, SensorReading};

/// Header byte of every streaming frame
pub const STREAM_HEADER: u8 = 19;

/// Checksum of the bytes following the header: the two's complement of their sum
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_sub(*b))
}

/// One streamed batch of sensor readings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFrame {
    readings: Vec<SensorReading>,
}

impl StreamFrame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading; readings keep their insertion order
    pub fn push(&mut self, id: u8, value: Vec<u8>) {
        self.readings.push(SensorReading::new(id, value));
    }

    /// Readings in request order
    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    /// Look up a reading by packet id
    pub fn reading(&self, id: u8) -> Option<&SensorReading> {
        self.readings.iter().find(|r| r.id == id)
    }

    /// Concatenated `(id, value)` pairs
    pub fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.payload_len());
        for reading in &self.readings {
            payload.push(reading.id);
            payload.extend_from_slice(&reading.bytes);
        }
        payload
    }

    /// Payload length: one id byte plus the value bytes per reading
    pub fn payload_len(&self) -> usize {
        self.readings.iter().map(|r| 1 + r.bytes.len()).sum()
    }

    /// Encode the frame to raw bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let payload = self.payload();
        if payload.len() > MAX_STREAM_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge(payload.len()));
        }

        let mut bytes = Vec::with_capacity(payload.len() + 3);
        bytes.push(STREAM_HEADER);
        bytes.push(payload.len() as u8);
        bytes.extend_from_slice(&payload);
        bytes.push(checksum(&bytes[1..]));
        Ok(bytes)
    }

    /// Decode exactly one frame from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < 3 {
            return Err(ProtocolError::ShortRead {
                expected: 3,
                actual: data.len(),
            });
        }
        if data[0] != STREAM_HEADER {
            return Err(ProtocolError::InvalidHeader(data[0]));
        }

        let length = data[1] as usize;
        if data.len() < length + 3 {
            return Err(ProtocolError::ShortRead {
                expected: length + 3,
                actual: data.len(),
            });
        }

        let frame = &data[..length + 3];
        let sum = frame[1..].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != 0 {
            return Err(ProtocolError::ChecksumMismatch { sum });
        }

        parse_payload(&frame[2..2 + length])
    }
}

/// Split a payload into readings using the declared length of each id
fn parse_payload(mut payload: &[u8]) -> Result<StreamFrame, ProtocolError> {
    let mut frame = StreamFrame::new();
    while let Some((&id, rest)) = payload.split_first() {
        let len = packet_length(id);
        if rest.len() < len {
            return Err(ProtocolError::TruncatedValue(id));
        }
        frame.push(id, rest[..len].to_vec());
        payload = &rest[len..];
    }
    Ok(frame)
}

/// Codec for a stream of telemetry frames.
///
/// The decoder skips bytes until a header is found and drops frames whose
/// checksum or payload layout is invalid, resuming at the next header.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamFrameCodec;

impl Decoder for StreamFrameCodec {
    type Item = StreamFrame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match src.iter().position(|b| *b == STREAM_HEADER) {
                Some(start) => src.advance(start),
                None => {
                    src.clear();
                    return Ok(None);
                }
            }

            if src.len() < 2 {
                return Ok(None);
            }

            let total = src[1] as usize + 3;
            if src.len() < total {
                src.reserve(total - src.len());
                return Ok(None);
            }

            match StreamFrame::from_bytes(&src[..total]) {
                Ok(frame) => {
                    src.advance(total);
                    return Ok(Some(frame));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping invalid stream frame");
                    // Resynchronise on the next header byte
                    src.advance(1);
                }
            }
        }
    }
}

impl Encoder<StreamFrame> for StreamFrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: StreamFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item.to_bytes()?);
        Ok(())
    }
}
