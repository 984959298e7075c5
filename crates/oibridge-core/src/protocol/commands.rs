//! Protocol commands
//!
//! Builds the opcode frames a controller sends to the robot.

use byteorder::{BigEndian, ByteOrder};

use super::Opcode;
use crate::sensors::packet_length;

/// Drive radius meaning "straight ahead"
pub const RADIUS_STRAIGHT: i16 = i16::MAX;

/// Drive radius meaning "spin clockwise in place"
pub const RADIUS_SPIN_CLOCKWISE: i16 = -1;

/// Drive radius meaning "spin counter-clockwise in place"
pub const RADIUS_SPIN_COUNTER_CLOCKWISE: i16 = 1;

/// Commands sent to an Open Interface robot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the OI (passive mode)
    Start,
    /// Enter safe mode
    Safe,
    /// Enter full mode
    Full,
    /// Stop the OI
    Stop,
    /// Request a single sensor packet
    Sensors(u8),
    /// Request several sensor packets, answered back to back
    QueryList(Vec<u8>),
    /// Start streaming the given sensor packets
    Stream(Vec<u8>),
    /// Pause (`false`) or resume (`true`) the stream
    PauseResumeStream(bool),
    /// Drive at a velocity (mm/s) along a radius (mm)
    Drive {
        /// Velocity in mm/s
        velocity: i16,
        /// Turn radius in mm
        radius: i16,
    },
    /// Drive each wheel at its own velocity (mm/s)
    DirectDrive {
        /// Right wheel velocity in mm/s
        right: i16,
        /// Left wheel velocity in mm/s
        left: i16,
    },
}

impl Command {
    /// Drive straight ahead at the given velocity
    pub fn drive_straight(velocity: i16) -> Self {
        Command::Drive {
            velocity,
            radius: RADIUS_STRAIGHT,
        }
    }

    /// Opcode of this command
    pub fn opcode(&self) -> Opcode {
        match self {
            Command::Start => Opcode::Start,
            Command::Safe => Opcode::Safe,
            Command::Full => Opcode::Full,
            Command::Stop => Opcode::Stop,
            Command::Sensors(_) => Opcode::Sensors,
            Command::QueryList(_) => Opcode::QueryList,
            Command::Stream(_) => Opcode::Stream,
            Command::PauseResumeStream(_) => Opcode::PauseResumeStream,
            Command::Drive { .. } => Opcode::Drive,
            Command::DirectDrive { .. } => Opcode::DirectDrive,
        }
    }

    /// Encode the command as an opcode frame
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![self.opcode().byte()];
        match self {
            Command::Start | Command::Safe | Command::Full | Command::Stop => {}
            Command::Sensors(id) => bytes.push(*id),
            Command::QueryList(ids) | Command::Stream(ids) => {
                bytes.push(ids.len() as u8);
                bytes.extend_from_slice(ids);
            }
            Command::PauseResumeStream(resume) => bytes.push(u8::from(*resume)),
            Command::Drive { velocity, radius } => {
                push_i16(&mut bytes, *velocity);
                push_i16(&mut bytes, *radius);
            }
            Command::DirectDrive { right, left } => {
                push_i16(&mut bytes, *right);
                push_i16(&mut bytes, *left);
            }
        }
        bytes
    }

    /// Number of bytes the robot answers with directly.
    ///
    /// Streamed telemetry arrives asynchronously and is not counted.
    pub fn response_len(&self) -> usize {
        match self {
            Command::Sensors(id) => packet_length(*id),
            Command::QueryList(ids) => ids.iter().map(|id| packet_length(*id)).sum(),
            _ => 0,
        }
    }
}

fn push_i16(bytes: &mut Vec<u8>, value: i16) {
    let mut buf = [0u8; 2];
    BigEndian::write_i16(&mut buf, value);
    bytes.extend_from_slice(&buf);
}
