//! Protocol opcodes
//!
//! Defines the opcode bytes of the Open Interface command set.

use super::ProtocolError;

/// Open Interface opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Start the OI, entering passive mode
    Start = 128,
    /// Change baud rate (1 argument byte)
    Baud = 129,
    /// Legacy alias of Safe
    Control = 130,
    /// Enter safe mode
    Safe = 131,
    /// Enter full mode
    Full = 132,
    /// Power down
    Power = 133,
    /// Spot cleaning
    Spot = 134,
    /// Default cleaning
    Clean = 135,
    /// Max cleaning
    Max = 136,
    /// Drive with velocity and radius (4 argument bytes)
    Drive = 137,
    /// Cleaning motors on/off (1 argument byte)
    Motors = 138,
    /// LED control (3 argument bytes)
    Leds = 139,
    /// Define a song (variable)
    Song = 140,
    /// Play a song (1 argument byte)
    Play = 141,
    /// Request one sensor packet (1 argument byte)
    Sensors = 142,
    /// Seek the dock
    SeekDock = 143,
    /// PWM cleaning motors (3 argument bytes)
    PwmMotors = 144,
    /// Drive each wheel independently (4 argument bytes)
    DirectDrive = 145,
    /// Drive each wheel by PWM (4 argument bytes)
    DrivePwm = 146,
    /// Start streaming sensor packets (count + ids)
    Stream = 148,
    /// Query a list of sensor packets (count + ids)
    QueryList = 149,
    /// Pause or resume the sensor stream (1 argument byte)
    PauseResumeStream = 150,
    /// Stop the OI
    Stop = 173,
}

impl Opcode {
    /// Wire byte of this opcode
    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        let opcode = match byte {
            128 => Opcode::Start,
            129 => Opcode::Baud,
            130 => Opcode::Control,
            131 => Opcode::Safe,
            132 => Opcode::Full,
            133 => Opcode::Power,
            134 => Opcode::Spot,
            135 => Opcode::Clean,
            136 => Opcode::Max,
            137 => Opcode::Drive,
            138 => Opcode::Motors,
            139 => Opcode::Leds,
            140 => Opcode::Song,
            141 => Opcode::Play,
            142 => Opcode::Sensors,
            143 => Opcode::SeekDock,
            144 => Opcode::PwmMotors,
            145 => Opcode::DirectDrive,
            146 => Opcode::DrivePwm,
            148 => Opcode::Stream,
            149 => Opcode::QueryList,
            150 => Opcode::PauseResumeStream,
            173 => Opcode::Stop,
            other => return Err(ProtocolError::UnknownOpcode(other)),
        };
        Ok(opcode)
    }
}
