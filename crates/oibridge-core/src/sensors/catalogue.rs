//! Sensor packet catalogue
//!
//! Open Interface sensor packet ids and the size and encoding of their values.
//! Multi-byte values are big-endian on the wire.

/// Bumps and wheel drops
pub const BUMPS_WHEEL_DROPS: u8 = 7;
/// Wall sensor
pub const WALL: u8 = 8;
/// Cliff left
pub const CLIFF_LEFT: u8 = 9;
/// Cliff front left
pub const CLIFF_FRONT_LEFT: u8 = 10;
/// Cliff front right
pub const CLIFF_FRONT_RIGHT: u8 = 11;
/// Cliff right
pub const CLIFF_RIGHT: u8 = 12;
/// Virtual wall
pub const VIRTUAL_WALL: u8 = 13;
/// Wheel overcurrents
pub const OVERCURRENTS: u8 = 14;
/// Dirt detect
pub const DIRT_DETECT: u8 = 15;
/// Infrared character omni
pub const IR_OPCODE: u8 = 17;
/// Buttons
pub const BUTTONS: u8 = 18;
/// Distance travelled since last request (mm)
pub const DISTANCE: u8 = 19;
/// Angle turned since last request (degrees)
pub const ANGLE: u8 = 20;
/// Charging state
pub const CHARGING_STATE: u8 = 21;
/// Battery voltage (mV)
pub const VOLTAGE: u8 = 22;
/// Battery current (mA)
pub const CURRENT: u8 = 23;
/// Battery temperature (degrees C)
pub const TEMPERATURE: u8 = 24;
/// Battery charge (mAh)
pub const BATTERY_CHARGE: u8 = 25;
/// Battery capacity (mAh)
pub const BATTERY_CAPACITY: u8 = 26;
/// Wall signal strength
pub const WALL_SIGNAL: u8 = 27;
/// Cliff left signal strength
pub const CLIFF_LEFT_SIGNAL: u8 = 28;
/// Cliff front left signal strength
pub const CLIFF_FRONT_LEFT_SIGNAL: u8 = 29;
/// Cliff front right signal strength
pub const CLIFF_FRONT_RIGHT_SIGNAL: u8 = 30;
/// Cliff right signal strength
pub const CLIFF_RIGHT_SIGNAL: u8 = 31;
/// Charging sources available
pub const CHARGING_SOURCES: u8 = 34;
/// Current OI mode
pub const OI_MODE: u8 = 35;
/// Selected song number
pub const SONG_NUMBER: u8 = 36;
/// Song playing flag
pub const SONG_PLAYING: u8 = 37;
/// Number of stream packets
pub const STREAM_PACKET_COUNT: u8 = 38;
/// Last requested drive velocity (mm/s)
pub const REQUESTED_VELOCITY: u8 = 39;
/// Last requested drive radius (mm)
pub const REQUESTED_RADIUS: u8 = 40;
/// Last requested right wheel velocity (mm/s)
pub const REQUESTED_RIGHT_VELOCITY: u8 = 41;
/// Last requested left wheel velocity (mm/s)
pub const REQUESTED_LEFT_VELOCITY: u8 = 42;
/// Left encoder counts
pub const LEFT_ENCODER_COUNTS: u8 = 43;
/// Right encoder counts
pub const RIGHT_ENCODER_COUNTS: u8 = 44;
/// Light bumper bitmap
pub const LIGHT_BUMPER: u8 = 45;
/// Stasis caster
pub const STASIS: u8 = 58;

/// How a sensor value is laid out on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// One unsigned byte
    Unsigned8,
    /// One signed byte
    Signed8,
    /// Two bytes, big-endian unsigned
    Unsigned16,
    /// Two bytes, big-endian signed
    Signed16,
    /// Group packet made of several sensor values
    Group(usize),
}

impl Encoding {
    /// Number of bytes a value of this encoding occupies
    pub fn width(self) -> usize {
        match self {
            Encoding::Unsigned8 | Encoding::Signed8 => 1,
            Encoding::Unsigned16 | Encoding::Signed16 => 2,
            Encoding::Group(width) => width,
        }
    }
}

/// Encoding of a sensor packet id, if the id is known
pub fn encoding(id: u8) -> Option<Encoding> {
    use Encoding::*;

    let encoding = match id {
        0 => Group(26),
        1 => Group(10),
        2 => Group(6),
        3 => Group(10),
        4 => Group(14),
        5 => Group(12),
        6 => Group(52),
        100 => Group(80),
        101 => Group(28),
        106 => Group(12),
        107 => Group(9),
        7..=18 => Unsigned8,
        19 | 20 | 23 => Signed16,
        21 => Unsigned8,
        22 => Unsigned16,
        24 => Signed8,
        25..=31 => Unsigned16,
        32 => Unsigned8,
        33 => Unsigned16,
        34..=38 => Unsigned8,
        39..=42 => Signed16,
        43 | 44 => Unsigned16,
        45 => Unsigned8,
        46..=51 => Unsigned16,
        52 | 53 => Unsigned8,
        54..=57 => Signed16,
        58 => Unsigned8,
        _ => return None,
    };
    Some(encoding)
}

/// Declared value length of a sensor packet id.
///
/// Unknown ids have a declared length of zero.
pub fn packet_length(id: u8) -> usize {
    encoding(id).map_or(0, Encoding::width)
}
