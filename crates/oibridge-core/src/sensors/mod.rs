//! Sensor Table
//!
//! Maps sensor packet ids to their current byte-encoded values. A table is
//! built once at startup and then shared read-only (behind an `Arc`) by every
//! engine that answers sensor queries.

pub mod catalogue;
mod sensing;

use byteorder::{BigEndian, ByteOrder};
use std::collections::HashMap;

pub use catalogue::{encoding, packet_length, Encoding};
pub use sensing::SensingSimulator;

/// Byte-encoded sensor values keyed by packet id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorTable {
    values: HashMap<u8, Vec<u8>>,
}

impl SensorTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with the canned values of a docked, idle robot
    pub fn with_mock_values() -> Self {
        let mut table = Self::new();
        table.set_u8(catalogue::BUMPS_WHEEL_DROPS, 0);
        table.set_u8(catalogue::VIRTUAL_WALL, 5);
        table.set_u8(catalogue::CLIFF_RIGHT, 42);
        table.set_u8(catalogue::CHARGING_STATE, 21);
        table.set_u16(catalogue::VOLTAGE, 1200);
        table.set_i8(catalogue::TEMPERATURE, 24);
        table.set_u8(catalogue::OI_MODE, 2);
        table.set_u8(catalogue::SONG_NUMBER, 1);
        table.insert(catalogue::DISTANCE, vec![10, 20]);
        table.set_u8(catalogue::WALL, 35);
        table.set_u16(catalogue::BATTERY_CHARGE, 1300);
        table.set_u16(catalogue::BATTERY_CAPACITY, 1500);
        table.set_i16(catalogue::CURRENT, -747);
        table.insert(catalogue::CLIFF_FRONT_LEFT_SIGNAL, vec![2, 25]);
        table
    }

    /// Raw value bytes for a packet id
    pub fn get(&self, id: u8) -> Option<&[u8]> {
        self.values.get(&id).map(Vec::as_slice)
    }

    /// Value bytes for a packet id, or a zero-filled buffer of the declared length
    pub fn value_or_zeroed(&self, id: u8) -> Vec<u8> {
        match self.get(id) {
            Some(value) => value.to_vec(),
            None => vec![0; packet_length(id)],
        }
    }

    /// Check whether a value is defined for a packet id
    pub fn contains(&self, id: u8) -> bool {
        self.values.contains_key(&id)
    }

    /// Store raw value bytes, returning the previous value
    pub fn insert(&mut self, id: u8, value: Vec<u8>) -> Option<Vec<u8>> {
        self.values.insert(id, value)
    }

    /// Remove a value, returning it
    pub fn remove(&mut self, id: u8) -> Option<Vec<u8>> {
        self.values.remove(&id)
    }

    /// Store an unsigned 8-bit value
    pub fn set_u8(&mut self, id: u8, value: u8) {
        self.values.insert(id, vec![value]);
    }

    /// Store a signed 8-bit value
    pub fn set_i8(&mut self, id: u8, value: i8) {
        self.values.insert(id, vec![value as u8]);
    }

    /// Store an unsigned 16-bit value (big-endian)
    pub fn set_u16(&mut self, id: u8, value: u16) {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.values.insert(id, buf.to_vec());
    }

    /// Store a signed 16-bit value (big-endian)
    pub fn set_i16(&mut self, id: u8, value: i16) {
        let mut buf = [0u8; 2];
        BigEndian::write_i16(&mut buf, value);
        self.values.insert(id, buf.to_vec());
    }

    /// Read back a 16-bit unsigned value
    pub fn get_u16(&self, id: u8) -> Option<u16> {
        self.get(id)
            .filter(|v| v.len() == 2)
            .map(BigEndian::read_u16)
    }

    /// Read back a 16-bit signed value
    pub fn get_i16(&self, id: u8) -> Option<i16> {
        self.get(id)
            .filter(|v| v.len() == 2)
            .map(BigEndian::read_i16)
    }

    /// Packet ids with a defined value, sorted
    pub fn ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.values.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of defined values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A single decoded sensor value, as carried in a streaming frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    /// Sensor packet id
    pub id: u8,
    /// Raw value bytes
    pub bytes: Vec<u8>,
}

impl SensorReading {
    /// Create a reading from raw bytes
    pub fn new(id: u8, bytes: Vec<u8>) -> Self {
        Self { id, bytes }
    }

    /// Interpret the value using the catalogue encoding for its id.
    ///
    /// Returns `None` for group packets, unknown ids, or a byte count that
    /// does not match the encoding.
    pub fn value(&self) -> Option<i32> {
        let encoding = encoding(self.id)?;
        if self.bytes.len() != encoding.width() {
            return None;
        }
        match encoding {
            Encoding::Unsigned8 => Some(self.bytes[0] as i32),
            Encoding::Signed8 => Some(self.bytes[0] as i8 as i32),
            Encoding::Unsigned16 => Some(BigEndian::read_u16(&self.bytes) as i32),
            Encoding::Signed16 => Some(BigEndian::read_i16(&self.bytes) as i32),
            Encoding::Group(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mock_voltage_is_big_endian() {
        let table = SensorTable::with_mock_values();
        assert_eq!(table.get(catalogue::VOLTAGE), Some(&[0x04, 0xB0][..]));
        assert_eq!(table.get_u16(catalogue::VOLTAGE), Some(1200));
    }

    #[test]
    fn test_mock_current_is_signed() {
        let table = SensorTable::with_mock_values();
        assert_eq!(table.get_i16(catalogue::CURRENT), Some(-747));
    }

    #[test]
    fn test_mock_values_match_declared_lengths() {
        let table = SensorTable::with_mock_values();
        for id in table.ids() {
            let value = table.get(id).unwrap();
            assert_eq!(value.len(), packet_length(id), "packet {}", id);
        }
    }

    #[test]
    fn test_value_or_zeroed() {
        let table = SensorTable::with_mock_values();
        assert_eq!(table.value_or_zeroed(catalogue::CLIFF_RIGHT), vec![42]);
        assert_eq!(table.value_or_zeroed(catalogue::ANGLE), vec![0, 0]);
        assert_eq!(table.value_or_zeroed(catalogue::CLIFF_LEFT), vec![0]);
        assert!(table.value_or_zeroed(200).is_empty());
    }

    #[test]
    fn test_insert_and_remove() {
        let mut table = SensorTable::new();
        assert!(table.is_empty());
        assert_eq!(table.insert(catalogue::WALL, vec![1]), None);
        assert_eq!(table.insert(catalogue::WALL, vec![2]), Some(vec![1]));
        assert!(table.contains(catalogue::WALL));
        assert_eq!(table.remove(catalogue::WALL), Some(vec![2]));
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_reading_values() {
        assert_eq!(SensorReading::new(catalogue::VOLTAGE, vec![0x04, 0xB0]).value(), Some(1200));
        assert_eq!(SensorReading::new(catalogue::CURRENT, vec![0xFD, 0x15]).value(), Some(-747));
        assert_eq!(SensorReading::new(catalogue::TEMPERATURE, vec![0xFF]).value(), Some(-1));
        assert_eq!(SensorReading::new(catalogue::OI_MODE, vec![2]).value(), Some(2));
        assert_eq!(SensorReading::new(catalogue::VOLTAGE, vec![4]).value(), None);
        assert_eq!(SensorReading::new(6, vec![0; 52]).value(), None);
    }
}
