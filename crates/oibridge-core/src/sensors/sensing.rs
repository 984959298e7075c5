//! Simulated sensing
//!
//! Produces fresh sensor table snapshots for the simulated robot so that
//! successive sessions observe a slowly draining battery with some noise on
//! voltage and current. Each snapshot is immutable once handed to an engine.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{catalogue, SensorTable};

/// Maximum charge drained per snapshot (mAh)
const MAX_DRAIN_MAH: u16 = 5;

/// Voltage noise amplitude (mV)
const VOLTAGE_JITTER_MV: i32 = 20;

/// Current noise amplitude (mA)
const CURRENT_JITTER_MA: i32 = 10;

/// Generates evolving sensor snapshots from a base table
pub struct SensingSimulator {
    /// Remaining battery charge, seeded from the first base table seen
    charge: Option<u16>,
    /// Random number generator
    rng: StdRng,
}

impl Default for SensingSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SensingSimulator {
    /// Create a simulator seeded from entropy
    pub fn new() -> Self {
        Self {
            charge: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a deterministic simulator
    pub fn with_seed(seed: u64) -> Self {
        Self {
            charge: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Produce the next snapshot derived from `base`.
    ///
    /// Only ids already present in `base` are updated, so value lengths never
    /// change between snapshots.
    pub fn sense(&mut self, base: &SensorTable) -> SensorTable {
        let mut table = base.clone();

        if let Some(base_charge) = base.get_u16(catalogue::BATTERY_CHARGE) {
            let drain = self.rng.gen_range(0..=MAX_DRAIN_MAH);
            let charge = self.charge.unwrap_or(base_charge).saturating_sub(drain);
            self.charge = Some(charge);
            table.set_u16(catalogue::BATTERY_CHARGE, charge);
        }

        if let Some(voltage) = base.get_u16(catalogue::VOLTAGE) {
            let jitter = self.rng.gen_range(-VOLTAGE_JITTER_MV..=VOLTAGE_JITTER_MV);
            let sensed = (voltage as i32 + jitter).clamp(0, u16::MAX as i32) as u16;
            table.set_u16(catalogue::VOLTAGE, sensed);
        }

        if let Some(current) = base.get_i16(catalogue::CURRENT) {
            let jitter = self.rng.gen_range(-CURRENT_JITTER_MA..=CURRENT_JITTER_MA);
            let sensed = (current as i32 + jitter).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
            table.set_i16(catalogue::CURRENT, sensed);
        }

        tracing::trace!(charge = ?self.charge, "sensed new table snapshot");
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_never_increases() {
        let base = SensorTable::with_mock_values();
        let mut sim = SensingSimulator::with_seed(7);
        let mut last = base.get_u16(catalogue::BATTERY_CHARGE).unwrap();
        for _ in 0..50 {
            let table = sim.sense(&base);
            let charge = table.get_u16(catalogue::BATTERY_CHARGE).unwrap();
            assert!(charge <= last);
            last = charge;
        }
    }

    #[test]
    fn test_voltage_stays_near_base() {
        let base = SensorTable::with_mock_values();
        let mut sim = SensingSimulator::with_seed(42);
        for _ in 0..50 {
            let table = sim.sense(&base);
            let voltage = table.get_u16(catalogue::VOLTAGE).unwrap() as i32;
            assert!((voltage - 1200).abs() <= VOLTAGE_JITTER_MV);
            let current = table.get_i16(catalogue::CURRENT).unwrap() as i32;
            assert!((current + 747).abs() <= CURRENT_JITTER_MA);
        }
    }

    #[test]
    fn test_snapshot_keeps_ids_and_lengths() {
        let base = SensorTable::with_mock_values();
        let mut sim = SensingSimulator::with_seed(1);
        let table = sim.sense(&base);
        assert_eq!(table.ids(), base.ids());
        for id in base.ids() {
            assert_eq!(table.get(id).unwrap().len(), base.get(id).unwrap().len());
        }
    }

    #[test]
    fn test_empty_base_stays_empty() {
        let mut sim = SensingSimulator::with_seed(3);
        assert!(sim.sense(&SensorTable::new()).is_empty());
    }
}
