//! Sparse address space with high-water tracking.

use crate::machine::errors::VMError;
use std::collections::HashMap;

/// Growable integer-addressed storage.
///
/// Cells never written read as zero, and the space extends on demand in both
/// reads and writes: the highest address ever touched defines the extent of
/// [`Memory::snapshot`]. Negative addresses are rejected.
#[derive(Debug)]
pub struct Memory {
    /// Explicitly written cells.
    cells: HashMap<i64, i64>,
    /// Highest address ever read or written; -1 until first access.
    high_water: i64,
}

impl Memory {
    /// Creates an address space initialized with `image` at addresses `0..n`.
    pub fn new(image: &[i64]) -> Self {
        let mut cells = HashMap::with_capacity(image.len());
        for (address, &value) in image.iter().enumerate() {
            cells.insert(address as i64, value);
        }
        Self {
            cells,
            high_water: image.len() as i64 - 1,
        }
    }

    /// Reads the value at `address`; unset cells yield zero.
    ///
    /// Reading extends the tracked extent, so a read past the image length
    /// shows up as a zero cell in later snapshots.
    pub fn read(&mut self, address: i64) -> Result<i64, VMError> {
        if address < 0 {
            return Err(VMError::NegativeAddress { address });
        }
        self.high_water = self.high_water.max(address);
        Ok(self.cells.get(&address).copied().unwrap_or(0))
    }

    /// Writes `value` at `address`, growing the space as needed.
    pub fn write(&mut self, address: i64, value: i64) -> Result<(), VMError> {
        if address < 0 {
            return Err(VMError::NegativeAddress { address });
        }
        self.high_water = self.high_water.max(address);
        self.cells.insert(address, value);
        Ok(())
    }

    /// Returns every cell from address 0 through the highest address ever
    /// touched, padding unset cells with zero.
    pub fn snapshot(&self) -> Vec<i64> {
        (0..=self.high_water)
            .map(|address| self.cells.get(&address).copied().unwrap_or(0))
            .collect()
    }
}
