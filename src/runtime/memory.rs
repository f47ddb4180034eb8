//! Linear memory of one instance.

use super::Trap;
use crate::ir::{Limits, PAGE_SIZE};

/// A page-granular, byte-addressable buffer owned by exactly one instance.
///
/// Every access is checked against the current size; an access that does not
/// fit entirely raises [`Trap::MemoryOutOfBounds`] and touches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearMemory {
    bytes: Vec<u8>,
    max_pages: u32,
}

impl LinearMemory {
    /// Allocate `limits.min` zeroed pages. Returns `None` when the allocation
    /// cannot be satisfied.
    pub fn new(limits: Limits) -> Option<Self> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(limits.min_bytes()).ok()?;
        bytes.resize(limits.min_bytes(), 0);
        Some(Self {
            bytes,
            max_pages: limits.max_pages(),
        })
    }

    /// Current size in pages.
    pub fn pages(&self) -> u32 {
        (self.bytes.len() / PAGE_SIZE) as u32
    }

    /// Current size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Grow by `delta` pages, returning the previous size in pages, or `None`
    /// if the maximum would be exceeded or the allocation failed. A failed grow
    /// leaves the memory unchanged.
    pub fn grow(&mut self, delta: u32) -> Option<u32> {
        let old = self.pages();
        let new = old.checked_add(delta).filter(|&p| p <= self.max_pages)?;
        let new_len = new as usize * PAGE_SIZE;
        self.bytes
            .try_reserve_exact(new_len - self.bytes.len())
            .ok()?;
        self.bytes.resize(new_len, 0);
        log::debug!("memory grown from {old} to {new} pages");
        Some(old)
    }

    fn range(&self, addr: u64, len: usize) -> Result<std::ops::Range<usize>, Trap> {
        let start = usize::try_from(addr).map_err(|_| Trap::MemoryOutOfBounds)?;
        let end = start.checked_add(len).ok_or(Trap::MemoryOutOfBounds)?;
        if end > self.bytes.len() {
            return Err(Trap::MemoryOutOfBounds);
        }
        Ok(start..end)
    }

    pub fn read(&self, addr: u64, len: usize) -> Result<&[u8], Trap> {
        let range = self.range(addr, len)?;
        Ok(&self.bytes[range])
    }

    pub fn write(&mut self, addr: u64, data: &[u8]) -> Result<(), Trap> {
        let range = self.range(addr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    fn load<const N: usize>(&self, addr: u64) -> Result<[u8; N], Trap> {
        let range = self.range(addr, N)?;
        let mut raw = [0u8; N];
        raw.copy_from_slice(&self.bytes[range]);
        Ok(raw)
    }

    pub fn load_i32(&self, addr: u64) -> Result<i32, Trap> {
        self.load(addr).map(i32::from_le_bytes)
    }

    pub fn load_i64(&self, addr: u64) -> Result<i64, Trap> {
        self.load(addr).map(i64::from_le_bytes)
    }

    pub fn load_f64(&self, addr: u64) -> Result<f64, Trap> {
        self.load(addr).map(f64::from_le_bytes)
    }

    pub fn store_i32(&mut self, addr: u64, value: i32) -> Result<(), Trap> {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn store_i64(&mut self, addr: u64, value: i64) -> Result<(), Trap> {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn store_f64(&mut self, addr: u64, value: f64) -> Result<(), Trap> {
        self.write(addr, &value.to_le_bytes())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_page() -> LinearMemory {
        LinearMemory::new(Limits { min: 1, max: Some(2) }).unwrap()
    }

    #[test]
    fn test_load_store() {
        let mut memory = one_page();
        memory.store_f64(8, -2.5).unwrap();
        assert_eq!(memory.load_f64(8), Ok(-2.5));
        assert_eq!(memory.read(8, 8).unwrap(), &(-2.5f64).to_le_bytes());

        memory.store_i32(0, -7).unwrap();
        assert_eq!(memory.load_i32(0), Ok(-7));
        assert_eq!(memory.load_i64(0).unwrap() as u32, -7i32 as u32);
    }

    #[test]
    fn test_bounds() {
        let mut memory = one_page();
        let last = (PAGE_SIZE - 8) as u64;
        assert!(memory.store_f64(last, 1.0).is_ok());
        assert_eq!(memory.load_f64(last + 1), Err(Trap::MemoryOutOfBounds));
        assert_eq!(memory.store_i32(u64::MAX, 0), Err(Trap::MemoryOutOfBounds));
        assert_eq!(memory.read(PAGE_SIZE as u64, 0).map(<[u8]>::len), Ok(0));
        // A rejected store writes nothing.
        assert_eq!(memory.write(last + 4, &[0xFF; 8]), Err(Trap::MemoryOutOfBounds));
        assert_eq!(memory.load_f64(last), Ok(1.0));
    }

    #[test]
    fn test_grow_honors_maximum() {
        let mut memory = one_page();
        assert_eq!(memory.grow(1), Some(1));
        assert_eq!(memory.pages(), 2);
        assert_eq!(memory.size(), 2 * PAGE_SIZE);
        assert_eq!(memory.grow(1), None);
        assert_eq!(memory.grow(0), Some(2));
        assert_eq!(memory.pages(), 2);
    }
}
