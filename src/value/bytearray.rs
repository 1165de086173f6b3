//! # ByteArray
//!
//! A mutable, indexable array of bytes with the same security bits as
//! [`crate::value::userobject::UserObject`]. Supports scalar get/set,
//! range-based slice assignment (fill, copy, cyclic repeat), and the
//! cryptographic digest methods (`md5`, `sha1`, `sha256`, `sha384`,
//! `sha512`, `sha3-256`, `sha3-384`, `sha3-512`, `crc32`). The
//! `each`/`map`/`where`/`count` iteration protocol lives in
//! [`crate::vm::builtins`] as state-machine natives; this module only
//! owns the byte storage and digest helpers they call into.

use crc32fast::Hasher as Crc32Hasher;
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use sha3::{Sha3_256, Sha3_384, Sha3_512};

use crate::error::RuntimeError;
use crate::value::userobject::SecurityFlags;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ByteArray {
    data: Vec<u8>,
    pub security: SecurityFlags,
}

impl ByteArray {
    pub fn new(data: Vec<u8>) -> Self {
        ByteArray {
            data,
            security: SecurityFlags::all(),
        }
    }

    pub fn zeroed(len: usize) -> Self {
        ByteArray::new(vec![0u8; len])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, index: usize) -> Result<u8, RuntimeError> {
        self.data
            .get(index)
            .copied()
            .ok_or_else(|| RuntimeError::IndexError(format!("index {} out of range", index)))
    }

    pub fn set(&mut self, index: usize, value: u8) -> Result<(), RuntimeError> {
        if !self.security.contains(SecurityFlags::WRITABLE) {
            return Err(RuntimeError::SecurityError(
                "byte array is not writable".to_string(),
            ));
        }
        let slot = self
            .data
            .get_mut(index)
            .ok_or_else(|| RuntimeError::IndexError(format!("index {} out of range", index)))?;
        *slot = value;
        Ok(())
    }

    /// Fill `[start, start+length)` with `value`.
    pub fn fill(&mut self, start: usize, length: usize, value: u8) -> Result<(), RuntimeError> {
        self.check_writable_range(start, length)?;
        for b in &mut self.data[start..start + length] {
            *b = value;
        }
        Ok(())
    }

    /// Copy `src` into `self` starting at `start`, cyclically repeating
    /// `src` if it's shorter than the destination range.
    pub fn copy_cyclic(&mut self, start: usize, length: usize, src: &[u8]) -> Result<(), RuntimeError> {
        self.check_writable_range(start, length)?;
        if src.is_empty() {
            return Err(RuntimeError::ValueError(
                "cannot copy from an empty source".to_string(),
            ));
        }
        for i in 0..self.length() {
            self.data[start + i] = src[i % src.len()];
        }
        Ok(())
    }

    fn check_writable_range(&self, start: usize, length: usize) -> Result<(), RuntimeError> {
        if !self.security.contains(SecurityFlags::WRITABLE) {
            return Err(RuntimeError::SecurityError(
                "byte array is not writable".to_string(),
            ));
        }
        if start.checked_add(length).map_or(true, |end| end > self.data.len()) {
            return Err(RuntimeError::IndexError(format!(
                "range [{}, {}) out of bounds for length {}",
                start,
                start + length,
                self.data.len()
            )));
        }
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.security = SecurityFlags::READABLE;
    }

    // ---- digests ---------------------------------------------------------

    pub fn crc32(&self) -> u32 {
        let mut hasher = Crc32Hasher::new();
        hasher.update(&self.data);
        hasher.finalize()
    }

    pub fn md5(&self) -> Vec<u8> {
        Md5::digest(&self.data).to_vec()
    }

    pub fn sha1(&self) -> Vec<u8> {
        Sha1::digest(&self.data).to_vec()
    }

    pub fn sha256(&self) -> Vec<u8> {
        Sha256::digest(&self.data).to_vec()
    }

    pub fn sha384(&self) -> Vec<u8> {
        Sha384::digest(&self.data).to_vec()
    }

    pub fn sha512(&self) -> Vec<u8> {
        Sha512::digest(&self.data).to_vec()
    }

    pub fn sha3_256(&self) -> Vec<u8> {
        Sha3_256::digest(&self.data).to_vec()
    }

    pub fn sha3_384(&self) -> Vec<u8> {
        Sha3_384::digest(&self.data).to_vec()
    }

    pub fn sha3_512(&self) -> Vec<u8> {
        Sha3_512::digest(&self.data).to_vec()
    }

    /// Lowercase hex encoding, matching `SmileString`'s own hex helpers so
    /// digest results render consistently with the rest of the string API.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_round_trip() {
        let mut b = ByteArray::zeroed(4);
        b.set(2, 0xAB).unwrap();
        assert_eq!(b.get(2).unwrap(), 0xAB);
        assert!(b.get(4).is_err());
    }

    #[test]
    fn fill_writes_range() {
        let mut b = ByteArray::zeroed(5);
        b.fill(1, 3, 9).unwrap();
        assert_eq!(b.as_slice(), &[0, 9, 9, 9, 0]);
    }

    #[test]
    fn copy_cyclic_repeats_source() {
        let mut b = ByteArray::zeroed(5);
        b.copy_cyclic(0, 5, &[1, 2]).unwrap();
        assert_eq!(b.as_slice(), &[1, 2, 1, 2, 1]);
    }

    #[test]
    fn frozen_array_rejects_writes() {
        let mut b = ByteArray::zeroed(2);
        b.freeze();
        assert!(b.set(0, 1).is_err());
    }

    #[test]
    fn crc32_matches_known_vector() {
        let b = ByteArray::new(b"123456789".to_vec());
        assert_eq!(b.crc32(), 0xCBF4_3926);
    }

    #[test]
    fn sha256_of_empty_matches_known_vector() {
        let b = ByteArray::new(Vec::new());
        let digest = b.sha256();
        assert_eq!(
            hex::encode(&digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}



