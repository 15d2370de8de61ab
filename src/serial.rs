//! Certificate serial number allocation.
//!
//! Serial numbers only need to be unique per issuing root. The policy is kept
//! behind [`SerialAllocator`] so issuance code never depends on which one is
//! in use.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{CertMintError, Result};

/// Produces serial numbers for newly signed certificates.
pub trait SerialAllocator: Send + Sync {
    fn next_serial(&self) -> u128;
}

/// Seconds since the Unix epoch, never below 1.
///
/// Two certificates signed within the same second get the same serial. Use
/// [`CounterSerial`] or [`RandomSerial`] when issuance can burst.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockSerial;

impl SerialAllocator for ClockSerial {
    fn next_serial(&self) -> u128 {
        seconds_serial(SystemTime::now())
    }
}

fn seconds_serial(at: SystemTime) -> u128 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| u128::from(d.as_secs()))
        .unwrap_or_default()
        .max(1)
}

/// A strictly increasing counter, seeded from the clock in microseconds so
/// that a restarted process does not reuse earlier serials.
#[derive(Debug)]
pub struct CounterSerial {
    next: AtomicU64,
}

impl CounterSerial {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(1);
        Self::starting_at(seed)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first.max(1)),
        }
    }
}

impl Default for CounterSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialAllocator for CounterSerial {
    fn next_serial(&self) -> u128 {
        u128::from(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// A random positive 127-bit serial.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSerial;

impl SerialAllocator for RandomSerial {
    fn next_serial(&self) -> u128 {
        (rand::random::<u128>() >> 1).max(1)
    }
}

/// Minimal big-endian two's complement octets of a non-negative serial, as
/// carried in the DER `INTEGER`.
pub fn serial_to_bytes(serial: u128) -> Vec<u8> {
    let bytes = serial.to_be_bytes();
    let start = bytes
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(bytes.len() - 1);
    let mut out = Vec::with_capacity(bytes.len() - start + 1);
    if bytes[start] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[start..]);
    out
}

/// Inverse of [`serial_to_bytes`]. Fails for negative or over-long values.
pub fn serial_from_bytes(bytes: &[u8]) -> Result<u128> {
    if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        return Err(CertMintError::InvalidInput(
            "negative serial number".to_string(),
        ));
    }
    let digits = match bytes.iter().position(|b| *b != 0) {
        Some(start) => &bytes[start..],
        None => &[][..],
    };
    if digits.len() > 16 {
        return Err(CertMintError::InvalidInput(format!(
            "serial number of {} octets does not fit in 128 bits",
            digits.len()
        )));
    }
    Ok(digits
        .iter()
        .fold(0u128, |acc, b| (acc << 8) | u128::from(*b)))
}
