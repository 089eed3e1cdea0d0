//! State Digest
//!
//! SHA-256 digest of the authoritative vehicle state, stamped on every
//! replication frame and in the runner's status log. Two worlds fed the
//! same commands produce the same digest tick for tick.
//!
//! Floats are hashed by bit pattern, so `0.0` and `-0.0` differ and the
//! update order is part of the digest.

use glam::DVec3;
use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for vehicle state.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for a world replication frame.
    pub fn for_world_state() -> Self {
        Self::new(b"VEHICLE_MOTION_STATE_V1")
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f32 bit pattern (little-endian).
    #[inline]
    pub fn update_f32(&mut self, value: f32) {
        self.hasher.update(value.to_bits().to_le_bytes());
    }

    /// Update with an f64 bit pattern (little-endian).
    #[inline]
    pub fn update_f64(&mut self, value: f64) {
        self.hasher.update(value.to_bits().to_le_bytes());
    }

    /// Update with a vector, X then Y then Z.
    #[inline]
    pub fn update_dvec3(&mut self, value: DVec3) {
        self.update_f64(value.x);
        self.update_f64(value.y);
        self.update_f64(value.z);
    }

    /// Update with a UUID (16 bytes).
    #[inline]
    pub fn update_uuid(&mut self, uuid: &[u8; 16]) {
        self.hasher.update(uuid);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute the digest of a world at a given tick.
///
/// The closure adds the per-vehicle data in iteration order.
pub fn compute_state_hash<F>(tick: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_world_state();
    hasher.update_u64(tick);
    add_state(&mut hasher);
    hasher.finalize()
}
