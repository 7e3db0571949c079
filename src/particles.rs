//! Particle position storage.
//!
//! A [`ParticleBuffer`] is a fixed-length, contiguous array of positions that
//! can be uploaded to the GPU as-is. It is allocated once, mutated in place
//! every frame, and never resized.

use glam::Vec3;

use crate::spawn::SpawnCube;

/// Fixed-size set of particle positions plus the sampler used to reseed them.
#[derive(Debug, Clone)]
pub struct ParticleBuffer {
    positions: Vec<Vec3>,
    spawn: SpawnCube,
}

impl ParticleBuffer {
    /// Allocate `count` particles uniformly inside `[-half_width, half_width]^3`.
    pub fn new(count: usize, half_width: f32, seed: u64) -> Self {
        let mut spawn = SpawnCube::new(half_width, seed);
        let positions = (0..count).map(|_| spawn.sample()).collect();
        Self { positions, spawn }
    }

    /// Build a buffer from explicit positions.
    ///
    /// Respawns still draw from the cube of `half_width`, seeded by `seed`.
    pub fn from_positions(positions: Vec<Vec3>, half_width: f32, seed: u64) -> Self {
        Self {
            positions,
            spawn: SpawnCube::new(half_width, seed),
        }
    }

    /// Number of particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the buffer holds no particles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Half-width of the spawn cube.
    #[inline]
    pub fn spawn_half_width(&self) -> f32 {
        self.spawn.half_width()
    }

    /// Position of particle `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn get(&self, index: usize) -> Vec3 {
        self.positions[index]
    }

    /// Overwrite the position of particle `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn set(&mut self, index: usize, position: Vec3) {
        self.positions[index] = position;
    }

    /// Reseed particle `index` at a fresh uniform position in the spawn cube.
    ///
    /// Returns the new position.
    pub fn respawn(&mut self, index: usize) -> Vec3 {
        let p = self.spawn.sample();
        self.positions[index] = p;
        p
    }

    /// All positions, in slot order.
    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Positions as raw bytes (`3 × f32` per particle) for GPU upload.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_fills_cube() {
        let buffer = ParticleBuffer::new(500, 12.0, 3);
        assert_eq!(buffer.len(), 500);
        for &p in buffer.positions() {
            assert!(p.abs().max_element() <= 12.0);
        }
    }

    #[test]
    fn test_respawn_keeps_length() {
        let mut buffer = ParticleBuffer::from_positions(vec![Vec3::splat(100.0); 4], 2.0, 1);
        let p = buffer.respawn(2);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.get(2), p);
        assert!(p.abs().max_element() <= 2.0);
        assert_eq!(buffer.get(1), Vec3::splat(100.0));
    }

    #[test]
    fn test_as_bytes_layout() {
        let buffer = ParticleBuffer::from_positions(vec![Vec3::new(1.0, 2.0, 3.0)], 1.0, 0);
        let bytes = buffer.as_bytes();
        assert_eq!(bytes.len(), 12);
        let floats: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(floats, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_same_seed_same_spawn() {
        let a = ParticleBuffer::new(64, 5.0, 123);
        let b = ParticleBuffer::new(64, 5.0, 123);
        assert_eq!(a.positions(), b.positions());
    }
}
