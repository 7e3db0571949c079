//! Seeded 3D simplex noise.
//!
//! The classic skewed-simplex construction: the input point is skewed onto a
//! cubic lattice, the enclosing simplex (one of six tetrahedra) is found, and
//! the four corner contributions are summed with a `(0.6 - r²)⁴` falloff.
//! Output is scaled into `[-1, 1]`.
//!
//! The permutation table is a seeded shuffle of `0..=255`, so two generators
//! built from the same seed produce bit-identical values.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Skew factor for 3D: (sqrt(4) - 1) / 3.
const F3: f64 = 1.0 / 3.0;
/// Unskew factor for 3D: (1 - 1/sqrt(4)) / 3.
const G3: f64 = 1.0 / 6.0;

/// Gradient directions: midpoints of the 12 cube edges.
const GRAD3: [[f64; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

/// A 3D simplex noise generator with its own permutation table.
#[derive(Clone)]
pub struct SimplexNoise {
    /// 256-entry permutation repeated twice so lookups never wrap.
    perm: [u8; 512],
}

impl SimplexNoise {
    /// Build a generator whose permutation is shuffled from `seed`.
    pub fn new(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut table: [u8; 256] = std::array::from_fn(|i| i as u8);
        table.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i & 255];
        }
        Self { perm }
    }

    #[inline]
    fn hash(&self, i: usize, j: usize, k: usize) -> usize {
        let p = &self.perm;
        p[i + p[j + p[k] as usize] as usize] as usize % 12
    }

    /// Sample the noise at `(x, y, z)`. Returns a value in `[-1, 1]`.
    pub fn noise3(&self, x: f64, y: f64, z: f64) -> f64 {
        let s = (x + y + z) * F3;
        let i = (x + s).floor();
        let j = (y + s).floor();
        let k = (z + s).floor();

        let t = (i + j + k) * G3;
        let x0 = x - (i - t);
        let y0 = y - (j - t);
        let z0 = z - (k - t);

        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        let x1 = x0 - i1 as f64 + G3;
        let y1 = y0 - j1 as f64 + G3;
        let z1 = z0 - k1 as f64 + G3;
        let x2 = x0 - i2 as f64 + 2.0 * G3;
        let y2 = y0 - j2 as f64 + 2.0 * G3;
        let z2 = z0 - k2 as f64 + 2.0 * G3;
        let x3 = x0 - 1.0 + 3.0 * G3;
        let y3 = y0 - 1.0 + 3.0 * G3;
        let z3 = z0 - 1.0 + 3.0 * G3;

        // Lattice coordinates wrapped into the table; rem_euclid keeps
        // negative cells in range.
        let ii = (i.rem_euclid(256.0)) as usize;
        let jj = (j.rem_euclid(256.0)) as usize;
        let kk = (k.rem_euclid(256.0)) as usize;

        let gi0 = self.hash(ii, jj, kk);
        let gi1 = self.hash(ii + i1, jj + j1, kk + k1);
        let gi2 = self.hash(ii + i2, jj + j2, kk + k2);
        let gi3 = self.hash(ii + 1, jj + 1, kk + 1);

        let n0 = corner(gi0, x0, y0, z0);
        let n1 = corner(gi1, x1, y1, z1);
        let n2 = corner(gi2, x2, y2, z2);
        let n3 = corner(gi3, x3, y3, z3);

        32.0 * (n0 + n1 + n2 + n3)
    }
}

impl std::fmt::Debug for SimplexNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimplexNoise")
            .field("perm", &&self.perm[..8])
            .finish_non_exhaustive()
    }
}

#[inline]
fn corner(gi: usize, x: f64, y: f64, z: f64) -> f64 {
    let t = 0.6 - x * x - y * y - z * z;
    if t < 0.0 {
        0.0
    } else {
        let g = GRAD3[gi];
        let t2 = t * t;
        t2 * t2 * (g[0] * x + g[1] * y + g[2] * z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise3_range() {
        let noise = SimplexNoise::new(1);
        for i in 0..20 {
            for j in 0..20 {
                for k in 0..20 {
                    let x = i as f64 * 0.37 - 3.0;
                    let y = j as f64 * 0.41 - 4.0;
                    let z = k as f64 * 0.29 - 2.5;
                    let v = noise.noise3(x, y, z);
                    assert!((-1.0..=1.0).contains(&v), "noise3 out of range: {}", v);
                    assert!(v.is_finite());
                }
            }
        }
    }

    #[test]
    fn test_zero_at_lattice_origin() {
        // The only contributing corner sits exactly on the sample point.
        let noise = SimplexNoise::new(99);
        assert_eq!(noise.noise3(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_same_seed_same_values() {
        let a = SimplexNoise::new(42);
        let b = SimplexNoise::new(42);
        for i in 0..50 {
            let p = i as f64 * 0.173;
            assert_eq!(
                a.noise3(p, -p * 0.5, p * 1.7).to_bits(),
                b.noise3(p, -p * 0.5, p * 1.7).to_bits()
            );
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = SimplexNoise::new(1);
        let b = SimplexNoise::new(2);
        let differs = (0..50).any(|i| {
            let p = i as f64 * 0.311 + 0.05;
            a.noise3(p, p * 0.7, -p) != b.noise3(p, p * 0.7, -p)
        });
        assert!(differs);
    }

    #[test]
    fn test_noise_is_continuous() {
        let noise = SimplexNoise::new(3);
        let h = 1e-6;
        for i in 0..100 {
            let p = i as f64 * 0.097 - 5.0;
            let a = noise.noise3(p, p * 0.3, p * -0.8);
            let b = noise.noise3(p + h, p * 0.3, p * -0.8);
            assert!((a - b).abs() < 1e-3, "jump at {}: {} vs {}", p, a, b);
        }
    }

    #[test]
    fn test_known_values_for_seed_42() {
        let noise = SimplexNoise::new(42);
        assert_eq!(&noise.perm[..8], &[219, 210, 203, 107, 250, 227, 55, 192]);

        let cases = [
            ((0.5, 0.25, 0.125), 0x3fba_11c9_77e5_122a),
            ((-1.3, 2.7, 0.4), 0xbfcc_214a_f5bf_00d2),
            ((10.6, -3.2, 7.9), 0xbfbc_8e94_e9ed_aa22),
        ];
        for ((x, y, z), bits) in cases {
            let v = noise.noise3(x, y, z);
            assert_eq!(v.to_bits(), bits, "noise3({}, {}, {}) = {}", x, y, z, v);
        }
    }

    #[test]
    fn test_known_value_for_seed_7() {
        let noise = SimplexNoise::new(7);
        assert_eq!(&noise.perm[..4], &[10, 183, 214, 169]);
        assert_eq!(
            noise.noise3(0.5, 0.25, 0.125),
            f64::from_bits(0xbfbf_442b_20b8_1817)
        );
    }

    #[test]
    fn test_negative_coordinates() {
        let noise = SimplexNoise::new(5);
        let v = noise.noise3(-300.25, -1024.5, -7.75);
        assert!(v.is_finite());
        assert!((-1.0..=1.0).contains(&v));
    }
}
