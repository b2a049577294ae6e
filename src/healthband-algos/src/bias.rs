use healthband_codec::Vector3;

/// Running per-axis sum of motion samples taken while the device is held
/// still.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiasAccumulator {
    sum: Vector3,
    samples: usize,
}

impl BiasAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: Vector3) {
        self.sum = self.sum + sample;
        self.samples += 1;
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Mean of the collected samples. With `remove_gravity` one g is taken
    /// off the z axis, since a level accelerometer at rest reads ~1g there.
    pub fn finish(&self, remove_gravity: bool) -> Option<Vector3> {
        if self.samples == 0 {
            return None;
        }

        let mean = self.sum / self.samples as f64;
        match remove_gravity {
            true => Some(mean - Vector3::GRAVITY_Z),
            false => Some(mean),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn empty_has_no_bias() {
        assert!(BiasAccumulator::new().finish(false).is_none());
        assert!(BiasAccumulator::new().finish(true).is_none());
    }

    #[test]
    fn mean_per_axis() {
        let mut acc = BiasAccumulator::new();
        acc.push(Vector3::new(1.0, 2.0, 3.0));
        acc.push(Vector3::new(3.0, 4.0, 5.0));
        assert_eq!(acc.samples(), 2);
        assert_eq!(acc.finish(false), Some(Vector3::new(2.0, 3.0, 4.0)));
    }

    #[test]
    fn gravity_removed_from_z_only() {
        let mut acc = BiasAccumulator::new();
        acc.push(Vector3::new(0.02, -0.01, 1.03));
        let bias = acc.finish(true).unwrap();
        assert!((bias.x - 0.02).abs() < 1e-12);
        assert!((bias.y + 0.01).abs() < 1e-12);
        assert!((bias.z - 0.03).abs() < 1e-12);
    }

    #[test]
    fn noisy_resting_samples_converge() {
        let mut rng = rand::rng();
        let mut acc = BiasAccumulator::new();
        for _ in 0..1000 {
            acc.push(Vector3::new(
                0.05 + rng.random_range(-0.01..0.01),
                -0.02 + rng.random_range(-0.01..0.01),
                1.0 + rng.random_range(-0.01..0.01),
            ));
        }
        let bias = acc.finish(true).unwrap();
        assert!((bias.x - 0.05).abs() < 0.005);
        assert!((bias.y + 0.02).abs() < 0.005);
        assert!(bias.z.abs() < 0.005);
    }
}
