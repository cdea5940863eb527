//! Box (continuous) observation/action space

use super::Space;
use ndarray::{ArrayD, IxDyn};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Box space for continuous values with per-element bounds.
#[derive(Clone, Debug)]
pub struct Box {
    /// Lower bound for each element
    pub low: ArrayD<f32>,
    /// Upper bound for each element
    pub high: ArrayD<f32>,
    shape: Vec<usize>,
}

impl Box {
    /// Create a new box space with given bounds
    pub fn new(low: ArrayD<f32>, high: ArrayD<f32>) -> Self {
        assert_eq!(
            low.shape(),
            high.shape(),
            "Low and high must have same shape"
        );
        let shape = low.shape().to_vec();
        Self { low, high, shape }
    }

    /// Create a box space with uniform bounds
    pub fn uniform(shape: &[usize], low: f32, high: f32) -> Self {
        let low_arr = ArrayD::from_elem(IxDyn(shape), low);
        let high_arr = ArrayD::from_elem(IxDyn(shape), high);
        Self::new(low_arr, high_arr)
    }

    /// Create a symmetric box `[-bound, bound]` for a flat vector.
    ///
    /// This is the shape every arena action space takes: `dim` continuous
    /// components, each semantically in `[-1, 1]`.
    pub fn symmetric(dim: usize, bound: f32) -> Self {
        Self::uniform(&[dim], -bound, bound)
    }
}

impl Space for Box {
    type Sample = ArrayD<f32>;

    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample {
        let mut result = ArrayD::zeros(IxDyn(&self.shape));
        for ((&l, &h), r) in self
            .low
            .iter()
            .zip(self.high.iter())
            .zip(result.iter_mut())
        {
            let dist = Uniform::new(l, h);
            *r = dist.sample(rng);
        }
        result
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        if value.shape() != self.low.shape() {
            return false;
        }
        value
            .iter()
            .zip(self.low.iter())
            .zip(self.high.iter())
            .all(|((&v, &l), &h)| v >= l && v <= h)
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_box_sample() {
        let space = Box::symmetric(6, 1.0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let sample = space.sample(&mut rng);
            assert!(space.contains(&sample));
            assert_eq!(sample.shape(), &[6]);
        }
    }

    #[test]
    fn test_box_contains() {
        let space = Box::uniform(&[2], 0.0, 1.0);
        let valid = ArrayD::from_shape_vec(IxDyn(&[2]), vec![0.5, 0.5]).unwrap();
        let invalid = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.5, 0.5]).unwrap();

        assert!(space.contains(&valid));
        assert!(!space.contains(&invalid));
    }

    #[test]
    fn test_box_rejects_wrong_shape() {
        let space = Box::symmetric(3, 1.0);
        let wrong = ArrayD::zeros(IxDyn(&[4]));
        assert!(!space.contains(&wrong));
    }
}
