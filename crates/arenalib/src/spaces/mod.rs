//! Observation and action space types.
//!
//! Both arena environments are purely continuous: observations are
//! fixed-length float vectors and actions are fixed-length float vectors
//! with components semantically in `[-1, 1]`, so only the `Box` space
//! survives here.

mod r#box;

pub use r#box::Box;

use rand::Rng;

/// Trait for observation and action spaces.
pub trait Space: Clone + Send + Sync {
    /// The type of samples from this space
    type Sample;

    /// Sample a random element from this space
    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample;

    /// Check if a value is contained in this space
    fn contains(&self, value: &Self::Sample) -> bool;

    /// Get the shape of samples from this space
    fn shape(&self) -> &[usize];

    /// Get the total number of elements in a sample
    fn num_elements(&self) -> usize {
        self.shape().iter().product()
    }
}
