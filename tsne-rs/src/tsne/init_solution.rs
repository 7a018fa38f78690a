use super::constants::INITIAL_STD_DEV;
use ndarray::Array2;
use rand::Rng;
use rand_distr::StandardNormal;

/*
  Draw a fresh embedding of small Gaussian noise, N(0, INITIAL_STD_DEV^2)
  per coordinate. The tiny scale keeps all Student-t similarities close to
  1 at the start, so early iterations are driven by P alone.

  Parameters
  ----------
  n_samples: int
  n_components: int
  rng: random source; the same seeded generator yields the same embedding.

  Returns
  -------
  embedding: array of shape (n_samples, n_components)
*/
pub fn random_init<R: Rng>(
  n_samples: usize,
  n_components: usize,
  rng: &mut R,
) -> Array2<f64> {
  Array2::from_shape_fn((n_samples, n_components), |_| {
    let z: f64 = rng.sample(StandardNormal);
    z * INITIAL_STD_DEV
  })
}
