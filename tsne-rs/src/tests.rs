#[cfg(test)]
mod tests {
  use crate::Affinities;
  use crate::AffinityParams;
  use crate::FittedTsne;
  use crate::OptimizationParams;
  use crate::Optimizer;
  use crate::Tsne;
  use crate::TsneConfig;
  use crate::TsneError;
  use approx::assert_abs_diff_eq;
  use ndarray::Array2;
  use ndarray::Axis;
  use rand::rngs::StdRng;
  use rand::Rng;
  use rand::SeedableRng;

  /// Generate synthetic test data: three loose blobs in 10 dimensions
  fn generate_test_data() -> Array2<f64> {
    let n_samples = 30;
    let n_features = 10;
    let mut rng = StdRng::seed_from_u64(1234);

    Array2::from_shape_fn((n_samples, n_features), |(i, _)| {
      let center = (i % 3) as f64 * 10.0;
      center + rng.random::<f64>()
    })
  }

  fn test_config() -> TsneConfig {
    TsneConfig {
      affinity: AffinityParams {
        perplexity: 5.0,
        ..Default::default()
      },
      seed: Some(42),
      ..Default::default()
    }
  }

  #[test]
  fn test_uninitialized_session_fails_fast() {
    let mut tsne = Tsne::new(test_config());
    assert!(!tsne.is_initialized());
    assert!(matches!(tsne.step(1), Err(TsneError::NotInitialized)));
    assert!(matches!(tsne.solution(), Err(TsneError::NotInitialized)));
    assert!(matches!(tsne.reset(), Err(TsneError::NotInitialized)));
    assert!(matches!(tsne.iteration(), Err(TsneError::NotInitialized)));
  }

  #[test]
  fn test_affinities_are_symmetric_floored_and_normalized() {
    let data = generate_test_data();
    let affinities = Affinities::from_points(data.view(), &test_config().affinity, true).unwrap();
    let p = affinities.p();
    let n = affinities.n_points();

    for i in 0..n {
      for j in 0..n {
        assert_eq!(p[(i, j)], p[(j, i)]);
        assert!(p[(i, j)] >= 1e-100);
        assert!(p[(i, j)] <= 1.0);
      }
    }
    assert_abs_diff_eq!(p.sum(), 1.0, epsilon = 1e-6 * (n * n) as f64);
  }

  #[test]
  fn test_row_entropies_match_perplexity() {
    let data = generate_test_data();
    let params = test_config().affinity;
    let affinities = Affinities::from_points(data.view(), &params, true).unwrap();
    let target = params.perplexity.ln();

    for row in affinities.calibrations() {
      assert!(
        (row.entropy - target).abs() <= params.tolerance || row.iterations == params.max_search_iters,
        "row missed target without exhausting budget: {row:?}"
      );
    }
    assert_eq!(affinities.unconverged_rows(), 0);
    assert_eq!(affinities.betas().len(), 30);
    assert!(affinities.betas().iter().all(|&b| b > 0.0));
  }

  #[test]
  fn test_q_distribution_sums_to_one() {
    let data = generate_test_data();
    let mut tsne = Tsne::new(test_config());
    tsne.init_from_points(data.view()).unwrap();

    for _ in 0..3 {
      let q = tsne.optimizer().unwrap().q_distribution();
      assert_abs_diff_eq!(q.sum(), 1.0, epsilon = 1e-9);
      assert!(q.iter().all(|&v| v >= 1e-100));
      tsne.step(20).unwrap();
    }
  }

  #[test]
  fn test_step_advances_and_recenters() {
    let data = generate_test_data();
    let mut tsne = Tsne::new(test_config());
    tsne.init_from_points(data.view()).unwrap();
    assert_eq!(tsne.iteration().unwrap(), 0);

    let cost = tsne.step(5).unwrap();
    assert!(cost.unwrap().is_finite());
    assert_eq!(tsne.iteration().unwrap(), 5);

    let solution = tsne.solution().unwrap();
    assert_eq!(solution.shape(), &[30, 2]);
    for mean in solution.mean_axis(Axis(0)).unwrap() {
      assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);
    }
  }

  #[test]
  fn test_solution_is_a_snapshot() {
    let data = generate_test_data();
    let mut tsne = Tsne::new(test_config());
    tsne.init_from_points(data.view()).unwrap();

    let before = tsne.solution().unwrap();
    let kept = before.clone();
    tsne.step(10).unwrap();
    assert_eq!(before, kept);
    assert_ne!(tsne.solution().unwrap(), before);
  }

  #[test]
  fn test_reset_keeps_affinities_and_restarts_schedule() {
    let data = generate_test_data();
    let mut tsne = Tsne::new(test_config());
    tsne.init_from_points(data.view()).unwrap();
    let p_before = tsne.affinities().unwrap().p().to_owned();

    tsne.step(10).unwrap();
    tsne.reset().unwrap();
    let first = tsne.solution().unwrap();
    tsne.reset().unwrap();
    let second = tsne.solution().unwrap();

    assert_eq!(first.shape(), second.shape());
    assert_ne!(first, second);
    assert_eq!(tsne.iteration().unwrap(), 0);
    assert_eq!(tsne.affinities().unwrap().p(), p_before);

    let optimizer = tsne.optimizer().unwrap();
    assert!(optimizer.steps().iter().all(|&s| s == 0.0));
    assert!(optimizer.gains().iter().all(|&g| g == 1.0));
    assert_eq!(optimizer.last_cost(), None);
  }

  #[test]
  fn test_reset_with_rejects_wrong_shape() {
    let data = generate_test_data();
    let mut tsne = Tsne::new(test_config());
    tsne.init_from_points(data.view()).unwrap();
    tsne.step(3).unwrap();

    let wrong = Array2::<f64>::zeros((30, 3));
    assert!(matches!(
      tsne.reset_with(wrong),
      Err(TsneError::InvalidInput(_))
    ));
    assert_eq!(tsne.iteration().unwrap(), 3);

    let init = Array2::from_shape_fn((30, 2), |(i, d)| (i * 2 + d) as f64 * 1e-3);
    tsne.reset_with(init.clone()).unwrap();
    assert_eq!(tsne.solution().unwrap(), init);
  }

  #[test]
  fn test_seeded_runs_are_bit_identical() {
    let data = generate_test_data();

    let run = |parallel: bool| {
      let mut tsne = Tsne::new(TsneConfig {
        parallel,
        ..test_config()
      });
      tsne.init_from_points(data.view()).unwrap();
      tsne.step(60).unwrap();
      tsne.solution().unwrap()
    };

    let a = run(true);
    let b = run(true);
    let c = run(false);
    assert_eq!(a, b);
    assert_eq!(a, c);
  }

  #[test]
  fn test_invalid_input_leaves_session_untouched() {
    let data = generate_test_data();
    let mut tsne = Tsne::new(test_config());
    tsne.init_from_points(data.view()).unwrap();
    tsne.step(4).unwrap();
    let before = tsne.solution().unwrap();

    let empty = Array2::<f64>::zeros((0, 3));
    assert!(matches!(
      tsne.init_from_points(empty.view()),
      Err(TsneError::InvalidInput(_))
    ));
    let flat = Array2::<f64>::zeros((5, 0));
    assert!(matches!(
      tsne.init_from_points(flat.view()),
      Err(TsneError::InvalidInput(_))
    ));
    let rect = Array2::<f64>::zeros((3, 4));
    assert!(matches!(
      tsne.init_from_distances(rect.view()),
      Err(TsneError::InvalidInput(_))
    ));

    assert_eq!(tsne.iteration().unwrap(), 4);
    assert_eq!(tsne.solution().unwrap(), before);
  }

  #[test]
  fn test_invalid_config_is_rejected() {
    let data = generate_test_data();
    let mut tsne = Tsne::new(TsneConfig {
      n_components: 0,
      ..test_config()
    });
    assert!(matches!(
      tsne.init_from_points(data.view()),
      Err(TsneError::InvalidConfig(_))
    ));
    assert!(!tsne.is_initialized());
  }

  #[test]
  fn test_init_from_distances_matches_points() {
    let data = generate_test_data();
    let n = data.nrows();
    let distances = Array2::from_shape_fn((n, n), |(i, j)| {
      data
        .row(i)
        .iter()
        .zip(data.row(j).iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
    });

    let mut from_points = Tsne::new(test_config());
    from_points.init_from_points(data.view()).unwrap();
    let mut from_distances = Tsne::new(test_config());
    from_distances.init_from_distances(distances.view()).unwrap();

    let pa = from_points.affinities().unwrap().p().to_owned();
    let pb = from_distances.affinities().unwrap().p().to_owned();
    for (a, b) in pa.iter().zip(pb.iter()) {
      assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
    }
  }

  #[test]
  fn test_three_dimensional_embedding() {
    let data = generate_test_data();
    let mut tsne = Tsne::new(TsneConfig {
      n_components: 3,
      ..test_config()
    });
    tsne.init_from_points(data.view()).unwrap();
    tsne.step(10).unwrap();
    assert_eq!(tsne.solution().unwrap().shape(), &[30, 3]);
  }

  #[test]
  fn test_high_level_fit() {
    let data = generate_test_data();
    let mut config = test_config();
    config.optimization.n_iter = 50;

    let fitted = Tsne::new(config).fit(data.view()).unwrap();
    assert_eq!(fitted.embedding().shape(), &[30, 2]);
    assert!(fitted.embedding().iter().all(|v| v.is_finite()));
    assert!(fitted.kl_divergence().unwrap() >= 0.0);
    assert_eq!(fitted.affinities().n_points(), 30);
  }

  #[test]
  fn test_checkpoint_serialization() {
    let data = generate_test_data();
    let mut tsne = Tsne::new(test_config());
    tsne.init_from_points(data.view()).unwrap();
    tsne.step(20).unwrap();

    // Serialize
    let serialized = bincode::serialize(tsne.optimizer().unwrap()).expect("Serialization failed");

    // Deserialize
    let mut restored: Optimizer =
      bincode::deserialize(&serialized).expect("Deserialization failed");
    assert_eq!(restored.iteration(), 20);

    // Both copies continue along the same trajectory
    tsne.step(30).unwrap();
    restored.step_n(30);
    assert_eq!(tsne.solution().unwrap(), restored.embedding());

    let mut resumed = Tsne::new(test_config());
    resumed.restore(restored).unwrap();
    assert_eq!(resumed.iteration().unwrap(), 50);
  }

  #[test]
  fn test_affinities_serialization() {
    let data = generate_test_data();
    let affinities = Affinities::from_points(data.view(), &test_config().affinity, true).unwrap();

    let serialized = bincode::serialize(&affinities).expect("Serialization failed");
    let affinities2: Affinities =
      bincode::deserialize(&serialized).expect("Deserialization failed");

    assert_eq!(affinities2.p(), affinities.p());
    assert_eq!(affinities2.perplexity(), affinities.perplexity());
    assert_eq!(affinities2.calibrations(), affinities.calibrations());

    // Cached affinities start a session without recomputing distances
    let mut tsne = Tsne::new(test_config());
    tsne.init_from_affinities(affinities2).unwrap();
    assert_eq!(tsne.solution().unwrap().shape(), &[30, 2]);
  }

  #[test]
  fn test_fitted_tsne_serialization() {
    let data = generate_test_data();
    let mut config = test_config();
    config.optimization.n_iter = 10;
    let fitted = Tsne::new(config).fit(data.view()).unwrap();

    let serialized = bincode::serialize(&fitted).expect("Serialization failed");
    let fitted2: FittedTsne = bincode::deserialize(&serialized).expect("Deserialization failed");

    assert_eq!(fitted.embedding(), fitted2.embedding());
    assert_eq!(fitted.kl_divergence(), fitted2.kl_divergence());
    assert_eq!(fitted2.config().optimization.n_iter, 10);
  }

  #[test]
  fn test_restore_rejects_mismatched_checkpoint() {
    let data = generate_test_data();
    let affinities = Affinities::from_points(data.view(), &test_config().affinity, true).unwrap();

    // Same field layout as Optimizer, with one row more than there are points
    let embedding = Array2::<f64>::zeros((31, 2));
    let checkpoint = (
      &affinities,
      &embedding,
      &embedding,
      Array2::<f64>::ones((31, 2)),
      0usize,
      None::<f64>,
      OptimizationParams::default(),
      false,
    );
    let serialized = bincode::serialize(&checkpoint).expect("Serialization failed");
    let corrupt: Optimizer = bincode::deserialize(&serialized).expect("Deserialization failed");
    assert!(matches!(corrupt.validate(), Err(TsneError::InvalidInput(_))));

    let mut tsne = Tsne::new(test_config());
    assert!(matches!(
      tsne.restore(corrupt),
      Err(TsneError::InvalidInput(_))
    ));
    assert!(!tsne.is_initialized());

    // Gains shaped differently from the embedding
    let embedding = Array2::<f64>::zeros((30, 2));
    let checkpoint = (
      &affinities,
      &embedding,
      &embedding,
      Array2::<f64>::ones((30, 3)),
      0usize,
      None::<f64>,
      OptimizationParams::default(),
      false,
    );
    let serialized = bincode::serialize(&checkpoint).expect("Serialization failed");
    let corrupt: Optimizer = bincode::deserialize(&serialized).expect("Deserialization failed");
    assert!(matches!(
      tsne.restore(corrupt),
      Err(TsneError::InvalidInput(_))
    ));

    // A consistent checkpoint still restores and steps
    let checkpoint = (
      &affinities,
      &embedding,
      &embedding,
      Array2::<f64>::ones((30, 2)),
      0usize,
      None::<f64>,
      OptimizationParams::default(),
      false,
    );
    let serialized = bincode::serialize(&checkpoint).expect("Serialization failed");
    let valid: Optimizer = bincode::deserialize(&serialized).expect("Deserialization failed");
    tsne.restore(valid).unwrap();
    assert!(tsne.step(1).unwrap().unwrap().is_finite());
  }

  #[test]
  fn test_init_from_affinities_rejects_malformed_cache() {
    let data = generate_test_data();
    let affinities = Affinities::from_points(data.view(), &test_config().affinity, true).unwrap();
    let mut tsne = Tsne::new(test_config());

    // Non-square P
    let cache = (
      Array2::<f64>::from_elem((3, 2), 0.1),
      affinities.calibrations().to_vec(),
      5.0f64,
    );
    let serialized = bincode::serialize(&cache).expect("Serialization failed");
    let corrupt: Affinities = bincode::deserialize(&serialized).expect("Deserialization failed");
    assert!(matches!(
      tsne.init_from_affinities(corrupt),
      Err(TsneError::InvalidInput(_))
    ));

    // Calibration count differs from the number of points
    let cache = (
      affinities.p().to_owned(),
      affinities.calibrations()[..29].to_vec(),
      5.0f64,
    );
    let serialized = bincode::serialize(&cache).expect("Serialization failed");
    let corrupt: Affinities = bincode::deserialize(&serialized).expect("Deserialization failed");
    assert!(matches!(
      tsne.init_from_affinities(corrupt),
      Err(TsneError::InvalidInput(_))
    ));
    assert!(!tsne.is_initialized());

    tsne.init_from_affinities(affinities).unwrap();
    assert!(tsne.is_initialized());
  }
}
