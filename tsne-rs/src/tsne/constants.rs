// Constants used throughout the t-SNE algorithm

/// Lower bound for every entry of P and Q, keeps logarithms finite
pub const PROBABILITY_FLOOR: f64 = 1e-100;

/// Conditional probabilities at or below this value are skipped in the entropy sum
pub const ENTROPY_CUTOFF: f64 = 1e-7;

/// Starting precision for the per-row beta search
pub const INITIAL_BETA: f64 = 1.0;

/// Additive gain increase when gradient and previous step disagree in sign
pub const GAIN_INCREMENT: f64 = 0.2;

/// Multiplicative gain decay when gradient and previous step agree in sign
pub const GAIN_DECAY: f64 = 0.8;

/// Gains never fall below this value
pub const MIN_GAIN: f64 = 0.01;

/// Gain of every coordinate after (re)initialization
pub const INITIAL_GAIN: f64 = 1.0;

/// Standard deviation of the random initial embedding
pub const INITIAL_STD_DEV: f64 = 1e-4;
