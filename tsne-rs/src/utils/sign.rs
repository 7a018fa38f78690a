/*
  Three-way sign used by the gain update: zero maps to zero, so a freshly
  reset momentum accumulator never agrees with a non-zero gradient.
*/
#[inline(always)]
pub fn sign(val: f64) -> i8 {
  if val > 0.0 {
    1
  } else if val < 0.0 {
    -1
  } else {
    0
  }
}
