use tracing::debug;
use tracing::warn;

pub fn raise_convergence_warning(
  unconverged_rows: usize,
  degenerate_rows: usize,
  perplexity: f64,
  total_rows: usize,
  threshold: f64, // Default 0.1
) {
  if degenerate_rows > 0 {
    warn!(
      "{degenerate_rows} of {total_rows} points have no neighbors with non-zero affinity. Their rows of P are held up only by the probability floor. Check for duplicated points or extreme distance scales."
    );
  }

  if unconverged_rows == 0 {
    debug!(perplexity, total_rows, "all affinity rows converged");
  } else if unconverged_rows <= (threshold * total_rows as f64) as usize {
    warn!(
      "Perplexity = {perplexity}: {unconverged_rows} of {total_rows} points did not reach the target entropy within the search budget. This shouldn't cause problems."
    );
  } else {
    warn!(
      "Perplexity = {perplexity}: {unconverged_rows} of {total_rows} points did not reach the target entropy within the search budget.\nThe perplexity may exceed what the data can support; it must be well below the number of points ({total_rows})."
    );
  }
}
