use irm_core::{ErrorInfo, IrmError};
use irm_model::State;

/// Co-clustering frequencies of `domain` across `latents`: entry `(i, j)` is
/// the fraction of states that place entities `i` and `j` in the same group.
pub fn zmatrix(domain: usize, latents: &[State]) -> Result<Vec<Vec<f64>>, IrmError> {
    let first = latents
        .first()
        .ok_or_else(|| IrmError::config("empty-latents", "at least one latent state is required"))?;
    let n = first.nentities(domain)?;
    let mut counts = vec![vec![0usize; n]; n];
    for (idx, latent) in latents.iter().enumerate() {
        let assignments = latent.assignments(domain)?;
        if assignments.len() != n {
            return Err(IrmError::Config(
                ErrorInfo::new("latent-shape", "latent states disagree on the domain size")
                    .with_context("state", idx)
                    .with_context("expected", n)
                    .with_context("found", assignments.len()),
            ));
        }
        for i in 0..n {
            for j in 0..n {
                if assignments[i].is_some() && assignments[i] == assignments[j] {
                    counts[i][j] += 1;
                }
            }
        }
    }
    let total = latents.len() as f64;
    Ok(counts
        .into_iter()
        .map(|row| row.into_iter().map(|c| c as f64 / total).collect())
        .collect())
}
