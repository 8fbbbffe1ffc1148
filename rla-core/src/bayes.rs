// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Bayes posterior kernel used by the BRLA engine (§4.3).
//!
//! Under a uniform prior on the true winner share `p`, observing `kw`
//! winner ballots and `kl` loser ballots in a round gives a posterior
//! density of `p` that is `Beta(kw+1, kl+1)`. The regularized incomplete
//! beta function is the posterior CDF, computed with
//! `statrs::function::beta::beta_reg` rather than by hand, the same way
//! the closest analog in the pack (`joyshmitz-process_triage`'s
//! `math-binomial.rs`) leans on a shared `log_beta`/`log_gamma` primitive
//! instead of reimplementing the special function.

use statrs::function::beta::beta_reg;

use crate::dist::hypergeom_log_pmf;

/// Posterior P(p <= threshold) for p ~ Beta(kw+1, kl+1), i.e. the posterior
/// probability, under a uniform prior, that the true winner share is at
/// most `threshold`. Used directly for the MAJORITY case (threshold = 1/2).
pub fn posterior_share_at_most(kw: u64, kl: u64, threshold: f64) -> f64 {
    beta_reg(kw as f64 + 1.0, kl as f64 + 1.0, threshold).clamp(0.0, 1.0)
}

/// BRLA's without-replacement posterior (the PLURALITY case): the
/// probability that the true winner tally in the full pool of `pool_size`
/// ballots is at most `half` (typically `pool_size / 2`), given a sampled
/// round of `kw` winner and `kl` loser ballots out of `n = kw + kl` drawn
/// from the pool.
///
/// This enumerates, over every possible true full-pool winner tally `t`,
/// the posterior weight of `t` under the uniform prior (proportional to
/// the hypergeometric likelihood of observing `kw` winner ballots in a
/// draw of `n` from a pool with `t` winner ballots) and sums the weight for
/// `t <= half`. This is the canonical BRLA formulation referenced in §4.3.
pub fn posterior_pool_winner_at_most(kw: u64, kl: u64, pool_size: u64, half: u64) -> f64 {
    let n = kw + kl;
    if n == 0 || pool_size == 0 {
        // No data observed yet: posterior equals the prior mass of
        // {0, ..., half} under a discrete uniform over {0, ..., pool_size}.
        return (half.min(pool_size) as f64 + 1.0) / (pool_size as f64 + 1.0);
    }
    // log-likelihood of observing kw winner draws given a true pool tally
    // of t, for each candidate t in 0..=pool_size, via the hypergeometric pmf.
    let log_likelihoods: Vec<f64> = (0..=pool_size)
        .map(|t| hypergeom_log_pmf(kw, pool_size, t, n))
        .collect();
    let max_ll = log_likelihoods.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max_ll.is_finite() {
        return 0.0;
    }
    let weights: Vec<f64> = log_likelihoods.iter().map(|ll| (ll - max_ll).exp()).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let numerator: f64 = weights[..=(half.min(pool_size) as usize)].iter().sum();
    (numerator / total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posterior_share_at_most_is_probability() {
        for (kw, kl) in [(10, 5), (0, 0), (1000, 1), (1, 1000)] {
            let p = posterior_share_at_most(kw, kl, 0.5);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn posterior_share_symmetric_at_even_split() {
        let p = posterior_share_at_most(20, 20, 0.5);
        assert!((p - 0.5).abs() < 1e-9, "p={p}");
    }

    #[test]
    fn posterior_share_decreases_with_more_winner_evidence() {
        let weak = posterior_share_at_most(11, 9, 0.5);
        let strong = posterior_share_at_most(70, 30, 0.5);
        assert!(strong < weak);
    }

    #[test]
    fn posterior_pool_no_data_is_discrete_uniform_prior() {
        let p = posterior_pool_winner_at_most(0, 0, 100, 50);
        assert!((p - 51.0 / 101.0).abs() < 1e-9, "p={p}");
    }

    #[test]
    fn posterior_pool_favors_winner_when_sample_is_lopsided() {
        // 175 winner ballots, 25 loser ballots out of a 1000-ballot pool:
        // posterior that the true pool tally is <= 500 should be tiny.
        let p = posterior_pool_winner_at_most(175, 25, 1000, 500);
        assert!(p < 0.01, "p={p}");
    }

    #[test]
    fn posterior_pool_is_probability() {
        let p = posterior_pool_winner_at_most(30, 20, 200, 100);
        assert!((0.0..=1.0).contains(&p));
    }
}
