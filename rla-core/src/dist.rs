// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Binomial and hypergeometric probability mass and tail evaluators.
//!
//! Everything here works in log-space internally so that it stays accurate
//! for n up to 1e6 and N up to 1e8, per §4.2 of the spec. Log-binomial
//! coefficients are built on `statrs`'s log-gamma, the way
//! `ChainSafe-forest`'s `block_prob.rs` leans on `statrs::function::gamma`
//! for the same purpose.

use statrs::function::gamma::ln_gamma;

/// log C(n, k), -infinity outside [0, n].
fn ln_binom_coeff(n: u64, k: u64) -> f64 {
    if k > n { return f64::NEG_INFINITY; }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

fn clamp01(p: f64) -> f64 { p.clamp(0.0, 1.0) }

/// log P(X = k) for X ~ Binomial(n, p).
pub fn binom_log_pmf(k: u64, n: u64, p: f64) -> f64 {
    if k > n { return f64::NEG_INFINITY; }
    if p <= 0.0 { return if k == 0 { 0.0 } else { f64::NEG_INFINITY }; }
    if p >= 1.0 { return if k == n { 0.0 } else { f64::NEG_INFINITY }; }
    ln_binom_coeff(n, k) + (k as f64) * p.ln() + ((n - k) as f64) * (1.0 - p).ln()
}

/// P(X = k) for X ~ Binomial(n, p).
pub fn binom_pmf(k: u64, n: u64, p: f64) -> f64 {
    clamp01(binom_log_pmf(k, n, p).exp())
}

/// P(X >= k) for X ~ Binomial(n, p), summed from the tail inward using the
/// stable incremental update
/// `log-pmf(j-1) = log-pmf(j) + log(j/(n-j+1)) + log((1-p)/p)`
/// stopping once terms are negligible relative to the running total, as
/// specified in §4.2.
pub fn binom_sf(k: u64, n: u64, p: f64) -> f64 {
    if k == 0 { return 1.0; }
    if k > n { return 0.0; }
    if p <= 0.0 { return 0.0; }
    if p >= 1.0 { return 1.0; }
    let log_odds = (p / (1.0 - p)).ln();
    let mut log_term = binom_log_pmf(n, n, p); // start at the top of the tail, j = n
    let mut total = log_term.exp();
    let mut j = n;
    while j > k {
        // pmf(j-1) = pmf(j) * (j / (n-j+1)) * ((1-p)/p), the stable incremental
        // update from §9 applied in the downward direction.
        log_term += (j as f64 / (n - j + 1) as f64).ln() - log_odds;
        j -= 1;
        let term = log_term.exp();
        if !term.is_finite() { continue; }
        total += term;
        if term < 1e-300 * total { break; }
    }
    clamp01(total)
}

/// log C(K, k) * C(N-K, n-k) - log C(N, n): log P(X = k) for
/// X ~ Hypergeometric(N, K, n) (population N, K successes, n draws).
pub fn hypergeom_log_pmf(k: u64, big_n: u64, big_k: u64, n: u64) -> f64 {
    if k > n || k > big_k { return f64::NEG_INFINITY; }
    let white_left = n - k;
    if white_left > big_n - big_k { return f64::NEG_INFINITY; }
    ln_binom_coeff(big_k, k) + ln_binom_coeff(big_n - big_k, white_left) - ln_binom_coeff(big_n, n)
}

/// P(X = k) for X ~ Hypergeometric(N, K, n).
pub fn hypergeom_pmf(k: u64, big_n: u64, big_k: u64, n: u64) -> f64 {
    clamp01(hypergeom_log_pmf(k, big_n, big_k, n).exp())
}

/// P(X >= k) for X ~ Hypergeometric(N, K, n), by direct summation of pmf
/// terms from `k` to the natural upper bound `min(n, K)`. Individual terms
/// use lgamma-based coefficients so this stays accurate even when `K` and
/// `N - K` differ by many orders of magnitude.
pub fn hypergeom_sf(k: u64, big_n: u64, big_k: u64, n: u64) -> f64 {
    let upper = n.min(big_k);
    if k > upper { return 0.0; }
    let mut total = 0.0f64;
    for j in k..=upper {
        total += hypergeom_pmf(j, big_n, big_k, n);
    }
    clamp01(total)
}
