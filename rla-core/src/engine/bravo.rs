// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! BRAVO: a sequential log-likelihood-ratio test (§4.5.4). Closed form
//! throughout; no bisection needed.

use serde::{Deserialize, Serialize};

use crate::engine::{stopping_prob_with_replacement, stopping_prob_without_replacement, AuditEngine, PairwiseTallies};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bravo {
    pub tallies: PairwiseTallies,
    pub with_replacement: bool,
}

impl Bravo {
    pub fn new(tallies: PairwiseTallies, with_replacement: bool) -> Self { Bravo { tallies, with_replacement } }

    pub(crate) fn p_a(&self) -> f64 { self.tallies.p_a() }
    const P_TIED: f64 = 0.5;

    fn log_likelihood_coeffs(&self) -> (f64, f64) {
        let p_a = self.p_a();
        let winner_coeff = (p_a / Self::P_TIED).ln();
        let loser_coeff = ((1.0 - p_a) / (1.0 - Self::P_TIED)).ln();
        (winner_coeff, loser_coeff)
    }

    /// The running log likelihood ratio Lambda after k winner ballots and
    /// (n - k) loser ballots.
    pub fn log_likelihood_ratio(&self, n: u64, k: u64) -> f64 {
        let (winner_coeff, loser_coeff) = self.log_likelihood_coeffs();
        (k as f64) * winner_coeff + ((n - k) as f64) * loser_coeff
    }
}

impl AuditEngine for Bravo {
    /// current_risk is 1 / exp(Lambda), capped at 1, per §4.4.
    fn p_value(&self, n: u64, k: u64) -> f64 {
        (-self.log_likelihood_ratio(n, k)).exp().min(1.0)
    }

    /// Closed form: smallest integer k with
    /// `k * winner_coeff + (n-k) * loser_coeff >= log(1/alpha)`.
    fn kmin(&self, n: u64, alpha: f64) -> Option<u64> {
        let (winner_coeff, loser_coeff) = self.log_likelihood_coeffs();
        let threshold = (1.0 / alpha).ln();
        // Lambda(k) = n*loser_coeff + k*(winner_coeff - loser_coeff), and
        // winner_coeff > loser_coeff whenever p_a > 1/2, so Lambda is
        // strictly increasing in k.
        let slope = winner_coeff - loser_coeff;
        if slope <= 0.0 {
            return None;
        }
        let k_real = (threshold - (n as f64) * loser_coeff) / slope;
        let k = k_real.ceil().max(0.0) as i128;
        if k > n as i128 {
            None
        } else {
            let k = k.max(0) as u64;
            Some(k)
        }
    }

    fn stopping_prob(&self, n: u64, alpha: f64) -> f64 {
        let kmin = self.kmin(n, alpha);
        if self.with_replacement {
            stopping_prob_with_replacement(kmin, n, self.p_a())
        } else {
            stopping_prob_without_replacement(kmin, n, self.tallies.pool, self.tallies.vw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tallies(vw: u64, vl: u64) -> PairwiseTallies { PairwiseTallies { vw, vl, pool: vw + vl } }

    #[test]
    fn p_value_in_unit_interval() {
        let e = Bravo::new(tallies(60, 40), true);
        for n in [1u64, 10, 100] {
            for k in 0..=n {
                let p = e.p_value(n, k);
                assert!((0.0..=1.0).contains(&p), "n={n} k={k} p={p}");
            }
        }
    }

    #[test]
    fn p_value_non_increasing_in_k() {
        let e = Bravo::new(tallies(60, 40), true);
        let n = 100;
        let mut prev = 1.0;
        for k in 0..=n {
            let p = e.p_value(n, k);
            assert!(p <= prev + 1e-9, "k={k} p={p} prev={prev}");
            prev = p;
        }
    }

    #[test]
    fn kmin_matches_direct_lambda_check_up_to_10000() {
        let e = Bravo::new(tallies(520, 480), true);
        let alpha = 0.1;
        let threshold = (1.0 / alpha).ln();
        for n in [10u64, 100, 1_000, 10_000] {
            let kmin = e.kmin(n, alpha);
            match kmin {
                Some(k) => {
                    assert!(e.log_likelihood_ratio(n, k) >= threshold - 1e-6, "n={n} k={k}");
                    if k > 0 {
                        assert!(e.log_likelihood_ratio(n, k - 1) < threshold + 1e-6, "n={n} k={k}");
                    }
                }
                None => {
                    assert!(e.log_likelihood_ratio(n, n) < threshold, "n={n}");
                }
            }
        }
    }

    #[test]
    fn s6_monotone_risk_under_increasing_winner_counts() {
        // S6: ten rounds of increasing winner counts consistent with p_a;
        // Lambda should be non-decreasing and risk non-increasing.
        let e = Bravo::new(tallies(600, 400), true);
        let mut prev_lambda = f64::NEG_INFINITY;
        let mut prev_risk = f64::INFINITY;
        for round in 1..=10u64 {
            let n = round * 50;
            let k = (n as f64 * 0.6).round() as u64; // consistent with p_a = 0.6
            let lambda = e.log_likelihood_ratio(n, k);
            let risk = e.p_value(n, k);
            assert!(lambda >= prev_lambda - 1e-9, "round={round}");
            assert!(risk <= prev_risk + 1e-9, "round={round}");
            prev_lambda = lambda;
            prev_risk = risk;
        }
    }

    #[test]
    fn without_replacement_does_not_change_kmin() {
        let with = Bravo::new(tallies(600, 400), true);
        let without = Bravo::new(tallies(600, 400), false);
        assert_eq!(with.kmin(100, 0.1), without.kmin(100, 0.1));
    }
}
