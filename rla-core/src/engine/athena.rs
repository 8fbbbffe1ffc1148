// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Athena: Minerva generalized by a delta shape parameter (§4.5.3).
//!
//! Resolution of the open question recorded in DESIGN.md: the reference
//! ("tied") share used in the ratio's numerator is `1 / (1 + delta)`
//! instead of Minerva's fixed `1/2`, and the cutoff compared against the
//! ratio is `delta * alpha` instead of `alpha`. At `delta = 1` both reduce
//! exactly to Minerva's rule.

use serde::{Deserialize, Serialize};

use crate::dist::binom_sf;
use crate::engine::{
    bisect_kmin, stopping_prob_with_replacement, stopping_prob_without_replacement, AuditEngine, PairwiseTallies,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Athena {
    pub tallies: PairwiseTallies,
    pub delta: f64,
    pub with_replacement: bool,
}

impl Athena {
    pub fn new(tallies: PairwiseTallies, delta: f64, with_replacement: bool) -> Self {
        Athena { tallies, delta, with_replacement }
    }

    pub(crate) fn p_a(&self) -> f64 { self.tallies.p_a() }

    fn p_reference(&self) -> f64 { 1.0 / (1.0 + self.delta) }

    fn cutoff(&self, alpha: f64) -> f64 { self.delta * alpha }

    pub(crate) fn ratio(&self, n: u64, k: u64) -> f64 {
        let denom = binom_sf(k, n, self.p_a());
        let numer = binom_sf(k, n, self.p_reference());
        if denom <= 0.0 {
            if numer <= 0.0 { 0.0 } else { f64::INFINITY }
        } else {
            numer / denom
        }
    }
}

impl AuditEngine for Athena {
    /// Per §4.4, Athena's current_risk is this round's ratio alone, with
    /// no carry from earlier rounds — the state machine enforces that by
    /// re-evaluating `p_value` fresh against the current cumulative
    /// (n, k) each round rather than tracking a running minimum.
    fn p_value(&self, n: u64, k: u64) -> f64 {
        self.ratio(n, k).min(1.0)
    }

    fn kmin(&self, n: u64, alpha: f64) -> Option<u64> {
        let cutoff = self.cutoff(alpha);
        bisect_kmin(n, cutoff, |k| self.ratio(n, k))
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
    fn delta_one_reduces_to_minerva() {
        use crate::engine::minerva::Minerva;
        let t = tallies(75, 25);
        let athena = Athena::new(t, 1.0, true);
        let minerva = Minerva::new(t, true);
        for n in [10u64, 50, 100] {
            for k in 0..=n {
                let a = athena.p_value(n, k);
                let m = minerva.p_value(n, k);
                assert!((a - m).abs() < 1e-9, "n={n} k={k} athena={a} minerva={m}");
            }
        }
    }

    #[test]
    fn p_value_in_unit_interval() {
        let e = Athena::new(tallies(75, 25), 1.0, true);
        for n in [10u64, 50, 100] {
            for k in 0..=n {
                let p = e.p_value(n, k);
                assert!((0.0..=1.0).contains(&p), "n={n} k={k} p={p}");
            }
        }
    }

    #[test]
    fn s3_athena_two_round_scenario() {
        // S3: 75/25 of 100000, alpha=0.1, delta=1.
        let e = Athena::new(PairwiseTallies { vw: 75_000, vl: 25_000, pool: 100_000 }, 1.0, true);
        let round1 = e.p_value(50, 31);
        assert!(round1 > 0.1, "round1={round1}");
        let round2 = e.p_value(100, 70);
        assert!(round2 <= 0.1, "round2={round2}");
    }
}
