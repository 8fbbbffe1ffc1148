// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Minerva: a ratio-of-tail-probabilities ballot-polling test (§4.5.2).

use serde::{Deserialize, Serialize};

use crate::dist::binom_sf;
use crate::engine::{
    bisect_kmin, stopping_prob_with_replacement, stopping_prob_without_replacement, AuditEngine, PairwiseTallies,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Minerva {
    pub tallies: PairwiseTallies,
    /// Usually `true` for the canonical form (ballots drawn with
    /// replacement from the announced-truth world).
    pub with_replacement: bool,
}

impl Minerva {
    pub fn new(tallies: PairwiseTallies, with_replacement: bool) -> Self { Minerva { tallies, with_replacement } }

    pub(crate) fn p_a(&self) -> f64 { self.tallies.p_a() }
    const P_TIED: f64 = 0.5;

    /// The Minerva ratio Binom-sf(k; n, 1/2) / Binom-sf(k; n, p_a).
    pub(crate) fn ratio(&self, n: u64, k: u64) -> f64 {
        let denom = binom_sf(k, n, self.p_a());
        let numer = binom_sf(k, n, Self::P_TIED);
        if denom <= 0.0 {
            if numer <= 0.0 { 0.0 } else { f64::INFINITY }
        } else {
            numer / denom
        }
    }
}

impl AuditEngine for Minerva {
    fn p_value(&self, n: u64, k: u64) -> f64 {
        self.ratio(n, k).min(1.0)
    }

    /// Smallest k for which the ratio <= alpha, found by binary search: the
    /// ratio is non-increasing in k because the announced share p_a > 1/2
    /// makes the numerator's tail decay slower than the denominator's.
    fn kmin(&self, n: u64, alpha: f64) -> Option<u64> {
        bisect_kmin(n, alpha, |k| self.ratio(n, k))
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
