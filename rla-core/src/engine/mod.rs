// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Risk/stopping-rule engines (§4.5): BRLA, Minerva, Athena and BRAVO, each
//! plugging into the [`crate::audit::Audit`] state machine through the
//! [`AuditEngine`] contract.
//!
//! The teacher dispatches audit-method variants through a
//! `#[serde(tag = "type")] enum Audit { BRAVO(..), MACRO(..), ... }`
//! (`audit_type.rs`) rather than trait objects; [`Engine`] follows the same
//! shape, replacing the original's class hierarchy with a tagged enum that
//! dispatches statically via `match` (§9).

pub mod athena;
pub mod bravo;
pub mod brla;
pub mod minerva;

use serde::{Deserialize, Serialize};

use crate::dist::{binom_sf, hypergeom_sf};

/// The contract every engine implements. `n` and `k` are always cumulative
/// sample size and cumulative winner-ballot count since the audit began.
pub trait AuditEngine {
    /// The engine's risk measure after a round with cumulative sample `n`
    /// and cumulative winner count `k`. In `[0, 1]`, non-increasing in `k`.
    fn p_value(&self, n: u64, k: u64) -> f64;

    /// Smallest `k* <= n` with `p_value(n, k*) <= alpha`, or `None` if no
    /// such `k*` exists.
    fn kmin(&self, n: u64, alpha: f64) -> Option<u64>;

    /// Probability, under the announced-truth world, that a fresh round of
    /// size `n` reaches `k >= kmin(n, alpha)`.
    fn stopping_prob(&self, n: u64, alpha: f64) -> f64;
}

/// Binary search for the smallest `k` in `[0, n]` with `p_value(n, k) <=
/// alpha`, exploiting that `p_value` is non-increasing in `k`. Shared by
/// every engine whose kmin is not available in closed form.
pub(crate) fn bisect_kmin(n: u64, alpha: f64, p_value: impl Fn(u64) -> f64) -> Option<u64> {
    if p_value(n) > alpha {
        return None; // not even a full round of winner ballots would stop the audit.
    }
    let mut lo = 0u64; // known: p_value(lo) may be > alpha
    let mut hi = n; // known: p_value(hi) <= alpha
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if p_value(mid) <= alpha {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    Some(hi)
}

/// Stopping probability for an engine whose announced-truth world draws
/// with replacement (Binomial(n, p_a)): every engine here except BRLA.
pub(crate) fn stopping_prob_with_replacement(kmin: Option<u64>, n: u64, p_a: f64) -> f64 {
    match kmin {
        None => 0.0,
        Some(k) => binom_sf(k, n, p_a),
    }
}

/// Stopping probability for BRLA's without-replacement announced-truth
/// world (Hypergeometric(pool, vw, n)).
pub(crate) fn stopping_prob_without_replacement(kmin: Option<u64>, n: u64, pool: u64, vw: u64) -> f64 {
    match kmin {
        None => 0.0,
        Some(k) => hypergeom_sf(k, pool, vw, n),
    }
}

/// The reported pairwise data every engine needs: announced winner and
/// loser tallies and the pool size their margin is measured against.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PairwiseTallies {
    pub vw: u64,
    pub vl: u64,
    pub pool: u64,
}

impl PairwiseTallies {
    /// The announced winner share p_a = Vw / (Vw + Vl).
    pub fn p_a(&self) -> f64 {
        self.vw as f64 / (self.vw + self.vl) as f64
    }
}

/// The engine selected for an audit, tagged the way `raire`'s `Audit` enum
/// is, and carrying its own parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Engine {
    #[serde(rename = "brla")]
    Brla(brla::Brla),
    #[serde(rename = "minerva")]
    Minerva(minerva::Minerva),
    #[serde(rename = "athena")]
    Athena(athena::Athena),
    #[serde(rename = "bravo")]
    Bravo(bravo::Bravo),
}

impl AuditEngine for Engine {
    fn p_value(&self, n: u64, k: u64) -> f64 {
        match self {
            Engine::Brla(e) => e.p_value(n, k),
            Engine::Minerva(e) => e.p_value(n, k),
            Engine::Athena(e) => e.p_value(n, k),
            Engine::Bravo(e) => e.p_value(n, k),
        }
    }

    fn kmin(&self, n: u64, alpha: f64) -> Option<u64> {
        match self {
            Engine::Brla(e) => e.kmin(n, alpha),
            Engine::Minerva(e) => e.kmin(n, alpha),
            Engine::Athena(e) => e.kmin(n, alpha),
            Engine::Bravo(e) => e.kmin(n, alpha),
        }
    }

    fn stopping_prob(&self, n: u64, alpha: f64) -> f64 {
        match self {
            Engine::Brla(e) => e.stopping_prob(n, alpha),
            Engine::Minerva(e) => e.stopping_prob(n, alpha),
            Engine::Athena(e) => e.stopping_prob(n, alpha),
            Engine::Bravo(e) => e.stopping_prob(n, alpha),
        }
    }
}
