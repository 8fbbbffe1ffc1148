// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The contest model: reported tallies, declared winners, and the pairwise
//! winner/loser reduction that every audit engine operates on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::RlaError;

/// How undervotes (ballots not counted for any candidate) are folded into a
/// pairwise reduction. See the Athena/BRLA open question in DESIGN.md.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UndervotePolicy {
    /// Undervotes count for neither the winner nor the loser; the pairwise
    /// pool is reduced to `Vw + Vl`. This is the default and matches the
    /// canonical BRLA formulation.
    ExcludeFromPool,
    /// Undervotes remain in the pool, i.e. the pairwise pool is the full
    /// contest size `N`.
    IncludeInPool,
}

impl Default for UndervotePolicy {
    fn default() -> Self { UndervotePolicy::ExcludeFromPool }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContestType {
    Plurality,
    Majority,
}

/// A single race: reported tallies, the total number of ballots cast, and
/// the declared winner(s). Read-only once constructed; shared by reference
/// from an [`crate::audit::Audit`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contest {
    ballots: u64,
    tallies: BTreeMap<String, u64>,
    winners: Vec<String>,
    contest_type: ContestType,
}

impl Contest {
    /// Construct a contest, checking the invariants in §3 of the spec:
    /// tallies sum to at most `ballots`, every winner is a known candidate
    /// with a strictly positive tally, and the declared winner(s) actually
    /// beat every non-winner under `contest_type`.
    pub fn make(
        ballots: u64,
        tallies: BTreeMap<String, u64>,
        winners: Vec<String>,
        contest_type: ContestType,
    ) -> Result<Contest, RlaError> {
        if ballots == 0 {
            return Err(RlaError::InvalidContest { reason: "a contest must have at least one ballot".into() });
        }
        if winners.is_empty() {
            return Err(RlaError::InvalidContest { reason: "a contest must declare at least one winner".into() });
        }
        let tally_sum: u64 = tallies.values().sum();
        if tally_sum > ballots {
            return Err(RlaError::InvalidContest { reason: format!("tallies sum to {tally_sum} which exceeds {ballots} ballots") });
        }
        for w in &winners {
            match tallies.get(w) {
                None => return Err(RlaError::InvalidContest { reason: format!("declared winner {w:?} is not in tallies") }),
                Some(0) => return Err(RlaError::InvalidContest { reason: format!("declared winner {w:?} has a non-positive tally") }),
                Some(_) => {}
            }
        }
        match contest_type {
            ContestType::Plurality => {
                for (name, tally) in &tallies {
                    if winners.contains(name) { continue; }
                    for w in &winners {
                        let w_tally = tallies[w];
                        if w_tally <= *tally {
                            return Err(RlaError::InvalidContest { reason: format!("winner {w:?} ({w_tally}) does not strictly exceed {name:?} ({tally})") });
                        }
                    }
                }
            }
            ContestType::Majority => {
                for w in &winners {
                    let w_tally = tallies[w];
                    // strict majority of N, comparing 2*tally > ballots to avoid float rounding.
                    if 2 * w_tally <= ballots {
                        return Err(RlaError::InvalidContest { reason: format!("winner {w:?} ({w_tally}) does not hold a strict majority of {ballots}") });
                    }
                }
            }
        }
        Ok(Contest { ballots, tallies, winners, contest_type })
    }

    pub fn ballots(&self) -> u64 { self.ballots }
    pub fn tallies(&self) -> &BTreeMap<String, u64> { &self.tallies }
    pub fn winners(&self) -> &[String] { &self.winners }
    pub fn contest_type(&self) -> ContestType { self.contest_type }

    /// Reduce to a pairwise reported winner vs. reported loser comparison.
    /// Returns `(Vw, Vl, pool)` with `Vw > Vl` guaranteed, where `pool` is
    /// the denominator used for the reported margin per `policy`.
    pub fn pairwise(&self, winner: &str, loser: &str, policy: UndervotePolicy) -> Result<(u64, u64, u64), RlaError> {
        let vw = *self.tallies.get(winner).ok_or_else(|| RlaError::InvalidContest { reason: format!("{winner:?} is not a candidate in this contest") })?;
        let vl = *self.tallies.get(loser).ok_or_else(|| RlaError::InvalidContest { reason: format!("{loser:?} is not a candidate in this contest") })?;
        if vw == vl {
            return Err(RlaError::InvalidContest { reason: format!("{winner:?} and {loser:?} are tied at {vw}") });
        }
        if vw < vl {
            return Err(RlaError::InvalidContest { reason: format!("{winner:?} ({vw}) does not lead {loser:?} ({vl})") });
        }
        let pool = match policy {
            UndervotePolicy::ExcludeFromPool => vw + vl,
            UndervotePolicy::IncludeInPool => self.ballots,
        };
        Ok((vw, vl, pool))
    }

    /// The reported pairwise margin m = (Vw - Vl) / N for the given pair.
    pub fn margin(&self, winner: &str, loser: &str) -> Result<f64, RlaError> {
        let (vw, vl, _) = self.pairwise(winner, loser, UndervotePolicy::ExcludeFromPool)?;
        Ok((vw as f64 - vl as f64) / self.ballots as f64)
    }
}
