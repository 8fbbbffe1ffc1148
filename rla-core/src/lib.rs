// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The computational core of a risk-limiting audit (RLA) workbench:
//! contest modeling, the binomial/hypergeometric/Bayes numerical kernels,
//! the audit state machine, and the BRLA/Minerva/Athena/BRAVO engines that
//! plug into it.
//!
//! Everything outside this crate -- transcript persistence, the
//! interactive and bulk CLI drivers -- is thin glue built in `rla-cli`
//! over the contract exposed here.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

pub mod audit;
pub mod bayes;
pub mod contest;
pub mod dist;
pub mod engine;
pub mod solver;

use audit::{Audit, AuditParams, EngineTag};
use contest::{Contest, ContestType};

/// Every way a request to this crate's library contract can fail, per §7.
#[derive(thiserror::Error, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum RlaError {
    #[error("invalid contest: {reason}")]
    InvalidContest { reason: String },
    #[error("invalid audit parameters: {reason}")]
    InvalidAuditParams { reason: String },
    #[error("invalid round: {reason}")]
    InvalidRound { reason: String },
    #[error("numeric failure: {reason}")]
    NumericFailure { reason: String },
}

/// The plain JSON record a contest-file parses from, per §6: `{ballots,
/// tallies, winners, type}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContestRecord {
    pub ballots: u64,
    pub tallies: BTreeMap<String, u64>,
    pub winners: Vec<String>,
    #[serde(rename = "type")]
    pub contest_type: ContestType,
}

impl ContestRecord {
    pub fn into_contest(self) -> Result<Contest, RlaError> {
        Contest::make(self.ballots, self.tallies, self.winners, self.contest_type)
    }
}

/// The full construction request for an [`Audit`]: a contest record plus a
/// pairwise reduction and the chosen engine, the way `raire`'s
/// `RaireProblem` bundles a parsing-friendly input record with a
/// `solve`-style entry point (`lib.rs`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditProblem {
    pub contest: ContestRecord,
    pub winner: String,
    pub loser: String,
    pub params: AuditParams,
    pub engine: EngineTag,
}

impl AuditProblem {
    /// Build the [`Audit`] this problem describes. Mirrors
    /// `RaireProblem::solve`, but returns the live state machine rather
    /// than a one-shot solution: an `Audit` accumulates rounds over its
    /// lifetime instead of being solved once.
    pub fn build(self) -> Result<Audit, RlaError> {
        let contest = Rc::new(self.contest.into_contest()?);
        Audit::new(contest, self.winner, self.loser, self.params, self.engine)
    }
}
