// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! The audit state machine (§4.4): common round lifecycle shared by every
//! engine, transcript bookkeeping, and the stop/continue decision.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::contest::{Contest, UndervotePolicy};
use crate::engine::{AuditEngine, Engine, PairwiseTallies};
use crate::solver::{next_sample_size, SolveOutcome};
use crate::RlaError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditState {
    NotStarted,
    InProgress,
    CompleteStopped,
    CompleteExhausted,
    CompleteForced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoppingReason {
    None,
    RiskMet,
    Forced,
    ExceededMax,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Stop,
    Continue,
}

/// One immutable entry in an audit's transcript. Created by
/// [`Audit::execute_round`]; never mutated afterward.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Round {
    pub round: u32,
    pub size: u64,
    pub winner_ballots: u64,
    pub loser_ballots: u64,
    pub kmin: Option<u64>,
    pub risk: f64,
    pub decision: Decision,
    pub forced: bool,
}

/// The outcome of [`Audit::execute_round`], matching the library contract
/// in §6.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub stopped: bool,
    pub risk: f64,
    pub kmin: Option<u64>,
}

/// Parameters chosen once, at audit construction, and never revisited.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditParams {
    pub alpha: f64,
    pub max_fraction: f64,
    pub undervote_policy: UndervotePolicy,
    /// Whether the announced-truth world the engine's `stopping_prob`
    /// assumes draws ballots with replacement (Binomial) or without
    /// (Hypergeometric). Ignored by BRLA, which is always without
    /// replacement regardless of this flag.
    pub with_replacement: bool,
}

impl AuditParams {
    fn validate(&self) -> Result<(), RlaError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(RlaError::InvalidAuditParams { reason: format!("alpha must be in (0,1), got {}", self.alpha) });
        }
        if !(self.max_fraction > 0.0 && self.max_fraction <= 1.0) {
            return Err(RlaError::InvalidAuditParams { reason: format!("max_fraction must be in (0,1], got {}", self.max_fraction) });
        }
        Ok(())
    }
}

/// The audit state machine. Owns its transcript and every piece of mutable
/// state; the [`Contest`] it audits is read-only and shared by reference
/// (an `Rc`, so the same contest can back several pairwise audits at once).
#[derive(Clone, Debug)]
pub struct Audit {
    contest: Rc<Contest>,
    winner: String,
    loser: String,
    params: AuditParams,
    engine: Engine,
    transcript: Vec<Round>,
    state: AuditState,
    stopping_reason: StoppingReason,
    current_risk: f64,
    kmin_cache: HashMap<u64, Option<u64>>,
}

impl Audit {
    /// Construct an audit for the pairwise comparison `winner` vs. `loser`
    /// within `contest`, with the given engine tag and parameters.
    pub fn new(
        contest: Rc<Contest>,
        winner: impl Into<String>,
        loser: impl Into<String>,
        params: AuditParams,
        engine_tag: EngineTag,
    ) -> Result<Audit, RlaError> {
        params.validate()?;
        let winner = winner.into();
        let loser = loser.into();
        let (vw, vl, pool) = contest.pairwise(&winner, &loser, params.undervote_policy)?;
        let tallies = PairwiseTallies { vw, vl, pool };
        let with_replacement = params.with_replacement;
        let engine = match engine_tag {
            EngineTag::Brla => Engine::Brla(crate::engine::brla::Brla::new(tallies, contest.contest_type())),
            EngineTag::Minerva => Engine::Minerva(crate::engine::minerva::Minerva::new(tallies, with_replacement)),
            EngineTag::Athena { delta } => {
                if delta < 0.0 {
                    return Err(RlaError::InvalidAuditParams { reason: format!("delta must be >= 0, got {delta}") });
                }
                Engine::Athena(crate::engine::athena::Athena::new(tallies, delta, with_replacement))
            }
            EngineTag::Bravo => Engine::Bravo(crate::engine::bravo::Bravo::new(tallies, with_replacement)),
        };
        Ok(Audit {
            contest,
            winner,
            loser,
            params,
            engine,
            transcript: Vec::new(),
            state: AuditState::NotStarted,
            stopping_reason: StoppingReason::None,
            current_risk: 1.0,
            kmin_cache: HashMap::new(),
        })
    }

    pub fn state(&self) -> AuditState { self.state }
    pub fn stopping_reason(&self) -> StoppingReason { self.stopping_reason }
    pub fn current_risk(&self) -> f64 { self.current_risk }
    pub fn transcript(&self) -> &[Round] { &self.transcript }
    pub fn contest(&self) -> &Contest { &self.contest }

    fn n_max(&self) -> u64 {
        (self.contest.ballots() as f64 * self.params.max_fraction).floor() as u64
    }

    fn last_round(&self) -> Option<&Round> { self.transcript.last() }

    fn kmin_memoized(&mut self, n: u64) -> Option<u64> {
        if let Some(cached) = self.kmin_cache.get(&n) {
            return *cached;
        }
        let kmin = self.engine.kmin(n, self.params.alpha);
        self.kmin_cache.insert(n, kmin);
        kmin
    }

    /// Recommend the next cumulative sample size to hit `target_prob`
    /// stopping probability, per §4.6. Does not mutate the audit.
    pub fn next_sample_size(&self, target_prob: f64) -> SolveOutcome {
        next_sample_size(&self.engine, self.params.alpha, target_prob, self.n_max())
    }

    /// Record an observed round and return the stop/continue decision.
    /// See §4.4 for the full transition table.
    pub fn execute_round(
        &mut self,
        n_cum: u64,
        kw_cum: u64,
        kl_cum: u64,
    ) -> Result<RoundOutcome, RlaError> {
        match self.state {
            AuditState::InProgress | AuditState::NotStarted => {}
            _ => return Err(RlaError::InvalidRound { reason: "audit has already completed".into() }),
        }
        let (prev_n, prev_kw, prev_kl) = match self.last_round() {
            Some(r) => (r.size, r.winner_ballots, r.loser_ballots),
            None => (0, 0, 0),
        };
        if n_cum <= prev_n {
            return Err(RlaError::InvalidRound { reason: format!("round size {n_cum} must exceed the previous cumulative size {prev_n}") });
        }
        let n_max = self.n_max();
        if n_cum > n_max {
            return Err(RlaError::InvalidRound { reason: format!("round size {n_cum} exceeds the maximum of {n_max} ballots ({}x{})", self.params.max_fraction, self.contest.ballots()) });
        }
        if kw_cum < prev_kw || kl_cum < prev_kl {
            return Err(RlaError::InvalidRound { reason: "cumulative winner/loser counts must not decrease".into() });
        }
        let new_winner = kw_cum - prev_kw;
        let new_loser = kl_cum - prev_kl;
        let delta = n_cum - prev_n;
        if new_winner + new_loser > delta {
            return Err(RlaError::InvalidRound { reason: format!("{new_winner} new winner + {new_loser} new loser ballots exceed the {delta} new ballots drawn") });
        }
        if kw_cum + kl_cum > n_cum {
            return Err(RlaError::InvalidRound { reason: format!("winner+loser count {} exceeds round size {n_cum}", kw_cum + kl_cum) });
        }

        let risk = self.engine.p_value(n_cum, kw_cum);
        let kmin = self.kmin_memoized(n_cum);
        self.current_risk = risk;

        let stop = risk <= self.params.alpha;
        let decision = if stop { Decision::Stop } else { Decision::Continue };
        self.transcript.push(Round {
            round: self.transcript.len() as u32 + 1,
            size: n_cum,
            winner_ballots: kw_cum,
            loser_ballots: kl_cum,
            kmin,
            risk,
            decision,
            forced: false,
        });

        self.state = if stop {
            self.stopping_reason = StoppingReason::RiskMet;
            AuditState::CompleteStopped
        } else if n_cum == n_max {
            self.stopping_reason = StoppingReason::ExceededMax;
            AuditState::CompleteExhausted
        } else {
            AuditState::InProgress
        };

        Ok(RoundOutcome { stopped: stop, risk, kmin })
    }

    /// Force the audit to stop (e.g. a full hand recount was performed),
    /// valid only while [`AuditState::InProgress`] (or before the first
    /// round, while [`AuditState::NotStarted`]).
    pub fn force_stop(&mut self) -> Result<(), RlaError> {
        match self.state {
            AuditState::InProgress | AuditState::NotStarted => {}
            _ => return Err(RlaError::InvalidRound { reason: "can only force-stop an in-progress audit".into() }),
        }
        let (prev_n, prev_kw, prev_kl) = match self.last_round() {
            Some(r) => (r.size, r.winner_ballots, r.loser_ballots),
            None => (0, 0, 0),
        };
        self.transcript.push(Round {
            round: self.transcript.len() as u32 + 1,
            size: prev_n,
            winner_ballots: prev_kw,
            loser_ballots: prev_kl,
            kmin: None,
            risk: self.current_risk,
            decision: Decision::Stop,
            forced: true,
        });
        self.state = AuditState::CompleteForced;
        self.stopping_reason = StoppingReason::Forced;
        Ok(())
    }
}

/// Chooses which [`Engine`] an [`Audit`] uses, mirroring the `{"brla",
/// "minerva", "athena", "bravo"}` tags of §6.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineTag {
    Brla,
    Minerva,
    Athena { delta: f64 },
    Bravo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::ContestType;
    use std::collections::BTreeMap;

    fn contest(ballots: u64, pairs: &[(&str, u64)], winners: &[&str], ty: ContestType) -> Rc<Contest> {
        let tallies: BTreeMap<String, u64> = pairs.iter().map(|(n, c)| (n.to_string(), *c)).collect();
        Rc::new(Contest::make(ballots, tallies, winners.iter().map(|s| s.to_string()).collect(), ty).unwrap())
    }

    fn params(alpha: f64, max_fraction: f64) -> AuditParams {
        AuditParams { alpha, max_fraction, undervote_policy: UndervotePolicy::ExcludeFromPool, with_replacement: true }
    }

    #[test]
    fn s1_brla_confirms_70_30_contest() {
        let c = contest(1000, &[("A", 700), ("B", 300)], &["A"], ContestType::Plurality);
        let mut audit = Audit::new(c, "A", "B", params(0.1, 0.2), EngineTag::Brla).unwrap();
        let outcome = audit.execute_round(200, 175, 25).unwrap();
        assert!(outcome.stopped);
        assert_eq!(audit.state(), AuditState::CompleteStopped);
        assert_eq!(audit.stopping_reason(), StoppingReason::RiskMet);
    }

    #[test]
    fn s2_minerva_stops_at_observed_round() {
        let c = contest(100_000, &[("A", 60_000), ("B", 40_000)], &["A"], ContestType::Majority);
        let mut audit = Audit::new(c, "A", "B", params(0.1, 0.1), EngineTag::Minerva).unwrap();
        let outcome = audit.execute_round(100, 60, 40).unwrap();
        assert!(outcome.stopped);
    }

    #[test]
    fn s3_athena_requires_two_rounds() {
        let c = contest(100_000, &[("A", 75_000), ("B", 25_000)], &["A"], ContestType::Majority);
        let mut audit = Audit::new(c, "A", "B", params(0.1, 0.1), EngineTag::Athena { delta: 1.0 }).unwrap();
        let round1 = audit.execute_round(50, 31, 19).unwrap();
        assert!(!round1.stopped);
        assert_eq!(audit.state(), AuditState::InProgress);
        let round2 = audit.execute_round(100, 70, 30).unwrap();
        assert!(round2.stopped);
        assert_eq!(audit.state(), AuditState::CompleteStopped);
    }

    #[test]
    fn s4_exhaustion_when_no_round_size_stops_the_audit() {
        let c = contest(1000, &[("A", 505), ("B", 495)], &["A"], ContestType::Plurality);
        let mut audit = Audit::new(c, "A", "B", params(0.05, 0.05), EngineTag::Brla).unwrap();
        let n_max = audit.n_max();
        assert_eq!(n_max, 50);
        // Sample the full allowance with counts proportional to the reported
        // (nearly tied) tallies -- nowhere near enough evidence to stop.
        let outcome = audit.execute_round(n_max, 26, 24).unwrap();
        assert!(!outcome.stopped);
        assert_eq!(audit.state(), AuditState::CompleteExhausted);
        assert_eq!(audit.stopping_reason(), StoppingReason::ExceededMax);
    }

    #[test]
    fn s5_tie_is_rejected_at_contest_construction() {
        let err = Contest::make(
            1000,
            [("A".to_string(), 500), ("B".to_string(), 500)].into_iter().collect(),
            vec!["A".into()],
            ContestType::Plurality,
        );
        assert!(matches!(err, Err(RlaError::InvalidContest { .. })));
    }

    #[test]
    fn round_size_must_strictly_increase() {
        let c = contest(1000, &[("A", 700), ("B", 300)], &["A"], ContestType::Plurality);
        let mut audit = Audit::new(c, "A", "B", params(0.1, 0.5), EngineTag::Brla).unwrap();
        audit.execute_round(50, 35, 15).unwrap();
        let err = audit.execute_round(50, 36, 14);
        assert!(matches!(err, Err(RlaError::InvalidRound { .. })));
    }

    #[test]
    fn cannot_execute_round_after_completion() {
        let c = contest(1000, &[("A", 700), ("B", 300)], &["A"], ContestType::Plurality);
        let mut audit = Audit::new(c, "A", "B", params(0.1, 0.5), EngineTag::Brla).unwrap();
        audit.execute_round(200, 175, 25).unwrap();
        assert_eq!(audit.state(), AuditState::CompleteStopped);
        let err = audit.execute_round(300, 260, 40);
        assert!(matches!(err, Err(RlaError::InvalidRound { .. })));
    }

    #[test]
    fn force_stop_marks_transcript_and_state() {
        let c = contest(1000, &[("A", 700), ("B", 300)], &["A"], ContestType::Plurality);
        let mut audit = Audit::new(c, "A", "B", params(0.01, 0.5), EngineTag::Brla).unwrap();
        audit.execute_round(50, 35, 15).unwrap();
        assert_eq!(audit.state(), AuditState::InProgress);
        audit.force_stop().unwrap();
        assert_eq!(audit.state(), AuditState::CompleteForced);
        assert_eq!(audit.stopping_reason(), StoppingReason::Forced);
        assert!(audit.transcript().last().unwrap().forced);
        assert!(audit.force_stop().is_err());
    }

    #[test]
    fn invalid_alpha_is_rejected() {
        let c = contest(1000, &[("A", 700), ("B", 300)], &["A"], ContestType::Plurality);
        let err = Audit::new(c, "A", "B", params(1.5, 0.5), EngineTag::Brla);
        assert!(matches!(err, Err(RlaError::InvalidAuditParams { .. })));
    }
}
