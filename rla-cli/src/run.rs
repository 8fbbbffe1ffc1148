// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Shared round-execution loop used by both CLI modes (§4.8). The binary
//! owns I/O; this module owns nothing but the mechanical act of feeding a
//! schedule of observations through an [`Audit`].

use rla_core::audit::{Audit, RoundOutcome};
use rla_core::RlaError;

/// One scheduled round: a cumulative sample size and the cumulative
/// winner/loser ballot counts observed in it.
#[derive(Clone, Copy, Debug)]
pub struct RoundInput {
    pub n_cum: u64,
    pub kw_cum: u64,
    pub kl_cum: u64,
}

/// Feed `rounds` through `audit` in order via `execute_round`, stopping
/// early if the audit completes. Returns one [`RoundOutcome`] per round
/// actually executed.
pub fn run_audit_core(audit: &mut Audit, rounds: &[RoundInput]) -> Result<Vec<RoundOutcome>, RlaError> {
    let mut outcomes = Vec::with_capacity(rounds.len());
    for round in rounds {
        log::debug!("executing round n={} kw={} kl={}", round.n_cum, round.kw_cum, round.kl_cum);
        let outcome = audit.execute_round(round.n_cum, round.kw_cum, round.kl_cum)?;
        outcomes.push(outcome);
        if outcome.stopped {
            break;
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rla_core::audit::AuditParams;
    use rla_core::contest::{Contest, ContestType, UndervotePolicy};
    use rla_core::audit::EngineTag;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    #[test]
    fn core_stops_at_first_qualifying_round() {
        let tallies: BTreeMap<String, u64> = [("A".to_string(), 700), ("B".to_string(), 300)].into_iter().collect();
        let contest = Rc::new(Contest::make(1000, tallies, vec!["A".into()], ContestType::Plurality).unwrap());
        let params = AuditParams { alpha: 0.1, max_fraction: 0.2, undervote_policy: UndervotePolicy::ExcludeFromPool, with_replacement: true };
        let mut audit = Audit::new(contest, "A", "B", params, EngineTag::Brla).unwrap();
        let rounds = vec![
            RoundInput { n_cum: 100, kw_cum: 55, kl_cum: 45 },
            RoundInput { n_cum: 200, kw_cum: 175, kl_cum: 25 },
            RoundInput { n_cum: 300, kw_cum: 260, kl_cum: 40 },
        ];
        let outcomes = run_audit_core(&mut audit, &rounds).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[1].stopped);
    }

    #[test]
    fn core_propagates_invalid_round_error() {
        let tallies: BTreeMap<String, u64> = [("A".to_string(), 700), ("B".to_string(), 300)].into_iter().collect();
        let contest = Rc::new(Contest::make(1000, tallies, vec!["A".into()], ContestType::Plurality).unwrap());
        let params = AuditParams { alpha: 0.1, max_fraction: 0.2, undervote_policy: UndervotePolicy::ExcludeFromPool, with_replacement: true };
        let mut audit = Audit::new(contest, "A", "B", params, EngineTag::Brla).unwrap();
        let rounds = vec![RoundInput { n_cum: 500, kw_cum: 10, kl_cum: 600 }];
        assert!(run_audit_core(&mut audit, &rounds).is_err());
    }
}
