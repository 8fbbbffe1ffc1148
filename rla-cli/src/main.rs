// Copyright 2023 Andrew Conway.
// Based on software (c) Michelle Blom in C++ https://github.com/michelleblom/audit-irv-cp/tree/raire-branch
// documented in https://arxiv.org/pdf/1903.08804.pdf
//
// This file is part of raire-rs.
// raire-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// raire-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.

//! Interactive and bulk drivers over `rla-core`'s `Audit` state machine
//! (§4.8). This binary owns I/O only; all statistical logic lives in
//! `rla-core`, the same separation the teacher draws between `raire` and
//! `utilities`.

mod run;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;

use rla_core::audit::{Audit, AuditParams, EngineTag, Round};
use rla_core::contest::{Contest, ContestType, UndervotePolicy};
use rla_core::solver::SolveOutcome;

use run::{run_audit_core, RoundInput};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Drives a risk-limiting audit interactively, or replays a fixed round
/// schedule in bulk mode.
struct CliOptions {
    /// Contest/audit-problem JSON file. Required in bulk mode; ignored
    /// (prompted for instead) in interactive mode.
    contest_json: Option<PathBuf>,

    /// Bulk round schedule as cumulative sample sizes, e.g. "100 200 300".
    /// Supplying this selects bulk mode.
    #[arg(short = 'l', long = "schedule")]
    schedule: Option<String>,

    /// Cumulative winner-ballot counts matching --schedule, space separated.
    #[arg(long = "winner-counts")]
    winner_counts: Option<String>,

    /// Cumulative loser-ballot counts matching --schedule, space separated.
    #[arg(long = "loser-counts")]
    loser_counts: Option<String>,

    /// Where to write the transcript JSON. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env().format_timestamp_millis().init();
    let args = CliOptions::parse();

    let transcript = if args.schedule.is_some() {
        run_bulk(&args)?
    } else {
        match run_interactive() {
            Ok(transcript) => transcript,
            Err(e) => {
                eprintln!("aborted: {e}");
                std::process::exit(1);
            }
        }
    };

    write_transcript(&args.output, &transcript)?;
    Ok(())
}

fn write_transcript(output: &Option<PathBuf>, transcript: &[Round]) -> anyhow::Result<()> {
    match output {
        Some(path) => serde_json::to_writer_pretty(File::create(path)?, transcript)?,
        None => println!("{}", serde_json::to_string_pretty(transcript)?),
    }
    Ok(())
}

fn parse_u64_list(s: &str) -> anyhow::Result<Vec<u64>> {
    s.split_whitespace().map(|tok| tok.parse::<u64>().map_err(Into::into)).collect()
}

fn run_bulk(args: &CliOptions) -> anyhow::Result<Vec<Round>> {
    let contest_path = args.contest_json.as_ref().ok_or_else(|| anyhow::anyhow!("bulk mode requires a contest JSON file"))?;
    let schedule = args.schedule.as_deref().ok_or_else(|| anyhow::anyhow!("run_bulk requires --schedule"))?;
    let problem: rla_core::AuditProblem = serde_json::from_reader(File::open(contest_path)?)?;
    let mut audit = problem.build()?;

    let sizes = parse_u64_list(schedule)?;
    let winners = parse_u64_list(args.winner_counts.as_deref().unwrap_or_default())?;
    let losers = parse_u64_list(args.loser_counts.as_deref().unwrap_or_default())?;
    if sizes.len() != winners.len() || sizes.len() != losers.len() {
        anyhow::bail!("--schedule, --winner-counts and --loser-counts must list the same number of rounds");
    }

    let rounds: Vec<RoundInput> = sizes
        .into_iter()
        .zip(winners)
        .zip(losers)
        .map(|((n_cum, kw_cum), kl_cum)| RoundInput { n_cum, kw_cum, kl_cum })
        .collect();

    run_audit_core(&mut audit, &rounds)?;
    Ok(audit.transcript().to_vec())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    let read = std::io::stdin().read_line(&mut line)?;
    if read == 0 {
        anyhow::bail!("input stream ended");
    }
    Ok(line.trim().to_string())
}

fn prompt_u64(label: &str) -> anyhow::Result<u64> {
    Ok(prompt(label)?.parse()?)
}

fn prompt_f64(label: &str) -> anyhow::Result<f64> {
    Ok(prompt(label)?.parse()?)
}

fn prompt_yes_no(label: &str) -> anyhow::Result<bool> {
    loop {
        match prompt(&format!("{label} (y/n)"))?.to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("please answer y or n"),
        }
    }
}

fn prompt_engine_tag() -> anyhow::Result<EngineTag> {
    loop {
        match prompt("Audit type (brla/minerva/athena/bravo)")?.to_lowercase().as_str() {
            "brla" => return Ok(EngineTag::Brla),
            "minerva" => return Ok(EngineTag::Minerva),
            "athena" => {
                let delta = prompt_f64("Athena delta")?;
                return Ok(EngineTag::Athena { delta });
            }
            "bravo" => return Ok(EngineTag::Bravo),
            _ => println!("unrecognized audit type"),
        }
    }
}

fn prompt_contest() -> anyhow::Result<Contest> {
    let ballots = prompt_u64("Total ballots cast")?;
    let num_candidates = prompt_u64("Number of candidates")?;
    let mut tallies = BTreeMap::new();
    for i in 0..num_candidates {
        let name = prompt(&format!("Name of candidate {}", i + 1))?;
        let tally = prompt_u64(&format!("Reported tally for {name}"))?;
        tallies.insert(name, tally);
    }
    let num_winners = prompt_u64("Number of winners")?;
    let mut winners = Vec::with_capacity(num_winners as usize);
    for i in 0..num_winners {
        winners.push(prompt(&format!("Name of winner {}", i + 1))?);
    }
    let contest_type = loop {
        match prompt("Contest type (PLURALITY/MAJORITY)")?.to_uppercase().as_str() {
            "PLURALITY" => break ContestType::Plurality,
            "MAJORITY" => break ContestType::Majority,
            _ => println!("unrecognized contest type"),
        }
    };
    Ok(Contest::make(ballots, tallies, winners, contest_type)?)
}

fn run_interactive() -> anyhow::Result<Vec<Round>> {
    let engine_tag = prompt_engine_tag()?;
    let alpha = prompt_f64("Risk limit alpha")?;
    let max_fraction = prompt_f64("Maximum fraction of ballots to sample")?;
    let contest = Rc::new(prompt_contest()?);
    let winner = prompt("Reported winner for this pairwise audit")?;
    let loser = prompt("Reported loser for this pairwise audit")?;

    // with_replacement defaults to true (the canonical form) in interactive
    // mode rather than adding another prompt; bulk/JSON mode can still set
    // it explicitly per audit via the contest-problem file.
    let params = AuditParams { alpha, max_fraction, undervote_policy: UndervotePolicy::ExcludeFromPool, with_replacement: true };
    let mut audit = Audit::new(contest, winner.clone(), loser.clone(), params, engine_tag)?;

    loop {
        if prompt_yes_no("Recommend a sample size")? {
            let target = prompt_f64("Target stopping probability")?;
            match audit.next_sample_size(target) {
                SolveOutcome::Found(n) => println!("Recommended next sample size: {n}"),
                SolveOutcome::Unattainable { best_probability } => {
                    println!("No feasible sample size reaches that target (best achievable: {best_probability:.6})");
                }
            }
        }

        let n_cum = prompt_u64("Enter next sample size (as a running total)")?;
        let kw_cum = prompt_u64(&format!("Enter total number of votes for {winner} found in sample"))?;
        let kl_cum = prompt_u64(&format!("Enter total number of votes for {loser} found in sample"))?;

        let round = RoundInput { n_cum, kw_cum, kl_cum };
        let outcome = match run_audit_core(&mut audit, std::slice::from_ref(&round)) {
            Ok(outcomes) => *outcomes.last().expect("run_audit_core returns one outcome per round given"),
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        println!("Stopping Condition Met? {}", if outcome.stopped { "True" } else { "False" });
        if !outcome.stopped {
            if prompt_yes_no("Would you like to force stop the audit")? {
                audit.force_stop()?;
                break;
            }
        } else {
            break;
        }
    }

    Ok(audit.transcript().to_vec())
}
