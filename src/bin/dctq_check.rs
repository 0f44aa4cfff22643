//! dctq_check: synthesize every step of an input document and report.
//!
//! Usage:
//!   dctq_check --input <json> [--rows-per-step N] [--packed-width W]
//!              [--state-in <hex,hex>] [--steps K] [--expect-state <hex,hex>]
//!
//! Each step runs in a fresh constraint system. The state is threaded from
//! step to step; the final pair is printed as hex. Exits non-zero if any
//! step is unsatisfiable or the final state differs from `--expect-state`.
//!
//! Defaults come from `DCTQ_ROWS_PER_STEP` / `DCTQ_PACKED_WIDTH`; the packed
//! width falls back to the width of the input document.

#![forbid(unsafe_code)]

use std::{env, time::Instant};

use anyhow::{anyhow, bail, Context};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use dctq_fold::{
    config::{self, ENV_PACKED_WIDTH},
    input::{fe_from_hex, fe_to_hex},
    ByteDecompressor, DctqConfig, DctqStep, ImageInput, PoseidonHasher, StepState, F,
};
use tracing::{info, warn};

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn parse_usize(key: &str, s: &str) -> anyhow::Result<usize> {
    s.parse::<usize>().map_err(|e| anyhow!("{key}: `{s}` is not an unsigned integer ({e})"))
}

fn parse_state(key: &str, s: &str) -> anyhow::Result<StepState> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| anyhow!("{key}: expected `<hex>,<hex>`"))?;
    let parse = |v: &str| fe_from_hex(v.trim()).map_err(|e| anyhow!("{key}: `{v}` ({e:?})"));
    Ok(StepState::new(parse(a)?, parse(b)?))
}

fn fmt_state(s: &StepState) -> String {
    format!("{},{}", fe_to_hex(s.orig), fe_to_hex(s.tran))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "dctq_fold=info".into()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();
    let input_path = parse_flag(&args, "--input").ok_or_else(|| anyhow!("missing --input <json>"))?;

    let raw = std::fs::read(&input_path).with_context(|| format!("read {input_path}"))?;
    let input = ImageInput::from_json_str(std::str::from_utf8(&raw).context("input is not utf-8")?)?;

    let mut cfg = DctqConfig::from_env()?;
    if env::var(ENV_PACKED_WIDTH).is_err() {
        cfg.packed_width = input.width();
    }
    if let Some(v) = parse_flag(&args, "--rows-per-step") {
        cfg.rows_per_step = parse_usize("--rows-per-step", &v)?;
    }
    if let Some(v) = parse_flag(&args, "--packed-width") {
        cfg.packed_width = parse_usize("--packed-width", &v)?;
    }
    cfg.validate()?;

    let mut state = match parse_flag(&args, "--state-in") {
        Some(v) => parse_state("--state-in", &v)?,
        None => StepState::default(),
    };
    let expect = parse_flag(&args, "--expect-state")
        .map(|v| parse_state("--expect-state", &v))
        .transpose()?;

    let total = input.rows() / cfg.rows_per_step.max(1);
    let limit = match parse_flag(&args, "--steps") {
        Some(v) => parse_usize("--steps", &v)?.min(total),
        None => total,
    };

    println!("input          : {input_path}");
    println!("input digest   : {}", blake3::hash(&raw).to_hex());
    println!("image          : {} rows x {} packed", input.rows(), input.width());
    println!("step shape     : {} rows x {} packed ({} blocks)", cfg.rows_per_step, cfg.packed_width, cfg.blocks_per_step());
    println!("circuit digest : {}", hex::encode(config::circuit_digest(&cfg)));
    println!("state in       : {}", fmt_state(&state));
    println!("steps          : {limit} of {total}");

    let hasher = PoseidonHasher::new();
    let started = Instant::now();
    let mut failed = Vec::new();
    for (i, (orig, tran)) in input.steps(&cfg)?.take(limit).enumerate() {
        let step = DctqStep::with_parts(cfg, ByteDecompressor, hasher.clone(), state, orig.to_vec(), tran.to_vec())?;
        let next = step.next_state();

        let cs = ConstraintSystem::<F>::new_ref();
        let t0 = Instant::now();
        step.generate_constraints(cs.clone())
            .map_err(|e| anyhow!("step {i}: synthesis failed: {e}"))?;
        let ok = cs.is_satisfied().map_err(|e| anyhow!("step {i}: {e}"))?;
        if ok {
            info!(step = i, constraints = cs.num_constraints(), ms = t0.elapsed().as_millis() as u64, "step ok");
        } else {
            let at = cs.which_is_unsatisfied().ok().flatten().unwrap_or_default();
            warn!(step = i, constraints = cs.num_constraints(), first_failure = %at, "step unsatisfied");
            failed.push(i);
        }
        println!("step {i:>5}: constraints={} satisfied={ok}", cs.num_constraints());
        state = next;
    }

    println!("state out      : {}", fmt_state(&state));
    println!("elapsed        : {:.2?}", started.elapsed());

    if !failed.is_empty() {
        bail!("{} of {limit} step(s) unsatisfied: {failed:?}", failed.len());
    }
    if let Some(want) = expect {
        if want != state {
            bail!("final state {} does not match expected {}", fmt_state(&state), fmt_state(&want));
        }
        println!("expected state : match");
    }
    Ok(())
}
