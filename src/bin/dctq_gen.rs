//! dctq_gen: build an input document from a synthetic frame.
//!
//! Usage:
//!   dctq_gen --out <json> [--width 1280] [--height 720] [--reshape 160]
//!            [--pattern random|gradient|flat] [--seed N]
//!
//! The frame is reshaped to `--reshape`-pixel rows (each source row becomes
//! `width / reshape` consecutive rows), encoded with the reference DCTQ
//! encoder and packed ten pixels per element.

#![forbid(unsafe_code)]

use std::env;

use anyhow::{anyhow, bail};
use dctq_fold::{
    config::{self, CHANNELS},
    reference::{self, CoefficientStats, PixelRows},
    DctqConfig, ImageInput,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::info;

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}

fn parse_usize(args: &[String], key: &str, default: usize) -> anyhow::Result<usize> {
    match parse_flag(args, key) {
        Some(s) => s.parse::<usize>().map_err(|e| anyhow!("{key}: `{s}` ({e})")),
        None => Ok(default),
    }
}

fn synth_frame(pattern: &str, width: usize, height: usize, seed: u64) -> anyhow::Result<PixelRows> {
    let mut rng = StdRng::seed_from_u64(seed);
    let frame = match pattern {
        "random" => (0..height)
            .map(|_| (0..width).map(|_| rng.gen::<[u8; CHANNELS]>()).collect())
            .collect(),
        "gradient" => (0..height)
            .map(|r| {
                (0..width)
                    .map(|c| {
                        [
                            (c * 255 / width.max(1)) as u8,
                            (r * 255 / height.max(1)) as u8,
                            ((r + c) % 256) as u8,
                        ]
                    })
                    .collect()
            })
            .collect(),
        "flat" => {
            let px: [u8; CHANNELS] = rng.gen();
            vec![vec![px; width]; height]
        }
        other => bail!("unknown --pattern `{other}` (random|gradient|flat)"),
    };
    Ok(frame)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "dctq_fold=info".into()))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().collect();
    let out = parse_flag(&args, "--out").ok_or_else(|| anyhow!("missing --out <json>"))?;
    let width = parse_usize(&args, "--width", 1280)?;
    let height = parse_usize(&args, "--height", 720)?;
    let reshape = parse_usize(&args, "--reshape", 160)?;
    let seed = parse_usize(&args, "--seed", 0)? as u64;
    let pattern = parse_flag(&args, "--pattern").unwrap_or_else(|| "random".into());

    let frame = synth_frame(&pattern, width, height, seed)?;
    let tall = reference::reshape_rows(&frame, reshape)?;
    info!(width, height, reshape, rows = tall.len(), "frame reshaped");

    let encoded = reference::encode_image(&tall)?;
    let stats = CoefficientStats::of(&encoded);
    let input = ImageInput::new(reference::pack_image(&tall)?, reference::pack_image(&encoded)?)?;
    input.write_json_file(&out)?;

    let cfg = DctqConfig { packed_width: input.width(), ..DctqConfig::default() };
    println!("output         : {out}");
    println!("frame          : {width}x{height} ({pattern}, seed {seed})");
    println!("reshaped       : {}x{}", reshape, tall.len());
    println!("packed         : {} rows x {} elements", input.rows(), input.width());
    match cfg.validate() {
        Ok(()) => {
            println!("steps          : {} of {} rows", input.rows() / cfg.rows_per_step, cfg.rows_per_step);
            println!("circuit digest : {}", hex::encode(config::circuit_digest(&cfg)));
        }
        Err(e) => println!("steps          : n/a ({e})"),
    }
    println!("coefficients   : min {} max {}", stats.min, stats.max);
    println!("zero / nonzero : {} / {}", stats.zero, stats.nonzero);
    println!("sparsity       : {:.2}%", stats.sparsity());
    Ok(())
}
