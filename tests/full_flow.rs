use ark_r1cs_std::{alloc::AllocVar, fields::fp::FpVar};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef};
use dctq_fold::{
    fold_image,
    reference::{build_input, encode_image, pack_image, PixelRows},
    synthesize_step, ByteDecompressor, DctqConfig, DctqStep, ImageInput, PoseidonHasher, StepState,
    StepStateVar, F,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const ROWS: usize = 24;
const COLS: usize = 40;

fn config() -> DctqConfig {
    DctqConfig::new(8, 4).expect("valid shape")
}

fn frame(seed: u64) -> PixelRows {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..ROWS)
        .map(|r| {
            (0..COLS)
                .map(|c| {
                    // Mix smooth structure with noise so both low and high
                    // frequencies carry non-zero coefficients.
                    let base = ((r * 9 + c * 5) % 200) as u8;
                    let noise: u8 = rng.gen_range(0..56);
                    [base + noise, 255 - base - noise / 2, rng.gen()]
                })
                .collect()
        })
        .collect()
}

fn alloc_rows(cs: &ConstraintSystemRef<F>, rows: &[Vec<F>]) -> Vec<Vec<FpVar<F>>> {
    rows.iter()
        .map(|r| r.iter().map(|v| FpVar::new_witness(cs.clone(), || Ok(*v)).unwrap()).collect())
        .collect()
}

fn run_steps(input: &ImageInput, initial: StepState) -> (StepState, Vec<bool>) {
    let cfg = config();
    let mut state = initial;
    let mut results = Vec::new();
    for (o, t) in input.steps(&cfg).unwrap() {
        let step = DctqStep::new(cfg, state, o.to_vec(), t.to_vec()).unwrap();
        state = step.next_state();
        let cs = ConstraintSystem::<F>::new_ref();
        step.generate_constraints(cs.clone()).unwrap();
        results.push(cs.is_satisfied().unwrap());
    }
    (state, results)
}

#[test]
fn sequential_steps_in_one_system_match_native_fold() {
    let cfg = config();
    let hasher = PoseidonHasher::new();
    let input = build_input(&frame(11)).unwrap();
    let initial = StepState::new(F::from(17u64), F::from(29u64));

    let cs = ConstraintSystem::<F>::new_ref();
    let mut state = StepStateVar::alloc_input(cs.clone(), Some(initial)).unwrap();
    for (o, t) in input.steps(&cfg).unwrap() {
        let ov = alloc_rows(&cs, o);
        let tv = alloc_rows(&cs, t);
        state = synthesize_step(cs.clone(), &cfg, &ByteDecompressor, &hasher, &state, &ov, &tv).unwrap();
    }
    assert!(cs.is_satisfied().unwrap());

    let native = fold_image(&hasher, initial, &input.original, &input.transformed, cfg.rows_per_step).unwrap();
    assert_eq!(state.value().unwrap(), native);
}

#[test]
fn encoded_frame_survives_json_and_every_step_is_satisfied() {
    let input = build_input(&frame(12)).unwrap();
    let reloaded = ImageInput::from_json_str(&input.to_json_string().unwrap()).unwrap();
    assert_eq!(reloaded, input);

    let (final_state, results) = run_steps(&reloaded, StepState::default());
    assert_eq!(results, vec![true; ROWS / 8]);

    let expected = fold_image(
        &PoseidonHasher::new(),
        StepState::default(),
        &input.original,
        &input.transformed,
        8,
    )
    .unwrap();
    assert_eq!(final_state, expected);
}

#[test]
fn tampered_sample_fails_only_its_own_step() {
    let pixels = frame(13);
    let mut encoded = encode_image(&pixels).unwrap();
    // Row 12 lives in the second step; push one coefficient well outside
    // its tolerance band.
    let px = &mut encoded[12][17][2];
    *px = if *px < 128 { *px + 9 } else { *px - 9 };
    let input = ImageInput::new(pack_image(&pixels).unwrap(), pack_image(&encoded).unwrap()).unwrap();

    let (_, results) = run_steps(&input, StepState::default());
    assert_eq!(results, vec![true, false, true]);
}

#[test]
fn different_frames_or_seeds_give_different_commitments() {
    let a = build_input(&frame(14)).unwrap();
    let b = build_input(&frame(15)).unwrap();
    let (sa, _) = run_steps(&a, StepState::default());
    let (sb, _) = run_steps(&b, StepState::default());
    assert_ne!(sa.orig, sb.orig);
    assert_ne!(sa.tran, sb.tran);

    let (sa2, ok) = run_steps(&a, StepState::new(F::from(1u64), F::from(1u64)));
    assert!(ok.iter().all(|&x| x));
    assert_ne!(sa, sa2);
}
