use std::{sync::Arc, time::Duration};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use guided_fsm::{
    build_odd_zeros_fsm, config::Config, generate, get_valid_tokens, Engine, EngineLike,
    UniformSampler, Vocabulary, EVEN, ODD,
};
use rand::SeedableRng;

/// Builds a vocabulary of every binary string of length 1 to `max_len`, with end-of-sequence as ID 0.
fn binary_vocab(max_len: usize) -> Vocabulary {
    let mut tokens = vec![(0, "[EOS]".to_string())];
    let mut id = 1u32;
    for len in 1..=max_len {
        for bits in 0..(1u32 << len) {
            tokens.push((id, format!("{:0width$b}", bits, width = len)));
            id += 1;
        }
    }
    Vocabulary::new(tokens, 0).unwrap()
}

fn run_an_engine(engine: &mut Engine, logits: &mut [f32]) {
    engine.compute_allowed_token_ids();
    let token_id = engine.allowed_token_ids()[0];
    let _ = engine.update_logits(token_id, logits).unwrap();
    engine.reset();
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut c = c.benchmark_group("Simple");
    c.measurement_time(Duration::from_secs(10)).sample_size(100);
    let (fsm, _) = build_odd_zeros_fsm();
    let vocab = binary_vocab(12);
    c.bench_function("filter 8k binary tokens from EVEN", |b| {
        b.iter(|| get_valid_tokens(black_box(&vocab), black_box(&fsm), EVEN))
    });
    c.bench_function("filter 8k binary tokens from ODD", |b| {
        b.iter(|| get_valid_tokens(black_box(&vocab), black_box(&fsm), ODD))
    });
    let mut logits = vec![0.0f32; vocab.vocab_size()];
    let mut engine =
        Engine::with_config(Arc::new(fsm), Arc::new(vocab), Config::default()).unwrap();
    c.bench_function("update logits 8k binary tokens", |b| {
        b.iter(|| run_an_engine(black_box(&mut engine), &mut logits))
    });
    let mut sampler = UniformSampler::new(rand::rngs::StdRng::seed_from_u64(7));
    c.bench_function("generate with 8k binary tokens", |b| {
        b.iter(|| generate(black_box(&mut engine), &mut sampler).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
