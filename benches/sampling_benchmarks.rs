use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use examace::bank::QuestionBank;
use examace::bank::sampler;
use examace::engine::grading;
use examace::quiz::{Difficulty, Question};

fn make_pool(size: usize) -> Vec<Question> {
    (0..size)
        .map(|i| Question {
            question: format!("Question {i}?"),
            options: ["a", "b", "c", "d"].map(String::from),
            correct_index: (i % 4) as u8,
            explanation: "Because.".to_string(),
        })
        .collect()
}

fn bench_sampling(c: &mut Criterion) {
    let pool = make_pool(10_000);
    let mut rng = SmallRng::seed_from_u64(0);

    c.bench_function("sample 30 of 10k", |b| {
        b.iter(|| sampler::sample(black_box(&pool), 30, &mut rng))
    });

    let bank = QuestionBank::embedded().expect("embedded bank");
    c.bench_function("fallback_questions (unknown subject)", |b| {
        b.iter(|| {
            bank.fallback_questions(black_box("Astrophysics"), Difficulty::Advanced, 5, &mut rng)
                .expect("general knowledge fallback")
        })
    });
}

fn bench_grading(c: &mut Criterion) {
    let questions = make_pool(30);
    let answers: Vec<u8> = (0..30).map(|i| (i % 3) as u8).collect();

    c.bench_function("grade 30 questions", |b| {
        b.iter(|| grading::grade(black_box(&questions), black_box(&answers)))
    });
}

criterion_group!(benches, bench_sampling, bench_grading);
criterion_main!(benches);
