use cairn_checkpoint::{
    CheckpointDraft, CheckpointStore, ConversationMessage, FileCheckpointStore, MessageRole,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

fn bench_draft(name: &str) -> CheckpointDraft {
    CheckpointDraft::new(
        name.to_string(),
        "bench-agent".to_string(),
        "Bench Agent".to_string(),
        "claude-3-5-sonnet".to_string(),
    )
    .with_messages(vec![
        ConversationMessage::new(MessageRole::User, "benchmark question".to_string()),
        ConversationMessage::new(MessageRole::Assistant, "benchmark answer".to_string()),
    ])
}

fn checkpoint_save_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let store = FileCheckpointStore::new(temp_dir.path().to_path_buf());

    c.bench_function("checkpoint save", |b| {
        b.to_async(&runtime).iter(|| async {
            store.save(black_box(bench_draft("bench save"))).await.unwrap();
        });
    });
}

fn checkpoint_list_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let store = FileCheckpointStore::new(temp_dir.path().to_path_buf());

    runtime.block_on(async {
        for i in 0..50 {
            store.save(bench_draft(&format!("bench list {i}"))).await.unwrap();
        }
    });

    c.bench_function("checkpoint list 50", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(store.list().await.unwrap());
        });
    });
}

fn checkpoint_restore_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let store = FileCheckpointStore::new(temp_dir.path().to_path_buf());

    let id = runtime.block_on(async { store.save(bench_draft("bench restore")).await.unwrap() });

    c.bench_function("checkpoint restore", |b| {
        b.to_async(&runtime).iter(|| async {
            black_box(store.get(black_box(&id)).await.unwrap());
        });
    });
}

criterion_group!(
    benches,
    checkpoint_save_benchmark,
    checkpoint_list_benchmark,
    checkpoint_restore_benchmark
);
criterion_main!(benches);
