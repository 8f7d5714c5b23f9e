use criterion::{criterion_group, criterion_main, Criterion};
use clipfolio::{ClipboardStore, SearchOptions, SearchScope};

const WORDS: &[&str] = &[
    "riverside", "error", "build", "failed", "hello", "world", "deploy", "config", "cat",
    "concatenate", "snippet", "password", "invoice", "meeting", "docker", "kubectl",
];

fn setup_store() -> ClipboardStore {
    let mut store = ClipboardStore::new_in_memory(1000);
    for i in 0..1000 {
        let text = (0..12)
            .map(|j| WORDS[(i * 7 + j * 3) % WORDS.len()])
            .collect::<Vec<_>>()
            .join(" ");
        store.on_clipboard_text(&format!("{} #{}", text, i));
    }
    for f in 0..10 {
        let folder = format!("folder{}", f);
        store.create_folder(&folder, None).unwrap();
        for i in 0..100 {
            let text = format!("{} {} item {}", WORDS[i % WORDS.len()], WORDS[(i + f) % WORDS.len()], i);
            store.add_favorite(&folder, &text, "saved from a meeting").unwrap();
        }
    }
    store
}

fn bench_search(c: &mut Criterion) {
    let store = setup_store();

    let cases = vec![
        ("literal", "riverside", SearchOptions::default()),
        ("literal_case_sensitive", "Hello", SearchOptions { case_sensitive: true, ..Default::default() }),
        ("whole_word", "cat", SearchOptions { whole_word: true, ..Default::default() }),
        ("regex", r"err\w+ build", SearchOptions { use_regex: true, ..Default::default() }),
        ("regex_whole_word", "deplo.", SearchOptions { use_regex: true, whole_word: true, ..Default::default() }),
        ("description_hit", "meeting", SearchOptions::default()),
    ];

    let mut group = c.benchmark_group("search");
    group.sample_size(20);

    for (name, query, options) in cases {
        group.bench_function(name, |b| {
            b.iter(|| store.search(query, &SearchScope::All, options));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
