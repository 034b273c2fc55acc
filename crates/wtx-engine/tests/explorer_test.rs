mod common;

use common::{FakeFactory, shop};
use std::path::Path;
use std::sync::Arc;
use wtx_engine::checker::StateChecker;
use wtx_engine::explorer::{Explorer, ExplorerConfig, ExplorerPhase};
use wtx_engine::queue::{Frontier, Partition};
use wtx_engine::testcase::{
    PrettyWriter, ReplayableWriter, ScreenshotWriter, TestCase, TestCaseSink,
};
use wtx_common::{Action, ActionSequence, CheckerSpec, ElementIdentifier, IndexBasis};

const URL: &str = "http://shop.test/";

fn config(max_length: usize) -> ExplorerConfig {
    let mut config = ExplorerConfig::new(URL);
    config.max_length = max_length;
    config.checkers = vec![StateChecker::new(CheckerSpec::VisibleElements {
        properties: Vec::new(),
    })];
    config
}

fn sink(dir: &Path) -> TestCaseSink {
    TestCaseSink::new()
        .with_writer(Box::new(ReplayableWriter::new(dir)))
        .with_writer(Box::new(PrettyWriter::new(dir)))
}

fn nav() -> Action {
    Action::click(ElementIdentifier::class_index("nav", 0, IndexBasis::Actionable))
}

#[tokio::test]
async fn emits_sequences_that_change_state() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::new(shop()));
    let mut explorer = Explorer::new(config(1), factory.clone(), sink(dir.path()));

    let stats = explorer.run().await.unwrap();
    assert_eq!(stats.run, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.errored, 0);
    assert_eq!(stats.emitted, 2);
    assert_eq!(explorer.phase(), ExplorerPhase::Done);
    assert!(explorer.frontier().is_empty());

    let first = TestCase::load(&dir.path().join("case-00001.json")).await.unwrap();
    assert_eq!(first.url, URL);
    assert_eq!(first.sequence, ActionSequence::from_actions(vec![nav()]));
    assert_eq!(first.final_states.len(), 1);
    assert_eq!(first.final_states[0].kind(), "VisibleElements");
    assert!(first.passed());

    let pretty = std::fs::read_to_string(dir.path().join("case-00002.txt")).unwrap();
    assert!(pretty.contains(&format!("1. {}", Action::click(ElementIdentifier::id("go")))));
    assert!(pretty.ends_with("PASSED\n"));
    assert!(!dir.path().join("case-00003.json").exists());
}

#[tokio::test]
async fn writer_failures_are_counted_without_ending_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::new(shop()));
    let without_captures = TestCaseSink::new()
        .with_writer(Box::new(ReplayableWriter::new(dir.path())))
        .with_writer(Box::new(ScreenshotWriter::new(dir.path())));

    let stats = Explorer::new(config(1), factory, without_captures)
        .run()
        .await
        .unwrap();
    assert_eq!(stats.run, 3);
    assert_eq!(stats.errored, 2);
    assert_eq!(stats.emitted, 0);
    // The replayable writer ran before the screenshot writer failed.
    assert!(dir.path().join("case-00002.json").exists());
    assert!(!dir.path().join("screenshots-case-00001").exists());
}

#[tokio::test]
async fn screenshots_are_written_for_every_emitted_case() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::new(shop()));
    let mut config = config(1);
    config.screenshots = true;
    let sink = TestCaseSink::new()
        .with_writer(Box::new(ReplayableWriter::new(dir.path())))
        .with_writer(Box::new(ScreenshotWriter::new(dir.path())));

    let stats = Explorer::new(config, factory, sink).run().await.unwrap();
    assert_eq!(stats.errored, 0);
    assert_eq!(stats.emitted, 2);
    let first = dir.path().join("screenshots-case-00001");
    assert_eq!(std::fs::read(first.join("1.png")).unwrap(), b"png:about");
    assert!(!first.join("2.png").exists());
    assert!(dir.path().join("screenshots-case-00002").join("1.png").exists());
}

#[tokio::test]
async fn never_explores_past_the_maximum_length() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::new(shop()));
    let mut explorer = Explorer::new(config(2), factory, sink(dir.path()));

    let stats = explorer.run().await.unwrap();
    assert_eq!(stats.run, 7);
    assert_eq!(stats.emitted, 5);
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|e| e == "json") {
            let case = TestCase::load(&path).await.unwrap();
            assert!((1..=2).contains(&case.sequence.length()), "{}", case.sequence);
        }
    }
}

#[tokio::test]
async fn sequences_that_keep_erroring_are_counted_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::new(shop().broken("nav")));
    let mut explorer = Explorer::new(config(1), factory.clone(), sink(dir.path()));

    let stats = explorer.run().await.unwrap();
    assert_eq!(stats.errored, 1);
    assert_eq!(stats.run, 2);
    assert_eq!(stats.emitted, 1);
    assert_eq!(factory.journal().opened, 1 + 3 + 1 + 1);
}

#[tokio::test]
async fn partitions_split_the_seed_frontier() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::new(shop()));

    let mut first = config(1);
    first.partition = Some(Partition { number: 0, count: 2 });
    let stats = Explorer::new(first, factory.clone(), sink(dir.path()))
        .run()
        .await
        .unwrap();
    assert_eq!(stats.run, 2);
    assert_eq!(stats.emitted, 2);
    assert!(dir.path().join("p0-case-00001.json").exists());
    assert!(dir.path().join("p0-case-00002.json").exists());

    let mut second = config(1);
    second.partition = Some(Partition { number: 1, count: 2 });
    let stats = Explorer::new(second, factory, sink(dir.path()))
        .run()
        .await
        .unwrap();
    assert_eq!(stats.run, 1);
    assert_eq!(stats.emitted, 0);
}

#[tokio::test]
async fn checkpoints_let_a_later_run_resume() {
    let dir = tempfile::tempdir().unwrap();
    let queue_file = dir.path().join("queue.json");
    let factory = Arc::new(FakeFactory::new(shop()));

    let mut interrupted = config(1);
    interrupted.queue_file = Some(queue_file.clone());
    let mut explorer = Explorer::new(interrupted, factory.clone(), TestCaseSink::new());
    explorer.initialize().await.unwrap();
    assert_eq!(explorer.frontier().len(), 3);
    assert!(explorer.step().await.unwrap());

    let saved = Frontier::load(&queue_file).await.unwrap();
    assert_eq!(&saved, explorer.frontier());
    assert_eq!(
        saved.iter().next(),
        Some(&ActionSequence::from_actions(vec![Action::click(
            ElementIdentifier::id("go")
        )]))
    );

    let mut resumed = config(1);
    resumed.queue_file = Some(queue_file.clone());
    resumed.resume = true;
    let out = dir.path().join("cases");
    let stats = Explorer::new(resumed, factory, sink(&out))
        .run()
        .await
        .unwrap();
    assert_eq!(stats.run, 2);
    assert_eq!(stats.emitted, 1);
    assert!(Frontier::load(&queue_file).await.unwrap().is_empty());
}

#[tokio::test]
async fn graph_mode_stops_at_known_states() {
    let dir = tempfile::tempdir().unwrap();
    let factory = Arc::new(FakeFactory::new(shop()));
    let mut graph_config = config(3);
    graph_config.graph_mode = true;
    graph_config.state_file = Some(dir.path().join("graph.json"));
    let mut explorer = Explorer::new(graph_config, factory, TestCaseSink::new());

    let stats = explorer.run().await.unwrap();
    assert_eq!(stats.run, 4);
    assert_eq!(stats.emitted, 3);

    let graph = explorer.graph().unwrap();
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.reachable_from(0).len(), 3);
    assert!(dir.path().join("graph.json").exists());
}

#[tokio::test]
async fn final_sequences_end_every_path() {
    let factory = Arc::new(FakeFactory::new(shop()));
    let mut with_final = config(2);
    with_final.final_sequences = vec![ActionSequence::from_actions(vec![Action::refresh()])];
    let mut explorer = Explorer::new(with_final, factory, TestCaseSink::new());

    explorer.initialize().await.unwrap();
    let seeded: Vec<&ActionSequence> = explorer.frontier().iter().collect();
    assert_eq!(seeded.len(), 3);
    assert!(seeded.iter().all(|s| s.last_action() == Some(&Action::refresh())));

    while explorer.step().await.unwrap() {}
    assert_eq!(explorer.stats().errored, 0);
    assert_eq!(explorer.stats().emitted, 5);
}
