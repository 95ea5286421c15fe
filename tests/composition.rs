// tests/composition.rs

use std::error::Error;
use std::time::Duration;

use proptest::prelude::*;

use assetdag::dag::TaskRegistry;
use assetdag::errors::AssetdagError;
use assetdag_test_utils::fakes::{FakeAction, RunLog};
use assetdag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn series_stops_at_first_failure() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = RunLog::new();

        let mut reg = TaskRegistry::new();
        reg.register("a", FakeAction::ok("a", &log))?;
        reg.register("b", FakeAction::failing("b", &log))?;
        reg.register("c", FakeAction::ok("c", &log))?;
        reg.register_series("seq", ["a", "b", "c"])?;
        let graph = reg.freeze()?;

        let err = graph.run("seq").await.unwrap_err();
        match &err {
            AssetdagError::CompositionAbort { task, child, .. } => {
                assert_eq!(task, "seq");
                assert_eq!(child, "b");
            }
            other => panic!("expected CompositionAbort, got {other:?}"),
        }
        assert!(matches!(err.root_cause(), AssetdagError::Transform { .. }));
        assert_eq!(log.entries(), vec!["start:a", "end:a", "start:b", "end:b"]);
        assert_eq!(log.starts("c"), 0);
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn series_runs_members_strictly_in_order() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = RunLog::new();

        let mut reg = TaskRegistry::new();
        reg.register("slow", FakeAction::slow("slow", &log, Duration::from_millis(50)))?;
        reg.register("fast", FakeAction::ok("fast", &log))?;
        reg.register_series("seq", ["slow", "fast"])?;
        let graph = reg.freeze()?;

        graph.run("seq").await?;
        assert_eq!(
            log.entries(),
            vec!["start:slow", "end:slow", "start:fast", "end:fast"]
        );
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn parallel_failure_does_not_cancel_siblings() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = RunLog::new();

        let mut reg = TaskRegistry::new();
        reg.register("slow", FakeAction::slow("slow", &log, Duration::from_millis(50)))?;
        reg.register("bad", FakeAction::failing("bad", &log))?;
        reg.register("other", FakeAction::ok("other", &log))?;
        reg.register_parallel("all", ["slow", "bad", "other"])?;
        let graph = reg.freeze()?;

        let err = graph.run("all").await.unwrap_err();
        assert!(matches!(err, AssetdagError::CompositionAbort { ref child, .. } if child == "bad"));

        let entries = log.entries();
        for name in ["slow", "bad", "other"] {
            assert!(entries.contains(&format!("end:{name}")), "{name} did not finish");
        }
        // All three started before the slow one finished.
        let slow_end = entries.iter().position(|e| e == "end:slow").unwrap();
        let other_start = entries.iter().position(|e| e == "start:other").unwrap();
        assert!(other_start < slow_end);
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn nested_compositions_and_reruns() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = RunLog::new();

        let mut reg = TaskRegistry::new();
        reg.register("clean", FakeAction::ok("clean", &log))?;
        reg.register("styles", FakeAction::ok("styles", &log))?;
        reg.register("scripts", FakeAction::ok("scripts", &log))?;
        reg.register_parallel("assets", ["styles", "scripts"])?;
        reg.register_series("build", ["clean", "assets"])?;
        let graph = reg.freeze()?;

        graph.run("build").await?;
        graph.run("styles").await?;

        assert_eq!(log.starts("clean"), 1);
        assert_eq!(log.starts("styles"), 2);
        assert_eq!(log.entries().first().map(String::as_str), Some("start:clean"));
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn unknown_task_is_not_found() -> TestResult {
    let log = RunLog::new();
    let mut reg = TaskRegistry::new();
    reg.register("a", FakeAction::ok("a", &log))?;
    let graph = reg.freeze()?;

    let err = graph.run("nope").await.unwrap_err();
    assert!(matches!(err, AssetdagError::TaskNotFound(ref n) if n == "nope"));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Child k of an N-member series fails: children 0..=k ran once, the rest never.
    #[test]
    fn series_abort_skips_remaining_children((n, k) in (1usize..8).prop_flat_map(|n| (Just(n), 0..n))) {
        let log = RunLog::new();
        let names: Vec<String> = (0..n).map(|i| format!("t{i}")).collect();

        let mut reg = TaskRegistry::new();
        for (i, name) in names.iter().enumerate() {
            let action = if i == k {
                FakeAction::failing(name, &log)
            } else {
                FakeAction::ok(name, &log)
            };
            reg.register(name.as_str(), action).unwrap();
        }
        reg.register_series("seq", names.clone()).unwrap();
        let graph = reg.freeze().unwrap();

        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let res = rt.block_on(graph.run("seq"));

        let failed_child = match res {
            Err(AssetdagError::CompositionAbort { child, .. }) => child,
            other => panic!("expected CompositionAbort, got {other:?}"),
        };
        prop_assert_eq!(&failed_child, &names[k]);
        for (i, name) in names.iter().enumerate() {
            let expected = if i <= k { 1 } else { 0 };
            prop_assert_eq!(log.starts(name), expected, "child {}", name);
        }
    }
}
