//! Polling loop tests against the in-memory repository with tokio's paused
//! clock.

use std::time::Duration;

use mergewatch::decision::FixedPolicy;
use mergewatch::scheduler::run_polling_loop;
use mergewatch::signals::{new_flag, request_shutdown, ShutdownFlag};
use mergewatch_core::models::{Decision, Line, LineDiff};
use mergewatch_core::testing::MemoryRepository;
use mergewatch_core::WatchSession;

const PATH: &str = "records.txt";

fn session() -> WatchSession<MemoryRepository> {
    let repo = MemoryRepository::new();
    repo.add_commit("base", &[(PATH, "1;a\n")])
        .add_commit("r1", &[(PATH, "1;a\n2;b\n")])
        .set_local_tip("base")
        .set_remote_tip("base")
        .set_merge_base(Some("base"))
        .set_diff(
            "base",
            "r1",
            PATH,
            LineDiff::new(vec![Line::new(2, "2;b")], vec![]),
        );
    WatchSession::initialize(repo, vec![PATH.to_string()]).unwrap()
}

/// Set the flag after `after` of (virtual) time.
fn stop_after(flag: &ShutdownFlag, after: Duration) {
    let flag = flag.clone();
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        request_shutdown(&flag);
    });
}

fn fetches(session: &WatchSession<MemoryRepository>) -> usize {
    session
        .provider()
        .calls()
        .iter()
        .filter(|c| **c == "fetch")
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_polls_every_interval_until_shutdown() {
    let mut session = session();
    let mut policy = FixedPolicy::new(Decision::Accept);
    let shutdown = new_flag();
    stop_after(&shutdown, Duration::from_millis(12_500));

    run_polling_loop(&mut session, &mut policy, Duration::from_secs(5), shutdown)
        .await
        .unwrap();

    // Cycles at t = 0, 5 and 10.
    assert_eq!(fetches(&session), 3);
    assert_eq!(policy.asked(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remote_change_prompts_once() {
    let mut session = session();
    session.provider().publish_remote("r1");
    let mut policy = FixedPolicy::new(Decision::Decline);
    let shutdown = new_flag();
    stop_after(&shutdown, Duration::from_millis(12_500));

    run_polling_loop(&mut session, &mut policy, Duration::from_secs(5), shutdown)
        .await
        .unwrap();

    assert_eq!(policy.asked(), 1);
    assert_eq!(session.provider().current_local_tip(), "base");
    assert!(!session.provider().calls().contains(&"push"));
}

#[tokio::test(start_paused = true)]
async fn test_accepted_change_is_merged_and_pushed() {
    let mut session = session();
    session.provider().publish_remote("r1");
    let mut policy = FixedPolicy::new(Decision::Accept);
    let shutdown = new_flag();
    stop_after(&shutdown, Duration::from_millis(7_500));

    run_polling_loop(&mut session, &mut policy, Duration::from_secs(5), shutdown)
        .await
        .unwrap();

    assert_eq!(policy.asked(), 1);
    assert_eq!(session.provider().current_local_tip(), "r1");
    assert_eq!(
        session.provider().calls(),
        vec!["fetch", "commit", "pull", "push", "fetch"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failures_do_not_stop_the_loop() {
    let mut session = session();
    session.provider().fail_fetch(true);
    let mut policy = FixedPolicy::new(Decision::Accept);
    let shutdown = new_flag();
    stop_after(&shutdown, Duration::from_millis(12_500));

    run_polling_loop(&mut session, &mut policy, Duration::from_secs(5), shutdown)
        .await
        .unwrap();

    assert_eq!(fetches(&session), 3);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_before_start_runs_no_cycle() {
    let mut session = session();
    let mut policy = FixedPolicy::new(Decision::Accept);
    let shutdown = new_flag();
    request_shutdown(&shutdown);

    run_polling_loop(&mut session, &mut policy, Duration::from_secs(5), shutdown)
        .await
        .unwrap();

    assert!(session.provider().calls().is_empty());
}
