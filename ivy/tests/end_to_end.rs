//! End-to-end scenarios (spec.md §8 "End-to-end scenarios") driving the
//! orchestration loop through `setup` -> `run` against a fake external
//! solver, the way `host/tests/proof_request.rs` drives `raiko-host`
//! through its own public API instead of reimplementing it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ivy::cli::{Cli, Command};
use ivy::orchestrate;

fn cli(config: PathBuf, command: Command, jobs: usize) -> Cli {
    Cli {
        config,
        force: false,
        debug: false,
        debug_events: false,
        jobs,
        command: Some(command),
    }
}

fn write_config(dir: &Path, default_solver: &str) -> PathBuf {
    let path = dir.join("design.ivy");
    std::fs::write(&path, format!("[options]\ntop top\ndefault_solver {default_solver}\n")).unwrap();
    path
}

async fn setup_and_export(config_path: &Path, export_json: &str) -> PathBuf {
    orchestrate::run(&cli(config_path.to_path_buf(), Command::Setup, 1)).await.unwrap();
    let root = orchestrate::work_dir_path(config_path);
    std::fs::write(root.join("ivy_export.json"), export_json).unwrap();
    root
}

fn fake_solver(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn two_independent_proofs_export() -> &'static str {
    r#"{
        "proofs": [
            {"name": ["top", "p1"], "srcloc": "top.v:1", "top_level": true, "automatic": true,
             "assert": [{"name": ["top", "inv1"], "local": false}]},
            {"name": ["top", "p2"], "srcloc": "top.v:2", "top_level": true, "automatic": true,
             "assert": [{"name": ["top", "inv2"], "local": false}]}
        ],
        "invariants": [
            {"name": ["top", "inv1"], "srcloc": "top.v:3"},
            {"name": ["top", "inv2"], "srcloc": "top.v:4"}
        ]
    }"#
}

/// Scenario 1: two independent invariants, each proven by its own
/// automatic top-level proof under a `sby smtbmc`-flavoured fake solver
/// that always reports `PASS`. After `run`, both are `pass` and the run
/// as a whole reports success.
#[tokio::test]
async fn two_independent_proofs_both_pass() {
    let dir = tempfile::tempdir().unwrap();
    let solver = fake_solver(dir.path(), "pass.sh", "echo PASS > status\n");
    let config_path = write_config(dir.path(), &format!("sh {}", solver.display()));
    setup_and_export(&config_path, two_independent_proofs_export()).await;

    let ok = orchestrate::run(&cli(config_path.clone(), Command::Run { proofs: vec![] }, 2))
        .await
        .unwrap();
    assert!(ok, "both proofs should pass");

    // A subsequent `status` with no pending work still reports success and
    // does not dispatch anything.
    let ok = orchestrate::run(&cli(config_path, Command::Status { proofs: vec![] }, 1))
        .await
        .unwrap();
    assert!(ok);
}

/// Scenario 4: a solver that reports `ERROR` persists that status without
/// disturbing the other (independent) proof, and the overall run still
/// succeeds (`error` is not `fail`).
#[tokio::test]
async fn solver_error_does_not_fail_other_independent_proofs() {
    let dir = tempfile::tempdir().unwrap();
    let solver = fake_solver(dir.path(), "error.sh", "echo ERROR > status\n");
    let config_path = write_config(dir.path(), &format!("sh {}", solver.display()));
    setup_and_export(&config_path, two_independent_proofs_export()).await;

    let ok = orchestrate::run(&cli(config_path, Command::Run { proofs: vec![] }, 2))
        .await
        .unwrap();
    assert!(ok, "an ERROR result must not fail the overall run");
}

/// Scenario 6: a `run` that leaves tasks `scheduled` (simulated here by
/// pre-seeding the store rather than actually killing the process
/// mid-flight) is left alone by a plain re-run, and only proceeds again
/// once `--reset-schedule` is passed.
#[tokio::test]
async fn interrupted_schedule_is_untouched_without_reset_schedule() {
    let dir = tempfile::tempdir().unwrap();
    let solver = fake_solver(dir.path(), "pass.sh", "echo PASS > status\n");
    let config_path = write_config(dir.path(), &format!("sh {}", solver.display()));
    let single_proof_export = r#"{
        "proofs": [{"name": ["top", "p1"], "srcloc": "top.v:1", "top_level": true, "automatic": true,
                     "assert": [{"name": ["top", "inv1"], "local": false}]}],
        "invariants": [{"name": ["top", "inv1"], "srcloc": "top.v:2"}]
    }"#;
    let root = setup_and_export(&config_path, single_proof_export).await;

    let store = ivy_store::StatusStore::open_or_create(&root.join("status.sqlite")).unwrap();
    let task = ivy_graph::Task::new(
        ivy_graph::Name::new(vec![ivy_graph::NamePart::Module("top".into()), ivy_graph::NamePart::Instance("p1".into())]),
        "default".to_string(),
    );
    store.initialize_status(&[task.clone()]).unwrap();
    store
        .change_status(&task, ivy_graph::Status::Scheduled, Some(&[ivy_graph::Status::Pending]))
        .unwrap();
    drop(store);

    let ok = orchestrate::run(&cli(config_path.clone(), Command::Run { proofs: vec![] }, 1))
        .await
        .unwrap();
    assert!(ok, "nothing failed, the run just made no progress");

    let store = ivy_store::StatusStore::open_or_create(&root.join("status.sqlite")).unwrap();
    assert_eq!(
        store.full_status().unwrap().get(&task).copied(),
        Some(ivy_graph::Status::Scheduled),
        "a plain re-run must not disturb an already-scheduled task"
    );
    drop(store);

    let ok = orchestrate::run(&cli(
        config_path,
        Command::Prove { proofs: vec![], reset_schedule: true },
        1,
    ))
    .await
    .unwrap();
    assert!(ok, "--reset-schedule should re-dispatch and pass");
}

/// Scenario 5: with `-j 1`, solver subprocesses never overlap. Each of
/// three independent proofs sleeps for a fixed duration before reporting
/// `PASS`; if the job-server lease actually bounds concurrency to one,
/// total wall-clock time is close to the sum of the sleeps rather than
/// their max.
#[tokio::test]
async fn jobs_one_serializes_solver_subprocesses() {
    let dir = tempfile::tempdir().unwrap();
    let solver = fake_solver(dir.path(), "slow_pass.sh", "sleep 0.2\necho PASS > status\n");
    let config_path = write_config(dir.path(), &format!("sh {}", solver.display()));
    let export = r#"{
        "proofs": [
            {"name": ["top", "p1"], "srcloc": "top.v:1", "top_level": true, "automatic": true,
             "assert": [{"name": ["top", "inv1"], "local": false}]},
            {"name": ["top", "p2"], "srcloc": "top.v:2", "top_level": true, "automatic": true,
             "assert": [{"name": ["top", "inv2"], "local": false}]},
            {"name": ["top", "p3"], "srcloc": "top.v:3", "top_level": true, "automatic": true,
             "assert": [{"name": ["top", "inv3"], "local": false}]}
        ],
        "invariants": [
            {"name": ["top", "inv1"], "srcloc": "top.v:4"},
            {"name": ["top", "inv2"], "srcloc": "top.v:5"},
            {"name": ["top", "inv3"], "srcloc": "top.v:6"}
        ]
    }"#;
    setup_and_export(&config_path, export).await;

    let start = Instant::now();
    let ok = orchestrate::run(&cli(config_path, Command::Run { proofs: vec![] }, 1))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(ok);
    assert!(
        elapsed.as_secs_f64() >= 0.5,
        "three 0.2s tasks under -j 1 should take at least ~0.6s serialized, took {elapsed:?}"
    );
}

/// Scenario 2: one proof with two solvers at priorities `(+1, -1)`. The
/// positive solver passes first; the negative solver is cancelled before
/// it ever runs. Persisted statuses end up `pass` for the positive
/// solver's row and `abandoned` for the negative's, with the entity's
/// reduced status still `pass`.
#[tokio::test]
async fn priority_pair_cancels_the_negative_solver_as_abandoned() {
    let dir = tempfile::tempdir().unwrap();
    let positive = fake_solver(dir.path(), "positive.sh", "echo PASS > status\n");
    let negative = fake_solver(dir.path(), "negative.sh", "sleep 5; echo PASS > status\n");
    let positive_solver = format!("sh {}", positive.display());
    let negative_solver = format!("sh {}", negative.display());
    let config_path = write_config(dir.path(), "sh /bin/false");
    let export = format!(
        r#"{{
        "proofs": [{{"name": ["top", "p1"], "srcloc": "top.v:1", "top_level": true, "automatic": true,
             "assert": [{{"name": ["top", "inv1"], "local": false}}],
             "solve": [
                {{"name": ["top", "p1"], "with": "{positive_solver}", "priority": 1}},
                {{"name": ["top", "p1"], "with": "{negative_solver}", "priority": -1}}
             ]}}],
        "invariants": [{{"name": ["top", "inv1"], "srcloc": "top.v:2"}}]
    }}"#
    );
    let root = setup_and_export(&config_path, &export).await;

    let start = Instant::now();
    let ok = orchestrate::run(&cli(config_path, Command::Run { proofs: vec![] }, 2))
        .await
        .unwrap();
    let elapsed = start.elapsed();
    assert!(ok, "the entity should read as pass overall");
    assert!(
        elapsed.as_secs_f64() < 4.0,
        "the negative solver's 5s sleep must not be waited out, took {elapsed:?}"
    );

    let store = ivy_store::StatusStore::open_or_create(&root.join("status.sqlite")).unwrap();
    let p1 = ivy_graph::Name::new(vec![
        ivy_graph::NamePart::Module("top".into()),
        ivy_graph::NamePart::Instance("p1".into()),
    ]);
    let positive_task = ivy_graph::Task::new(p1.clone(), positive_solver);
    let negative_task = ivy_graph::Task::new(p1.clone(), negative_solver);
    let full = store.full_status().unwrap();
    assert_eq!(full.get(&positive_task).copied(), Some(ivy_graph::Status::Pass));
    assert_eq!(full.get(&negative_task).copied(), Some(ivy_graph::Status::Abandoned));
    assert_eq!(store.reduced_status().unwrap().get(&p1).copied(), Some(ivy_graph::Status::Pass));
}

/// Same as `priority_pair_cancels_the_negative_solver_as_abandoned`, but
/// the `solve` array declares the negative-priority solver before the
/// positive one. spec.md §6 imposes no ordering requirement on `solve`,
/// so the negative solver must still be gated behind the positive one
/// even though it is dispatched first.
#[tokio::test]
async fn priority_pair_cancels_the_negative_solver_when_declared_first() {
    let dir = tempfile::tempdir().unwrap();
    let positive = fake_solver(dir.path(), "positive.sh", "echo PASS > status\n");
    let negative = fake_solver(dir.path(), "negative.sh", "sleep 5; echo PASS > status\n");
    let positive_solver = format!("sh {}", positive.display());
    let negative_solver = format!("sh {}", negative.display());
    let config_path = write_config(dir.path(), "sh /bin/false");
    let export = format!(
        r#"{{
        "proofs": [{{"name": ["top", "p1"], "srcloc": "top.v:1", "top_level": true, "automatic": true,
             "assert": [{{"name": ["top", "inv1"], "local": false}}],
             "solve": [
                {{"name": ["top", "p1"], "with": "{negative_solver}", "priority": -1}},
                {{"name": ["top", "p1"], "with": "{positive_solver}", "priority": 1}}
             ]}}],
        "invariants": [{{"name": ["top", "inv1"], "srcloc": "top.v:2"}}]
    }}"#
    );
    let root = setup_and_export(&config_path, &export).await;

    let start = Instant::now();
    let ok = orchestrate::run(&cli(config_path, Command::Run { proofs: vec![] }, 2))
        .await
        .unwrap();
    let elapsed = start.elapsed();
    assert!(ok, "the entity should read as pass overall");
    assert!(
        elapsed.as_secs_f64() < 4.0,
        "the negative solver's 5s sleep must not be waited out, took {elapsed:?}"
    );

    let store = ivy_store::StatusStore::open_or_create(&root.join("status.sqlite")).unwrap();
    let p1 = ivy_graph::Name::new(vec![
        ivy_graph::NamePart::Module("top".into()),
        ivy_graph::NamePart::Instance("p1".into()),
    ]);
    let positive_task = ivy_graph::Task::new(p1.clone(), positive_solver);
    let negative_task = ivy_graph::Task::new(p1.clone(), negative_solver);
    let full = store.full_status().unwrap();
    assert_eq!(full.get(&positive_task).copied(), Some(ivy_graph::Status::Pass));
    assert_eq!(full.get(&negative_task).copied(), Some(ivy_graph::Status::Abandoned));
    assert_eq!(store.reduced_status().unwrap().get(&p1).copied(), Some(ivy_graph::Status::Pass));
}
