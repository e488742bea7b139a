//! The orchestration loop (spec.md §4.9): parse config, stand up the work
//! directory, ingest the JSON export, build the status graph, and either
//! stop (`setup`), dispatch proof tasks and await their completion
//! (`run`/`prove`), or just print the persisted report (`status`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ivy_config::Config;
use ivy_graph::entity::{AssertItem, AssumeItem};
use ivy_graph::{
    Entity, EntityModel, Name, Status, StatusGraph, StatusMap, Task, VertexKey, VertexKind,
};
use ivy_scheduler::{DispatchRequest, Scheduler, UsefulnessOracle};
use ivy_solver::{JobLease, ProofInputSpec};
use ivy_store::StatusStore;

use crate::cli::{Cli, Command};
use crate::error::IvyError;
use crate::ingest::{build_entity_model, JsonExport};
use crate::report::{render_report, ReportLine};
use crate::workdir::{self, WorkDir};

/// The work directory for a `<name>.ivy` config file is its sibling
/// directory with the `.ivy` suffix stripped, matching the original tool's
/// `ivy_file.with_name(ivy_file.name[:-4])`.
pub fn work_dir_path(config_path: &Path) -> PathBuf {
    match config_path.file_stem() {
        Some(stem) => config_path.with_file_name(stem),
        None => config_path.to_path_buf(),
    }
}

/// Runs the full orchestration loop for one CLI invocation. Returns `Ok(true)`
/// if the run completed with every selected task settled successfully
/// (`pass`/`unreachable` only), `Ok(false)` if any task ended in a
/// non-passing terminal status, so `main` can pick an exit code.
pub async fn run(cli: &Cli) -> Result<bool, IvyError> {
    let config_source = std::fs::read_to_string(&cli.config)
        .map_err(|e| ivy_config::ConfigError::Io(cli.config.clone(), e))?;
    let config = ivy_config::parse(&cli.config, &config_source)?;

    let root = work_dir_path(&cli.config);
    let command = cli.command();
    let is_setup = matches!(command, Command::Setup);

    let work_dir = if is_setup {
        workdir::setup(&root, cli.force)?
    } else {
        workdir::open_existing(&root)?
    };

    let store = Arc::new(StatusStore::open_or_create(&work_dir.status_db_path())?);

    if is_setup {
        tracing::info!(work_dir = %root.display(), "work directory ready");
        return Ok(true);
    }

    let export = load_json_export(&work_dir)?;
    let mut model = build_entity_model(&export, config.options.auto_proof);
    model.resolve_solves();
    let graph = Arc::new(StatusGraph::build(&model));

    warn_unreachable_sinks(&graph);

    match command {
        Command::Setup => unreachable!("handled above"),
        Command::Status { proofs } => {
            let reduced = store.reduced_status()?;
            let selected = select_entities(&model, &proofs)?;
            print_report(&model, &reduced, &selected);
            Ok(selected
                .iter()
                .all(|n| reduced.get(n).copied().unwrap_or(Status::Unreachable) != Status::Fail))
        }
        Command::Run { proofs } => {
            run_and_prove(&config, &model, &graph, store, &work_dir, &proofs, false, cli.jobs, cli.debug_events)
                .await
        }
        Command::Prove { proofs, reset_schedule } => {
            run_and_prove(
                &config,
                &model,
                &graph,
                store,
                &work_dir,
                &proofs,
                reset_schedule,
                cli.jobs,
                cli.debug_events,
            )
            .await
        }
    }
}

fn load_json_export(work_dir: &WorkDir) -> Result<JsonExport, IvyError> {
    let path = work_dir.export_json_path();
    if !path.is_file() {
        return Err(IvyError::MissingJsonExport(path));
    }
    let text = std::fs::read_to_string(&path).map_err(|e| IvyError::Io(path.clone(), e))?;
    serde_json::from_str(&text).map_err(|e| IvyError::Json(path, e))
}

/// Dry propagation from all-`pending` task seeds, to find structural cycles
/// isolated from any solver task (spec.md §4.9 step 4, §7 error kind 3).
fn warn_unreachable_sinks(graph: &StatusGraph) {
    let mut map = StatusMap::new(graph, |_| None);
    map.iterate();
    for &sink in graph.sinks() {
        if map.status(sink) == Status::Unreachable {
            tracing::warn!(
                vertex = %graph.vertex(sink).name,
                kind = ?graph.vertex(sink).kind,
                "unreachable sink: no task can ever determine this vertex's status"
            );
        }
    }
}

fn all_tasks(model: &EntityModel) -> Vec<Task> {
    model
        .entities()
        .filter(|e| e.solve())
        .flat_map(|e| {
            e.solves()
                .solvers()
                .map(|s| Task::new(e.name().clone(), s.to_string()))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Resolves CLI proof-name arguments to entity names by matching the last
/// name segment, as the original tool's `name.parts[-1] == arg` does. An
/// empty argument list selects every solved entity.
fn select_entities(model: &EntityModel, args: &[String]) -> Result<Vec<Name>, IvyError> {
    if args.is_empty() {
        return Ok(model.entities().filter(|e| e.solve()).map(|e| e.name().clone()).collect());
    }
    let mut selected = Vec::new();
    for arg in args {
        let found = model
            .entities()
            .filter(|e| e.solve())
            .find(|e| e.name().local() == arg)
            .map(|e| e.name().clone());
        match found {
            Some(name) => selected.push(name),
            None => return Err(IvyError::ProofNotFound(arg.clone())),
        }
    }
    Ok(selected)
}

fn build_input_spec(entity: &Entity, config: &Config) -> ProofInputSpec {
    let engines = config.engines.iter().map(|e| e.line.clone()).collect();
    match entity {
        Entity::Proof(p) => {
            let asserts: Vec<String> = p.asserts().map(|a: &AssertItem| a.name.rtlil()).collect();
            let assumes: Vec<String> = p
                .assumes()
                .filter(|a: &&AssumeItem| !a.cross)
                .map(|a| a.name.rtlil())
                .collect();
            let cross_assumes: Vec<String> =
                p.assumes().filter(|a: &&AssumeItem| a.cross).map(|a| a.name.rtlil()).collect();
            ProofInputSpec { asserts, assumes, cross_assumes, engines, depth: 2 }
        }
        Entity::Invariant(i) => {
            ProofInputSpec { asserts: vec![i.name.rtlil()], assumes: vec![], cross_assumes: vec![], engines, depth: 2 }
        }
    }
}

struct GraphOracle {
    store: Arc<StatusStore>,
    graph: Arc<StatusGraph>,
}

#[async_trait::async_trait]
impl UsefulnessOracle for GraphOracle {
    async fn unreachable_non_useful(&self) -> Vec<Name> {
        let Ok(reduced) = self.store.reduced_status() else {
            return Vec::new();
        };
        let mut map = StatusMap::new(&self.graph, |name| reduced.get(name).copied());
        map.iterate();
        map.backpropagate_useful();
        self.graph
            .tasks()
            .iter()
            .filter(|&&rank| {
                !map.useful(rank)
                    && matches!(map.status(rank), Status::Pending | Status::Scheduled | Status::Running)
            })
            .map(|&rank| self.graph.vertex(rank).name.clone())
            .collect()
    }
}

async fn run_and_prove(
    config: &Config,
    model: &EntityModel,
    graph: &Arc<StatusGraph>,
    store: Arc<StatusStore>,
    work_dir: &WorkDir,
    proof_args: &[String],
    reset_schedule: bool,
    jobs: usize,
    debug_events: bool,
) -> Result<bool, IvyError> {
    let tasks = all_tasks(model);
    store.initialize_status(&tasks)?;

    let selected_names = select_entities(model, proof_args)?;
    let selected: std::collections::HashSet<&Name> = selected_names.iter().collect();
    let selected_tasks: Vec<Task> = tasks.into_iter().filter(|t| selected.contains(&t.name)).collect();

    let require: &[Status] = if reset_schedule {
        &[Status::Pending, Status::Scheduled, Status::Running]
    } else {
        &[Status::Pending]
    };
    let rejected = store.change_status_many(&selected_tasks, Status::Scheduled, Some(require))?;
    for (task, current) in &rejected {
        if !proof_args.is_empty() {
            tracing::warn!(%task, status = %current, "skipping: task is not in a startable state");
        }
    }
    let to_dispatch: Vec<Task> = selected_tasks.into_iter().filter(|t| !rejected.contains_key(t)).collect();

    let oracle = Arc::new(GraphOracle { store: store.clone(), graph: graph.clone() });
    let lease = JobLease::new(jobs.max(1));
    let (scheduler, mut events_rx) = Scheduler::new(
        store.clone(),
        lease,
        config.options.default_solver.clone(),
        work_dir.tasks_dir(),
        oracle,
    );

    let mut remaining = to_dispatch.len();
    for task in &to_dispatch {
        let entity = model.get(&task.name).expect("task name came from the entity model");
        let entity_priority = entity.solves().priority(&task.solver).unwrap_or(0);
        let solve_order_index = entity.solves().solve_order(&task.solver).unwrap_or(0);
        let dependency_order = graph
            .rank_of(&VertexKey::new(VertexKind::Entity, task.name.clone()))
            .unwrap_or(0);
        let input = build_input_spec(entity, config);
        tracing::info!(%task, "scheduling proof task");
        scheduler.dispatch_proof_task(DispatchRequest {
            task: task.clone(),
            entity_priority,
            solve_order_index,
            dependency_order,
            input,
        });
    }

    while remaining > 0 {
        let Some(event) = events_rx.recv().await else { break };
        if debug_events {
            tracing::debug!(?event, "proof status event");
        }
        let is_final = event.status.is_final();
        scheduler.handle_event(event)?;
        if is_final {
            remaining -= 1;
        }
    }

    let reduced = store.reduced_status()?;
    print_report(model, &reduced, &selected_names);
    Ok(selected_names
        .iter()
        .all(|n| reduced.get(n).copied().unwrap_or(Status::Unreachable) != Status::Fail))
}

fn print_report(model: &EntityModel, reduced: &HashMap<Name, Status>, selected: &[Name]) {
    let lines: Vec<ReportLine> = selected
        .iter()
        .map(|name| ReportLine {
            name: name.clone(),
            status: reduced.get(name).copied().unwrap_or(Status::Unreachable),
            src_loc: model.get(name).map(entity_src_loc).unwrap_or_default(),
        })
        .collect();
    print!("{}", render_report(&lines));
}

fn entity_src_loc(entity: &Entity) -> String {
    match entity {
        Entity::Proof(p) => p.src_loc.clone(),
        Entity::Invariant(i) => i.src_loc.clone(),
    }
}
