//! The task graph.
//!
//! A build is a set of named tasks with explicit predecessor lists, forming
//! a Directed Acyclic Graph. The executor performs a parallel topological
//! traversal: every task whose predecessors have all completed is spawned
//! immediately, so unordered tasks interleave freely while an edge between
//! two tasks is a strict barrier. This is safe because the build tasks
//! write disjoint subtrees of the output directory.
//!
//! The algorithm works as follows:
//! 1. A pool of worker threads is spawned.
//! 2. The initial set of tasks (those with no predecessors) is sent to the
//!    workers.
//! 3. The main thread waits for completions on a channel. When a task
//!    finishes, the dependency counts of its dependents are decremented,
//!    and any count reaching zero spawns that task.
//! 4. When a task fails, its transitive dependents are never started;
//!    tasks already running are left to finish.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crossbeam_channel::unbounded;
use indicatif::{ProgressBar, ProgressStyle};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::error::BuildError;
use crate::io::as_overhead;

type Action = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

struct Task {
    name: &'static str,
    deps: Vec<&'static str>,
    action: Action,
}

/// An ordered collection of named tasks and their predecessor lists.
#[derive(Default)]
pub struct Pipeline {
    tasks: Vec<Task>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. `deps` are the names of tasks which must complete
    /// before this one starts; they must be registered too by the time
    /// [`Pipeline::run`] is called.
    pub fn add<F>(&mut self, name: &'static str, deps: &[&'static str], action: F) -> &mut Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.tasks.push(Task {
            name,
            deps: deps.to_vec(),
            action: Box::new(action),
        });
        self
    }

    /// Execute the graph to completion. Returns the first task failure,
    /// attributed to the task by name.
    pub fn run(&self) -> Result<(), BuildError> {
        let s = Instant::now();

        let mut graph = DiGraph::<&'static str, ()>::new();
        let mut indices = HashMap::new();

        for task in &self.tasks {
            let index = graph.add_node(task.name);
            indices.insert(task.name, index);
        }

        for task in &self.tasks {
            for dep in &task.deps {
                let from = indices.get(dep).copied().ok_or_else(|| {
                    BuildError::UnknownPredecessor(task.name.to_string(), dep.to_string())
                })?;
                graph.add_edge(from, indices[task.name], ());
            }
        }

        petgraph::algo::toposort(&graph, None)
            .map_err(|cycle| BuildError::Cycle(graph[cycle.node_id()].to_string()))?;

        // Map from a dependency to the nodes that depend on it.
        let mut dependents: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
        for edge in graph.raw_edges() {
            dependents
                .entry(edge.source())
                .or_default()
                .push(edge.target());
        }

        let mut dependency_counts: HashMap<NodeIndex, usize> = graph
            .node_indices()
            .map(|i| {
                (
                    i,
                    graph
                        .neighbors_directed(i, petgraph::Direction::Incoming)
                        .count(),
                )
            })
            .collect();

        let total = self.tasks.len() as u64;
        if total == 0 {
            return Ok(());
        }

        let bar = ProgressBar::new(total).with_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Error setting progress bar template")
                .progress_chars("#>-"),
        );

        let (result_sender, result_receiver) = unbounded::<(NodeIndex, anyhow::Result<()>)>();

        let tasks = &self.tasks;
        let mut first_error = None;
        let mut blocked: HashSet<NodeIndex> = HashSet::new();
        let mut in_flight = 0u64;

        rayon::scope(|scope| {
            let spawn_task = |index: NodeIndex| {
                let sender = result_sender.clone();
                let task = &tasks[index.index()];
                let bar = bar.clone();

                scope.spawn(move |_| {
                    bar.set_message(task.name);
                    let result = (task.action)();
                    sender.send((index, result)).unwrap();
                });
            };

            // Seed the tasks with no predecessors.
            for index in graph.node_indices() {
                if dependency_counts[&index] == 0 {
                    spawn_task(index);
                    in_flight += 1;
                }
            }

            // Scheduler loop; the main thread sits here while the workers
            // execute tasks.
            while in_flight > 0 {
                let (completed, result) = result_receiver.recv().unwrap();
                in_flight -= 1;
                bar.inc(1);

                if let Err(err) = result {
                    let name = graph[completed];
                    if first_error.is_none() {
                        first_error = Some(BuildError::Task(name.to_string(), err));
                    }

                    // Strict ordering: nothing downstream of a failed task
                    // may start.
                    let mut dfs = Dfs::new(&graph, completed);
                    while let Some(nx) = dfs.next(&graph) {
                        blocked.insert(nx);
                    }
                    continue;
                }

                if let Some(downstream) = dependents.get(&completed) {
                    for &index in downstream {
                        let count = dependency_counts.get_mut(&index).unwrap();
                        *count -= 1;
                        if *count == 0 && !blocked.contains(&index) {
                            spawn_task(index);
                            in_flight += 1;
                        }
                    }
                }
            }
        });

        match first_error {
            Some(err) => {
                bar.abandon_with_message("Build failed");
                Err(err)
            }
            None => {
                bar.finish_with_message(format!("Finished tasks {}", as_overhead(s)));
                Ok(())
            }
        }
    }
}
