//! Dependency level resolution.
//!
//! Level `i` contains only services whose dependencies all sit in levels `< i`.
//! Members of one level do not depend on each other and can be deployed or
//! removed together.

use crate::errors::CycleDetectedError;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Debug;

/// One set of mutually independent services.
pub type Level = BTreeSet<String>;

/// Computes deploy levels from a dependency map.
pub trait DependencyGraphResolver: Send + Sync + Debug {
    /// Partitions the services of `graph` into ordered levels.
    ///
    /// Dependencies naming services absent from `graph` are ignored; callers
    /// validate those beforehand.
    ///
    /// # Errors
    ///
    /// Returns [`CycleDetectedError`] if no valid order exists. No partial
    /// result is returned.
    fn resolve(&self, graph: &HashMap<String, Vec<String>>) -> Result<Vec<Level>, CycleDetectedError>;
}

/// Default resolver: repeatedly peels off every service whose dependencies are placed.
///
/// The partition is stable for a fixed input because levels are ordered sets
/// and each service lands in the lowest level its dependencies allow.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelResolver;

impl LevelResolver {
    /// Creates a new resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DependencyGraphResolver for LevelResolver {
    fn resolve(&self, graph: &HashMap<String, Vec<String>>) -> Result<Vec<Level>, CycleDetectedError> {
        // Sorted view so cycle reporting is deterministic too.
        let sorted: BTreeMap<&str, Vec<&str>> = graph
            .iter()
            .map(|(name, deps)| {
                let known: Vec<&str> = deps
                    .iter()
                    .map(String::as_str)
                    .filter(|dep| graph.contains_key(*dep))
                    .collect();
                (name.as_str(), known)
            })
            .collect();

        let mut placed: HashSet<&str> = HashSet::new();
        let mut remaining: BTreeSet<&str> = sorted.keys().copied().collect();
        let mut levels = Vec::new();

        while !remaining.is_empty() {
            let ready: Vec<&str> = remaining
                .iter()
                .copied()
                .filter(|name| sorted[name].iter().all(|dep| placed.contains(dep)))
                .collect();

            if ready.is_empty() {
                let cycle = find_cycle(&sorted, &remaining)
                    .unwrap_or_else(|| remaining.iter().map(|s| (*s).to_string()).collect());
                return Err(CycleDetectedError::new(cycle));
            }

            for name in &ready {
                remaining.remove(name);
            }
            placed.extend(ready.iter().copied());
            levels.push(ready.into_iter().map(str::to_string).collect());
        }

        Ok(levels)
    }
}

/// Finds one cycle among `candidates` by depth-first search.
fn find_cycle<'a>(
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    candidates: &BTreeSet<&'a str>,
) -> Option<Vec<String>> {
    fn dfs<'g>(
        node: &'g str,
        graph: &BTreeMap<&'g str, Vec<&'g str>>,
        visited: &mut HashSet<&'g str>,
        stack: &mut Vec<&'g str>,
    ) -> Option<Vec<String>> {
        if let Some(start) = stack.iter().position(|n| *n == node) {
            let mut cycle: Vec<String> = stack[start..].iter().map(|s| (*s).to_string()).collect();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        if !visited.insert(node) {
            return None;
        }

        stack.push(node);
        if let Some(deps) = graph.get(node) {
            for dep in deps {
                if let Some(cycle) = dfs(*dep, graph, visited, stack) {
                    return Some(cycle);
                }
            }
        }
        stack.pop();
        None
    }

    let mut visited = HashSet::new();
    for node in candidates {
        let mut stack = Vec::new();
        if let Some(cycle) = dfs(*node, graph, &mut visited, &mut stack) {
            return Some(cycle);
        }
    }
    None
}
