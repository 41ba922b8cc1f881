//! Dependency analysis for computed memories
//!
//! Nodes are memory symbols; an edge `a -> b` means writing `a` must
//! re-evaluate the computed memory `b`. Edges that would close a cycle are
//! rejected, so the graph stays acyclic and propagation always terminates.

use crate::value::{CalcState, SymbolTag};
use crate::{CalcError, CalcResult};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<SymbolTag>,
    index: HashMap<SymbolTag, usize>,
    /// Outgoing edges: dependency -> dependents
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph of the `dependents` links stored on the memories of `state`
    pub fn from_memories(state: &CalcState) -> Self {
        let mut graph = Self::new();
        for entry in state.memories() {
            let from = graph.node(&entry.symbol);
            for dependent in &entry.dependents {
                let to = graph.node(dependent);
                if !graph.edges[from].contains(&to) {
                    graph.edges[from].push(to);
                }
            }
        }
        graph
    }

    fn node(&mut self, symbol: &SymbolTag) -> usize {
        if let Some(&i) = self.index.get(symbol) {
            return i;
        }
        self.nodes.push(symbol.clone());
        self.edges.push(Vec::new());
        let i = self.nodes.len() - 1;
        self.index.insert(symbol.clone(), i);
        i
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when an edge `dependency -> dependent` would close a cycle
    pub fn would_cycle(&self, dependency: &SymbolTag, dependent: &SymbolTag) -> bool {
        if dependency == dependent {
            return true;
        }
        match (self.index.get(dependent), self.index.get(dependency)) {
            (Some(&start), Some(&target)) => self.reachable(start).contains(&target),
            _ => false,
        }
    }

    /// Record that writing `dependency` re-evaluates `dependent`
    pub fn add_edge(&mut self, dependency: &SymbolTag, dependent: &SymbolTag) -> CalcResult<()> {
        if self.would_cycle(dependency, dependent) {
            return Err(CalcError::CyclicDependency(format!(
                "'{}' depends on '{}', which already depends on it",
                dependent, dependency
            )));
        }
        let from = self.node(dependency);
        let to = self.node(dependent);
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
        }
        Ok(())
    }

    /// Nodes reachable from `start`, excluding `start` itself unless a cycle
    /// leads back to it
    fn reachable(&self, start: usize) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<usize> = self.edges[start].iter().copied().collect();
        while let Some(node) = queue.pop_front() {
            if seen.insert(node) {
                queue.extend(self.edges[node].iter().copied());
            }
        }
        seen
    }

    /// Computed memories to re-evaluate after writing `start`, each after
    /// everything it depends on.
    ///
    /// Kahn's algorithm over the subgraph reachable from `start`.
    pub fn propagation_order(&self, start: &SymbolTag) -> CalcResult<Vec<SymbolTag>> {
        let Some(&start) = self.index.get(start) else {
            return Ok(Vec::new());
        };
        let reachable = self.reachable(start);

        // Only edges inside the affected subgraph hold a node back
        let mut dependency_count: HashMap<usize, usize> =
            reachable.iter().map(|&node| (node, 0)).collect();
        for &node in &reachable {
            for target in &self.edges[node] {
                if let Some(count) = dependency_count.get_mut(target) {
                    *count += 1;
                }
            }
        }

        let mut ready: Vec<usize> = dependency_count
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&node, _)| node)
            .collect();
        ready.sort_unstable();
        let mut queue: VecDeque<usize> = ready.into();

        let mut result = Vec::new();
        while let Some(node) = queue.pop_front() {
            result.push(self.nodes[node].clone());
            for dependent in &self.edges[node] {
                if let Some(count) = dependency_count.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }

        if result.len() != reachable.len() {
            return Err(CalcError::CyclicDependency(format!(
                "memories depending on '{}' form a cycle",
                self.nodes[start]
            )));
        }
        Ok(result)
    }
}
