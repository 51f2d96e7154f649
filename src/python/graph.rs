#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Dependency graph over a module's declarations and its closure.

use std::collections::{HashMap, VecDeque};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::declarations::Declaration;

/// Directed graph from each declaration to the same-module declarations its
/// definition references.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyGraph {
    /// Adjacency, in declaration order.
    edges: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from extracted declarations.
    pub fn from_declarations(declarations: &[Declaration]) -> Self {
        let mut graph = Self::new();
        for declaration in declarations {
            graph.add(declaration.name(), declaration.uses().iter().cloned());
        }
        graph
    }

    /// Adds a node with its outgoing edges. Edges to names that never become
    /// nodes are ignored during resolution.
    pub fn add(&mut self, name: impl Into<String>, uses: impl IntoIterator<Item = String>) {
        self.edges.entry(name.into()).or_default().extend(uses);
    }

    /// Returns true if `name` is a node.
    pub fn contains(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Returns the direct dependencies of `name` that are nodes.
    pub fn uses<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .get(name)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .filter(|n| self.contains(n))
    }

    /// Returns the declarations `root` needs in order to run standalone,
    /// excluding `root`, with dependencies before their dependents.
    ///
    /// Members of a cycle are emitted together, in discovery order; other
    /// ties go to the earliest discovered name. Unknown roots resolve to
    /// nothing.
    pub fn resolve(&self, root: &str) -> Vec<String> {
        let discovered = self.discover(root);
        if discovered.is_empty() {
            return Vec::new();
        }

        let components = Tarjan::new(self, &discovered).run();
        let component_of: HashMap<&str, usize> = components
            .iter()
            .enumerate()
            .flat_map(|(i, members)| members.iter().map(move |m| (*m, i)))
            .collect();

        // A component becomes ready once every component it uses is emitted.
        let mut pending: Vec<IndexSet<usize>> = vec![IndexSet::new(); components.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); components.len()];
        for (i, members) in components.iter().enumerate() {
            for member in members {
                for used in self.uses(member) {
                    if let Some(&j) = component_of.get(used)
                        && j != i
                        && pending[i].insert(j)
                    {
                        dependents[j].push(i);
                    }
                }
            }
        }

        let rank = |name: &str| discovered.get_index_of(name).unwrap_or(usize::MAX);
        let first_rank = |i: usize| {
            components[i]
                .iter()
                .map(|m| rank(*m))
                .min()
                .unwrap_or(usize::MAX)
        };

        let mut ready: Vec<usize> = (0..components.len())
            .filter(|i| pending[*i].is_empty())
            .collect();
        let mut order = Vec::with_capacity(discovered.len());

        while let Some(pos) = ready
            .iter()
            .enumerate()
            .min_by_key(|(_, i)| first_rank(**i))
            .map(|(pos, _)| pos)
        {
            let component = ready.swap_remove(pos);
            let mut members = components[component].clone();
            members.sort_by_key(|m| rank(*m));
            order.extend(members.into_iter().map(str::to_string));

            for &dependent in &dependents[component] {
                pending[dependent].swap_remove(&component);
                if pending[dependent].is_empty() {
                    ready.push(dependent);
                }
            }
        }

        order
    }

    /// Breadth-first discovery of every node reachable from `root`, excluding
    /// `root`, in discovery order.
    fn discover<'a>(&'a self, root: &str) -> IndexSet<&'a str> {
        let mut discovered: IndexSet<&str> = IndexSet::new();
        let mut frontier: VecDeque<&str> = VecDeque::new();

        for used in self.uses(root) {
            if used != root && discovered.insert(used) {
                frontier.push_back(used);
            }
        }

        while let Some(name) = frontier.pop_front() {
            for used in self.uses(name) {
                if used != root && discovered.insert(used) {
                    frontier.push_back(used);
                }
            }
        }

        discovered
    }
}

/// Tarjan's strongly connected components over a discovered subgraph.
struct Tarjan<'g> {
    /// The full graph.
    graph: &'g DependencyGraph,
    /// Nodes of the subgraph.
    nodes: &'g IndexSet<&'g str>,
    /// Visit index per node.
    index: HashMap<&'g str, usize>,
    /// Lowest reachable index per node.
    low:   HashMap<&'g str, usize>,
    /// Nodes on the current stack.
    stack: Vec<&'g str>,
    /// Next visit index.
    next:  usize,
    /// Components found so far.
    found: Vec<Vec<&'g str>>,
}

impl<'g> Tarjan<'g> {
    /// Prepares a run over `nodes`.
    fn new(graph: &'g DependencyGraph, nodes: &'g IndexSet<&'g str>) -> Self {
        Self {
            graph,
            nodes,
            index: HashMap::new(),
            low: HashMap::new(),
            stack: Vec::new(),
            next: 0,
            found: Vec::new(),
        }
    }

    /// Returns every component of the subgraph.
    fn run(mut self) -> Vec<Vec<&'g str>> {
        for node in self.nodes.iter().copied() {
            if !self.index.contains_key(node) {
                self.connect(node);
            }
        }
        self.found
    }

    /// Visits `node` and closes its component if it is a root.
    fn connect(&mut self, node: &'g str) {
        self.index.insert(node, self.next);
        self.low.insert(node, self.next);
        self.next += 1;
        self.stack.push(node);

        let successors: Vec<&'g str> = self
            .graph
            .uses(node)
            .filter_map(|n| self.nodes.get(n).copied())
            .collect();

        for successor in successors {
            if let Some(&successor_index) = self.index.get(successor) {
                if self.stack.contains(&successor) {
                    let low = self.low[node].min(successor_index);
                    self.low.insert(node, low);
                }
            } else {
                self.connect(successor);
                let low = self.low[node].min(self.low[successor]);
                self.low.insert(node, low);
            }
        }

        if self.low[node] == self.index[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                component.push(member);
                if member == node {
                    break;
                }
            }
            self.found.push(component);
        }
    }
}
