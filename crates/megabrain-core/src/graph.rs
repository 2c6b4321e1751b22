//! `GraphClosure`: bounded-depth traversal over a structural entity graph
//! (implements/extends/calls/... edges between named entities).
//!
//! The graph is stored as an arena: entities get dense `u32` ids via a name
//! index, edges are a flat `Vec`, and a reverse adjacency list is built once
//! at construction (see `spec.md` Design Note on "potentially cyclic entity
//! graph" — this is exactly the shape that note calls for). There is no
//! teacher analogue for this component; the arena/adjacency idiom follows
//! the rest of the crate's "plain struct + `HashMap` indirection" style.

use std::collections::{HashMap, HashSet};

use crate::query::{PredicateKind, StructuralPredicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeLabel {
    Implements,
    Extends,
    Calls,
    Instantiates,
    References,
    Imports,
}

/// An arena-indexed, directed entity graph. Edges read as `(source, target,
/// label)`, e.g. `(ArrayList, List, Implements)` means "ArrayList implements
/// List".
#[derive(Debug, Default)]
pub struct Graph {
    names: Vec<String>,
    name_to_id: HashMap<String, u32>,
    /// target id -> (source id, label) — the direction closures traverse.
    reverse_adjacency: HashMap<u32, Vec<(u32, EdgeLabel)>>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn from_edges(edges: Vec<(String, String, EdgeLabel)>) -> Self {
        let mut graph = Graph::new();
        for (source, target, label) in edges {
            graph.add_edge(&source, &target, label);
        }
        graph
    }

    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.name_to_id.insert(name.to_string(), id);
        id
    }

    pub fn add_edge(&mut self, source: &str, target: &str, label: EdgeLabel) {
        let source_id = self.intern(source);
        let target_id = self.intern(target);
        self.reverse_adjacency
            .entry(target_id)
            .or_default()
            .push((source_id, label));
    }

    fn name_of(&self, id: u32) -> &str {
        &self.names[id as usize]
    }

    /// BFS from `root` following only edges whose label is in `labels`, in
    /// reverse (i.e. from target back to source), bounded to `depth` hops.
    /// Ties among equal-length paths are broken lexicographically by
    /// visiting neighbors in sorted name order, so the first time a node is
    /// reached is always via the lexicographically smallest shortest path.
    fn closure_via(&self, root: &str, labels: &[EdgeLabel], depth: u32) -> Vec<(String, Vec<String>)> {
        let Some(&root_id) = self.name_to_id.get(root) else {
            return Vec::new();
        };

        let mut visited: HashSet<u32> = HashSet::new();
        visited.insert(root_id);
        let mut frontier: Vec<(u32, Vec<String>)> = vec![(root_id, vec![root.to_string()])];
        let mut results = Vec::new();

        for _ in 0..depth {
            let mut next_frontier: Vec<(u32, Vec<String>)> = Vec::new();
            for (node_id, path) in &frontier {
                let mut neighbors: Vec<(u32, &str)> = self
                    .reverse_adjacency
                    .get(node_id)
                    .into_iter()
                    .flatten()
                    .filter(|(_, label)| labels.contains(label))
                    .map(|(source_id, _)| (*source_id, self.name_of(*source_id)))
                    .collect();
                neighbors.sort_by(|a, b| a.1.cmp(b.1));

                for (neighbor_id, neighbor_name) in neighbors {
                    if visited.contains(&neighbor_id) {
                        continue;
                    }
                    visited.insert(neighbor_id);
                    let mut new_path = path.clone();
                    new_path.push(neighbor_name.to_string());
                    results.push((neighbor_name.to_string(), new_path.clone()));
                    next_frontier.push((neighbor_id, new_path));
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        results
    }
}

/// Clamp a requested traversal depth into `[1, max_depth]`.
pub fn clamp_depth(depth: u32, max_depth: u32) -> u32 {
    depth.max(1).min(max_depth.max(1))
}

/// Runtime-selected graph backend: either an in-memory graph is wired in, or
/// none is (`Absent`). `Absent` answers every closure query with an empty
/// vector, never an error — a deployment without structural data simply
/// never contributes graph results.
pub enum GraphBackend {
    InMemory(Graph),
    Absent,
}

impl GraphBackend {
    pub fn implements_closure(&self, interface: &str, depth: u32) -> Vec<(String, Vec<String>)> {
        match self {
            GraphBackend::Absent => Vec::new(),
            GraphBackend::InMemory(graph) => {
                graph.closure_via(interface, &[EdgeLabel::Implements, EdgeLabel::Extends], depth)
            }
        }
    }

    pub fn extends_closure(&self, class: &str, depth: u32) -> Vec<(String, Vec<String>)> {
        match self {
            GraphBackend::Absent => Vec::new(),
            GraphBackend::InMemory(graph) => graph.closure_via(class, &[EdgeLabel::Extends], depth),
        }
    }

    /// `usages(target) = {target} ∪ implements(target) ∪ extends(target)`,
    /// deduped by entity name (first occurrence kept) — see Open Question 3
    /// in `DESIGN.md`.
    pub fn usages_closure(&self, target: &str, depth: u32) -> Vec<(String, Vec<String>)> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();

        seen.insert(target.to_string());
        out.push((target.to_string(), vec![target.to_string()]));

        for (name, path) in self.implements_closure(target, depth) {
            if seen.insert(name.clone()) {
                out.push((name, path));
            }
        }
        for (name, path) in self.extends_closure(target, depth) {
            if seen.insert(name.clone()) {
                out.push((name, path));
            }
        }
        out
    }

    pub fn closure_for(&self, predicate: &StructuralPredicate, depth: u32) -> Vec<(String, Vec<String>)> {
        match predicate.kind {
            PredicateKind::Implements => self.implements_closure(&predicate.target_name, depth),
            PredicateKind::Extends => self.extends_closure(&predicate.target_name, depth),
            PredicateKind::Usages => self.usages_closure(&predicate.target_name, depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> Graph {
        // ArrayList implements List; List extends Collection.
        // LinkedList implements List.
        Graph::from_edges(vec![
            ("ArrayList".to_string(), "List".to_string(), EdgeLabel::Implements),
            ("LinkedList".to_string(), "List".to_string(), EdgeLabel::Implements),
            ("List".to_string(), "Collection".to_string(), EdgeLabel::Extends),
        ])
    }

    #[test]
    fn implements_closure_finds_direct_and_transitive_implementors() {
        let backend = GraphBackend::InMemory(sample_graph());
        let result = backend.implements_closure("Collection", 5);
        let names: Vec<_> = result.iter().map(|(n, _)| n.clone()).collect();
        assert!(names.contains(&"List".to_string()));
        assert!(names.contains(&"ArrayList".to_string()));
        assert!(names.contains(&"LinkedList".to_string()));
    }

    #[test]
    fn depth_bound_limits_traversal() {
        let backend = GraphBackend::InMemory(sample_graph());
        let result = backend.implements_closure("Collection", 1);
        let names: Vec<_> = result.iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, vec!["List".to_string()]);
    }

    #[test]
    fn paths_never_exceed_depth_plus_one() {
        let backend = GraphBackend::InMemory(sample_graph());
        let result = backend.implements_closure("Collection", 5);
        for (_, path) in &result {
            assert!(path.len() <= 5 + 1);
        }
    }

    #[test]
    fn cyclic_graph_terminates_and_dedupes() {
        let cyclic = Graph::from_edges(vec![
            ("A".to_string(), "B".to_string(), EdgeLabel::Extends),
            ("B".to_string(), "A".to_string(), EdgeLabel::Extends),
        ]);
        let backend = GraphBackend::InMemory(cyclic);
        let result = backend.extends_closure("A", 10);
        let names: HashSet<_> = result.iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names.len(), 1);
        assert!(names.contains("B"));
    }

    #[test]
    fn absent_backend_returns_empty_without_error() {
        let backend = GraphBackend::Absent;
        assert!(backend.implements_closure("Anything", 5).is_empty());
        assert!(backend.extends_closure("Anything", 5).is_empty());
        assert!(backend.usages_closure("Anything", 5).is_empty());
    }

    #[test]
    fn usages_closure_unions_target_implements_and_extends() {
        let backend = GraphBackend::InMemory(sample_graph());
        let result = backend.usages_closure("List", 5);
        let names: HashSet<_> = result.iter().map(|(n, _)| n.clone()).collect();
        assert!(names.contains("List"));
        assert!(names.contains("ArrayList"));
        assert!(names.contains("LinkedList"));
    }

    #[test]
    fn unknown_root_returns_empty() {
        let backend = GraphBackend::InMemory(sample_graph());
        assert!(backend.implements_closure("NoSuchEntity", 5).is_empty());
    }

    #[test]
    fn clamp_depth_bounds_into_range() {
        assert_eq!(clamp_depth(0, 5), 1);
        assert_eq!(clamp_depth(10, 5), 5);
        assert_eq!(clamp_depth(3, 5), 3);
    }
}
