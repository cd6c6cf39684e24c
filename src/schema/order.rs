//! Foreign-key dependency ordering
//!
//! Tables are ordered so that every table comes after the tables it
//! references. Uses petgraph for the dependency graph.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::graph::NodeIndex;
use petgraph::{Directed, Direction, Graph};

use super::table::TableDefinition;

/// Sort tables so that referenced tables come before referencing ones
///
/// Among tables whose dependencies are already placed, the one with the
/// smallest name goes first. Self-references and references to tables
/// outside `tables` are ignored. Tables caught in a foreign-key cycle are
/// emitted in name order once nothing else can be placed.
pub fn sort_by_dependencies(tables: Vec<TableDefinition>) -> Vec<TableDefinition> {
    // Edge direction: dependency -> dependent
    let mut graph = Graph::<usize, (), Directed>::new();
    let mut node_map: HashMap<&str, NodeIndex> = HashMap::new();

    for (i, table) in tables.iter().enumerate() {
        let node = graph.add_node(i);
        node_map.insert(table.name.as_str(), node);
    }

    for table in &tables {
        let dependent = node_map[table.name.as_str()];
        for dependency in table.dependencies() {
            if let Some(&dep_node) = node_map.get(dependency) {
                if graph.find_edge(dep_node, dependent).is_none() {
                    graph.add_edge(dep_node, dependent, ());
                }
            }
        }
    }

    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut placed = vec![false; tables.len()];

    let key = |node: NodeIndex| Reverse((tables[graph[node]].name.clone(), node.index()));

    let mut ready: BinaryHeap<Reverse<(String, usize)>> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .map(key)
        .collect();

    let mut order = Vec::with_capacity(tables.len());

    while order.len() < tables.len() {
        let next = match ready.pop() {
            Some(Reverse((_, index))) => NodeIndex::new(index),
            None => {
                // Only cycles are left; break the one with the smallest name
                let Some(node) = graph
                    .node_indices()
                    .filter(|n| !placed[n.index()])
                    .min_by(|a, b| tables[graph[*a]].name.cmp(&tables[graph[*b]].name))
                else {
                    break;
                };
                tracing::warn!(
                    table = %tables[graph[node]].name,
                    "circular foreign key dependency, ordering may not satisfy all references"
                );
                node
            }
        };

        if placed[next.index()] {
            continue;
        }
        placed[next.index()] = true;
        order.push(graph[next]);

        for dependent in graph.neighbors_directed(next, Direction::Outgoing) {
            let degree = &mut in_degree[dependent.index()];
            *degree = degree.saturating_sub(1);
            if *degree == 0 && !placed[dependent.index()] {
                ready.push(key(dependent));
            }
        }
    }

    let mut slots: Vec<Option<TableDefinition>> = tables.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}
