use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::DatabaseSchema;

/// Summary of FK graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub self_references: usize,
}

/// Parent-before-child ordering of the tables in a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphReport {
    pub summary: FkGraphSummary,
    /// Table keys (`schema.table`) with every referenced table ahead of its
    /// dependents. `None` when the graph has a cycle.
    pub topo_order: Option<Vec<String>>,
    pub cycle: Option<Vec<String>>,
}

/// Build a deterministic FK dependency report for a database schema.
///
/// Self-referencing foreign keys do not constrain the order and are only
/// counted in the summary.
pub fn build_fk_graph_report(schema: &DatabaseSchema) -> FkGraphReport {
    let (graph, self_references) = build_adjacency(schema);
    let nodes = graph.len();
    let edges = graph.values().map(|targets| targets.len()).sum();
    let summary = FkGraphSummary {
        nodes,
        edges,
        self_references,
    };

    match toposort(&graph) {
        Ok(order) => FkGraphReport {
            summary,
            topo_order: Some(order),
            cycle: None,
        },
        Err(cycle) => FkGraphReport {
            summary,
            topo_order: None,
            cycle: Some(cycle),
        },
    }
}

/// Edges point from a referenced (parent) table to the tables referencing it.
fn build_adjacency(schema: &DatabaseSchema) -> (BTreeMap<String, BTreeSet<String>>, usize) {
    let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut self_references = 0;

    for (schema_name, table) in schema.tables() {
        let table_key = format!("{schema_name}.{}", table.name);
        graph.entry(table_key.clone()).or_default();

        for fk in table.foreign_keys() {
            let referenced = format!("{}.{}", fk.referenced_schema, fk.referenced_table);
            if referenced == table_key {
                self_references += 1;
                continue;
            }
            graph.entry(referenced).or_default().insert(table_key.clone());
        }
    }

    (graph, self_references)
}

fn toposort(graph: &BTreeMap<String, BTreeSet<String>>) -> Result<Vec<String>, Vec<String>> {
    let mut indegree: BTreeMap<&str, usize> =
        graph.keys().map(|node| (node.as_str(), 0)).collect();

    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.as_str()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<&str> = indegree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| *node)
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());

        if let Some(targets) = graph.get(node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target.as_str()) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.as_str());
                    }
                }
            }
        }
    }

    if order.len() == indegree.len() {
        Ok(order)
    } else {
        Err(indegree
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(node, _)| node.to_string())
            .collect())
    }
}
