//! Connection list optimization: duplicate removal and per-node caps.
//!
//! Both passes keep the relative order of surviving connections and record
//! one warning per dropped connection.

use std::collections::BTreeSet;

use tracing::debug;

use crate::connection::model::ConnectionMapping;

/// Drop repeated `(source, target)` pairs, keeping the first.
pub fn deduplicate(
    connections: Vec<ConnectionMapping>,
    warnings: &mut Vec<String>,
) -> Vec<ConnectionMapping> {
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    let mut kept = Vec::with_capacity(connections.len());

    for conn in connections {
        let key = (conn.source_node.clone(), conn.target_node.clone());
        if seen.insert(key) {
            kept.push(conn);
        } else {
            debug!(connection = %conn.id, "duplicate connection dropped");
            warnings.push(format!(
                "dropped duplicate connection {} ({} -> {})",
                conn.id, conn.source_node, conn.target_node
            ));
        }
    }
    kept
}

/// Limit every node to `max_per_node` incident connections.
///
/// Nodes are visited in first-appearance order. For an over-limit node the
/// excess connections with the highest priority number are dropped; among
/// equal priorities the latest-emitted goes first.
pub fn enforce_node_cap(
    connections: Vec<ConnectionMapping>,
    max_per_node: usize,
    warnings: &mut Vec<String>,
) -> Vec<ConnectionMapping> {
    let mut nodes: Vec<&str> = Vec::new();
    for conn in &connections {
        for n in [conn.source_node.as_str(), conn.target_node.as_str()] {
            if !nodes.contains(&n) {
                nodes.push(n);
            }
        }
    }

    let mut alive = vec![true; connections.len()];
    for node in nodes {
        let mut touching: Vec<usize> = (0..connections.len())
            .filter(|&i| {
                alive[i]
                    && (connections[i].source_node == node || connections[i].target_node == node)
            })
            .collect();
        if touching.len() <= max_per_node {
            continue;
        }
        let excess = touching.len() - max_per_node;
        touching.sort_by(|&a, &b| {
            connections[b]
                .priority
                .total_cmp(&connections[a].priority)
                .then(b.cmp(&a))
        });
        for &i in touching.iter().take(excess) {
            alive[i] = false;
            let c = &connections[i];
            debug!(connection = %c.id, node = %node, "connection dropped by node cap");
            warnings.push(format!(
                "dropped connection {} ({} -> {}): node {} exceeds {} connections",
                c.id, c.source_node, c.target_node, node, max_per_node
            ));
        }
    }

    connections
        .into_iter()
        .zip(alive)
        .filter_map(|(c, keep)| keep.then_some(c))
        .collect()
}
