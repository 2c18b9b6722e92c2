//! Iterative depth-first traversals over an id adjacency map.
//!
//! Both traversals keep an explicit stack instead of recursing, so graph
//! depth is bounded only by memory. Roots are visited in the supplied
//! `order`; neighbours are visited in adjacency order.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    InProgress,
    Done,
}

fn neighbours<'a>(adjacency: &'a BTreeMap<String, Vec<String>>, id: &str) -> &'a [String] {
    adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
}

/// Find every cycle reachable from `order`.
///
/// A cycle is reported each time the traversal meets a node that is still
/// on the stack, as the path slice from that node's first occurrence to the
/// revisit, closed by repeating the node: `[X, Y, X]`. Neighbours that are
/// not themselves keys of `adjacency` or `order` are ignored.
pub fn find_cycles(
    order: &[String],
    adjacency: &BTreeMap<String, Vec<String>>,
) -> Vec<Vec<String>> {
    let mut color: BTreeMap<&str, Color> = order
        .iter()
        .map(|id| (id.as_str(), Color::Unvisited))
        .collect();
    for id in adjacency.keys() {
        color.entry(id.as_str()).or_insert(Color::Unvisited);
    }

    let mut cycles = Vec::new();

    for root in order {
        if color.get(root.as_str()) != Some(&Color::Unvisited) {
            continue;
        }

        // (node, index of next neighbour to visit)
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
        let mut path: Vec<&str> = vec![root.as_str()];
        color.insert(root.as_str(), Color::InProgress);

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let adj = neighbours(adjacency, node);

            if next < adj.len() {
                frame.1 += 1;
                let child = adj[next].as_str();
                match color.get(child).copied() {
                    Some(Color::Unvisited) => {
                        color.insert(child, Color::InProgress);
                        stack.push((child, 0));
                        path.push(child);
                    }
                    Some(Color::InProgress) => {
                        if let Some(start) = path.iter().position(|p| *p == child) {
                            let mut cycle: Vec<String> =
                                path[start..].iter().map(|s| s.to_string()).collect();
                            cycle.push(child.to_string());
                            cycles.push(cycle);
                        }
                    }
                    Some(Color::Done) | None => {}
                }
            } else {
                color.insert(node, Color::Done);
                stack.pop();
                path.pop();
            }
        }
    }

    cycles
}

/// Depth-first postorder over `dependencies` (`id → ids it depends on`).
///
/// Every id appears after all of its dependencies. If the graph has a
/// cycle, back edges are skipped and the result is still a permutation of
/// the visited ids, but no ordering guarantee holds across the cycle.
pub fn postorder(order: &[String], dependencies: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    let mut color: BTreeMap<&str, Color> = order
        .iter()
        .map(|id| (id.as_str(), Color::Unvisited))
        .collect();
    let mut out = Vec::with_capacity(order.len());

    for root in order {
        if color.get(root.as_str()) != Some(&Color::Unvisited) {
            continue;
        }
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
        color.insert(root.as_str(), Color::InProgress);

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let adj = neighbours(dependencies, node);

            if next < adj.len() {
                frame.1 += 1;
                let child = adj[next].as_str();
                if color.get(child) == Some(&Color::Unvisited) {
                    color.insert(child, Color::InProgress);
                    stack.push((child, 0));
                }
            } else {
                color.insert(node, Color::Done);
                out.push(node.to_string());
                stack.pop();
            }
        }
    }

    out
}
