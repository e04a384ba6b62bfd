use std::collections::{HashMap, VecDeque};

use crate::codegen::error::{GenError, GenResult};
use crate::dsl::GraphDSL;

/// Order nodes so that every node comes after the nodes feeding it.
///
/// Ties are broken by declaration order, so the same graph always yields
/// the same order.
pub fn topo_sort(graph: &GraphDSL) -> GenResult<Vec<String>> {
    let mut indeg: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), 0usize))
        .collect();

    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for c in &graph.connections {
        if !indeg.contains_key(c.from.node_id.as_str()) {
            return Err(GenError::MissingNode(c.from.node_id.clone()));
        }
        let Some(d) = indeg.get_mut(c.to.node_id.as_str()) else {
            return Err(GenError::MissingNode(c.to.node_id.clone()));
        };
        *d += 1;
        outgoing
            .entry(c.from.node_id.as_str())
            .or_default()
            .push(c.to.node_id.as_str());
    }

    let mut q: VecDeque<&str> = graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| indeg.get(id) == Some(&0))
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(graph.nodes.len());

    while let Some(n) = q.pop_front() {
        order.push(n.to_string());
        if let Some(nexts) = outgoing.get(n) {
            for m in nexts {
                if let Some(entry) = indeg.get_mut(m) {
                    *entry -= 1;
                    if *entry == 0 {
                        q.push_back(*m);
                    }
                }
            }
        }
    }

    if order.len() != graph.nodes.len() {
        return Err(GenError::GraphCycle);
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{Connection, Endpoint, Metadata, Node};

    fn node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            node_type: "Vector3".to_string(),
            params: HashMap::new(),
            slot_values: Default::default(),
        }
    }

    fn conn(id: &str, from: &str, to: &str) -> Connection {
        Connection {
            id: id.to_string(),
            from: Endpoint {
                node_id: from.to_string(),
                slot_id: 0,
            },
            to: Endpoint {
                node_id: to.to_string(),
                slot_id: 1,
            },
        }
    }

    fn graph(nodes: Vec<Node>, connections: Vec<Connection>) -> GraphDSL {
        GraphDSL {
            version: "1.0".to_string(),
            metadata: Metadata {
                name: "test".to_string(),
                created: None,
                modified: None,
            },
            nodes,
            connections,
        }
    }

    #[test]
    fn dependencies_come_first() {
        let g = graph(
            vec![node("c"), node("b"), node("a")],
            vec![conn("c1", "a", "b"), conn("c2", "b", "c")],
        );
        assert_eq!(topo_sort(&g).unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn independent_nodes_keep_declaration_order() {
        let g = graph(vec![node("z"), node("y"), node("x")], vec![]);
        assert_eq!(topo_sort(&g).unwrap(), vec!["z", "y", "x"]);
    }

    #[test]
    fn cycle_is_rejected() {
        let g = graph(
            vec![node("a"), node("b")],
            vec![conn("c1", "a", "b"), conn("c2", "b", "a")],
        );
        assert_eq!(topo_sort(&g).unwrap_err(), GenError::GraphCycle);
    }

    #[test]
    fn missing_node_is_rejected() {
        let g = graph(vec![node("a")], vec![conn("c1", "a", "ghost")]);
        assert_eq!(
            topo_sort(&g).unwrap_err(),
            GenError::MissingNode("ghost".to_string())
        );
    }
}
