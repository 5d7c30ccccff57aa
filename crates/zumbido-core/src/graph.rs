//! In-memory graph model and dependency schedule.
//!
//! Nodes live in a flat array in file order with an id→index map on the
//! side; connections stay as the decoded record list. No pointer graph,
//! no ownership cycles — the scheduler works purely through indices.
//!
//! The dependency order is computed once per load: a post-order DFS over
//! the node array visits everything feeding a node before the node itself.
//! The visitor's seen set breaks cycles silently (one edge of the cycle
//! observes the previous block's output).

use std::collections::HashMap;

use crate::chunk::{Connection, DecodedChunk, Node, NodeType, SampleData};
use crate::nodes::Kernel;
use crate::stream::StreamSlot;

/// Output buffers start at this capacity and grow to the block size on use.
const INITIAL_BUFFER_LEN: usize = 1024;

/// One node plus its kernel state and output buffer.
pub(crate) struct NodeSlot {
    pub node: Node,
    pub kernel: Kernel,
    /// The node's mono output for the current block. Other nodes read it
    /// through connections; the scheduler reads the sink's.
    pub output: Vec<f32>,
}

/// Everything a loaded chunk becomes, minus the parameter table.
#[derive(Default)]
pub(crate) struct Graph {
    pub nodes: Vec<NodeSlot>,
    pub index: HashMap<u32, usize>,
    pub connections: Vec<Connection>,
    pub samples: Vec<SampleData>,
    pub streams: Vec<StreamSlot>,
    /// Cached dependency order (slot indices).
    pub order: Vec<usize>,
    /// Cached output node (slot index).
    pub sink: Option<usize>,
}

impl Graph {
    /// Builds the runtime graph from a decoded chunk.
    pub fn from_chunk(chunk: DecodedChunk) -> Self {
        let mut index = HashMap::with_capacity(chunk.nodes.len());
        for (i, node) in chunk.nodes.iter().enumerate() {
            index.insert(node.id, i);
        }

        let order = dependency_order(&chunk.nodes, &chunk.connections, &index);
        let sink = resolve_sink(&chunk.nodes, &chunk.connections, &index);

        let nodes = chunk
            .nodes
            .iter()
            .map(|node| NodeSlot {
                node: *node,
                kernel: Kernel::for_node(node),
                output: vec![0.0; INITIAL_BUFFER_LEN],
            })
            .collect();

        Self {
            nodes,
            index,
            connections: chunk.connections,
            samples: chunk.samples,
            streams: chunk.streams.into_iter().map(StreamSlot::new).collect(),
            order,
            sink,
        }
    }
}

/// Post-order DFS over the node array, dependencies first.
fn dependency_order(
    nodes: &[Node],
    connections: &[Connection],
    index: &HashMap<u32, usize>,
) -> Vec<usize> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut seen = vec![false; nodes.len()];
    for slot in 0..nodes.len() {
        visit(slot, nodes, connections, index, &mut seen, &mut order);
    }
    order
}

fn visit(
    slot: usize,
    nodes: &[Node],
    connections: &[Connection],
    index: &HashMap<u32, usize>,
    seen: &mut [bool],
    order: &mut Vec<usize>,
) {
    if seen[slot] {
        return;
    }
    seen[slot] = true;

    let id = nodes[slot].id;
    for conn in connections {
        if conn.dest_node == id
            && let Some(&source) = index.get(&conn.source_node)
        {
            visit(source, nodes, connections, index, seen, order);
        }
    }
    order.push(slot);
}

/// The output sink: the first amplifier with no outgoing connection, or
/// node id 1 as the default for simple assets.
fn resolve_sink(
    nodes: &[Node],
    connections: &[Connection],
    index: &HashMap<u32, usize>,
) -> Option<usize> {
    for (slot, node) in nodes.iter().enumerate() {
        if node.kind() != Some(NodeType::Amplifier) {
            continue;
        }
        let has_outgoing = connections.iter().any(|c| c.source_node == node.id);
        if !has_outgoing {
            return Some(slot);
        }
    }
    index.get(&1).copied()
}
