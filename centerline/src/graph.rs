use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::Result;

use geom::{Distance, HashablePt2D, PolyLine, Pt2D};

/// Identifies one polygon of the input layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolygonId(pub usize);

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "polygon #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "node #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub usize);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "edge #{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub pt: Pt2D,
    /// Distance from this node to the nearest boundary of its source polygon, fixed when the node
    /// is created.
    pub radius: Distance,
    // Ascending id order, because edges are always inserted with increasing ids. A self-loop
    // appears once here but counts twice towards degree.
    edges: Vec<EdgeId>,
}

impl Node {
    pub fn edges(&self) -> &Vec<EdgeId> {
        &self.edges
    }
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub n1: NodeId,
    pub n2: NodeId,
    /// First point equals n1's position, last point equals n2's position, bit-exact.
    pub pl: PolyLine,
    /// Smallest boundary radius sampled at the polyline's vertices.
    pub min_radius: Distance,
    /// Mean boundary radius over the polyline's vertices.
    pub mean_radius: Distance,
    pub source: PolygonId,
}

impl Edge {
    pub fn length(&self) -> Distance {
        self.pl.length()
    }

    pub fn is_loop(&self) -> bool {
        self.n1 == self.n2
    }

    pub fn other_endpoint(&self, n: NodeId) -> NodeId {
        if self.n1 == n {
            self.n2
        } else if self.n2 == n {
            self.n1
        } else {
            panic!("{} isn't an endpoint of this edge", n);
        }
    }
}

/// Where a leaf-to-junction walk stopped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChainEnd {
    /// Reached a node of degree >= 3.
    Junction(NodeId),
    /// Ran out of graph: the component is a pure path (or a cycle closed on itself).
    DeadEnd(NodeId),
}

/// A maximal chain from a degree-1 node inward: the unit that pruners remove.
#[derive(Clone, Debug)]
pub struct LeafChain {
    /// Starts with the leaf.
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub length: Distance,
    pub end: ChainEnd,
}

/// One connected piece of the graph.
#[derive(Clone, Debug)]
pub struct Component {
    pub nodes: BTreeSet<NodeId>,
    pub edges: BTreeSet<EdgeId>,
}

impl Component {
    pub fn total_length(&self, g: &Graph) -> Distance {
        self.edges.iter().map(|e| g.edge(*e).length()).sum()
    }
}

/// An undirected planar-ish multigraph in arena storage. Node and edge ids index dense vectors;
/// removal leaves a tombstone, so ids stay stable within a stage. `compact` rebuilds between
/// stages.
///
/// Geometry is immutable per edge: stages change the graph by removing and inserting edges, never
/// by editing coordinates in place.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    pt_to_node: BTreeMap<HashablePt2D, NodeId>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.iter().flatten().count()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0].as_ref().unwrap()
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        self.edges[id.0].as_ref().unwrap()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|_| NodeId(idx)))
            .collect()
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|_| EdgeId(idx)))
            .collect()
    }

    pub fn find_node(&self, pt: Pt2D) -> Option<NodeId> {
        self.pt_to_node.get(&pt.to_hashable()).copied()
    }

    pub fn has_edge(&self, id: EdgeId) -> bool {
        self.edges.get(id.0).map(|slot| slot.is_some()).unwrap_or(false)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Degree of a node; a self-loop counts twice.
    pub fn degree(&self, id: NodeId) -> usize {
        self.node(id)
            .edges
            .iter()
            .map(|e| if self.edge(*e).is_loop() { 2 } else { 1 })
            .sum()
    }

    /// Nodes of degree exactly 1, ascending id.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.node_ids()
            .into_iter()
            .filter(|n| self.degree(*n) == 1)
            .collect()
    }

    /// Unify on exact (trimmed) position. An existing node keeps its original radius.
    pub fn get_or_create_node(&mut self, pt: Pt2D, radius: Distance) -> NodeId {
        let key = pt.to_hashable();
        if let Some(id) = self.pt_to_node.get(&key) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            pt,
            radius,
            edges: Vec::new(),
        }));
        self.pt_to_node.insert(key, id);
        id
    }

    /// The polyline's endpoints must coincide bit-exactly with the two nodes' positions.
    pub fn add_edge(
        &mut self,
        n1: NodeId,
        n2: NodeId,
        pl: PolyLine,
        min_radius: Distance,
        mean_radius: Distance,
        source: PolygonId,
    ) -> Result<EdgeId> {
        if pl.first_pt().to_hashable() != self.node(n1).pt.to_hashable() {
            bail!(
                "edge geometry starts at {}, but {} is at {}",
                pl.first_pt(),
                n1,
                self.node(n1).pt
            );
        }
        if pl.last_pt().to_hashable() != self.node(n2).pt.to_hashable() {
            bail!(
                "edge geometry ends at {}, but {} is at {}",
                pl.last_pt(),
                n2,
                self.node(n2).pt
            );
        }
        let id = EdgeId(self.edges.len());
        self.edges.push(Some(Edge {
            n1,
            n2,
            pl,
            min_radius,
            mean_radius,
            source,
        }));
        self.nodes[n1.0].as_mut().unwrap().edges.push(id);
        if n1 != n2 {
            self.nodes[n2.0].as_mut().unwrap().edges.push(id);
        }
        Ok(id)
    }

    /// Convenience for stages that only have geometry: endpoint nodes are looked up or created.
    pub fn add_edge_from_geometry(
        &mut self,
        pl: PolyLine,
        radius_at: impl Fn(Pt2D) -> Distance,
        min_radius: Distance,
        mean_radius: Distance,
        source: PolygonId,
    ) -> Result<EdgeId> {
        let n1 = self.get_or_create_node(pl.first_pt(), radius_at(pl.first_pt()));
        let n2 = self.get_or_create_node(pl.last_pt(), radius_at(pl.last_pt()));
        self.add_edge(n1, n2, pl, min_radius, mean_radius, source)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Edge {
        let edge = self.edges[id.0].take().unwrap();
        for n in [edge.n1, edge.n2] {
            if let Some(node) = self.nodes[n.0].as_mut() {
                node.edges.retain(|e| *e != id);
            }
        }
        edge
    }

    /// Drop nodes with no incident edges.
    pub fn remove_isolated_nodes(&mut self) {
        for idx in 0..self.nodes.len() {
            let remove = match &self.nodes[idx] {
                Some(node) => node.edges.is_empty(),
                None => false,
            };
            if remove {
                let node = self.nodes[idx].take().unwrap();
                self.pt_to_node.remove(&node.pt.to_hashable());
            }
        }
    }

    pub fn total_edge_length(&self) -> Distance {
        self.edges
            .iter()
            .flatten()
            .map(|e| e.length())
            .sum()
    }

    /// Walk from a degree-1 node inward through degree-2 nodes, stopping at the first junction
    /// (degree >= 3) or when the graph runs out.
    pub fn leaf_chain(&self, leaf: NodeId) -> LeafChain {
        let mut nodes = vec![leaf];
        let mut edges = Vec::new();
        let mut length = Distance::ZERO;
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        visited.insert(leaf);

        let mut current = leaf;
        let mut arrived_by: Option<EdgeId> = None;
        loop {
            let next_edge = self
                .node(current)
                .edges
                .iter()
                .copied()
                .find(|e| Some(*e) != arrived_by && !self.edge(*e).is_loop());
            let e = match next_edge {
                Some(e) => e,
                None => {
                    return LeafChain {
                        nodes,
                        edges,
                        length,
                        end: ChainEnd::DeadEnd(current),
                    };
                }
            };
            let other = self.edge(e).other_endpoint(current);
            edges.push(e);
            length += self.edge(e).length();

            if !visited.insert(other) {
                // Came back around a cycle; stop here.
                return LeafChain {
                    nodes,
                    edges,
                    length,
                    end: ChainEnd::DeadEnd(other),
                };
            }
            nodes.push(other);

            let deg = self.degree(other);
            if deg >= 3 {
                return LeafChain {
                    nodes,
                    edges,
                    length,
                    end: ChainEnd::Junction(other),
                };
            }
            if deg == 1 {
                return LeafChain {
                    nodes,
                    edges,
                    length,
                    end: ChainEnd::DeadEnd(other),
                };
            }
            arrived_by = Some(e);
            current = other;
        }
    }

    /// Walk away from `from` along `first`, passing through degree-2 nodes, until a junction, a
    /// leaf, a cycle, or `max_len` of accumulated geometry. Returns the length walked (possibly
    /// beyond `max_len` by one edge) and the node where the walk stopped.
    pub fn walk_branch(&self, from: NodeId, first: EdgeId, max_len: Distance) -> (Distance, NodeId) {
        let mut length = self.edge(first).length();
        let mut current = self.edge(first).other_endpoint(from);
        let mut arrived_by = first;
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        visited.insert(from);
        visited.insert(current);

        loop {
            if length >= max_len || self.degree(current) != 2 {
                return (length, current);
            }
            let next_edge = self
                .node(current)
                .edges
                .iter()
                .copied()
                .find(|e| *e != arrived_by && !self.edge(*e).is_loop());
            let e = match next_edge {
                Some(e) => e,
                None => {
                    return (length, current);
                }
            };
            let other = self.edge(e).other_endpoint(current);
            length += self.edge(e).length();
            if !visited.insert(other) {
                return (length, other);
            }
            arrived_by = e;
            current = other;
        }
    }

    /// Floodfill into connected components. Deterministic: components are discovered in ascending
    /// order of their smallest node id.
    pub fn connected_components(&self) -> Vec<Component> {
        let mut result = Vec::new();
        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        for start in self.node_ids() {
            if seen.contains(&start) {
                continue;
            }
            let mut nodes = BTreeSet::new();
            let mut edges = BTreeSet::new();
            let mut queue = vec![start];
            while let Some(n) = queue.pop() {
                if !seen.insert(n) {
                    continue;
                }
                nodes.insert(n);
                for e in &self.node(n).edges {
                    edges.insert(*e);
                    let other = self.edge(*e).other_endpoint(n);
                    if !seen.contains(&other) {
                        queue.push(other);
                    }
                }
            }
            result.push(Component { nodes, edges });
        }
        result
    }

    /// Merge another graph into this one. Nodes unify by exact position.
    pub fn absorb(&mut self, other: &Graph) {
        for id in other.edge_ids() {
            let edge = other.edge(id);
            let n1 = self.get_or_create_node(other.node(edge.n1).pt, other.node(edge.n1).radius);
            let n2 = self.get_or_create_node(other.node(edge.n2).pt, other.node(edge.n2).radius);
            self.add_edge(
                n1,
                n2,
                edge.pl.clone(),
                edge.min_radius,
                edge.mean_radius,
                edge.source,
            )
            .unwrap();
        }
    }

    /// Rebuild without tombstones, renumbering ids densely in the old order.
    pub fn compact(&self) -> Graph {
        let mut result = Graph::new();
        for id in self.edge_ids() {
            let edge = self.edge(id);
            let n1 = result.get_or_create_node(self.node(edge.n1).pt, self.node(edge.n1).radius);
            let n2 = result.get_or_create_node(self.node(edge.n2).pt, self.node(edge.n2).radius);
            result
                .add_edge(
                    n1,
                    n2,
                    edge.pl.clone(),
                    edge.min_radius,
                    edge.mean_radius,
                    edge.source,
                )
                .unwrap();
        }
        result
    }

    /// The cheap structural invariants: endpoint coincidence and (when requested) minimum edge
    /// length. Planarity is checked separately; it needs a spatial index.
    pub fn check_invariants(&self, min_edge_length: Option<Distance>) -> Result<()> {
        for id in self.edge_ids() {
            let edge = self.edge(id);
            if edge.pl.first_pt().to_hashable() != self.node(edge.n1).pt.to_hashable() {
                bail!("{}: geometry start doesn't match {}", id, edge.n1);
            }
            if edge.pl.last_pt().to_hashable() != self.node(edge.n2).pt.to_hashable() {
                bail!("{}: geometry end doesn't match {}", id, edge.n2);
            }
            if edge.pl.points().len() < 2 {
                bail!("{}: fewer than 2 points", id);
            }
            if let Some(min_len) = min_edge_length {
                if edge.length() < min_len {
                    bail!("{}: length {} is below {}", id, edge.length(), min_len);
                }
            }
        }
        for n in self.node_ids() {
            for e in &self.node(n).edges {
                if self.edges[e.0].is_none() {
                    bail!("{} refers to removed {}", n, e);
                }
            }
        }
        Ok(())
    }
}
