use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use crate::record::VideoRecord;

/// Why two videos are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relationship {
    SameChannel,
    SameCategory,
    SameDate,
}

impl Relationship {
    /// Build order of the edge passes. Later passes overwrite earlier ones.
    #[cfg_attr(not(test), allow(dead_code))]
    pub const PASS_ORDER: [Relationship; 3] = [
        Relationship::SameChannel,
        Relationship::SameCategory,
        Relationship::SameDate,
    ];

    pub fn weight(self) -> f64 {
        match self {
            Relationship::SameChannel => 1.0,
            Relationship::SameCategory => 0.7,
            Relationship::SameDate => 0.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Relationship::SameChannel => "same_channel",
            Relationship::SameCategory => "same_category",
            Relationship::SameDate => "same_date",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoNode {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub category: String,
    pub views: u64,
}

impl VideoNode {
    fn from_record(r: &VideoRecord) -> Self {
        Self {
            video_id: r.video_id.clone(),
            title: r.title.clone(),
            channel: r.channel_title.clone(),
            category: r.category_name.clone(),
            views: r.view_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub weight: f64,
    pub relationship: Relationship,
}

impl From<Relationship> for Edge {
    fn from(relationship: Relationship) -> Self {
        Self {
            weight: relationship.weight(),
            relationship,
        }
    }
}

/// Undirected simple graph of videos. Nodes keep first-insertion order and are
/// addressed internally by their position; every edge is stored on both
/// endpoints.
#[derive(Debug, Clone, Default)]
pub struct VideoGraph {
    nodes: Vec<VideoNode>,
    index: HashMap<String, usize>,
    adj: Vec<BTreeMap<usize, Edge>>,
    edge_count: usize,
}

impl VideoGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn node(&self, video_id: &str) -> Option<&VideoNode> {
        self.index.get(video_id).map(|&i| &self.nodes[i])
    }

    /// Nodes in first-insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &VideoNode> {
        self.nodes.iter()
    }

    /// Edge between two videos, in either direction.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn edge(&self, a: &str, b: &str) -> Option<&Edge> {
        let (&ia, &ib) = (self.index.get(a)?, self.index.get(b)?);
        self.adj[ia].get(&ib)
    }

    /// Each undirected edge once, lower insertion index first.
    pub fn edges(&self) -> impl Iterator<Item = (&VideoNode, &VideoNode, &Edge)> {
        self.adj.iter().enumerate().flat_map(move |(i, nbrs)| {
            nbrs.range(i + 1..)
                .map(move |(&j, e)| (&self.nodes[i], &self.nodes[j], e))
        })
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn degree(&self, video_id: &str) -> usize {
        self.index
            .get(video_id)
            .map(|&i| self.adj[i].len())
            .unwrap_or(0)
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn neighbors(&self, video_id: &str) -> Vec<&str> {
        match self.index.get(video_id) {
            Some(&i) => self.adj[i]
                .keys()
                .map(|&j| self.nodes[j].video_id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn degree_at(&self, i: usize) -> usize {
        self.adj[i].len()
    }

    pub(crate) fn neighbor_indices(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.adj[i].keys().copied()
    }

    pub(crate) fn has_edge_at(&self, i: usize, j: usize) -> bool {
        self.adj[i].contains_key(&j)
    }

    /// Insert or overwrite a node's attributes, returning its position.
    pub(crate) fn upsert_node(&mut self, node: VideoNode) -> usize {
        if let Some(&i) = self.index.get(&node.video_id) {
            self.nodes[i] = node;
            return i;
        }
        let i = self.nodes.len();
        self.index.insert(node.video_id.clone(), i);
        self.nodes.push(node);
        self.adj.push(BTreeMap::new());
        i
    }

    /// Add an edge or overwrite the attributes of an existing one. Self-loops
    /// are ignored.
    pub(crate) fn set_edge(&mut self, i: usize, j: usize, edge: Edge) {
        if i == j {
            return;
        }
        if self.adj[i].insert(j, edge).is_none() {
            self.edge_count += 1;
        }
        self.adj[j].insert(i, edge);
    }
}

/// Build the video relationship graph from the trending table.
///
/// One node per distinct `video_id`; when a video recurs across collection
/// days the node carries the attributes of its last row in table order. Edges
/// come from three passes (channel, category, date) applied in that order, each
/// connecting every pair of distinct videos sharing the pass key. A pair
/// touched by several passes keeps a single edge whose attributes come from the
/// last pass, so `same_date` beats `same_category` beats `same_channel`.
pub fn build_video_graph(records: &[VideoRecord]) -> VideoGraph {
    let mut graph = VideoGraph::default();
    let positions: Vec<usize> = records
        .iter()
        .map(|r| graph.upsert_node(VideoNode::from_record(r)))
        .collect();

    add_relationship_pass(&mut graph, records, &positions, Relationship::SameChannel, |r| {
        r.channel_id.as_str()
    });
    add_relationship_pass(&mut graph, records, &positions, Relationship::SameCategory, |r| {
        r.category_id.as_str()
    });
    add_relationship_pass(&mut graph, records, &positions, Relationship::SameDate, |r| {
        r.collection_date
    });
    graph
}

fn add_relationship_pass<'a, K, F>(
    graph: &mut VideoGraph,
    records: &'a [VideoRecord],
    positions: &[usize],
    relationship: Relationship,
    key: F,
) where
    K: Hash + Eq,
    F: Fn(&'a VideoRecord) -> K,
{
    // Groups in first-appearance order keep the build deterministic.
    let mut group_of: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (row, record) in records.iter().enumerate() {
        let g = *group_of.entry(key(record)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push(positions[row]);
    }

    let edge = Edge::from(relationship);
    for members in &groups {
        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                graph.set_edge(members[i], members[j], edge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::video;
    use std::collections::HashSet;

    #[test]
    fn test_empty_table() {
        let g = build_video_graph(&[]);
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.is_empty());
    }

    #[test]
    fn test_node_per_distinct_video() {
        let rows = vec![
            video("a", "c1", "10", "2024-01-01"),
            video("b", "c2", "20", "2024-01-01"),
            video("a", "c1", "10", "2024-01-02"),
            video("c", "c3", "30", "2024-01-02"),
            video("b", "c2", "20", "2024-01-03"),
        ];
        let g = build_video_graph(&rows);
        let distinct: HashSet<&str> = rows.iter().map(|r| r.video_id.as_str()).collect();
        assert_eq!(g.node_count(), distinct.len());
        let order: Vec<&str> = g.nodes().map(|n| n.video_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_last_row_wins_for_node_attributes() {
        let mut first = video("a", "c1", "10", "2024-01-01");
        first.view_count = 100;
        first.title = "old".into();
        let mut second = video("a", "c1", "10", "2024-01-02");
        second.view_count = 250;
        second.title = "new".into();
        let g = build_video_graph(&[first, second]);
        let node = g.node("a").unwrap();
        assert_eq!(node.views, 250);
        assert_eq!(node.title, "new");
        assert_eq!(node.channel, "Channel c1");
        assert_eq!(node.category, "Category 10");
    }

    #[test]
    fn test_no_self_loops_for_recurring_video() {
        let rows = vec![
            video("a", "c1", "10", "2024-01-01"),
            video("a", "c1", "10", "2024-01-02"),
        ];
        let g = build_video_graph(&rows);
        assert_eq!(g.edge_count(), 0);
        assert!(g.edge("a", "a").is_none());
        assert_eq!(g.degree("a"), 0);
    }

    #[test]
    fn test_channel_then_category_tie_break() {
        let rows = vec![
            video("a", "ch1", "cat1", "2024-01-01"),
            video("b", "ch1", "cat1", "2024-01-02"),
        ];
        let g = build_video_graph(&rows);
        assert_eq!(g.edge_count(), 1);
        let e = g.edge("a", "b").unwrap();
        assert_eq!(e.relationship, Relationship::SameCategory);
        assert!((e.weight - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_date_wins_over_everything() {
        let rows = vec![
            video("a", "ch1", "cat1", "2024-01-01"),
            video("b", "ch1", "cat1", "2024-01-01"),
        ];
        let g = build_video_graph(&rows);
        let e = g.edge("b", "a").unwrap();
        assert_eq!(e.relationship, Relationship::SameDate);
        assert!((e.weight - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_channel_only_edge() {
        let rows = vec![
            video("a", "ch1", "cat1", "2024-01-01"),
            video("b", "ch1", "cat2", "2024-01-02"),
        ];
        let g = build_video_graph(&rows);
        let e = g.edge("a", "b").unwrap();
        assert_eq!(e.relationship, Relationship::SameChannel);
        assert_eq!(e.weight, 1.0);
    }

    #[test]
    fn test_three_video_scenario() {
        let rows = vec![
            video("A", "ch1", "cat0", "2024-01-01"),
            video("B", "ch1", "cat1", "2024-01-01"),
            video("C", "ch2", "cat1", "2024-01-01"),
        ];
        let g = build_video_graph(&rows);
        assert_eq!(g.edge_count(), 3);
        for (a, b) in [("A", "B"), ("B", "C"), ("A", "C")] {
            let e = g.edge(a, b).unwrap();
            assert_eq!(e.relationship, Relationship::SameDate);
            assert_eq!(e.weight, 0.5);
        }
    }

    #[test]
    fn test_every_edge_has_a_shared_key() {
        let rows = vec![
            video("a", "ch1", "10", "2024-01-01"),
            video("b", "ch2", "20", "2024-01-02"),
            video("c", "ch1", "30", "2024-01-03"),
            video("d", "ch3", "20", "2024-01-04"),
            video("e", "ch4", "40", "2024-01-01"),
            video("f", "ch5", "50", "2024-01-05"),
        ];
        let g = build_video_graph(&rows);
        let by_id: HashMap<&str, &VideoRecord> =
            rows.iter().map(|r| (r.video_id.as_str(), r)).collect();
        for (u, v, _) in g.edges() {
            assert_ne!(u.video_id, v.video_id);
            let (ru, rv) = (by_id[u.video_id.as_str()], by_id[v.video_id.as_str()]);
            assert!(
                ru.channel_id == rv.channel_id
                    || ru.category_id == rv.category_id
                    || ru.collection_date == rv.collection_date
            );
        }
        // a-c channel, b-d category, a-e date
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.degree("f"), 0);
    }

    #[test]
    fn test_edges_iterates_each_pair_once() {
        let rows = vec![
            video("a", "c", "1", "2024-01-01"),
            video("b", "c", "1", "2024-01-01"),
            video("c", "c", "1", "2024-01-01"),
        ];
        let g = build_video_graph(&rows);
        assert_eq!(g.edges().count(), g.edge_count());
        let mut nbrs = g.neighbors("b");
        nbrs.sort();
        assert_eq!(nbrs, vec!["a", "c"]);
    }

    #[test]
    fn test_relationship_labels() {
        let labels: Vec<String> = Relationship::PASS_ORDER
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(labels, vec!["same_channel", "same_category", "same_date"]);
    }
}
