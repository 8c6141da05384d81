use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use chrono::NaiveDate;

use crate::graph::VideoGraph;
use crate::record::VideoRecord;

/// Modularity gains at or below this are treated as no improvement.
const MIN_MODULARITY_GAIN: f64 = 1e-12;

/// Structural metrics of the video graph.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub density: f64,
    pub avg_clustering: f64,
    pub degree_centrality: BTreeMap<String, f64>,
    pub betweenness_centrality: BTreeMap<String, f64>,
    /// Disjoint, covering; largest first, ties by smallest video id.
    pub communities: Vec<BTreeSet<String>>,
    /// Modularity of `communities`.
    pub modularity: f64,
}

/// Content tallies over the raw table.
#[derive(Debug, Clone, Default)]
pub struct Patterns {
    /// Category name → row count, descending count then name.
    pub category_distribution: Vec<(String, usize)>,
    /// Channel title → row count, same ordering.
    pub channel_videos: Vec<(String, usize)>,
    pub daily_trends: BTreeMap<NaiveDate, usize>,
}

impl Patterns {
    pub fn total_rows(&self) -> usize {
        self.daily_trends.values().sum()
    }
}

pub fn analyze_network(graph: &VideoGraph) -> Metrics {
    let n = graph.node_count();
    let ids: Vec<String> = graph.nodes().map(|v| v.video_id.clone()).collect();

    let degree_centrality = (0..n)
        .map(|i| {
            let c = if n > 1 {
                graph.degree_at(i) as f64 / (n - 1) as f64
            } else {
                0.0
            };
            (ids[i].clone(), c)
        })
        .collect();

    let betweenness_centrality = ids
        .iter()
        .cloned()
        .zip(betweenness_centrality(graph))
        .collect();

    let partition = greedy_modularity_communities(graph);
    let modularity = modularity(graph, &partition);
    let mut communities: Vec<BTreeSet<String>> = partition
        .iter()
        .map(|members| members.iter().map(|&i| ids[i].clone()).collect())
        .collect();
    communities.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| a.first().cmp(&b.first()))
    });

    Metrics {
        num_nodes: n,
        num_edges: graph.edge_count(),
        density: density(graph),
        avg_clustering: average_clustering(graph),
        degree_centrality,
        betweenness_centrality,
        communities,
        modularity,
    }
}

/// Ratio of actual to possible edges; zero for fewer than two nodes.
pub fn density(graph: &VideoGraph) -> f64 {
    let n = graph.node_count() as f64;
    if n <= 1.0 {
        return 0.0;
    }
    2.0 * graph.edge_count() as f64 / (n * (n - 1.0))
}

/// Local clustering coefficient per node position: fraction of neighbour
/// pairs that are connected. Degree below two gives 0.
fn clustering_coefficients(graph: &VideoGraph) -> Vec<f64> {
    (0..graph.node_count())
        .map(|node| {
            let neighbors: Vec<usize> = graph.neighbor_indices(node).collect();
            let k = neighbors.len();
            if k < 2 {
                return 0.0;
            }
            let mut triangles = 0usize;
            for i in 0..k {
                for j in (i + 1)..k {
                    if graph.has_edge_at(neighbors[i], neighbors[j]) {
                        triangles += 1;
                    }
                }
            }
            let possible = k * (k - 1) / 2;
            triangles as f64 / possible as f64
        })
        .collect()
}

/// Mean of the local coefficients over every node, isolated ones included.
pub fn average_clustering(graph: &VideoGraph) -> f64 {
    let coeffs = clustering_coefficients(graph);
    if coeffs.is_empty() {
        return 0.0;
    }
    coeffs.iter().sum::<f64>() / coeffs.len() as f64
}

/// Exact Brandes betweenness over hop counts, normalized for an undirected
/// graph by `1 / ((n-1)(n-2))`. Indexed by node position.
fn betweenness_centrality(graph: &VideoGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut centrality = vec![0.0_f64; n];

    for s in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut pred: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist = vec![-1_i64; n];
        let mut delta = vec![0.0_f64; n];

        sigma[s] = 1.0;
        dist[s] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for w in graph.neighbor_indices(v) {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    pred[w].push(v);
                }
            }
        }

        while let Some(w) = stack.pop() {
            for &v in &pred[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != s {
                centrality[w] += delta[w];
            }
        }
    }

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for c in &mut centrality {
            *c *= scale;
        }
    }
    centrality
}

/// Clauset–Newman–Moore greedy modularity maximization on the unweighted
/// graph. Starts from singletons and merges the adjacent pair with the largest
/// gain until no merge has a positive gain. Equal gains go to the pair with the
/// smallest positions. Returns node positions per community.
fn greedy_modularity_communities(graph: &VideoGraph) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    let m = graph.edge_count() as f64;
    if m == 0.0 {
        return (0..n).map(|i| vec![i]).collect();
    }
    let two_m = 2.0 * m;

    // a[i]: fraction of edge ends in community i.
    // links[i][j]: half the fraction of edges between communities i and j.
    let mut a: Vec<f64> = (0..n).map(|i| graph.degree_at(i) as f64 / two_m).collect();
    let mut links: Vec<BTreeMap<usize, f64>> = (0..n)
        .map(|i| graph.neighbor_indices(i).map(|j| (j, 1.0 / two_m)).collect())
        .collect();
    let mut members: Vec<Option<Vec<usize>>> = (0..n).map(|i| Some(vec![i])).collect();

    loop {
        let mut best: Option<(f64, usize, usize)> = None;
        for i in 0..n {
            for (&j, &e_ij) in links[i].range(i + 1..) {
                let gain = 2.0 * (e_ij - a[i] * a[j]);
                if best.map_or(true, |(g, _, _)| gain > g) {
                    best = Some((gain, i, j));
                }
            }
        }
        let (i, j) = match best {
            Some((gain, i, j)) if gain > MIN_MODULARITY_GAIN => (i, j),
            _ => break,
        };

        // Fold j into i.
        let moved = std::mem::take(&mut links[j]);
        for (k, e_jk) in moved {
            links[k].remove(&j);
            if k == i {
                continue;
            }
            *links[i].entry(k).or_insert(0.0) += e_jk;
            *links[k].entry(i).or_insert(0.0) += e_jk;
        }
        a[i] += a[j];
        a[j] = 0.0;
        let absorbed = members[j].take().unwrap_or_default();
        if let Some(target) = members[i].as_mut() {
            target.extend(absorbed);
        }
    }

    members.into_iter().flatten().collect()
}

/// Newman modularity of a partition given as node positions.
fn modularity(graph: &VideoGraph, partition: &[Vec<usize>]) -> f64 {
    let m = graph.edge_count() as f64;
    if m == 0.0 {
        return 0.0;
    }
    let mut community_of = vec![0usize; graph.node_count()];
    for (c, nodes) in partition.iter().enumerate() {
        for &v in nodes {
            community_of[v] = c;
        }
    }
    let mut internal = vec![0.0_f64; partition.len()];
    let mut degree_sum = vec![0.0_f64; partition.len()];
    for v in 0..graph.node_count() {
        let c = community_of[v];
        degree_sum[c] += graph.degree_at(v) as f64;
        for w in graph.neighbor_indices(v) {
            if w > v && community_of[w] == c {
                internal[c] += 1.0;
            }
        }
    }
    internal
        .iter()
        .zip(&degree_sum)
        .map(|(l, d)| l / m - (d / (2.0 * m)).powi(2))
        .sum()
}

/// Tally categories, channels and collection days over the raw table.
pub fn analyze_content_patterns(records: &[VideoRecord]) -> Patterns {
    let mut categories: HashMap<&str, usize> = HashMap::new();
    let mut channels: HashMap<&str, usize> = HashMap::new();
    let mut daily_trends: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for r in records {
        *categories.entry(r.category_name.as_str()).or_insert(0) += 1;
        *channels.entry(r.channel_title.as_str()).or_insert(0) += 1;
        *daily_trends.entry(r.collection_date).or_insert(0) += 1;
    }
    Patterns {
        category_distribution: ranked(categories),
        channel_videos: ranked(channels),
        daily_trends,
    }
}

fn ranked(counts: HashMap<&str, usize>) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, c)| (k.to_string(), c))
        .collect();
    out.sort_by_key(|(k, c)| (Reverse(*c), k.clone()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_video_graph, Edge, Relationship, VideoNode};
    use crate::record::fixtures::video;
    use std::collections::HashSet;

    fn graph_from_edges(n: usize, edges: &[(usize, usize)]) -> VideoGraph {
        let mut g = VideoGraph::default();
        for i in 0..n {
            g.upsert_node(VideoNode {
                video_id: format!("v{i:02}"),
                title: String::new(),
                channel: String::new(),
                category: String::new(),
                views: 0,
            });
        }
        for &(i, j) in edges {
            g.set_edge(i, j, Edge::from(Relationship::SameDate));
        }
        g
    }

    fn complete(n: usize) -> VideoGraph {
        let mut edges = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                edges.push((i, j));
            }
        }
        graph_from_edges(n, &edges)
    }

    fn assert_covers(graph: &VideoGraph, metrics: &Metrics) {
        let mut seen = HashSet::new();
        for c in &metrics.communities {
            for id in c {
                assert!(seen.insert(id.clone()), "{id} appears twice");
            }
        }
        let all: HashSet<String> = graph.nodes().map(|v| v.video_id.clone()).collect();
        assert_eq!(seen, all);
    }

    #[test]
    fn test_empty_graph() {
        let m = analyze_network(&VideoGraph::default());
        assert_eq!(m.num_nodes, 0);
        assert_eq!(m.num_edges, 0);
        assert_eq!(m.density, 0.0);
        assert_eq!(m.avg_clustering, 0.0);
        assert!(m.degree_centrality.is_empty());
        assert!(m.betweenness_centrality.is_empty());
        assert!(m.communities.is_empty());
        assert_eq!(m.modularity, 0.0);
    }

    #[test]
    fn test_single_node() {
        let g = graph_from_edges(1, &[]);
        let m = analyze_network(&g);
        assert_eq!(m.density, 0.0);
        assert_eq!(m.degree_centrality["v00"], 0.0);
        assert_eq!(m.betweenness_centrality["v00"], 0.0);
        assert_eq!(m.communities.len(), 1);
    }

    #[test]
    fn test_complete_graph() {
        let g = complete(5);
        let m = analyze_network(&g);
        assert_eq!(m.num_edges, 10);
        assert!((m.density - 1.0).abs() < 1e-12);
        assert!((m.avg_clustering - 1.0).abs() < 1e-12);
        for c in m.degree_centrality.values() {
            assert!((c - 1.0).abs() < 1e-12);
        }
        for b in m.betweenness_centrality.values() {
            assert!(b.abs() < 1e-12);
        }
        assert_eq!(m.communities.len(), 1);
        assert_eq!(m.communities[0].len(), 5);
    }

    #[test]
    fn test_star_betweenness() {
        let g = graph_from_edges(5, &[(0, 1), (0, 2), (0, 3), (0, 4)]);
        let m = analyze_network(&g);
        assert!((m.betweenness_centrality["v00"] - 1.0).abs() < 1e-12);
        for leaf in ["v01", "v02", "v03", "v04"] {
            assert_eq!(m.betweenness_centrality[leaf], 0.0);
        }
        assert_eq!(m.avg_clustering, 0.0);
    }

    #[test]
    fn test_path_betweenness() {
        // v00 - v01 - v02 - v03
        let g = graph_from_edges(4, &[(0, 1), (1, 2), (2, 3)]);
        let m = analyze_network(&g);
        // v01 lies on (0,2) and (0,3): 2 of 3 pairs not involving it.
        assert!((m.betweenness_centrality["v01"] - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.betweenness_centrality["v02"] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.betweenness_centrality["v00"], 0.0);
    }

    #[test]
    fn test_disconnected_betweenness() {
        // Path of three plus an isolated pair.
        let g = graph_from_edges(5, &[(0, 1), (1, 2), (3, 4)]);
        let m = analyze_network(&g);
        // One pair through v01, normalized by (4*3)/2 unordered pairs.
        assert!((m.betweenness_centrality["v01"] - 1.0 / 6.0).abs() < 1e-12);
        assert_eq!(m.betweenness_centrality["v03"], 0.0);
    }

    #[test]
    fn test_clustering_mixed() {
        // Triangle 0-1-2 with a pendant 3 on node 0.
        let g = graph_from_edges(4, &[(0, 1), (1, 2), (0, 2), (0, 3)]);
        let coeffs = clustering_coefficients(&g);
        assert!((coeffs[0] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(coeffs[1], 1.0);
        assert_eq!(coeffs[2], 1.0);
        assert_eq!(coeffs[3], 0.0);
        assert!((average_clustering(&g) - (1.0 / 3.0 + 2.0) / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_degree_centrality_cross_check() {
        let g = graph_from_edges(6, &[(0, 1), (1, 2), (2, 3), (3, 0), (4, 5), (1, 3)]);
        let m = analyze_network(&g);
        let n = m.num_nodes as f64;
        let avg_degree = 2.0 * m.num_edges as f64 / n;
        let mean: f64 = m.degree_centrality.values().sum::<f64>() / n;
        assert!((mean - avg_degree / (n - 1.0)).abs() < 1e-12);
        assert!(m
            .degree_centrality
            .values()
            .all(|&c| (0.0..=1.0).contains(&c)));
    }

    #[test]
    fn test_two_triangles_split() {
        let g = graph_from_edges(6, &[(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)]);
        let m = analyze_network(&g);
        assert_eq!(m.communities.len(), 2);
        let first: Vec<&str> = m.communities[0].iter().map(String::as_str).collect();
        assert_eq!(first, vec!["v00", "v01", "v02"]);
        assert!((m.modularity - 0.5).abs() < 1e-12);
        assert_covers(&g, &m);
    }

    #[test]
    fn test_bridged_cliques_split() {
        // Two 4-cliques joined by one bridge edge.
        let mut edges = Vec::new();
        for base in [0, 4] {
            for i in 0..4 {
                for j in (i + 1)..4 {
                    edges.push((base + i, base + j));
                }
            }
        }
        edges.push((3, 4));
        let g = graph_from_edges(8, &edges);
        let m = analyze_network(&g);
        assert_eq!(m.communities.len(), 2);
        assert!(m.communities.iter().all(|c| c.len() == 4));
        assert!(m.modularity > 0.3);
        assert_covers(&g, &m);
    }

    #[test]
    fn test_communities_ordered_by_size_then_min_id() {
        // Isolated v00, a triangle, an isolated v04 and a pair.
        let g = graph_from_edges(7, &[(1, 2), (2, 3), (1, 3), (5, 6)]);
        let m = analyze_network(&g);
        let sizes: Vec<usize> = m.communities.iter().map(BTreeSet::len).collect();
        assert_eq!(sizes, vec![3, 2, 1, 1]);
        let mins: Vec<&str> = m
            .communities
            .iter()
            .map(|c| c.first().unwrap().as_str())
            .collect();
        assert_eq!(mins, vec!["v01", "v05", "v00", "v04"]);
        assert_covers(&g, &m);
    }

    #[test]
    fn test_edgeless_graph_yields_singletons() {
        let g = graph_from_edges(3, &[]);
        let m = analyze_network(&g);
        assert_eq!(m.communities.len(), 3);
        assert_covers(&g, &m);
    }

    #[test]
    fn test_built_graph_partition_covers() {
        let rows = vec![
            video("a", "ch1", "10", "2024-01-01"),
            video("b", "ch1", "20", "2024-01-01"),
            video("c", "ch2", "20", "2024-01-02"),
            video("d", "ch3", "30", "2024-01-02"),
            video("a", "ch1", "10", "2024-01-02"),
            video("e", "ch4", "40", "2024-01-03"),
        ];
        let g = build_video_graph(&rows);
        let m = analyze_network(&g);
        assert_eq!(m.num_nodes, 5);
        assert_covers(&g, &m);
    }

    #[test]
    fn test_content_patterns() {
        let rows = vec![
            video("a", "ch1", "10", "2024-01-02"),
            video("b", "ch1", "20", "2024-01-01"),
            video("c", "ch2", "20", "2024-01-02"),
            video("a", "ch1", "10", "2024-01-03"),
            video("d", "ch3", "20", "2024-01-03"),
        ];
        let p = analyze_content_patterns(&rows);
        assert_eq!(
            p.category_distribution,
            vec![("Category 20".to_string(), 3), ("Category 10".to_string(), 2)]
        );
        assert_eq!(p.channel_videos[0], ("Channel ch1".to_string(), 3));
        assert_eq!(p.channel_videos.len(), 3);
        // ties ordered by name
        assert_eq!(p.channel_videos[1].0, "Channel ch2");
        let days: Vec<(String, usize)> = p
            .daily_trends
            .iter()
            .map(|(d, c)| (d.to_string(), *c))
            .collect();
        assert_eq!(
            days,
            vec![
                ("2024-01-01".to_string(), 1),
                ("2024-01-02".to_string(), 2),
                ("2024-01-03".to_string(), 2),
            ]
        );
        assert_eq!(p.total_rows(), 5);
    }

    #[test]
    fn test_content_patterns_empty() {
        let p = analyze_content_patterns(&[]);
        assert!(p.category_distribution.is_empty());
        assert!(p.channel_videos.is_empty());
        assert!(p.daily_trends.is_empty());
        assert_eq!(p.total_rows(), 0);
    }
}
