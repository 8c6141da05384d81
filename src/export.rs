use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::config::GraphExport;
use crate::graph::VideoGraph;

/// Node-link JSON document, the layout graph tooling such as d3 or networkx
/// reads directly.
pub fn to_json(graph: &VideoGraph) -> Value {
    let nodes: Vec<Value> = graph
        .nodes()
        .map(|n| {
            json!({
                "id": n.video_id,
                "title": n.title,
                "channel": n.channel,
                "category": n.category,
                "views": n.views,
            })
        })
        .collect();
    let links: Vec<Value> = graph
        .edges()
        .map(|(a, b, e)| {
            json!({
                "source": a.video_id,
                "target": b.video_id,
                "weight": e.weight,
                "relationship": e.relationship.as_str(),
            })
        })
        .collect();
    json!({
        "directed": false,
        "multigraph": false,
        "nodes": nodes,
        "links": links,
    })
}

pub fn to_graphml(graph: &VideoGraph) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">
  <key id=\"title\" for=\"node\" attr.name=\"title\" attr.type=\"string\"/>
  <key id=\"channel\" for=\"node\" attr.name=\"channel\" attr.type=\"string\"/>
  <key id=\"category\" for=\"node\" attr.name=\"category\" attr.type=\"string\"/>
  <key id=\"views\" for=\"node\" attr.name=\"views\" attr.type=\"long\"/>
  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"double\"/>
  <key id=\"relationship\" for=\"edge\" attr.name=\"relationship\" attr.type=\"string\"/>
  <graph id=\"trending\" edgedefault=\"undirected\">
");
    for n in graph.nodes() {
        xml.push_str(&format!("    <node id=\"{}\">
      <data key=\"title\">{}</data>
      <data key=\"channel\">{}</data>
      <data key=\"category\">{}</data>
      <data key=\"views\">{}</data>
    </node>
", xml_escape(&n.video_id), xml_escape(&n.title), xml_escape(&n.channel), xml_escape(&n.category), n.views));
    }
    for (a, b, e) in graph.edges() {
        xml.push_str(&format!("    <edge source=\"{}\" target=\"{}\">
      <data key=\"weight\">{}</data>
      <data key=\"relationship\">{}</data>
    </edge>
", xml_escape(&a.video_id), xml_escape(&b.video_id), e.weight, e.relationship));
    }
    xml.push_str("  </graph>
</graphml>
");
    xml
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Write the graph in the configured format next to the report. Returns
/// `None` when export is disabled.
pub fn write_graph_export(
    dir: &Path,
    graph: &VideoGraph,
    format: GraphExport,
    stamp: &str,
) -> Result<Option<PathBuf>> {
    let (ext, body) = match format {
        GraphExport::None => return Ok(None),
        GraphExport::Graphml => ("graphml", to_graphml(graph)),
        GraphExport::Json => (
            "json",
            serde_json::to_string_pretty(&to_json(graph)).context("serialising graph")?,
        ),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("video_graph_{stamp}.{ext}"));
    std::fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(Some(path))
}
