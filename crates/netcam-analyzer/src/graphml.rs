//! GraphML export of the results graph
use crate::graph::ResultsGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use std::io::{self, Write};

const NODE_KEYS: &[(&str, &str, &str)] = &[
    ("kind", "kind", "string"),
    ("label", "label", "string"),
    ("service", "service", "string"),
    ("status", "status", "string"),
    ("pass_count", "pass_count", "int"),
    ("fail_count", "fail_count", "int"),
    ("device", "device", "string"),
    ("check_id", "check_id", "string"),
];

const EDGE_KEYS: &[(&str, &str, &str)] = &[
    ("e_kind", "kind", "string"),
    ("e_service", "service", "string"),
    ("e_stop", "stop", "boolean"),
];

/// Write `graph` as a GraphML document.
pub fn write_graphml<W: Write>(graph: &ResultsGraph, mut out: W) -> io::Result<()> {
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(out, r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns">"#)?;
    for (id, name, ty) in NODE_KEYS {
        writeln!(out, r#"  <key id="{id}" for="node" attr.name="{name}" attr.type="{ty}"/>"#)?;
    }
    for (id, name, ty) in EDGE_KEYS {
        writeln!(out, r#"  <key id="{id}" for="edge" attr.name="{name}" attr.type="{ty}"/>"#)?;
    }
    writeln!(out, r#"  <graph id="G" edgedefault="directed">"#)?;

    let inner = graph.inner();
    for idx in inner.node_indices() {
        let Some(node) = inner.node_weight(idx) else {
            continue;
        };
        writeln!(out, r#"    <node id="n{}">"#, idx.index())?;
        data(&mut out, "kind", node.kind().as_str())?;
        data(&mut out, "label", &node.label)?;
        if let Some(service) = &node.service {
            data(&mut out, "service", service)?;
        }
        data(&mut out, "status", node.status.as_str())?;
        data(&mut out, "pass_count", &node.pass_count.to_string())?;
        data(&mut out, "fail_count", &node.fail_count.to_string())?;
        if let Some(result) = &node.result {
            data(&mut out, "device", result.device())?;
            data(&mut out, "check_id", &result.check_id())?;
        }
        writeln!(out, "    </node>")?;
    }

    for edge in inner.edge_references() {
        writeln!(
            out,
            r#"    <edge id="e{}" source="n{}" target="n{}">"#,
            edge.id().index(),
            edge.source().index(),
            edge.target().index()
        )?;
        let weight = edge.weight();
        data(&mut out, "e_kind", weight.kind.as_str())?;
        data(&mut out, "e_service", &weight.service)?;
        data(&mut out, "e_stop", if weight.stop { "true" } else { "false" })?;
        writeln!(out, "    </edge>")?;
    }

    writeln!(out, "  </graph>")?;
    writeln!(out, "</graphml>")
}

fn data<W: Write>(out: &mut W, key: &str, value: &str) -> io::Result<()> {
    writeln!(out, r#"      <data key="{}">{}</data>"#, key, escape(value))
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
