//! Render an analyzed network as a Mermaid Gantt chart or a Graphviz digraph.

use crate::analyzer::critical_path::CriticalPathAnalysis;
use crate::network::ActivityNetwork;
use petgraph::visit::EdgeRef;

/// Mermaid `gantt` chart at early dates, one section per trade.
pub fn to_mermaid_gantt(network: &ActivityNetwork, analysis: &CriticalPathAnalysis, title: &str) -> String {
    let mut lines = Vec::new();
    lines.push("gantt".to_string());
    lines.push(format!("    title {}", title));
    lines.push("    dateFormat YYYY-MM-DD".to_string());

    let mut trades: Vec<&str> = network
        .activities()
        .map(|a| a.primary_trade.as_str())
        .collect();
    trades.sort_unstable();
    trades.dedup();

    for trade in trades {
        lines.push(format!("    section {}", trade));
        for timing in &analysis.activity_timings {
            let Some(activity) = network.index_of(&timing.activity_id).map(|i| network.activity(i)) else {
                continue;
            };
            if activity.primary_trade != trade {
                continue;
            }
            let tag = if timing.is_critical { "crit, " } else { "" };
            lines.push(format!(
                "    {} :{}{}, {}, {}d",
                activity.name.replace(':', " "),
                tag,
                sanitize_id(&activity.id),
                timing.early_start.format("%Y-%m-%d"),
                activity.planned_duration_days
            ));
        }
    }

    lines.join("\n")
}

/// Graphviz DOT of the precedence network; critical activities and the links between them are red.
pub fn to_dot(network: &ActivityNetwork, analysis: &CriticalPathAnalysis, name: &str) -> String {
    let mut lines = Vec::new();
    lines.push(format!("digraph \"{}\" {{", name));
    lines.push("    rankdir=LR;".to_string());
    lines.push("    node [shape=box, style=\"rounded,filled\", fontname=\"Helvetica\"];".to_string());
    lines.push("    edge [color=\"#666666\"];".to_string());
    lines.push(String::new());

    for activity in network.activities() {
        let tf = analysis.total_float.get(&activity.id).copied().unwrap_or(0);
        let color = if analysis.is_critical(&activity.id) {
            "#ef4444"
        } else if tf <= 5 {
            "#f59e0b"
        } else {
            "#22c55e"
        };
        lines.push(format!(
            "    {} [label=\"{}\\n{}d (TF {})\", fillcolor=\"{}\", fontcolor=\"#ffffff\"];",
            sanitize_id(&activity.id),
            activity.name.replace('"', "'"),
            activity.planned_duration_days,
            tf,
            color
        ));
    }

    lines.push(String::new());

    for edge in network.graph.edge_references() {
        let from = network.activity(edge.source());
        let to = network.activity(edge.target());
        let link = edge.weight();
        let critical = analysis.is_critical(&from.id) && analysis.is_critical(&to.id);
        let mut attrs = vec![format!("label=\"{}{:+}\"", link.dependency_type.code(), link.lag_days)];
        if critical {
            attrs.push("color=\"#ef4444\"".to_string());
            attrs.push("penwidth=2".to_string());
        }
        lines.push(format!(
            "    {} -> {} [{}];",
            sanitize_id(&from.id),
            sanitize_id(&to.id),
            attrs.join(", ")
        ));
    }

    lines.push("}".to_string());
    lines.join("\n")
}

fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
