use crate::layout::{DiagramData, Layout};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Flat, diff-friendly view of a [`Layout`]: geometry rounded to hundredths
/// and enums rendered as their names.
#[derive(Debug, Serialize)]
pub struct LayoutDump<'a> {
    pub kind: String,
    pub direction: String,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub subgraphs: Vec<SubgraphDump>,
    pub regions: Vec<RegionDump>,
    pub diagram: &'a DiagramData,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub shape: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label_width: f32,
    pub label_height: f32,
    pub label_lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub route: String,
    pub directed: bool,
    pub arrow_start: bool,
    pub arrow_end: bool,
    pub points: Vec<[f32; 2]>,
    pub label_anchor: Option<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct SubgraphDump {
    pub id: String,
    pub label: String,
    pub members: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct RegionDump {
    pub composite: String,
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

fn round(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

fn point(p: (f32, f32)) -> [f32; 2] {
    [round(p.0), round(p.1)]
}

impl<'a> LayoutDump<'a> {
    pub fn from_layout(layout: &'a Layout) -> Self {
        let nodes = layout
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id.clone(),
                shape: format!("{:?}", node.shape),
                x: round(node.x),
                y: round(node.y),
                width: round(node.width),
                height: round(node.height),
                label_width: round(node.label.width),
                label_height: round(node.label.height),
                label_lines: node.label.lines.clone(),
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from.clone(),
                to: edge.to.clone(),
                route: format!("{:?}", edge.route),
                directed: edge.directed,
                arrow_start: edge.arrow_start,
                arrow_end: edge.arrow_end,
                points: edge.points.iter().copied().map(point).collect(),
                label_anchor: edge.label_anchor.map(point),
            })
            .collect();

        let subgraphs = layout
            .subgraphs
            .iter()
            .map(|sub| SubgraphDump {
                id: sub.id.clone(),
                label: sub.label.lines.join("\n"),
                members: sub.members.clone(),
                x: round(sub.x),
                y: round(sub.y),
                width: round(sub.width),
                height: round(sub.height),
            })
            .collect();

        let regions = layout
            .regions
            .iter()
            .map(|region| RegionDump {
                composite: region.composite.clone(),
                index: region.index,
                x: round(region.x),
                y: round(region.y),
                width: round(region.width),
                height: round(region.height),
            })
            .collect();

        LayoutDump {
            kind: format!("{:?}", layout.kind),
            direction: format!("{:?}", layout.direction),
            width: round(layout.width),
            height: round(layout.height),
            nodes,
            edges,
            subgraphs,
            regions,
            diagram: &layout.diagram,
        }
    }
}

/// Serialize `layout` as JSON into `writer`.
pub fn write_layout_json<W: Write>(writer: W, layout: &Layout, compact: bool) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    if compact {
        serde_json::to_writer(writer, &dump)?;
    } else {
        serde_json::to_writer_pretty(writer, &dump)?;
    }
    Ok(())
}

pub fn write_layout_dump(path: &Path, layout: &Layout, compact: bool) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_layout_json(&mut writer, layout, compact)?;
    writer.flush()?;
    Ok(())
}
