use std::collections::BTreeMap;

use serde::Serialize;

use crate::ir::{DiagramKind, Direction, EdgeStyle, NodeShape};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

impl TextBlock {
    pub fn empty() -> Self {
        Self {
            lines: vec![String::new()],
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLayout {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: TextBlock,
    pub shape: NodeShape,
    pub icon: Option<String>,
}

impl NodeLayout {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, point: (f32, f32)) -> bool {
        point.0 > self.x
            && point.0 < self.x + self.width
            && point.1 > self.y
            && point.1 < self.y + self.height
    }
}

/// Arrowhead placement: the tip lies on the node boundary, the base sits
/// one arrow length back along the path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrowAnchor {
    pub tip: (f32, f32),
    pub base: (f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteKind {
    Straight,
    Polyline,
    BackEdge,
    SelfLoop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLayout {
    pub from: String,
    pub to: String,
    pub label: Option<TextBlock>,
    pub label_anchor: Option<(f32, f32)>,
    pub points: Vec<(f32, f32)>,
    pub directed: bool,
    pub arrow_start: bool,
    pub arrow_end: bool,
    pub arrow_start_anchor: Option<ArrowAnchor>,
    pub arrow_end_anchor: Option<ArrowAnchor>,
    pub style: EdgeStyle,
    pub route: RouteKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubgraphLayout {
    pub id: String,
    pub label: TextBlock,
    pub label_anchor: (f32, f32),
    pub members: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One concurrent region of a composite state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionLayout {
    pub composite: String,
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lifeline {
    pub id: String,
    pub x: f32,
    pub y1: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreMarker {
    pub task: String,
    pub score: f32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttTick {
    pub x: f32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GitLane {
    pub branch: String,
    pub start: (f32, f32),
    pub end: (f32, f32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub id: String,
    pub value: f32,
    pub percent: f32,
    pub start_angle: f32,
    pub end_angle: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarAxis {
    pub id: String,
    pub angle: f32,
    pub end: (f32, f32),
    pub value_point: (f32, f32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyLink {
    pub from: String,
    pub to: String,
    pub thickness: f32,
}

/// Family-specific geometry that does not fit node boxes or edge paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DiagramData {
    Graph,
    Sequence {
        lifelines: Vec<Lifeline>,
    },
    Journey {
        scores: Vec<ScoreMarker>,
    },
    Timeline {
        axis: ((f32, f32), (f32, f32)),
    },
    Gantt {
        origin_day: i64,
        day_width: f32,
        ticks: Vec<GanttTick>,
    },
    GitGraph {
        lanes: Vec<GitLane>,
    },
    Pie {
        center: (f32, f32),
        radius: f32,
        total: f32,
        slices: Vec<PieSlice>,
    },
    Radar {
        center: (f32, f32),
        radius: f32,
        axes: Vec<RadarAxis>,
    },
    Quadrant {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Sankey {
        links: Vec<SankeyLink>,
    },
}

fn shift(point: &mut (f32, f32), dx: f32, dy: f32) {
    point.0 += dx;
    point.1 += dy;
}

impl DiagramData {
    pub(crate) fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            Self::Graph | Self::Sankey { .. } => {}
            Self::Sequence { lifelines } => {
                for line in lifelines {
                    line.x += dx;
                    line.y1 += dy;
                    line.y2 += dy;
                }
            }
            Self::Journey { scores } => {
                for score in scores {
                    score.x += dx;
                    score.y += dy;
                }
            }
            Self::Timeline { axis } => {
                shift(&mut axis.0, dx, dy);
                shift(&mut axis.1, dx, dy);
            }
            Self::Gantt { ticks, .. } => {
                for tick in ticks {
                    tick.x += dx;
                }
            }
            Self::GitGraph { lanes } => {
                for lane in lanes {
                    shift(&mut lane.start, dx, dy);
                    shift(&mut lane.end, dx, dy);
                }
            }
            Self::Pie { center, .. } => shift(center, dx, dy),
            Self::Radar { center, axes, .. } => {
                shift(center, dx, dy);
                for axis in axes {
                    shift(&mut axis.end, dx, dy);
                    shift(&mut axis.value_point, dx, dy);
                }
            }
            Self::Quadrant { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
        }
    }

    pub(crate) fn extend_bounds(&self, bounds: &mut Bounds) {
        match self {
            Self::Graph | Self::Sankey { .. } | Self::Journey { .. } | Self::Gantt { .. } => {}
            Self::Sequence { lifelines } => {
                for line in lifelines {
                    bounds.include_point((line.x, line.y1));
                    bounds.include_point((line.x, line.y2));
                }
            }
            Self::Timeline { axis } => {
                bounds.include_point(axis.0);
                bounds.include_point(axis.1);
            }
            Self::GitGraph { lanes } => {
                for lane in lanes {
                    bounds.include_point(lane.start);
                    bounds.include_point(lane.end);
                }
            }
            Self::Pie { center, radius, .. } | Self::Radar { center, radius, .. } => {
                bounds.include_rect(center.0 - radius, center.1 - radius, radius * 2.0, radius * 2.0);
            }
            Self::Quadrant {
                x,
                y,
                width,
                height,
            } => bounds.include_rect(*x, *y, *width, *height),
        }
    }
}

/// Axis-aligned accumulator used when normalizing a layout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new() -> Self {
        Self {
            min_x: f32::INFINITY,
            min_y: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            max_y: f32::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.min_x.is_finite()
    }

    pub fn include_point(&mut self, point: (f32, f32)) {
        self.min_x = self.min_x.min(point.0);
        self.min_y = self.min_y.min(point.1);
        self.max_x = self.max_x.max(point.0);
        self.max_y = self.max_y.max(point.1);
    }

    pub fn include_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.include_point((x, y));
        self.include_point((x + width, y + height));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub kind: DiagramKind,
    pub direction: Direction,
    pub nodes: BTreeMap<String, NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub subgraphs: Vec<SubgraphLayout>,
    pub regions: Vec<RegionLayout>,
    pub diagram: DiagramData,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn empty(kind: DiagramKind, direction: Direction) -> Self {
        Self {
            kind,
            direction,
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            subgraphs: Vec::new(),
            regions: Vec::new(),
            diagram: DiagramData::Graph,
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.get(id)
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeLayout> {
        self.edges.iter().find(|edge| edge.from == from && edge.to == to)
    }

    pub fn subgraph(&self, id: &str) -> Option<&SubgraphLayout> {
        self.subgraphs.iter().find(|sub| sub.id == id)
    }

    /// Move every coordinate by `(dx, dy)`.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        for node in self.nodes.values_mut() {
            node.x += dx;
            node.y += dy;
        }
        for edge in &mut self.edges {
            for point in &mut edge.points {
                shift(point, dx, dy);
            }
            if let Some(anchor) = edge.label_anchor.as_mut() {
                shift(anchor, dx, dy);
            }
            for arrow in [&mut edge.arrow_start_anchor, &mut edge.arrow_end_anchor]
                .into_iter()
                .flatten()
            {
                shift(&mut arrow.tip, dx, dy);
                shift(&mut arrow.base, dx, dy);
            }
        }
        for sub in &mut self.subgraphs {
            sub.x += dx;
            sub.y += dy;
            shift(&mut sub.label_anchor, dx, dy);
        }
        for region in &mut self.regions {
            region.x += dx;
            region.y += dy;
        }
        self.diagram.translate(dx, dy);
    }

    pub(crate) fn content_bounds(&self) -> Bounds {
        let mut bounds = Bounds::new();
        for node in self.nodes.values() {
            bounds.include_rect(node.x, node.y, node.width, node.height);
        }
        for edge in &self.edges {
            for point in &edge.points {
                bounds.include_point(*point);
            }
            if let (Some(anchor), Some(label)) = (edge.label_anchor, edge.label.as_ref()) {
                bounds.include_rect(
                    anchor.0 - label.width / 2.0,
                    anchor.1 - label.height / 2.0,
                    label.width,
                    label.height,
                );
            }
        }
        for sub in &self.subgraphs {
            bounds.include_rect(sub.x, sub.y, sub.width, sub.height);
        }
        for region in &self.regions {
            bounds.include_rect(region.x, region.y, region.width, region.height);
        }
        self.diagram.extend_bounds(&mut bounds);
        bounds
    }
}
