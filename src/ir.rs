use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagramKind {
    Flowchart,
    Class,
    State,
    Er,
    Architecture,
    C4,
    Block,
    Requirement,
    Sequence,
    Journey,
    Timeline,
    Gantt,
    GitGraph,
    Mindmap,
    Radar,
    Pie,
    Quadrant,
    Sankey,
    Treemap,
}

/// Layout strategy a diagram kind is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutFamily {
    Layered,
    Axis,
    Radial,
}

impl DiagramKind {
    pub fn family(self) -> LayoutFamily {
        match self {
            Self::Flowchart
            | Self::Class
            | Self::State
            | Self::Er
            | Self::Architecture
            | Self::C4
            | Self::Block
            | Self::Requirement => LayoutFamily::Layered,
            Self::Sequence | Self::Journey | Self::Timeline | Self::Gantt | Self::GitGraph => {
                LayoutFamily::Axis
            }
            Self::Mindmap
            | Self::Radar
            | Self::Pie
            | Self::Quadrant
            | Self::Sankey
            | Self::Treemap => LayoutFamily::Radial,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(alias = "TD", alias = "TB")]
    TopDown,
    #[serde(alias = "LR")]
    LeftRight,
    #[serde(alias = "BT")]
    BottomTop,
    #[serde(alias = "RL")]
    RightLeft,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" => Some(Self::TopDown),
            "LR" => Some(Self::LeftRight),
            "BT" => Some(Self::BottomTop),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    /// True when the main (rank) axis runs horizontally.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, Self::BottomTop | Self::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeShape {
    #[default]
    Rectangle,
    RoundRect,
    Stadium,
    Subroutine,
    Cylinder,
    Circle,
    DoubleCircle,
    Diamond,
    Hexagon,
    Parallelogram,
    ParallelogramAlt,
    Trapezoid,
    TrapezoidAlt,
    Asymmetric,
    Text,
    StateStart,
    StateEnd,
    ForkJoin,
    Choice,
}

impl NodeShape {
    /// Pseudo-terminal markers keep a fixed size regardless of their label.
    pub fn is_marker(self) -> bool {
        matches!(
            self,
            Self::StateStart | Self::StateEnd | Self::ForkJoin | Self::Choice
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortSide {
    Left,
    Right,
    Top,
    Bottom,
}

/// Gantt scheduling data as written by the author; resolved during layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSchedule {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub shape: NodeShape,
    #[serde(default)]
    pub value: Option<f32>,
    #[serde(default)]
    pub point: Option<(f32, f32)>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub schedule: Option<TaskSchedule>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            shape: NodeShape::Rectangle,
            value: None,
            point: None,
            icon: None,
            schedule: None,
        }
    }

    pub fn with_shape(mut self, shape: NodeShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.value = Some(value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EdgeStyle {
    #[default]
    Solid,
    Dotted,
    Thick,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub directed: bool,
    #[serde(default)]
    pub arrow_start: bool,
    #[serde(default = "default_true")]
    pub arrow_end: bool,
    #[serde(default)]
    pub style: EdgeStyle,
    #[serde(default)]
    pub from_port: Option<PortSide>,
    #[serde(default)]
    pub to_port: Option<PortSide>,
    #[serde(default)]
    pub value: Option<f32>,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
            directed: true,
            arrow_start: false,
            arrow_end: true,
            style: EdgeStyle::Solid,
            from_port: None,
            to_port: None,
            value: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_ports(mut self, from: Option<PortSide>, to: Option<PortSide>) -> Self {
        self.from_port = from;
        self.to_port = to;
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subgraph {
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Node ids or nested subgraph ids.
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub direction: Option<Direction>,
}

/// A state node owning an inner graph and optional concurrent regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeState {
    pub id: String,
    #[serde(default)]
    pub inner: Graph,
    #[serde(default)]
    pub regions: Vec<Graph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub kind: DiagramKind,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub subgraphs: Vec<Subgraph>,
    #[serde(default)]
    pub composites: Vec<CompositeState>,
}

impl Graph {
    pub fn new(kind: DiagramKind) -> Self {
        Self {
            kind,
            direction: Direction::TopDown,
            nodes: Vec::new(),
            edges: Vec::new(),
            subgraphs: Vec::new(),
            composites: Vec::new(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Insert a node with the id as label unless it already exists; update label/shape when given.
    pub fn ensure_node(&mut self, id: &str, label: Option<String>, shape: Option<NodeShape>) {
        let idx = match self.nodes.iter().position(|node| node.id == id) {
            Some(idx) => idx,
            None => {
                self.nodes.push(Node::new(id, id));
                self.nodes.len() - 1
            }
        };
        let entry = &mut self.nodes[idx];
        if let Some(label) = label {
            entry.label = label;
        }
        if let Some(shape) = shape {
            entry.shape = shape;
        }
    }

    /// Add an edge, creating missing endpoints in declaration order.
    pub fn connect(&mut self, from: &str, to: &str) -> &mut Edge {
        self.ensure_node(from, None, None);
        self.ensure_node(to, None, None);
        self.edges.push(Edge::new(from, to));
        let last = self.edges.len() - 1;
        &mut self.edges[last]
    }

    pub fn add_subgraph(&mut self, id: &str, label: &str, members: &[&str]) {
        self.subgraphs.push(Subgraph {
            id: id.to_string(),
            label: label.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            direction: None,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(DiagramKind::Flowchart)
    }
}
