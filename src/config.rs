use crate::layout::FontSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest value any spacing or padding knob is clamped to.
pub const MIN_SPACING: f32 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowchartLayoutConfig {
    /// Iteration cap for crossing minimization.
    pub order_passes: usize,
    /// Adjacent-swap sweeps per rank per pass.
    pub transpose_sweeps: usize,
    /// Tie-break weight for edges attached through a left/right port.
    pub port_side_bias: f32,
    /// Barycenter passes run while assigning cross-axis positions.
    pub smoothing_passes: usize,
}

impl Default for FlowchartLayoutConfig {
    fn default() -> Self {
        Self {
            order_passes: 24,
            transpose_sweeps: 4,
            port_side_bias: 1.0,
            smoothing_passes: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubgraphLayoutConfig {
    pub padding: f32,
    pub label_gap: f32,
}

impl Default for SubgraphLayoutConfig {
    fn default() -> Self {
        Self {
            padding: 16.0,
            label_gap: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateLayoutConfig {
    pub marker_size: f32,
    pub choice_size: f32,
    pub fork_length: f32,
    pub fork_thickness: f32,
    pub region_separator_pad: f32,
    pub region_padding: f32,
    pub header_gap: f32,
}

impl Default for StateLayoutConfig {
    fn default() -> Self {
        Self {
            marker_size: 14.0,
            choice_size: 28.0,
            fork_length: 70.0,
            fork_thickness: 8.0,
            region_separator_pad: 16.0,
            region_padding: 12.0,
            header_gap: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceLayoutConfig {
    pub actor_gap: f32,
    pub actor_min_width: f32,
    pub actor_height: f32,
    pub message_spacing: f32,
    pub self_message_width: f32,
    pub bottom_margin: f32,
}

impl Default for SequenceLayoutConfig {
    fn default() -> Self {
        Self {
            actor_gap: 50.0,
            actor_min_width: 150.0,
            actor_height: 65.0,
            message_spacing: 44.0,
            self_message_width: 40.0,
            bottom_margin: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyLayoutConfig {
    pub task_width: f32,
    pub task_height: f32,
    pub task_gap: f32,
    pub section_height: f32,
    pub score_step: f32,
    pub max_score: f32,
}

impl Default for JourneyLayoutConfig {
    fn default() -> Self {
        Self {
            task_width: 150.0,
            task_height: 50.0,
            task_gap: 20.0,
            section_height: 36.0,
            score_step: 18.0,
            max_score: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineLayoutConfig {
    pub period_width: f32,
    pub period_gap: f32,
    pub event_gap: f32,
    pub axis_gap: f32,
    pub section_height: f32,
}

impl Default for TimelineLayoutConfig {
    fn default() -> Self {
        Self {
            period_width: 150.0,
            period_gap: 20.0,
            event_gap: 12.0,
            axis_gap: 30.0,
            section_height: 36.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanttLayoutConfig {
    pub bar_height: f32,
    pub bar_gap: f32,
    pub day_width: f32,
    pub label_column_width: f32,
    pub tick_interval_days: u32,
    pub section_gap: f32,
    pub milestone_size: f32,
}

impl Default for GanttLayoutConfig {
    fn default() -> Self {
        Self {
            bar_height: 20.0,
            bar_gap: 4.0,
            day_width: 24.0,
            label_column_width: 150.0,
            tick_interval_days: 7,
            section_gap: 12.0,
            milestone_size: 16.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitGraphLayoutConfig {
    pub commit_step: f32,
    pub branch_spacing: f32,
    pub commit_radius: f32,
    pub label_gap: f32,
    pub main_branch_name: String,
}

impl Default for GitGraphLayoutConfig {
    fn default() -> Self {
        Self {
            commit_step: 40.0,
            branch_spacing: 50.0,
            commit_radius: 10.0,
            label_gap: 6.0,
            main_branch_name: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindmapLayoutConfig {
    pub padding: f32,
    pub ring_gap: f32,
    pub min_slot_angle: f32,
}

impl Default for MindmapLayoutConfig {
    fn default() -> Self {
        Self {
            padding: 10.0,
            ring_gap: 40.0,
            min_slot_angle: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarLayoutConfig {
    pub radius: f32,
    pub max_value: Option<f32>,
    pub label_gap: f32,
}

impl Default for RadarLayoutConfig {
    fn default() -> Self {
        Self {
            radius: 180.0,
            max_value: None,
            label_gap: 12.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieLayoutConfig {
    pub radius: f32,
    pub min_percent: f32,
    pub label_radius_ratio: f32,
}

impl Default for PieLayoutConfig {
    fn default() -> Self {
        Self {
            radius: 185.0,
            min_percent: 1.0,
            label_radius_ratio: 0.75,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadrantLayoutConfig {
    pub width: f32,
    pub height: f32,
    pub point_size: f32,
}

impl Default for QuadrantLayoutConfig {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 500.0,
            point_size: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SankeyLayoutConfig {
    pub node_width: f32,
    pub node_gap: f32,
    pub column_gap: f32,
    pub height: f32,
}

impl Default for SankeyLayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 10.0,
            node_gap: 12.0,
            column_gap: 150.0,
            height: 400.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreemapLayoutConfig {
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    pub gap: f32,
    pub header_height: f32,
}

impl Default for TreemapLayoutConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 500.0,
            padding: 10.0,
            gap: 4.0,
            header_height: 24.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub node_padding_x: f32,
    pub node_padding_y: f32,
    pub label_line_height: f32,
    /// Labels wider than this many pixels are word-wrapped.
    pub max_label_width: f32,
    pub font: FontSpec,
    pub canvas_padding: f32,
    pub arrow_size: f32,
    pub edge_label_gap: f32,
    pub flowchart: FlowchartLayoutConfig,
    pub subgraph: SubgraphLayoutConfig,
    pub state: StateLayoutConfig,
    pub sequence: SequenceLayoutConfig,
    pub journey: JourneyLayoutConfig,
    pub timeline: TimelineLayoutConfig,
    pub gantt: GanttLayoutConfig,
    pub gitgraph: GitGraphLayoutConfig,
    pub mindmap: MindmapLayoutConfig,
    pub radar: RadarLayoutConfig,
    pub pie: PieLayoutConfig,
    pub quadrant: QuadrantLayoutConfig,
    pub sankey: SankeyLayoutConfig,
    pub treemap: TreemapLayoutConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 50.0,
            rank_spacing: 50.0,
            node_padding_x: 30.0,
            node_padding_y: 15.0,
            label_line_height: 1.5,
            max_label_width: 200.0,
            font: FontSpec::default(),
            canvas_padding: 8.0,
            arrow_size: 8.0,
            edge_label_gap: 4.0,
            flowchart: FlowchartLayoutConfig::default(),
            subgraph: SubgraphLayoutConfig::default(),
            state: StateLayoutConfig::default(),
            sequence: SequenceLayoutConfig::default(),
            journey: JourneyLayoutConfig::default(),
            timeline: TimelineLayoutConfig::default(),
            gantt: GanttLayoutConfig::default(),
            gitgraph: GitGraphLayoutConfig::default(),
            mindmap: MindmapLayoutConfig::default(),
            radar: RadarLayoutConfig::default(),
            pie: PieLayoutConfig::default(),
            quadrant: QuadrantLayoutConfig::default(),
            sankey: SankeyLayoutConfig::default(),
            treemap: TreemapLayoutConfig::default(),
        }
    }
}

fn clamp_knob(name: &str, value: &mut f32) {
    if !value.is_finite() || *value <= 0.0 {
        tracing::warn!(knob = name, value = *value, "non-positive layout knob clamped");
        *value = MIN_SPACING;
    }
}

impl LayoutConfig {
    /// Copy of this config with every spacing, padding and size knob made
    /// strictly positive. Layout runs on the sanitized copy only.
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        clamp_knob("nodeSpacing", &mut config.node_spacing);
        clamp_knob("rankSpacing", &mut config.rank_spacing);
        clamp_knob("nodePaddingX", &mut config.node_padding_x);
        clamp_knob("nodePaddingY", &mut config.node_padding_y);
        clamp_knob("labelLineHeight", &mut config.label_line_height);
        clamp_knob("maxLabelWidth", &mut config.max_label_width);
        clamp_knob("font.size", &mut config.font.size);
        clamp_knob("canvasPadding", &mut config.canvas_padding);
        clamp_knob("arrowSize", &mut config.arrow_size);
        clamp_knob("edgeLabelGap", &mut config.edge_label_gap);
        if !config.flowchart.port_side_bias.is_finite() {
            config.flowchart.port_side_bias = 0.0;
        }

        let subgraph = &mut config.subgraph;
        clamp_knob("subgraph.padding", &mut subgraph.padding);
        clamp_knob("subgraph.labelGap", &mut subgraph.label_gap);

        let state = &mut config.state;
        clamp_knob("state.markerSize", &mut state.marker_size);
        clamp_knob("state.choiceSize", &mut state.choice_size);
        clamp_knob("state.forkLength", &mut state.fork_length);
        clamp_knob("state.forkThickness", &mut state.fork_thickness);
        clamp_knob("state.regionSeparatorPad", &mut state.region_separator_pad);
        clamp_knob("state.regionPadding", &mut state.region_padding);
        clamp_knob("state.headerGap", &mut state.header_gap);

        let sequence = &mut config.sequence;
        clamp_knob("sequence.actorGap", &mut sequence.actor_gap);
        clamp_knob("sequence.actorMinWidth", &mut sequence.actor_min_width);
        clamp_knob("sequence.actorHeight", &mut sequence.actor_height);
        clamp_knob("sequence.messageSpacing", &mut sequence.message_spacing);
        clamp_knob("sequence.selfMessageWidth", &mut sequence.self_message_width);
        clamp_knob("sequence.bottomMargin", &mut sequence.bottom_margin);

        let journey = &mut config.journey;
        clamp_knob("journey.taskWidth", &mut journey.task_width);
        clamp_knob("journey.taskHeight", &mut journey.task_height);
        clamp_knob("journey.taskGap", &mut journey.task_gap);
        clamp_knob("journey.sectionHeight", &mut journey.section_height);
        clamp_knob("journey.scoreStep", &mut journey.score_step);
        clamp_knob("journey.maxScore", &mut journey.max_score);

        let timeline = &mut config.timeline;
        clamp_knob("timeline.periodWidth", &mut timeline.period_width);
        clamp_knob("timeline.periodGap", &mut timeline.period_gap);
        clamp_knob("timeline.eventGap", &mut timeline.event_gap);
        clamp_knob("timeline.axisGap", &mut timeline.axis_gap);
        clamp_knob("timeline.sectionHeight", &mut timeline.section_height);

        let gantt = &mut config.gantt;
        clamp_knob("gantt.barHeight", &mut gantt.bar_height);
        clamp_knob("gantt.barGap", &mut gantt.bar_gap);
        clamp_knob("gantt.dayWidth", &mut gantt.day_width);
        clamp_knob("gantt.labelColumnWidth", &mut gantt.label_column_width);
        clamp_knob("gantt.sectionGap", &mut gantt.section_gap);
        clamp_knob("gantt.milestoneSize", &mut gantt.milestone_size);
        gantt.tick_interval_days = gantt.tick_interval_days.max(1);

        let gitgraph = &mut config.gitgraph;
        clamp_knob("gitGraph.commitStep", &mut gitgraph.commit_step);
        clamp_knob("gitGraph.branchSpacing", &mut gitgraph.branch_spacing);
        clamp_knob("gitGraph.commitRadius", &mut gitgraph.commit_radius);
        clamp_knob("gitGraph.labelGap", &mut gitgraph.label_gap);

        let mindmap = &mut config.mindmap;
        clamp_knob("mindmap.padding", &mut mindmap.padding);
        clamp_knob("mindmap.ringGap", &mut mindmap.ring_gap);
        clamp_knob("mindmap.minSlotAngle", &mut mindmap.min_slot_angle);

        let radar = &mut config.radar;
        clamp_knob("radar.radius", &mut radar.radius);
        clamp_knob("radar.labelGap", &mut radar.label_gap);
        if let Some(max) = radar.max_value.as_mut() {
            clamp_knob("radar.maxValue", max);
        }

        let pie = &mut config.pie;
        clamp_knob("pie.radius", &mut pie.radius);
        clamp_knob("pie.minPercent", &mut pie.min_percent);
        clamp_knob("pie.labelRadiusRatio", &mut pie.label_radius_ratio);

        let quadrant = &mut config.quadrant;
        clamp_knob("quadrant.width", &mut quadrant.width);
        clamp_knob("quadrant.height", &mut quadrant.height);
        clamp_knob("quadrant.pointSize", &mut quadrant.point_size);

        let sankey = &mut config.sankey;
        clamp_knob("sankey.nodeWidth", &mut sankey.node_width);
        clamp_knob("sankey.nodeGap", &mut sankey.node_gap);
        clamp_knob("sankey.columnGap", &mut sankey.column_gap);
        clamp_knob("sankey.height", &mut sankey.height);

        let treemap = &mut config.treemap;
        clamp_knob("treemap.width", &mut treemap.width);
        clamp_knob("treemap.height", &mut treemap.height);
        clamp_knob("treemap.padding", &mut treemap.padding);
        clamp_knob("treemap.gap", &mut treemap.gap);
        clamp_knob("treemap.headerHeight", &mut treemap.header_height);

        config
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FlowchartConfigFile {
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    order_passes: Option<usize>,
    transpose_sweeps: Option<usize>,
    port_side_bias: Option<f32>,
    smoothing_passes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SubgraphConfigFile {
    padding: Option<f32>,
    label_gap: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StateConfigFile {
    marker_size: Option<f32>,
    choice_size: Option<f32>,
    fork_length: Option<f32>,
    fork_thickness: Option<f32>,
    region_separator_pad: Option<f32>,
    region_padding: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SequenceConfigFile {
    actor_margin: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    message_margin: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GanttConfigFile {
    bar_height: Option<f32>,
    bar_gap: Option<f32>,
    day_width: Option<f32>,
    left_padding: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GitGraphConfigFile {
    commit_step: Option<f32>,
    branch_spacing: Option<f32>,
    main_branch_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PieConfigFile {
    radius: Option<f32>,
    min_percent: Option<f32>,
    text_position: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TreemapConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    padding: Option<f32>,
    gap: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    node_padding_x: Option<f32>,
    node_padding_y: Option<f32>,
    label_line_height: Option<f32>,
    max_label_width: Option<f32>,
    font_family: Option<String>,
    font_size: Option<f32>,
    canvas_padding: Option<f32>,
    flowchart: Option<FlowchartConfigFile>,
    subgraph: Option<SubgraphConfigFile>,
    state: Option<StateConfigFile>,
    sequence: Option<SequenceConfigFile>,
    gantt: Option<GanttConfigFile>,
    #[serde(rename = "gitGraph")]
    gitgraph: Option<GitGraphConfigFile>,
    pie: Option<PieConfigFile>,
    treemap: Option<TreemapConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Apply a JSON document of camelCase overrides onto the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<LayoutConfig> {
    let mut config = LayoutConfig::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(v) = parsed.node_spacing {
        config.node_spacing = v;
    }
    if let Some(v) = parsed.rank_spacing {
        config.rank_spacing = v;
    }
    if let Some(v) = parsed.node_padding_x {
        config.node_padding_x = v;
    }
    if let Some(v) = parsed.node_padding_y {
        config.node_padding_y = v;
    }
    if let Some(v) = parsed.label_line_height {
        config.label_line_height = v;
    }
    if let Some(v) = parsed.max_label_width {
        config.max_label_width = v;
    }
    if let Some(v) = parsed.font_family {
        config.font.family = v;
    }
    if let Some(v) = parsed.font_size {
        config.font.size = v;
    }
    if let Some(v) = parsed.canvas_padding {
        config.canvas_padding = v;
    }

    if let Some(flow) = parsed.flowchart {
        if let Some(v) = flow.node_spacing {
            config.node_spacing = v;
        }
        if let Some(v) = flow.rank_spacing {
            config.rank_spacing = v;
        }
        if let Some(v) = flow.order_passes {
            config.flowchart.order_passes = v;
        }
        if let Some(v) = flow.transpose_sweeps {
            config.flowchart.transpose_sweeps = v;
        }
        if let Some(v) = flow.port_side_bias {
            config.flowchart.port_side_bias = v;
        }
        if let Some(v) = flow.smoothing_passes {
            config.flowchart.smoothing_passes = v;
        }
    }

    if let Some(sub) = parsed.subgraph {
        if let Some(v) = sub.padding {
            config.subgraph.padding = v;
        }
        if let Some(v) = sub.label_gap {
            config.subgraph.label_gap = v;
        }
    }

    if let Some(state) = parsed.state {
        if let Some(v) = state.marker_size {
            config.state.marker_size = v;
        }
        if let Some(v) = state.choice_size {
            config.state.choice_size = v;
        }
        if let Some(v) = state.fork_length {
            config.state.fork_length = v;
        }
        if let Some(v) = state.fork_thickness {
            config.state.fork_thickness = v;
        }
        if let Some(v) = state.region_separator_pad {
            config.state.region_separator_pad = v;
        }
        if let Some(v) = state.region_padding {
            config.state.region_padding = v;
        }
    }

    if let Some(seq) = parsed.sequence {
        if let Some(v) = seq.actor_margin {
            config.sequence.actor_gap = v;
        }
        if let Some(v) = seq.width {
            config.sequence.actor_min_width = v;
        }
        if let Some(v) = seq.height {
            config.sequence.actor_height = v;
        }
        if let Some(v) = seq.message_margin {
            config.sequence.message_spacing = v;
        }
    }

    if let Some(gantt) = parsed.gantt {
        if let Some(v) = gantt.bar_height {
            config.gantt.bar_height = v;
        }
        if let Some(v) = gantt.bar_gap {
            config.gantt.bar_gap = v;
        }
        if let Some(v) = gantt.day_width {
            config.gantt.day_width = v;
        }
        if let Some(v) = gantt.left_padding {
            config.gantt.label_column_width = v;
        }
    }

    if let Some(git) = parsed.gitgraph {
        if let Some(v) = git.commit_step {
            config.gitgraph.commit_step = v;
        }
        if let Some(v) = git.branch_spacing {
            config.gitgraph.branch_spacing = v;
        }
        if let Some(v) = git.main_branch_name {
            config.gitgraph.main_branch_name = v;
        }
    }

    if let Some(pie) = parsed.pie {
        if let Some(v) = pie.radius {
            config.pie.radius = v;
        }
        if let Some(v) = pie.min_percent {
            config.pie.min_percent = v;
        }
        if let Some(v) = pie.text_position {
            config.pie.label_radius_ratio = v;
        }
    }

    if let Some(treemap) = parsed.treemap {
        if let Some(v) = treemap.width {
            config.treemap.width = v;
        }
        if let Some(v) = treemap.height {
            config.treemap.height = v;
        }
        if let Some(v) = treemap.padding {
            config.treemap.padding = v;
        }
        if let Some(v) = treemap.gap {
            config.treemap.gap = v;
        }
    }

    Ok(config)
}
