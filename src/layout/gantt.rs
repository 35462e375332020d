use std::collections::HashMap;

use super::*;
use crate::ir::NodeShape;

const DEFAULT_DURATION_DAYS: f64 = 3.0;

fn parse_gantt_duration(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let mut digits = String::new();
    let mut unit = None;
    for ch in value.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            digits.push(ch);
        } else if !ch.is_whitespace() {
            unit = Some(ch.to_ascii_lowercase());
        }
    }
    let number: f64 = digits.parse().ok()?;
    let mult = match unit {
        Some('d') => 1.0,
        Some('w') => 7.0,
        Some('h') => 1.0 / 24.0,
        Some('m') => 30.0,
        Some('y') => 365.0,
        _ => 1.0,
    };
    Some(number * mult)
}

fn parse_gantt_date(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let parts: Vec<&str> = value
        .split(|ch| ch == '-' || ch == '/' || ch == '.')
        .collect();
    if parts.len() != 3 {
        return None;
    }
    let year: i64 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let day: u32 = parts[2].parse().ok()?;
    if month == 0 || month > 12 || day == 0 || day > 31 {
        return None;
    }
    Some(days_from_civil(year, month, day))
}

/// Days since 1970-01-01 in the proleptic Gregorian calendar.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = year - (month <= 2) as i64;
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let m = month as i64;
    let d = day as i64;
    let doy = (153 * (m + if m > 2 { -3 } else { 9 }) + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = mp + if mp < 10 { 3 } else { -9 };
    let year = y + (m <= 2) as i64;
    (year, m as u32, d as u32)
}

fn format_gantt_date(days: i64) -> String {
    let (year, month, day) = civil_from_days(days);
    format!("{:04}-{:02}-{:02}", year, month, day)
}

/// Start and end of every task in days. Absolute dates are days since the
/// epoch; without any absolute date the chart is relative to day zero.
fn schedule_tasks(graph: &Graph) -> (Vec<(f64, f64)>, Option<i64>) {
    let origin = graph
        .nodes
        .iter()
        .filter_map(|node| node.schedule.as_ref()?.start.as_deref())
        .filter_map(parse_gantt_date)
        .min();
    let base = origin.unwrap_or(0) as f64;

    let mut timing: Vec<(f64, f64)> = Vec::with_capacity(graph.nodes.len());
    let mut ends: HashMap<&str, f64> = HashMap::new();
    for node in &graph.nodes {
        let schedule = node.schedule.as_ref();
        let start_token = schedule.and_then(|s| s.start.as_deref()).map(str::trim);
        let previous_end = timing.last().map_or(base, |(_, end)| *end);
        let start = match start_token {
            Some(token) => {
                if let Some(day) = parse_gantt_date(token) {
                    day as f64
                } else if let Some(after) = token.strip_prefix("after ") {
                    // Several dependencies start after the latest one.
                    after
                        .split_whitespace()
                        .filter_map(|id| ends.get(id).copied())
                        .fold(None, |acc: Option<f64>, end| Some(acc.map_or(end, |a| a.max(end))))
                        .unwrap_or(previous_end)
                } else {
                    previous_end
                }
            }
            None => previous_end,
        };
        let duration_token = schedule.and_then(|s| s.duration.as_deref());
        let duration = match duration_token {
            Some(token) => match parse_gantt_date(token) {
                Some(end_day) => end_day as f64 - start,
                None => parse_gantt_duration(token).unwrap_or(DEFAULT_DURATION_DAYS),
            },
            None => DEFAULT_DURATION_DAYS,
        }
        .max(0.0);
        let end = start + duration;
        ends.insert(node.id.as_str(), end);
        timing.push((start, end));
    }
    (timing, origin)
}

/// One row per task in declaration order; bar x and width come from the
/// task's schedule, sections add a gap where they change.
pub(super) fn compute_gantt_layout(
    graph: &Graph,
    config: &LayoutConfig,
    measurer: &LabelMeasurer<'_>,
) -> Layout {
    let gantt = &config.gantt;
    let (timing, absolute_origin) = schedule_tasks(graph);
    let first_start = timing
        .iter()
        .map(|(start, _)| *start)
        .fold(f64::INFINITY, f64::min);
    let last_end = timing
        .iter()
        .map(|(_, end)| *end)
        .fold(f64::NEG_INFINITY, f64::max);
    let origin_day = if first_start.is_finite() {
        first_start.floor() as i64
    } else {
        0
    };
    let day_x = |day: f64| gantt.label_column_width + ((day - origin_day as f64) as f32) * gantt.day_width;

    let mut section_of: HashMap<&str, usize> = HashMap::new();
    for (idx, sub) in graph.subgraphs.iter().enumerate() {
        for member in &sub.members {
            section_of.entry(member.as_str()).or_insert(idx);
        }
    }

    let mut nodes = BTreeMap::new();
    let mut row_tops: HashMap<&str, f32> = HashMap::new();
    let mut y = 0.0f32;
    let mut previous_section = None;
    for (idx, (node, (start, end))) in graph.nodes.iter().zip(&timing).enumerate() {
        let section = section_of.get(node.id.as_str()).copied();
        if idx > 0 && section != previous_section {
            y += gantt.section_gap;
        }
        previous_section = section;
        row_tops.insert(node.id.as_str(), y);

        let label = measurer.block(&node.label);
        let center_y = y + gantt.bar_height / 2.0;
        let layout = if end - start <= f64::EPSILON {
            let mut milestone = node_box(
                node,
                label,
                (day_x(*start), center_y),
                (gantt.milestone_size, gantt.milestone_size),
            );
            milestone.shape = NodeShape::Diamond;
            milestone
        } else {
            let x0 = day_x(*start);
            let width = day_x(*end) - x0;
            node_box(node, label, (x0 + width / 2.0, center_y), (width, gantt.bar_height))
        };
        nodes.insert(node.id.clone(), layout);
        y += gantt.bar_height + gantt.bar_gap;
    }

    let chart_end = if last_end.is_finite() { day_x(last_end) } else { gantt.label_column_width };
    let mut subgraphs = Vec::with_capacity(graph.subgraphs.len());
    for sub in &graph.subgraphs {
        let tops: Vec<f32> = sub
            .members
            .iter()
            .filter_map(|member| row_tops.get(member.as_str()).copied())
            .collect();
        if tops.is_empty() {
            continue;
        }
        let top = tops.iter().copied().fold(f32::INFINITY, f32::min);
        let bottom = tops.iter().copied().fold(f32::NEG_INFINITY, f32::max) + gantt.bar_height;
        let label = measurer.block(&sub.label);
        subgraphs.push(SubgraphLayout {
            id: sub.id.clone(),
            label_anchor: (gantt.label_column_width / 2.0, top + gantt.bar_height / 2.0),
            label,
            members: sub.members.clone(),
            x: 0.0,
            y: top,
            width: chart_end,
            height: bottom - top,
        });
    }

    let mut ticks = Vec::new();
    if last_end.is_finite() {
        let step = gantt.tick_interval_days.max(1) as i64;
        let mut day = origin_day;
        while (day as f64) <= last_end {
            let label = if absolute_origin.is_some() {
                format_gantt_date(day)
            } else {
                (day - origin_day).to_string()
            };
            ticks.push(GanttTick {
                x: day_x(day as f64),
                label,
            });
            day += step;
        }
    }

    let edges = straight_edges(graph, &nodes, config, measurer);
    Layout {
        kind: graph.kind,
        direction: graph.direction,
        nodes,
        edges,
        subgraphs,
        regions: Vec::new(),
        diagram: DiagramData::Gantt {
            origin_day,
            day_width: gantt.day_width,
            ticks,
        },
        width: 0.0,
        height: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DiagramKind, TaskSchedule};

    fn task(id: &str, start: Option<&str>, duration: Option<&str>) -> Node {
        let mut node = Node::new(id, id);
        node.schedule = Some(TaskSchedule {
            start: start.map(str::to_string),
            duration: duration.map(str::to_string),
        });
        node
    }

    fn layout_for(graph: &Graph) -> Layout {
        let config = LayoutConfig::default();
        let sizer = CharWidthSizer;
        let measurer = LabelMeasurer::new(&sizer, config.font.clone(), 1.5, 200.0);
        compute_gantt_layout(graph, &config, &measurer)
    }

    #[test]
    fn civil_dates_round_trip() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(parse_gantt_date("2024-03-01"), Some(days_from_civil(2024, 3, 1)));
        assert_eq!(format_gantt_date(days_from_civil(2024, 2, 29)), "2024-02-29");
        assert_eq!(parse_gantt_duration("2w"), Some(14.0));
        assert_eq!(parse_gantt_duration("12h"), Some(0.5));
    }

    #[test]
    fn tasks_chain_through_after_and_milestones_are_diamonds() {
        let mut graph = Graph::new(DiagramKind::Gantt);
        graph.add_node(task("design", Some("2024-01-01"), Some("3d")));
        graph.add_node(task("build", Some("after design"), Some("1w")));
        graph.add_node(task("ship", Some("after build"), Some("0d")));
        let layout = layout_for(&graph);

        let design = layout.node("design").unwrap();
        let build = layout.node("build").unwrap();
        let ship = layout.node("ship").unwrap();
        assert!((design.width - 72.0).abs() < 1e-3);
        assert!((build.x - (design.x + design.width)).abs() < 1e-3);
        assert!((build.width - 7.0 * 24.0).abs() < 1e-3);
        assert_eq!(ship.shape, NodeShape::Diamond);
        assert!((ship.center().0 - (build.x + build.width)).abs() < 1e-3);
        assert!(build.y > design.y && ship.y > build.y);

        let DiagramData::Gantt { ticks, origin_day, .. } = &layout.diagram else {
            panic!("expected gantt data");
        };
        assert_eq!(*origin_day, days_from_civil(2024, 1, 1));
        assert_eq!(ticks[0].label, "2024-01-01");
        assert_eq!(ticks[1].label, "2024-01-08");
    }

    #[test]
    fn relative_tasks_follow_each_other() {
        let mut graph = Graph::new(DiagramKind::Gantt);
        graph.add_node(task("a", None, Some("2d")));
        graph.add_node(task("b", None, None));
        let layout = layout_for(&graph);
        let a = layout.node("a").unwrap();
        let b = layout.node("b").unwrap();
        assert!((a.x - 150.0).abs() < 1e-3);
        assert!((b.x - (150.0 + 48.0)).abs() < 1e-3);
        assert!((b.width - 72.0).abs() < 1e-3);
        let DiagramData::Gantt { ticks, .. } = &layout.diagram else {
            panic!("expected gantt data");
        };
        assert_eq!(ticks[0].label, "0");
    }
}
