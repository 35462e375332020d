#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod text_metrics;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{LayoutConfig, load_config, parse_config};
pub use ir::{DiagramKind, Direction, Edge, Graph, Node, NodeShape};
pub use layout::{CharWidthSizer, FontSpec, LabelSizer, Layout, LayoutError, TextSize, compute_layout};
pub use text_metrics::FontMetricsSizer;
