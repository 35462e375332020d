use std::cell::RefCell;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::TextBlock;

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|\\n|\r?\n").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size: f32,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "trebuchet ms, verdana, arial, sans-serif".to_string(),
            size: 16.0,
        }
    }
}

impl FontSpec {
    pub fn with_size(&self, size: f32) -> Self {
        Self {
            family: self.family.clone(),
            size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextSize {
    pub width: f32,
    pub height: f32,
}

/// Measures one line of text. Supplied by the caller for each layout call.
pub trait LabelSizer {
    fn measure(&self, text: &str, font: &FontSpec) -> TextSize;
}

impl<F> LabelSizer for F
where
    F: Fn(&str, &FontSpec) -> TextSize,
{
    fn measure(&self, text: &str, font: &FontSpec) -> TextSize {
        self(text, font)
    }
}

/// Deterministic sizer backed by a calibrated per-character width table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharWidthSizer;

impl LabelSizer for CharWidthSizer {
    fn measure(&self, text: &str, font: &FontSpec) -> TextSize {
        TextSize {
            width: fallback_text_width(text, font.size),
            height: font.size,
        }
    }
}

pub(crate) fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'A' => 0.652,
        'B' => 0.648,
        'C' => 0.734,
        'D' => 0.723,
        'E' => 0.594,
        'F' => 0.575,
        'G' | 'H' => 0.742,
        'I' => 0.272,
        'J' => 0.557,
        'K' => 0.648,
        'L' => 0.559,
        'M' => 0.903,
        'N' => 0.763,
        'O' => 0.754,
        'P' => 0.623,
        'Q' => 0.755,
        'R' => 0.637,
        'S' => 0.633,
        'T' => 0.599,
        'U' => 0.746,
        'V' => 0.661,
        'W' => 0.958,
        'X' => 0.655,
        'Y' => 0.646,
        'Z' => 0.621,
        'a' => 0.550,
        'b' => 0.603,
        'c' => 0.547,
        'd' => 0.609,
        'e' => 0.570,
        'f' => 0.340,
        'g' | 'h' => 0.600,
        'i' => 0.235,
        'j' => 0.227,
        'k' => 0.522,
        'l' => 0.239,
        'm' => 0.867,
        'n' => 0.585,
        'o' => 0.574,
        'p' => 0.595,
        'q' => 0.585,
        'r' => 0.364,
        's' => 0.523,
        't' => 0.305,
        'u' => 0.585,
        'v' => 0.545,
        'w' => 0.811,
        'x' => 0.538,
        'y' => 0.556,
        'z' => 0.550,
        '0' => 0.613,
        '1' => 0.396,
        '2' => 0.609,
        '3' => 0.597,
        '4' => 0.614,
        '5' => 0.586,
        '6' => 0.608,
        '7' => 0.559,
        '8' => 0.611,
        '9' => 0.595,
        '@' | '#' | '%' | '&' => 0.946,
        _ => 0.568,
    }
}

pub(crate) fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

pub(crate) fn split_lines(text: &str) -> Vec<String> {
    LINE_BREAK
        .split(text)
        .map(|line| line.trim().to_string())
        .collect()
}

type MeasureKey = (String, String, u32);

/// Wraps a [`LabelSizer`] for the duration of one layout call: splits and
/// wraps labels, and remembers every line it has measured.
pub(crate) struct LabelMeasurer<'a> {
    sizer: &'a dyn LabelSizer,
    font: FontSpec,
    line_height: f32,
    max_width: f32,
    cache: RefCell<HashMap<MeasureKey, TextSize>>,
}

impl<'a> LabelMeasurer<'a> {
    pub fn new(sizer: &'a dyn LabelSizer, font: FontSpec, line_height: f32, max_width: f32) -> Self {
        Self {
            sizer,
            font,
            line_height,
            max_width,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn measure_line(&self, text: &str, font: &FontSpec) -> TextSize {
        let key = (text.to_string(), font.family.clone(), font.size.to_bits());
        if let Some(size) = self.cache.borrow().get(&key) {
            return *size;
        }
        let raw = self.sizer.measure(text, font);
        let size = TextSize {
            width: if raw.width.is_finite() { raw.width.max(0.0) } else { 0.0 },
            height: if raw.height.is_finite() { raw.height.max(0.0) } else { 0.0 },
        };
        self.cache.borrow_mut().insert(key, size);
        size
    }

    /// Measure with the default font, wrapping at the configured width.
    pub fn block(&self, text: &str) -> TextBlock {
        let font = self.font.clone();
        self.block_with_font(text, &font, true)
    }

    pub fn block_with_font(&self, text: &str, font: &FontSpec, wrap: bool) -> TextBlock {
        let mut lines = Vec::new();
        for line in split_lines(text) {
            if wrap {
                lines.extend(self.wrap_line(&line, font));
            } else {
                lines.push(line);
            }
        }
        if lines.is_empty() {
            lines.push(String::new());
        }

        let min_line_height = font.size * self.line_height;
        let mut width = 0.0f32;
        let mut height = 0.0f32;
        for line in &lines {
            let size = self.measure_line(line, font);
            width = width.max(size.width);
            height += size.height.max(min_line_height);
        }

        TextBlock {
            lines,
            width,
            height,
        }
    }

    fn wrap_line(&self, line: &str, font: &FontSpec) -> Vec<String> {
        if self.measure_line(line, font).width <= self.max_width {
            return vec![line.to_string()];
        }

        let mut lines = Vec::new();
        let mut current = String::new();
        for word in line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if self.measure_line(&candidate, font).width > self.max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current.push_str(word);
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }

    #[cfg(test)]
    fn cached_entries(&self) -> usize {
        self.cache.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn split_lines_handles_br_tags() {
        assert_eq!(split_lines("a<br/>b"), vec!["a", "b"]);
        assert_eq!(split_lines("a<BR>b"), vec!["a", "b"]);
        assert_eq!(split_lines("a<br />b"), vec!["a", "b"]);
        assert_eq!(split_lines("a\\nb"), vec!["a", "b"]);
    }

    #[test]
    fn split_lines_trims_whitespace() {
        assert_eq!(split_lines("  hello  \n  world  "), vec!["hello", "world"]);
    }

    #[test]
    fn char_width_factor_returns_positive_values() {
        for ch in ['a', 'Z', ' ', '0', '@', '\u{4e2d}'] {
            assert!(char_width_factor(ch) > 0.0, "char {:?} has zero width", ch);
        }
    }

    #[test]
    fn fallback_text_width_scales_with_font_size() {
        let w16 = fallback_text_width("Hello", 16.0);
        let w32 = fallback_text_width("Hello", 32.0);
        assert!((w32 - w16 * 2.0).abs() < 0.01, "width should double with font size");
    }

    #[test]
    fn wrap_splits_long_text() {
        let measurer = LabelMeasurer::new(&CharWidthSizer, FontSpec::default(), 1.5, 100.0);
        let block = measurer.block("this is a rather long line that should be wrapped");
        assert!(block.lines.len() > 1, "expected wrapping, got {:?}", block.lines);
        assert!(block.width <= 100.0 + 1e-3 || block.lines.iter().any(|l| !l.contains(' ')));
    }

    #[test]
    fn empty_label_produces_single_line() {
        let measurer = LabelMeasurer::new(&CharWidthSizer, FontSpec::default(), 1.5, 200.0);
        let block = measurer.block("");
        assert_eq!(block.lines.len(), 1);
        assert_eq!(block.width, 0.0);
        assert_eq!(block.height, 24.0);
    }

    #[test]
    fn block_height_respects_line_height_floor() {
        let tiny = |_: &str, _: &FontSpec| TextSize {
            width: 10.0,
            height: 2.0,
        };
        let measurer = LabelMeasurer::new(&tiny, FontSpec::default(), 1.5, 200.0);
        let block = measurer.block("a<br>b");
        assert_eq!(block.height, 48.0);
        assert_eq!(block.width, 10.0);
    }

    #[test]
    fn repeated_measurements_hit_the_cache() {
        let calls = Cell::new(0usize);
        let counting = |text: &str, font: &FontSpec| {
            calls.set(calls.get() + 1);
            TextSize {
                width: text.len() as f32 * font.size * 0.5,
                height: font.size,
            }
        };
        let measurer = LabelMeasurer::new(&counting, FontSpec::default(), 1.5, 500.0);
        measurer.block("Start");
        measurer.block("Start");
        measurer.block("Start<br>Start");
        assert_eq!(calls.get(), 1);
        assert_eq!(measurer.cached_entries(), 1);

        let bigger = FontSpec::default().with_size(20.0);
        measurer.block_with_font("Start", &bigger, false);
        assert_eq!(calls.get(), 2);
    }
}
