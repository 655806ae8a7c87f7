use crate::config::LayoutConfig;
use crate::text_metrics;
use crate::theme::Theme;

use super::TextBlock;

const AVERAGE_CHAR_FACTOR: f32 = 0.56;

/// Wraps a node name to the configured label width and sizes the result.
pub(crate) fn measure_label(text: &str, theme: &Theme, config: &LayoutConfig) -> TextBlock {
    let metrics = Metrics {
        font_size: theme.font_size.max(1.0),
        font_family: theme.font_family.as_str(),
        fast: config.fast_text_metrics,
    };
    let max_width = config.max_label_width_chars.max(1) as f32 * metrics.average_char();

    let mut lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .flat_map(|line| wrap_line(line, max_width, &metrics))
        .collect();
    if lines.is_empty() {
        lines.push(String::new());
    }

    let width = lines
        .iter()
        .map(|line| metrics.width(line))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * metrics.font_size * config.label_line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

struct Metrics<'a> {
    font_size: f32,
    font_family: &'a str,
    fast: bool,
}

impl Metrics<'_> {
    fn width(&self, text: &str) -> f32 {
        if self.fast && text.is_ascii() {
            return fallback_text_width(text, self.font_size);
        }
        text_metrics::measure_text_width(text, self.font_size, self.font_family)
            .unwrap_or_else(|| fallback_text_width(text, self.font_size))
    }

    fn average_char(&self) -> f32 {
        let fallback = self.font_size * AVERAGE_CHAR_FACTOR;
        if self.fast {
            return fallback;
        }
        text_metrics::average_char_width(self.font_family, self.font_size).unwrap_or(fallback)
    }
}

/// Greedy word wrap. A single word wider than the limit is split by chars.
fn wrap_line(line: &str, max_width: f32, metrics: &Metrics<'_>) -> Vec<String> {
    if metrics.width(line) <= max_width {
        return vec![line.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if metrics.width(&candidate) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if metrics.width(word) <= max_width {
            current.push_str(word);
            continue;
        }
        for ch in word.chars() {
            current.push(ch);
            if metrics.width(&current) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

/// Rough advance per character class for a proportional sans-serif face.
fn char_width_factor(ch: char) -> f32 {
    match ch {
        'i' | 'j' | 'l' | 'I' | '\'' | '|' | '!' | '.' | ',' | ':' | ';' => 0.26,
        'f' | 'r' | 't' | ' ' | '(' | ')' | '[' | ']' | '-' => 0.34,
        'm' | 'w' => 0.84,
        'M' | 'W' | '@' | '%' => 0.92,
        'A'..='Z' | '0'..='9' | '#' | '&' => 0.64,
        'a'..='z' => 0.56,
        c if c.is_ascii() => AVERAGE_CHAR_FACTOR,
        // CJK and other wide scripts.
        c if c as u32 >= 0x2E80 => 1.0,
        _ => 0.6,
    }
}
