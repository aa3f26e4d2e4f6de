//! Font-metric-driven wrapping for the ghost-text overlay. The host editor
//! widget owns font metrics, so wrapping asks it for advance widths and
//! line height rather than assuming a fixed-width grid. Wrapping runs once,
//! at first display, against the anchor's frozen position; a later
//! viewport resize re-runs it against the same stored anchor and display
//! text, but cursor movement never does.

use unicode_segmentation::UnicodeSegmentation;

/// What the ghost-text overlay needs from the host's editor widget to lay
/// out multi-line suggestions. Implemented by the host, not by this crate.
pub trait RenderSurface {
    /// Pixel width `text` would occupy if rendered in the overlay's font.
    fn advance_width(&self, text: &str) -> f32;
    /// Pixel height of one line in the overlay's font.
    fn line_height(&self) -> f32;
    /// Pixel width available for ghost text at the anchor's column.
    fn available_width(&self) -> f32;
}

/// Greedily wraps `text` to `surface`'s available width, breaking at
/// grapheme-cluster boundaries and preferring the last whitespace run
/// before the limit so words are not split mid-grapheme.
pub fn wrap_to_surface(text: &str, surface: &dyn RenderSurface) -> Vec<String> {
    let max_width = surface.available_width();
    if max_width <= 0.0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        lines.extend(wrap_paragraph(paragraph, surface, max_width));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn wrap_paragraph(paragraph: &str, surface: &dyn RenderSurface, max_width: f32) -> Vec<String> {
    if paragraph.is_empty() {
        return vec![String::new()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;
    let mut last_break: Option<(usize, f32)> = None; // (char len at break, width at break)

    for grapheme in paragraph.graphemes(true) {
        let grapheme_width = surface.advance_width(grapheme);
        if current_width + grapheme_width > max_width && !current.is_empty() {
            if let Some((break_len, break_width)) = last_break {
                let remainder: String = current.chars().skip(break_len).collect();
                let head: String = current.chars().take(break_len).collect();
                lines.push(head.trim_end().to_string());
                current = remainder.trim_start().to_string();
                current_width = surface.advance_width(&current);
                let _ = break_width;
            } else {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }
            last_break = None;
        }

        if grapheme.chars().all(char::is_whitespace) {
            last_break = Some((current.chars().count(), current_width));
        }

        current.push_str(grapheme);
        current_width += grapheme_width;
    }

    lines.push(current);
    lines
}

#[cfg(test)]
pub(crate) struct FixedWidthSurface {
    pub char_width: f32,
    pub line_height: f32,
    pub available_width: f32,
}

#[cfg(test)]
impl RenderSurface for FixedWidthSurface {
    fn advance_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn available_width(&self) -> f32 {
        self.available_width
    }
}
