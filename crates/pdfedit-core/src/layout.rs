//! Heuristic text layout
//!
//! There is no shaping engine here. Line counts come from an average glyph
//! advance (`font_size * avg_glyph_width_factor`), and the same heuristic
//! decides where drawn lines break, so drawn text stays inside the box whose
//! height was estimated for it. Real AFM widths are only used to measure a
//! finished line for alignment and decorations.

use crate::config::ComposeConfig;
use crate::fonts::FontFamily;
use crate::model::TextAlign;
use crate::runs::Run;

/// Width left for glyphs inside a box of `box_width` points
pub fn available_width(box_width: f64, config: &ComposeConfig) -> f64 {
    (box_width - 2.0 * config.horizontal_padding).max(1.0)
}

fn glyph_advance(font_size: f64, config: &ComposeConfig) -> f64 {
    font_size * config.avg_glyph_width_factor
}

/// Split runs at hard line breaks. Always returns at least one paragraph.
pub fn split_paragraphs(runs: &[Run]) -> Vec<Vec<Run>> {
    let mut paragraphs = vec![Vec::new()];
    for run in runs {
        for (i, piece) in run.text.split('\n').enumerate() {
            if i > 0 {
                paragraphs.push(Vec::new());
            }
            if !piece.is_empty() {
                if let Some(current) = paragraphs.last_mut() {
                    current.push(Run::new(piece, run.flags()));
                }
            }
        }
    }
    paragraphs
}

fn char_count(runs: &[Run]) -> usize {
    runs.iter().map(|r| r.text.chars().count()).sum()
}

fn paragraph_lines(chars: usize, available: f64, font_size: f64, config: &ComposeConfig) -> usize {
    let width = chars as f64 * glyph_advance(font_size, config);
    ((width / available).ceil() as usize).max(1)
}

/// Estimated wrapped line count, `ceil(width / available)` per paragraph
pub fn estimate_line_count(runs: &[Run], available: f64, font_size: f64, config: &ComposeConfig) -> usize {
    split_paragraphs(runs)
        .iter()
        .map(|p| paragraph_lines(char_count(p), available, font_size, config))
        .sum()
}

/// Height in points of a free-text box `width` points wide
pub fn estimate_box_height(runs: &[Run], width: f64, font_size: f64, config: &ComposeConfig) -> f64 {
    let lines = estimate_line_count(runs, available_width(width, config), font_size, config);
    lines as f64 * font_size * config.line_height_factor + config.vertical_padding
}

/// Break runs into drawable lines.
///
/// Words are kept together where the estimated line budget allows; otherwise
/// the paragraph is cut into equal character slices.
pub fn wrap_lines(runs: &[Run], available: f64, font_size: f64, config: &ComposeConfig) -> Vec<Vec<Run>> {
    let capacity = ((available / glyph_advance(font_size, config)).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in split_paragraphs(runs) {
        let chars: Vec<char> = paragraph.iter().flat_map(|r| r.text.chars()).collect();
        if chars.is_empty() {
            lines.push(Vec::new());
            continue;
        }
        let budget = paragraph_lines(chars.len(), available, font_size, config);
        let mut ranges = greedy_breaks(&chars, capacity);
        if ranges.len() > budget {
            let per_line = chars.len().div_ceil(budget);
            ranges = (0..chars.len())
                .step_by(per_line)
                .map(|start| (start, (start + per_line).min(chars.len())))
                .collect();
        }
        for (start, end) in ranges {
            lines.push(slice_runs(&paragraph, start, end));
        }
    }
    lines
}

fn greedy_breaks(chars: &[char], capacity: usize) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut last_space: Option<usize> = None;
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ' ' {
            last_space = Some(i);
        }
        if i + 1 - start > capacity {
            match last_space.filter(|&s| s > start) {
                Some(space) => {
                    ranges.push((start, space));
                    start = space + 1;
                }
                None => {
                    ranges.push((start, i));
                    start = i;
                }
            }
            last_space = None;
            i = start;
            continue;
        }
        i += 1;
    }
    if start < chars.len() || ranges.is_empty() {
        ranges.push((start, chars.len()));
    }
    ranges
}

/// Runs covering characters `start..end`
pub fn slice_runs(runs: &[Run], start: usize, end: usize) -> Vec<Run> {
    let mut out = Vec::new();
    let mut offset = 0;
    for run in runs {
        let len = run.text.chars().count();
        let lo = start.max(offset);
        let hi = end.min(offset + len);
        if lo < hi {
            let text: String = run.text.chars().skip(lo - offset).take(hi - lo).collect();
            out.push(Run::new(text, run.flags()));
        }
        offset += len;
    }
    out
}

/// Measured width of a line in points, using the resolved font of each run
pub fn measure_runs(runs: &[Run], family: FontFamily, font_size: f64) -> f64 {
    runs.iter()
        .map(|r| r.font_variant(family).text_width(&r.text, font_size))
        .sum()
}

/// Horizontal offset of a line `line_width` wide inside `box_width`
pub fn align_offset(align: TextAlign, line_width: f64, box_width: f64) -> f64 {
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => ((box_width - line_width) / 2.0).max(0.0),
        TextAlign::Right => (box_width - line_width).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runs::{concat_text, RunFlags};
    use proptest::prelude::*;

    fn plain(text: &str) -> Vec<Run> {
        vec![Run::new(text, RunFlags::default())]
    }

    #[test]
    fn test_single_short_line() {
        let config = ComposeConfig::default();
        // 5 chars * 12 * 0.5 = 30pt, fits in 100pt
        let h = estimate_box_height(&plain("hello"), 104.0, 12.0, &config);
        assert!((h - (12.0 * 1.2 + 4.0)).abs() < 1e-9);
    }

    #[test]
    fn test_wrapped_line_count() {
        let config = ComposeConfig::default();
        // 20 chars * 6pt = 120pt over 50pt -> 3 lines
        assert_eq!(estimate_line_count(&plain(&"x".repeat(20)), 50.0, 12.0, &config), 3);
    }

    #[test]
    fn test_hard_breaks_count_per_paragraph() {
        let config = ComposeConfig::default();
        assert_eq!(estimate_line_count(&plain("a\nb\n"), 100.0, 12.0, &config), 3);
    }

    #[test]
    fn test_empty_text_is_one_line() {
        let config = ComposeConfig::default();
        assert_eq!(estimate_line_count(&[], 100.0, 12.0, &config), 1);
    }

    #[test]
    fn test_wrap_prefers_word_boundaries() {
        let config = ComposeConfig::default();
        // capacity = floor(60 / 6) = 10 chars
        let lines = wrap_lines(&plain("hello big world"), 60.0, 12.0, &config);
        let texts: Vec<String> = lines.iter().map(|l| concat_text(l)).collect();
        assert_eq!(texts, vec!["hello big", "world"]);
    }

    #[test]
    fn test_wrap_keeps_formatting() {
        let config = ComposeConfig::default();
        let runs = vec![
            Run::new("aaaa", RunFlags { bold: true, ..RunFlags::default() }),
            Run::new("bbbb", RunFlags::default()),
        ];
        let lines = wrap_lines(&runs, 36.0, 12.0, &config);
        assert_eq!(lines.len(), 2);
        assert!(lines[0][0].bold);
        assert_eq!(concat_text(&lines[1]), "bb");
        assert!(!lines[1][0].bold);
    }

    #[test]
    fn test_align_offset() {
        assert_eq!(align_offset(TextAlign::Left, 40.0, 100.0), 0.0);
        assert_eq!(align_offset(TextAlign::Center, 40.0, 100.0), 30.0);
        assert_eq!(align_offset(TextAlign::Right, 40.0, 100.0), 60.0);
        assert_eq!(align_offset(TextAlign::Right, 140.0, 100.0), 0.0);
    }

    proptest! {
        /// Property: drawn lines never outnumber the estimated lines
        #[test]
        fn wrap_fits_estimate(text in "[a-z \n]{0,80}", available in 10.0f64..300.0, size in 6.0f64..30.0) {
            let config = ComposeConfig::default();
            let runs = plain(&text);
            let lines = wrap_lines(&runs, available, size, &config);
            prop_assert!(lines.len() <= estimate_line_count(&runs, available, size, &config));
        }

        /// Property: wrapping drops at most the spaces it breaks on
        #[test]
        fn wrap_keeps_non_space_text(text in "[a-z ]{0,80}", available in 10.0f64..300.0) {
            let config = ComposeConfig::default();
            let lines = wrap_lines(&plain(&text), available, 12.0, &config);
            let joined: String = lines.iter().map(|l| concat_text(l)).collect::<String>();
            let strip = |s: &str| s.chars().filter(|c| *c != ' ').collect::<String>();
            prop_assert_eq!(strip(&joined), strip(&text));
        }
    }
}
