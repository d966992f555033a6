//! Rich-text markup -> formatting runs
//!
//! The live editor stores its content as a small HTML-like markup string.
//! Both the preview and the compositor turn that string into the same ordered
//! list of [`Run`]s, so what you see while editing is what gets baked.
//!
//! Formatting changes are explicit operations on runs ([`toggle_format`],
//! [`apply_format`]) followed by [`runs_to_markup`]; the markup is the only
//! source of truth and is never read back from rendered output.

use crate::fonts::{FontFamily, FontVariant};
use lol_html::html_content::EndTag;
use lol_html::{doc_text, element, rewrite_str, HandlerResult, RewriteStrSettings};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

/// Formatting flags a run can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunFlags {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
}

/// A span of text sharing one formatting combination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
}

impl Run {
    pub fn new(text: impl Into<String>, flags: RunFlags) -> Self {
        Self {
            text: text.into(),
            bold: flags.bold,
            italic: flags.italic,
            underline: flags.underline,
            strike: flags.strike,
        }
    }

    pub fn flags(&self) -> RunFlags {
        RunFlags {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            strike: self.strike,
        }
    }

    pub fn font_variant(&self, family: FontFamily) -> FontVariant {
        FontVariant::resolve(family, self.bold, self.italic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    Bold,
    Italic,
    Underline,
    Strike,
}

impl Format {
    fn get(self, flags: &RunFlags) -> bool {
        match self {
            Format::Bold => flags.bold,
            Format::Italic => flags.italic,
            Format::Underline => flags.underline,
            Format::Strike => flags.strike,
        }
    }

    fn set(self, flags: &mut RunFlags, on: bool) {
        match self {
            Format::Bold => flags.bold = on,
            Format::Italic => flags.italic = on,
            Format::Underline => flags.underline = on,
            Format::Strike => flags.strike = on,
        }
    }
}

const BLOCK_TAGS: &[&str] = &[
    "div",
    "p",
    "li",
    "blockquote",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
];

/// Flag stack and run output shared by the rewriter's handlers
struct Flattener {
    base: RunFlags,
    /// (frame id, flags inside that element), innermost last
    open: Vec<(u64, RunFlags)>,
    next_frame: u64,
    /// Raw text of the current text node, entities still encoded
    pending: String,
    runs: Vec<Run>,
}

impl Flattener {
    fn new(base: RunFlags) -> Self {
        Self {
            base,
            open: Vec::new(),
            next_frame: 0,
            pending: String::new(),
            runs: Vec::new(),
        }
    }

    fn flags(&self) -> RunFlags {
        self.open.last().map_or(self.base, |&(_, flags)| flags)
    }

    fn emit(&mut self, text: &str, flags: RunFlags) {
        if !text.is_empty() {
            self.runs.push(Run::new(text, flags));
        }
    }

    fn text(&mut self, raw: &str, last_in_node: bool) {
        self.pending.push_str(raw);
        if last_in_node {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let raw = std::mem::take(&mut self.pending);
        let decoded = html_escape::decode_html_entities(&raw).into_owned();
        self.emit(&decoded, self.flags());
    }

    fn open(&mut self, flags: RunFlags) -> u64 {
        self.next_frame += 1;
        self.open.push((self.next_frame, flags));
        self.next_frame
    }

    /// Closing an element also closes anything still open inside it
    fn close(&mut self, frame: u64) {
        self.flush();
        if let Some(pos) = self.open.iter().rposition(|&(id, _)| id == frame) {
            self.open.truncate(pos);
        }
    }

    /// Block elements start on a new line unless they open the content
    fn break_before_block(&mut self, flags: RunFlags) {
        let needs_break = self
            .runs
            .last()
            .is_some_and(|r| !r.text.ends_with('\n'));
        if needs_break {
            self.emit("\n", flags);
        }
    }

    fn start_element(&mut self, tag: &str, style: Option<&str>) -> RunFlags {
        self.flush();
        let outer = self.flags();
        let mut inner = outer;
        apply_tag(tag, &mut inner);
        if let Some(style) = style {
            apply_style(style, &mut inner);
        }
        if BLOCK_TAGS.contains(&tag) {
            self.break_before_block(outer);
        }
        inner
    }
}

/// Flatten markup into runs, outermost flags first.
///
/// Unknown tags are plain containers, stray closing tags are ignored and
/// anything left open runs to the end. `<br>` and block elements become
/// line breaks. Adjacent runs with equal flags are left unmerged.
pub fn flatten_runs(markup: &str, base: RunFlags) -> Vec<Run> {
    let state = Rc::new(RefCell::new(Flattener::new(base)));

    let rewritten = rewrite_str(
        markup,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                let tag = el.tag_name().to_ascii_lowercase();
                let style = el.get_attribute("style");
                let mut flattener = state.borrow_mut();
                let inner = flattener.start_element(&tag, style.as_deref());

                if tag == "br" {
                    flattener.emit("\n", inner);
                    return Ok(());
                }
                if let Some(handlers) = el.end_tag_handlers() {
                    let frame = flattener.open(inner);
                    let state = Rc::clone(&state);
                    handlers.push(Box::new(move |_: &mut EndTag<'_>| -> HandlerResult {
                        state.borrow_mut().close(frame);
                        Ok(())
                    }) as _);
                }
                Ok(())
            })],
            document_content_handlers: vec![doc_text!(|chunk| {
                state
                    .borrow_mut()
                    .text(chunk.as_str(), chunk.last_in_text_node());
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    );

    let mut flattener = state.borrow_mut();
    if let Err(e) = rewritten {
        warn!(error = %e, "markup rejected, using it as plain text");
        let text = html_escape::decode_html_entities(markup).into_owned();
        return vec![Run::new(text, base)];
    }
    flattener.flush();
    std::mem::take(&mut flattener.runs)
}

fn apply_tag(tag: &str, flags: &mut RunFlags) {
    match tag {
        "b" | "strong" => flags.bold = true,
        "i" | "em" => flags.italic = true,
        "u" | "ins" => flags.underline = true,
        "s" | "strike" | "del" => flags.strike = true,
        _ => {}
    }
}

fn apply_style(style: &str, flags: &mut RunFlags) {
    for decl in style.split(';') {
        let Some((prop, value)) = decl.split_once(':') else {
            continue;
        };
        let value = value.trim().to_ascii_lowercase();
        match prop.trim().to_ascii_lowercase().as_str() {
            "font-weight" => {
                flags.bold = match value.as_str() {
                    "bold" | "bolder" => true,
                    "normal" | "lighter" => false,
                    other => other.parse::<u16>().map(|w| w >= 600).unwrap_or(flags.bold),
                }
            }
            "font-style" => {
                flags.italic = value.contains("italic") || value.contains("oblique");
            }
            "text-decoration" | "text-decoration-line" => {
                if value.contains("none") {
                    flags.underline = false;
                    flags.strike = false;
                } else {
                    flags.underline |= value.contains("underline");
                    flags.strike |= value.contains("line-through");
                }
            }
            _ => {}
        }
    }
}

/// Runs for an entity: flattened markup when it yields anything, otherwise a
/// single run made of the plain-text field with the entity's base flags.
pub fn resolve_runs(markup: Option<&str>, plain: &str, base: RunFlags) -> Vec<Run> {
    let runs = markup
        .map(|m| flatten_runs(m, base))
        .unwrap_or_default();
    if runs.is_empty() {
        vec![Run::new(plain, base)]
    } else {
        runs
    }
}

/// Text content of the markup with tags stripped and entities decoded
pub fn plain_text(markup: &str) -> String {
    concat_text(&flatten_runs(markup, RunFlags::default()))
}

pub fn concat_text(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// Split runs so that char offsets `start` and `end` fall on run boundaries
fn split_at_range(runs: &[Run], start: usize, end: usize) -> Vec<Run> {
    let mut out = Vec::with_capacity(runs.len() + 2);
    let mut offset = 0;
    for run in runs {
        let len = run.text.chars().count();
        let run_start = offset;
        let run_end = offset + len;
        offset = run_end;

        let mut cuts: Vec<usize> = [start, end]
            .into_iter()
            .filter(|&c| c > run_start && c < run_end)
            .map(|c| c - run_start)
            .collect();
        cuts.dedup();

        if cuts.is_empty() {
            out.push(run.clone());
            continue;
        }

        let chars: Vec<char> = run.text.chars().collect();
        let mut prev = 0;
        for cut in cuts.into_iter().chain(std::iter::once(len)) {
            out.push(Run::new(chars[prev..cut].iter().collect::<String>(), run.flags()));
            prev = cut;
        }
    }
    out
}

/// Set or clear `format` on the characters in `start..end`
pub fn apply_format(runs: &[Run], start: usize, end: usize, format: Format, on: bool) -> Vec<Run> {
    if start >= end {
        return runs.to_vec();
    }
    let mut offset = 0;
    split_at_range(runs, start, end)
        .into_iter()
        .map(|run| {
            let len = run.text.chars().count();
            let inside = offset >= start && offset + len <= end && len > 0;
            offset += len;
            if inside {
                let mut flags = run.flags();
                format.set(&mut flags, on);
                Run::new(run.text, flags)
            } else {
                run
            }
        })
        .collect()
}

/// Toggle `format` over `start..end`: turned off when every character in the
/// range already has it, turned on otherwise.
pub fn toggle_format(runs: &[Run], start: usize, end: usize, format: Format) -> Vec<Run> {
    let mut offset = 0;
    let mut all_set = true;
    let mut any = false;
    for run in runs {
        let len = run.text.chars().count();
        let overlaps = offset < end && offset + len > start;
        if overlaps {
            any = true;
            all_set &= format.get(&run.flags());
        }
        offset += len;
    }
    apply_format(runs, start, end, format, !(any && all_set))
}

/// Serialize runs back into markup that flattens to the same text and flags
pub fn runs_to_markup(runs: &[Run]) -> String {
    let mut out = String::new();
    for run in runs.iter().filter(|r| !r.text.is_empty()) {
        let tags: Vec<&str> = [
            (run.bold, "b"),
            (run.italic, "i"),
            (run.underline, "u"),
            (run.strike, "s"),
        ]
        .into_iter()
        .filter_map(|(on, tag)| on.then_some(tag))
        .collect();

        for tag in &tags {
            out.push('<');
            out.push_str(tag);
            out.push('>');
        }
        let mut lines = run.text.split('\n').peekable();
        while let Some(line) = lines.next() {
            out.push_str(&html_escape::encode_text(line));
            if lines.peek().is_some() {
                out.push_str("<br>");
            }
        }
        for tag in tags.iter().rev() {
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
    out
}
