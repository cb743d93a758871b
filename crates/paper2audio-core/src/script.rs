//! Word budgeting and prompt rendering for the narration script.

use crate::document::Document;

pub const DEFAULT_MINUTES: i32 = 12;
pub const DEFAULT_WPM: i32 = 150;

/// Share of the spoken budget used for words; the rest is left for pauses.
const SPEAKING_SHARE: f64 = 0.9;

/// Maximum characters of the abstract embedded in the prompt.
pub const PROMPT_ABSTRACT_MAX_CHARS: usize = 1800;
/// Maximum whitespace-delimited tokens of the body embedded in the prompt.
pub const PROMPT_BODY_MAX_WORDS: usize = 2500;

/// Label that opens the body excerpt section of every template.
pub const LONGER_EXTRACT_MARKER: &str = "Longer extract (noisy):";

/// Target narration length in words for `minutes` of audio at `wpm`.
///
/// Non-positive inputs fall back to [`DEFAULT_MINUTES`] / [`DEFAULT_WPM`].
pub fn target_word_count(minutes: i32, wpm: i32) -> u32 {
    let minutes = if minutes <= 0 { DEFAULT_MINUTES } else { minutes };
    let wpm = if wpm <= 0 { DEFAULT_WPM } else { wpm };
    let words = f64::from(minutes) * f64::from(wpm);
    (words * SPEAKING_SHARE).round() as u32
}

/// Tone variant of the generation instruction.
///
/// Both variants share the same structure: word budget, tone rules, an
/// ordered content checklist, the fabrication prohibition, the labelled
/// metadata sections, and the closing "script only" instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Template {
    /// Neutral overview for a general listener who is driving.
    #[default]
    General,
    /// Technical overview for a researcher in the field.
    Expert,
}

impl Template {
    /// Parse a template name; anything unrecognised is [`Template::General`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "expert" | "technical" => Template::Expert,
            _ => Template::General,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Template::General => "general",
            Template::Expert => "expert",
        }
    }

    /// Render the full generation request for `doc` with a budget of
    /// `target_words`. Pure: equal inputs give byte-identical output.
    pub fn render(&self, doc: &Document, target_words: u32) -> String {
        let title = single_line(doc.title());
        let authors = single_line(doc.authors());
        let abstract_text = truncate_chars(doc.abstract_text().trim(), PROMPT_ABSTRACT_MAX_CHARS);
        let extract = trim_words(doc.body(), PROMPT_BODY_MAX_WORDS);

        let instructions = match self {
            Template::General => general_instructions(target_words),
            Template::Expert => expert_instructions(target_words),
        };

        format!(
            "{instructions}

Paper metadata (may be noisy due to PDF extraction):
Title: {title}
Authors: {authors}

Abstract (if detected):
{abstract_text}

{LONGER_EXTRACT_MARKER}
{extract}

Now write the script only. Do not add headers or bullets."
        )
    }
}

/// Render the general-audience prompt.
pub fn make_prompt(doc: &Document, target_words: u32) -> String {
    Template::General.render(doc, target_words)
}

fn general_instructions(target_words: u32) -> String {
    format!(
        "You are an expert technical writer and reviewer.
Produce a single-narrator audio-ready script of about {target_words} words (±10%) that presents a neutral, analytical overview of the following academic paper for a listener who is driving.

Hard requirements:
- Use concise, medium-length sentences with natural cadence.
- No hype, no back-and-forth dialog, no sycophancy.
- Include: (1) context & motivation, (2) precise problem statement, (3) core approach/method, (4) key findings/results with units if available, (5) strengths AND limitations/caveats, (6) bottom-line takeaway and when to read the full paper.
- Avoid formulas and long lists; prefer plain-language descriptions of what the method does.
- Cite section names sparingly in-line if clearly present (e.g., “In the evaluation section…”).
- Do not fabricate details not supported by the paper."
    )
}

fn expert_instructions(target_words: u32) -> String {
    format!(
        "You are a senior researcher briefing a colleague who works in the same field.
Produce a single-narrator audio-ready script of about {target_words} words (±10%) that presents a rigorous, technical overview of the following academic paper for a listener who is driving.

Hard requirements:
- Use precise terminology; keep sentences medium-length so they remain easy to follow by ear.
- No hype, no back-and-forth dialog, no sycophancy.
- Include: (1) context & motivation, (2) precise problem statement, (3) assumptions, threat model, or experimental setup, (4) core approach/method and what distinguishes it from prior work, (5) baselines, datasets, and metrics, (6) key findings/results with units and effect sizes if available, (7) strengths AND limitations/caveats, including threats to validity, (8) reproducibility: code, data, or artifacts mentioned, (9) bottom-line takeaway and which sections deserve a close read.
- Describe equations by what they compute rather than reading them symbol by symbol.
- Cite section names in-line when clearly present (e.g., “In the evaluation section…”).
- Do not fabricate details not supported by the paper."
    )
}

/// Keep at most `n` whitespace tokens of `s`, rejoined by single spaces.
/// Text already within the limit is returned unchanged.
pub fn trim_words(s: &str, n: usize) -> String {
    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() <= n {
        return s.to_string();
    }
    words[..n].join(" ")
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn single_line(s: &str) -> String {
    s.replace('\n', " ").trim().to_string()
}
