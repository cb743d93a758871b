use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use paper2audio_core::{Document, PipelineEvent, RunReport, Template};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the selected backends before the run starts.
pub fn print_plan(
    w: &mut dyn Write,
    pdf_name: &str,
    summarizer: &str,
    speaker: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "{} {} (summarizer: {}, speech: {})",
            "Narrating".bold().cyan(),
            pdf_name.bold(),
            summarizer.cyan(),
            speaker.cyan()
        )?;
    } else {
        writeln!(
            w,
            "Narrating {} (summarizer: {}, speech: {})",
            pdf_name, summarizer, speaker
        )?;
    }
    Ok(())
}

/// Print a progress event as it arrives.
pub fn print_event(
    w: &mut dyn Write,
    event: &PipelineEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        PipelineEvent::Extracted {
            title,
            headings,
            body_words,
        } => {
            let title = if title.is_empty() {
                "(untitled)".to_string()
            } else {
                truncate(title, 70)
            };
            writeln!(w, "Extracted \"{}\" ({} words)", title, body_words)?;
            if !headings.is_empty() {
                let list = headings.join(", ");
                if color.enabled() {
                    writeln!(w, "  {}", format!("sections: {}", list).dimmed())?;
                } else {
                    writeln!(w, "  sections: {}", list)?;
                }
            }
        }
        PipelineEvent::PromptBuilt {
            target_words,
            prompt_chars,
        } => {
            writeln!(
                w,
                "Prompt ready: target {} words ({} chars)",
                target_words, prompt_chars
            )?;
        }
        PipelineEvent::Summarized { provider, words } => {
            writeln!(w, "Narration from {}: {} words", provider, words)?;
        }
        PipelineEvent::ScriptSaved { path } => {
            writeln!(w, "Saved script: {}", path.display())?;
        }
        PipelineEvent::ScriptWriteFailed { path, error } => {
            let msg = format!("warning: could not write {}: {}", path.display(), error);
            if color.enabled() {
                writeln!(w, "{}", msg.yellow())?;
            } else {
                writeln!(w, "{}", msg)?;
            }
        }
        PipelineEvent::Synthesized { provider, path } => {
            writeln!(w, "Audio from {}: {}", provider, path.display())?;
        }
    }
    Ok(())
}

/// Spinner message shown while the next stage runs.
pub fn spinner_message(
    event: &PipelineEvent,
    summarizer: &str,
    speaker: &str,
) -> Option<String> {
    match event {
        PipelineEvent::PromptBuilt { .. } => Some(format!("Summarizing with {summarizer}...")),
        PipelineEvent::Summarized { .. } => Some(format!("Synthesizing speech with {speaker}...")),
        _ => None,
    }
}

pub fn print_success(
    w: &mut dyn Write,
    report: &RunReport,
    color: ColorMode,
) -> std::io::Result<()> {
    let path = clean_path(&report.audio_path);
    if color.enabled() {
        writeln!(w, "{} {}", "Wrote audio:".bold().green(), path.display())?;
    } else {
        writeln!(w, "Wrote audio: {}", path.display())?;
    }
    Ok(())
}

/// Print what `inspect` found: metadata, headings, and the word budget.
pub fn print_document(
    w: &mut dyn Write,
    doc: &Document,
    target_words: u32,
    template: Template,
    color: ColorMode,
) -> std::io::Result<()> {
    let or_none = |s: &str| {
        if s.is_empty() {
            "(none)".to_string()
        } else {
            s.to_string()
        }
    };

    if color.enabled() {
        writeln!(w, "{}", "DRY RUN".bold().cyan())?;
    } else {
        writeln!(w, "DRY RUN")?;
    }
    writeln!(w, "  Title:     {}", or_none(doc.title()))?;
    writeln!(w, "  Authors:   {}", or_none(doc.authors()))?;
    writeln!(
        w,
        "  Headings:  {}",
        if doc.headings().is_empty() {
            "(none)".to_string()
        } else {
            doc.headings().join(", ")
        }
    )?;
    writeln!(
        w,
        "  Body:      {} words",
        doc.body().split_whitespace().count()
    )?;
    writeln!(w, "  Target:    {} words", target_words)?;
    writeln!(w, "  Template:  {}", template.name())?;
    writeln!(w)?;

    let abstract_text = or_none(doc.abstract_text());
    if color.enabled() {
        writeln!(w, "{}", "Abstract:".bold())?;
        writeln!(w, "{}", abstract_text.dimmed())?;
    } else {
        writeln!(w, "Abstract:")?;
        writeln!(w, "{}", abstract_text)?;
    }
    Ok(())
}

pub fn print_prompt(w: &mut dyn Write, prompt: &str, color: ColorMode) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "Prompt:".bold())?;
    } else {
        writeln!(w, "Prompt:")?;
    }
    writeln!(w, "{}", prompt)?;
    Ok(())
}

/// Lexically normalize `path` (drops `.` segments and repeated separators).
pub fn clean_path(path: &Path) -> std::path::PathBuf {
    let cleaned: std::path::PathBuf = path
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect();
    if cleaned.as_os_str().is_empty() {
        std::path::PathBuf::from(".")
    } else {
        cleaned
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
