use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::script::Template;
use crate::{Config, Tool};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
/// Credentials are never read from here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub llm: Option<LlmSection>,
    pub tts: Option<TtsSection>,
    pub style: Option<StyleSection>,
    pub tools: Option<ToolsSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmSection {
    pub provider: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub ollama_model: Option<String>,
    pub ollama_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TtsSection {
    pub provider: Option<String>,
    pub piper_voice: Option<String>,
    pub piper_voice_json: Option<String>,
    pub say_voice: Option<String>,
    pub openai_voice: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub eleven_voice: Option<String>,
    pub eleven_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleSection {
    pub minutes: Option<i32>,
    pub wpm: Option<i32>,
    pub template: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsSection {
    pub piper: Option<ToolSection>,
    pub say: Option<ToolSection>,
    pub ffmpeg: Option<ToolSection>,
}

/// `[tools.<name>]`: program path plus optional leading arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSection {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
}

#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Platform config directory path: `<config_dir>/paper2audio/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("paper2audio").join("config.toml"))
}

/// Load config by cascading CWD `.paper2audio.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".paper2audio.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    match load_explicit(path) {
        Ok(config) => Some(config),
        Err(ConfigFileError::Read { .. }) => None,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring invalid config file");
            None
        }
    }
}

/// Load exactly the file named by the user. Failures are errors.
pub fn load_explicit(path: &Path) -> Result<ConfigFile, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (b, o) = (
        base.llm.unwrap_or_default(),
        overlay.llm.unwrap_or_default(),
    );
    let llm = LlmSection {
        provider: o.provider.or(b.provider),
        openai_model: o.openai_model.or(b.openai_model),
        openai_base_url: o.openai_base_url.or(b.openai_base_url),
        ollama_model: o.ollama_model.or(b.ollama_model),
        ollama_url: o.ollama_url.or(b.ollama_url),
    };

    let (b, o) = (
        base.tts.unwrap_or_default(),
        overlay.tts.unwrap_or_default(),
    );
    let tts = TtsSection {
        provider: o.provider.or(b.provider),
        piper_voice: o.piper_voice.or(b.piper_voice),
        piper_voice_json: o.piper_voice_json.or(b.piper_voice_json),
        say_voice: o.say_voice.or(b.say_voice),
        openai_voice: o.openai_voice.or(b.openai_voice),
        openai_model: o.openai_model.or(b.openai_model),
        openai_base_url: o.openai_base_url.or(b.openai_base_url),
        eleven_voice: o.eleven_voice.or(b.eleven_voice),
        eleven_base_url: o.eleven_base_url.or(b.eleven_base_url),
    };

    let (b, o) = (
        base.style.unwrap_or_default(),
        overlay.style.unwrap_or_default(),
    );
    let style = StyleSection {
        minutes: o.minutes.or(b.minutes),
        wpm: o.wpm.or(b.wpm),
        template: o.template.or(b.template),
    };

    let (b, o) = (
        base.tools.unwrap_or_default(),
        overlay.tools.unwrap_or_default(),
    );
    let tools = ToolsSection {
        piper: merge_tool(b.piper, o.piper),
        say: merge_tool(b.say, o.say),
        ffmpeg: merge_tool(b.ffmpeg, o.ffmpeg),
    };

    ConfigFile {
        llm: Some(llm),
        tts: Some(tts),
        style: Some(style),
        tools: Some(tools),
    }
}

fn merge_tool(base: Option<ToolSection>, overlay: Option<ToolSection>) -> Option<ToolSection> {
    match (base, overlay) {
        (None, None) => None,
        (Some(t), None) | (None, Some(t)) => Some(t),
        (Some(b), Some(o)) => Some(ToolSection {
            program: o.program.or(b.program),
            args: o.args.or(b.args),
        }),
    }
}

impl ConfigFile {
    /// Overwrite the fields of `config` that this file sets.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(llm) = &self.llm {
            set(&mut config.llm.provider, &llm.provider);
            set(&mut config.llm.openai_model, &llm.openai_model);
            set(&mut config.llm.openai_base_url, &llm.openai_base_url);
            set(&mut config.llm.ollama_model, &llm.ollama_model);
            set(&mut config.llm.ollama_url, &llm.ollama_url);
        }
        if let Some(tts) = &self.tts {
            set(&mut config.tts.provider, &tts.provider);
            if let Some(p) = &tts.piper_voice {
                config.tts.piper_voice = Some(PathBuf::from(p));
            }
            if let Some(p) = &tts.piper_voice_json {
                config.tts.piper_voice_json = Some(PathBuf::from(p));
            }
            if tts.say_voice.is_some() {
                config.tts.say_voice = tts.say_voice.clone();
            }
            set(&mut config.tts.openai_voice, &tts.openai_voice);
            set(&mut config.tts.openai_model, &tts.openai_model);
            set(&mut config.tts.openai_base_url, &tts.openai_base_url);
            set(&mut config.tts.eleven_voice, &tts.eleven_voice);
            set(&mut config.tts.eleven_base_url, &tts.eleven_base_url);
        }
        if let Some(style) = &self.style {
            if let Some(m) = style.minutes {
                config.style.target_minutes = m;
            }
            if let Some(w) = style.wpm {
                config.style.wpm = w;
            }
            if let Some(t) = &style.template {
                config.style.template = Template::from_name(t);
            }
        }
        if let Some(tools) = &self.tools {
            apply_tool(&mut config.tools.piper, &tools.piper);
            apply_tool(&mut config.tools.say, &tools.say);
            apply_tool(&mut config.tools.ffmpeg, &tools.ffmpeg);
        }
    }
}

fn set(target: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        target.clone_from(v);
    }
}

fn apply_tool(tool: &mut Tool, section: &Option<ToolSection>) {
    let Some(section) = section else { return };
    if let Some(program) = &section.program {
        tool.program.clone_from(program);
    }
    if let Some(args) = &section.args {
        tool.args.clone_from(args);
    }
}
