use std::path::PathBuf;

use anyhow::Context;

pub const DEFAULT_PROMPT: &str = ">> ";
pub const DEFAULT_MAX_CALL_DEPTH: usize = 2048;

const PROMPT_VAR: &str = "EMBER_PROMPT";
const PRELUDE_VAR: &str = "EMBER_PRELUDE";
const MAX_CALL_DEPTH_VAR: &str = "EMBER_MAX_CALL_DEPTH";

/// Session settings for the interactive loop and the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    /// Source file evaluated once before the first prompt.
    pub prelude: Option<PathBuf>,
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prompt: DEFAULT_PROMPT.to_string(),
            prelude: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl Config {
    /// Reads `EMBER_PROMPT`, `EMBER_PRELUDE` and `EMBER_MAX_CALL_DEPTH`, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Config> {
        Config::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let mut config = Config::default();
        if let Some(prompt) = var(PROMPT_VAR) {
            config.prompt = prompt;
        }
        config.prelude = var(PRELUDE_VAR)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);
        if let Some(depth) = var(MAX_CALL_DEPTH_VAR) {
            config.max_call_depth = depth
                .trim()
                .parse()
                .with_context(|| format!("invalid {MAX_CALL_DEPTH_VAR} value {depth:?}"))?;
        }
        Ok(config)
    }
}
