use std::path::Path;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use log::info;
use serde::{Deserialize, Serialize};

/// Settings used when preparing a [`crate::Regex`] or a
/// [`crate::LiteralSearcher`].
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Pattern evaluation settings.
    pub eval: EvalConfig,
    /// Literal search settings.
    pub search: SearchConfig,
}

/// Pattern evaluation settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    /// When `true`, `.` doesn't match `\n`, and line anchors also match
    /// right after and right before a `\n`.
    pub multiline: bool,
    /// Turn greedy repetitions into possessive ones when backtracking into
    /// them can't produce a different outcome.
    pub possessive_optimization: bool,
    /// Run the pattern optimizer before evaluation.
    pub optimize_pattern: bool,
    /// Use the length limits, the start and end anchors and the leading
    /// literal to skip evaluations that can't succeed.
    pub static_analysis: bool,
}

/// Literal search settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Use the vectorized DFA walk when the CPU supports it.
    pub simd: bool,
    /// Longest literal searched with a DFA.
    pub dfa_max_len: usize,
    /// Largest DFA, in number of states, walked with vector instructions.
    pub simd_max_states: usize,
    /// Shortest literal searched with Boyer-Moore-Horspool when it's too
    /// long for a DFA.
    pub horspool_min_len: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            multiline: false,
            possessive_optimization: true,
            optimize_pattern: true,
            static_analysis: true,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            simd: true,
            dfa_max_len: 255,
            simd_max_states: 16,
            horspool_min_len: 3,
        }
    }
}

/// Load config file from a given path. Path must contain a valid TOML file or
/// this function will propagate the error. Settings missing from the file
/// keep their default values.
pub fn load_config_from_file(
    config_file: &Path,
) -> Result<Config, figment::Error> {
    let config: Config =
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file_exact(config_file))
            .extract()?;
    info!("configuration loaded from {}", config_file.display());
    Ok(config)
}
