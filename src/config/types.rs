use serde::{Deserialize, Serialize};

pub use mergeforged_av::settings::{Container, MergeSettings, StandardizeSettings, ToolsConfig};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub merge: MergeSettings,

    #[serde(default)]
    pub standardize: StandardizeSettings,

    #[serde(default)]
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JobsConfig {
    /// Maximum number of merges running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_max_concurrent() -> usize {
    5
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}
