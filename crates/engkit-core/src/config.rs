use crate::error::{EngkitError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ProjectKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    #[default]
    General,
    Mechanical,
    Electrical,
    Thermal,
}

impl ProjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::General => "general",
            ProjectKind::Mechanical => "mechanical",
            ProjectKind::Electrical => "electrical",
            ProjectKind::Thermal => "thermal",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HookPolicy
// ---------------------------------------------------------------------------

/// Thresholds and vocabularies the policy hooks evaluate against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookPolicy {
    #[serde(default = "default_stale_minutes")]
    pub context_stale_after_minutes: u64,
    #[serde(default = "default_understanding_max")]
    pub understanding_max_todo: usize,
    #[serde(default = "default_understanding_max")]
    pub understanding_max_tbd: usize,
    #[serde(default = "default_understanding_sections")]
    pub understanding_sections: Vec<String>,
    #[serde(default = "default_context_min_chars")]
    pub context_min_chars: usize,
    #[serde(default = "default_context_max_placeholders")]
    pub context_max_placeholders: usize,
    #[serde(default = "default_systems")]
    pub systems: Vec<String>,
    #[serde(default = "default_design_indicators")]
    pub design_indicators: Vec<String>,
    #[serde(default = "default_prompt_keywords")]
    pub prompt_keywords: Vec<String>,
}

fn default_stale_minutes() -> u64 {
    60
}

fn default_understanding_max() -> usize {
    3
}

fn default_understanding_sections() -> Vec<String> {
    ["## System Overview", "## Reference Documents", "## Key Constraints"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_context_min_chars() -> usize {
    100
}

fn default_context_max_placeholders() -> usize {
    5
}

fn default_systems() -> Vec<String> {
    [
        "combustor",
        "fuel-system",
        "structural",
        "thermal",
        "performance",
        "testing",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_design_indicators() -> Vec<String> {
    [
        "/design/",
        "/iterations/",
        ".step",
        ".sldprt",
        ".f3d",
        ".dwg",
        ".dxf",
        "design-",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_prompt_keywords() -> Vec<String> {
    ["combustor", "turbine", "compressor"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for HookPolicy {
    fn default() -> Self {
        Self {
            context_stale_after_minutes: default_stale_minutes(),
            understanding_max_todo: default_understanding_max(),
            understanding_max_tbd: default_understanding_max(),
            understanding_sections: default_understanding_sections(),
            context_min_chars: default_context_min_chars(),
            context_max_placeholders: default_context_max_placeholders(),
            systems: default_systems(),
            design_indicators: default_design_indicators(),
            prompt_keywords: default_prompt_keywords(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: ProjectKind,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolkit_version: Option<String>,
    #[serde(default)]
    pub hooks: HookPolicy,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
                kind: ProjectKind::General,
            },
            toolkit_version: None,
            hooks: HookPolicy::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(EngkitError::NotAProject(path));
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Hook policy for the project at `root`. Hooks must never fail on a
    /// missing or broken config, so anything unreadable yields the defaults.
    pub fn hook_policy(root: &Path) -> HookPolicy {
        match Self::load(root) {
            Ok(cfg) => cfg.hooks,
            Err(e) => {
                tracing::debug!(error = %e, "using default hook policy");
                HookPolicy::default()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let hooks = &self.hooks;

        if hooks.context_stale_after_minutes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "hooks.context_stale_after_minutes is 0: every session end will be blocked"
                    .to_string(),
            });
        }

        if hooks.understanding_sections.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "hooks.understanding_sections is empty: understanding documents are not checked for structure"
                    .to_string(),
            });
        }

        if hooks.design_indicators.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "hooks.design_indicators is empty: only calculation notebooks are gated"
                    .to_string(),
            });
        }

        for system in &hooks.systems {
            if system.is_empty() || system.contains('/') || system.contains('\\') {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "hooks.systems entry '{system}' must be a single path segment"
                    ),
                });
            }
        }

        if self.project.name.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "project.name is empty".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
