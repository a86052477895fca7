//! Motif configuration file handling
//!
//! `motif.toml` holds the defaults every subcommand starts from. Each section
//! and field is optional; a missing file means the built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use motif_animation::{Direction, Easing, ParallaxConfig, SequenceConfig, StaggerConfig, Weighting};

/// File name looked up in the working directory
pub const CONFIG_FILE: &str = "motif.toml";

/// Top-level contents of `motif.toml`
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct MotifConfig {
    #[serde(default)]
    pub stagger: StaggerSection,
    #[serde(default)]
    pub sequence: SequenceSection,
    #[serde(default)]
    pub parallax: ParallaxSection,
    #[serde(default)]
    pub accessibility: AccessibilitySection,
}

// =============================================================================
// [stagger]
// =============================================================================

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct StaggerSection {
    /// Delay between items in seconds
    #[serde(default = "default_base_delay")]
    pub base_delay: f64,
    /// Budget for the whole stagger in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
    /// Weight delays by the Fibonacci sequence
    #[serde(default = "default_true")]
    pub fibonacci: bool,
}

fn default_base_delay() -> f64 {
    0.1
}

fn default_true() -> bool {
    true
}

impl Default for StaggerSection {
    fn default() -> Self {
        Self {
            base_delay: default_base_delay(),
            total_duration: None,
            fibonacci: true,
        }
    }
}

// =============================================================================
// [sequence]
// =============================================================================

/// Playback direction as written in the config file
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DirectionName {
    #[default]
    Forward,
    Reverse,
}

impl From<DirectionName> for Direction {
    fn from(name: DirectionName) -> Self {
        match name {
            DirectionName::Forward => Direction::Forward,
            DirectionName::Reverse => Direction::Reverse,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct SequenceSection {
    /// Number of steps
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Delay before the first step in seconds
    #[serde(default)]
    pub initial_delay: f64,
    #[serde(default)]
    pub direction: DirectionName,
    /// Restart after the final step
    #[serde(default)]
    pub looping: bool,
}

fn default_steps() -> usize {
    5
}

impl Default for SequenceSection {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            initial_delay: 0.0,
            direction: DirectionName::Forward,
            looping: false,
        }
    }
}

// =============================================================================
// [parallax]
// =============================================================================

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct ParallaxSection {
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// Maximum travel in pixels
    #[serde(default = "default_range")]
    pub range: f32,
    /// Fraction of the element height used as its reference point
    #[serde(default)]
    pub offset: f32,
    #[serde(default)]
    pub horizontal: bool,
    #[serde(default = "default_true")]
    pub use_golden_ratio: bool,
    /// Sine easing when true, linear otherwise
    #[serde(default = "default_true")]
    pub easing: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_speed() -> f32 {
    0.5
}

fn default_range() -> f32 {
    100.0
}

impl Default for ParallaxSection {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            range: default_range(),
            offset: 0.0,
            horizontal: false,
            use_golden_ratio: true,
            easing: true,
            enabled: true,
        }
    }
}

// =============================================================================
// [accessibility]
// =============================================================================

#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AccessibilitySection {
    /// Simulate a user who asked for reduced motion
    #[serde(default)]
    pub reduced_motion: bool,
}

impl MotifConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the configuration for a run
    ///
    /// An explicit path must exist. Without one, `motif.toml` in `dir` is
    /// used when present and the defaults otherwise.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file {} does not exist", path.display());
            }
            return Self::load(path);
        }

        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            tracing::debug!("Using config at {}", path.display());
            Self::load(&path)
        } else {
            tracing::debug!("No {} in {}, using defaults", CONFIG_FILE, dir.display());
            Ok(Self::default())
        }
    }

    /// Path `motif init` writes to
    pub fn default_path(explicit: Option<&Path>, dir: &Path) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dir.join(CONFIG_FILE))
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Stagger configuration for `count` items
    pub fn stagger_config(&self, count: usize) -> StaggerConfig {
        let weighting = if self.stagger.fibonacci {
            Weighting::Fibonacci
        } else {
            Weighting::Linear
        };

        let mut config = StaggerConfig::new(count, self.stagger.base_delay)
            .weighting(weighting)
            .reduced_motion(self.accessibility.reduced_motion);
        if let Some(total) = self.stagger.total_duration {
            config = config.total_duration(total);
        }
        config
    }

    /// Sequence configuration combining `[sequence]` and `[stagger]`
    pub fn sequence_config(&self) -> SequenceConfig {
        let stagger = &self.stagger;
        let mut config = SequenceConfig::new(self.sequence.steps)
            .base_delay(stagger.base_delay)
            .initial_delay(self.sequence.initial_delay)
            .direction(self.sequence.direction.into())
            .looping(self.sequence.looping);
        if stagger.fibonacci {
            config = config.fibonacci();
        }
        if let Some(total) = stagger.total_duration {
            config = config.total_duration(total);
        }
        config
    }

    pub fn parallax_config(&self) -> ParallaxConfig {
        let section = &self.parallax;
        let mut config = ParallaxConfig::new()
            .speed(section.speed)
            .range(section.range)
            .offset(section.offset)
            .golden_ratio(section.use_golden_ratio)
            .enabled(section.enabled)
            .easing(if section.easing {
                Easing::SineInOut
            } else {
                Easing::Linear
            });
        if section.horizontal {
            config = config.horizontal();
        }
        config
    }
}
