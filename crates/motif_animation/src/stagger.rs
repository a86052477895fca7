//! Stagger delay calculator
//!
//! Turns an item count and timing budget into one delay per item, either
//! evenly spaced or weighted by the Fibonacci sequence.
//!
//! # Example
//!
//! ```rust
//! use motif_animation::{compute_delays, StaggerConfig};
//!
//! let delays = compute_delays(&StaggerConfig::new(5, 0.1).fibonacci()).unwrap();
//! assert_eq!(delays.len(), 5);
//! assert!((delays.total() - 0.5).abs() < 1e-9);
//! ```

use motif_core::{ensure_seconds, fibonacci_range, golden_compress, Result};

/// Delay used for every item under reduced motion (seconds)
pub const MIN_DELAY: f64 = 0.05;

/// First Fibonacci index used for weights; skips the two unit terms
const FIRST_WEIGHT_INDEX: i64 = 2;

/// How delays are distributed across items
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Weighting {
    /// Every item gets the same delay
    #[default]
    Linear,
    /// Delays grow with Fibonacci weight
    Fibonacci,
}

/// Configuration for a stagger computation
#[derive(Clone, Debug, PartialEq)]
pub struct StaggerConfig {
    /// Number of items to stagger
    pub item_count: usize,
    /// Base delay between items (seconds)
    pub base_delay: f64,
    /// Optional budget for the whole stagger (seconds)
    pub total_duration: Option<f64>,
    /// Distribution of delays
    pub weighting: Weighting,
    /// Collapse every delay to [`MIN_DELAY`]
    pub reduced_motion: bool,
}

impl StaggerConfig {
    /// Create a linear stagger of `item_count` items
    pub fn new(item_count: usize, base_delay: f64) -> Self {
        Self {
            item_count,
            base_delay,
            total_duration: None,
            weighting: Weighting::Linear,
            reduced_motion: false,
        }
    }

    /// Fit the stagger into a total duration
    pub fn total_duration(mut self, seconds: f64) -> Self {
        self.total_duration = Some(seconds);
        self
    }

    /// Weight delays by the Fibonacci sequence
    pub fn fibonacci(mut self) -> Self {
        self.weighting = Weighting::Fibonacci;
        self
    }

    /// Set the distribution of delays
    pub fn weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    /// Apply the reduced-motion clamp
    pub fn reduced_motion(mut self, reduced: bool) -> Self {
        self.reduced_motion = reduced;
        self
    }

    fn validate(&self) -> Result<()> {
        ensure_seconds("base_delay", self.base_delay)?;
        if let Some(total) = self.total_duration {
            ensure_seconds("total_duration", total)?;
        }
        Ok(())
    }
}

impl Default for StaggerConfig {
    fn default() -> Self {
        Self::new(0, 0.1)
    }
}

/// Per-item delays in seconds, produced by [`compute_delays`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DelayTable {
    delays: Vec<f64>,
}

impl DelayTable {
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.delays.get(index).copied()
    }

    /// Delay at `index`, or `default` when the table has no such entry
    pub fn get_or(&self, index: usize, default: f64) -> f64 {
        self.get(index).unwrap_or(default)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.delays
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.delays.iter()
    }

    /// Sum of every delay
    pub fn total(&self) -> f64 {
        self.delays.iter().sum()
    }

    /// Start offset of each item: `initial` plus the delays of all prior items
    pub fn cumulative(&self, initial: f64) -> Vec<f64> {
        self.delays
            .iter()
            .scan(initial, |acc, delay| {
                let start = *acc;
                *acc += delay;
                Some(start)
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a DelayTable {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.delays.iter()
    }
}

/// Compute the delay table for a stagger configuration
///
/// Fails only when a delay or duration is negative or not finite.
pub fn compute_delays(config: &StaggerConfig) -> Result<DelayTable> {
    config.validate()?;

    let count = config.item_count;
    if count == 0 {
        return Ok(DelayTable::default());
    }

    if config.reduced_motion {
        return Ok(DelayTable {
            delays: vec![MIN_DELAY; count],
        });
    }

    let delays = match config.weighting {
        // Uniform on purpose: linear mode never scales by index
        Weighting::Linear => {
            let delay = match config.total_duration {
                Some(total) => total / count as f64,
                None => config.base_delay,
            };
            vec![delay; count]
        }
        Weighting::Fibonacci => {
            let weights = fibonacci_range(FIRST_WEIGHT_INDEX, FIRST_WEIGHT_INDEX + count as i64);
            let sum = weights.iter().map(|&w| w as f64).sum::<f64>().max(1.0);
            let scale = match config.total_duration {
                Some(total) => golden_compress(total),
                None => config.base_delay * count as f64,
            };
            weights
                .iter()
                .map(|&weight| weight as f64 / sum * scale)
                .collect()
        }
    };

    tracing::trace!(
        "compute_delays: {} item(s), {:?}, total {:.4}s",
        count,
        config.weighting,
        delays.iter().sum::<f64>()
    );

    Ok(DelayTable { delays })
}
