//! Easing curves

use std::f32::consts::PI;

/// Remaps linear progress onto a curve
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Output equals input
    Linear,
    /// Half a sine period centred on 0.5: slow at both ends
    #[default]
    SineInOut,
}

impl Easing {
    /// Apply the curve to `t`, clamped to 0.0..=1.0
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::SineInOut => ((t - 0.5) * PI).sin() * 0.5 + 0.5,
        }
    }
}
