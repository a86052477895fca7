//! Golden-ratio constants
//!
//! Durations are compressed by Φ⁻¹ and speeds expanded by Φ across the engine.

/// The golden ratio Φ
pub const PHI: f64 = 1.618_033_988_749_895;

/// The inverse golden ratio Φ⁻¹, equal to Φ − 1
pub const PHI_INVERSE: f64 = PHI - 1.0;

/// Scale a value down by Φ⁻¹
pub fn golden_compress(value: f64) -> f64 {
    value * PHI_INVERSE
}

/// Scale a value up by Φ
pub fn golden_expand(value: f64) -> f64 {
    value * PHI
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phi_identities() {
        assert!((PHI * PHI_INVERSE - 1.0).abs() < 1e-12);
        assert!((PHI * PHI - (PHI + 1.0)).abs() < 1e-12);
        assert!((PHI_INVERSE - 0.618_033_988_749_895).abs() < 1e-12);
    }

    #[test]
    fn test_compress_expand_inverse() {
        let value = 2.5;
        assert!((golden_expand(golden_compress(value)) - value).abs() < 1e-12);
        assert!(golden_compress(value) < value);
        assert!(golden_expand(value) > value);
    }
}
