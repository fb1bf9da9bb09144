//! Pure computations over domain records: task scoring, alignment points
//! and journal statistics. Nothing here touches storage.

pub mod alignment;
pub mod journal_insights;
pub mod scoring;

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// `part / whole * 100`, or 0 for an empty whole, rounded to `decimals`.
pub fn percentage(part: u64, whole: u64, decimals: i32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, decimals)
}

#[cfg(test)]
mod tests {
    use super::{percentage, round_to};

    #[test]
    fn percentage_handles_empty_whole() {
        assert_eq!(percentage(3, 0, 2), 0.0);
        assert_eq!(percentage(1, 3, 2), 33.33);
        assert_eq!(percentage(2, 3, 1), 66.7);
    }

    #[test]
    fn round_to_one_decimal() {
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(0.05, 1), 0.1);
    }
}
