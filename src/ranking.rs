use std::cmp::Ordering;

/// Descending order for scores. NaN sorts last instead of poisoning the sort.
pub fn cmp_score_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

pub fn format_price(now_cost: u16) -> String {
    format!("£{:.1}m", f64::from(now_cost) / 10.0)
}

/// `part / whole` as a percentage in [0, 100]; an empty sample yields 0.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64) / (whole as f64) * 100.0).clamp(0.0, 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn truncate<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_scores_sort_last() {
        let mut scores = vec![1.0, f64::NAN, 3.0, 2.0];
        scores.sort_by(|a, b| cmp_score_desc(*a, *b));
        assert_eq!(&scores[..3], &[3.0, 2.0, 1.0]);
        assert!(scores[3].is_nan());
    }

    #[test]
    fn percent_handles_empty_sample() {
        assert_eq!(percent(3, 0), 0.0);
        assert_eq!(percent(3, 3), 100.0);
        assert!((percent(1, 3) - 33.333).abs() < 0.01);
    }

    #[test]
    fn prices_render_in_millions() {
        assert_eq!(format_price(75), "£7.5m");
        assert_eq!(format_price(130), "£13.0m");
    }
}
