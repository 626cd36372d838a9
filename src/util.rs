/// Arithmetic mean, `None` for an empty slice
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// `mm:ss` for the countdown and timer displays
pub fn format_clock(secs: f64) -> String {
    let total = secs.max(0.0).ceil() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
