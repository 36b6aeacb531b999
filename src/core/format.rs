pub const DEFAULT_CURRENCY_PREFIX: &str = "R$";

pub fn format_currency(value: f64, prefix: &str) -> String {
    format!("{} {:.2}", prefix, value)
}

/// Always signed: "+1.25%", "-0.40%", "+0.00%".
pub fn format_percent(value: f64) -> String {
    // avoid "-0.00%"
    let value = if value.abs() < 0.005 { 0.0 } else { value };
    format!("{:+.2}%", value)
}

pub fn format_distance(km: f64) -> String {
    format!("{:.1} km", km)
}

pub fn format_minutes(minutes: u32) -> String {
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{}h{:02}", minutes / 60, minutes % 60)
    }
}
