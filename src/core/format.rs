fn plural(count: u32, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Human readable duration, e.g. `"2 years and 1 month"`.
pub fn years_and_months(months: u32) -> String {
    let years = months / 12;
    let rest = months % 12;
    if years == 0 {
        return plural(rest, "month");
    }
    format!("{} and {}", plural(years, "year"), plural(rest, "month"))
}
