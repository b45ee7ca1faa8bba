//! Human-readable artifact sizes.

const UNITS: [&str; 7] = ["B", "K", "M", "G", "T", "P", "E"];

/// Format a byte count: `"500 B"`, `"2.0 KB"`, `"1.5 MB"`.
///
/// Below 1024 the exact count is shown. Above, the value is scaled by the
/// largest power of 1024 not exceeding it and shown with one decimal.
pub fn format_file_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut exponent = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && exponent < UNITS.len() - 1 {
        scaled /= 1024;
        exponent += 1;
    }

    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    format!("{value:.1} {}B", UNITS[exponent])
}
