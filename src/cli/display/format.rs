//! Time, size, and list formatters for CLI output.

use chrono::{DateTime, Utc};

/// `2024-05-01 12:00:00 UTC`, or `-` when absent.
pub fn timestamp(dt: Option<&DateTime<Utc>>) -> String {
    dt.map_or_else(
        || "-".to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

/// Byte count in binary units: `512 B`, `1.5 KiB`, `3.0 MiB`.
pub fn file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Comma-separated values, or `-` for none.
pub fn joined<T: ToString>(values: &[T]) -> String {
    if values.is_empty() {
        return "-".to_string();
    }
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a count with its label: "1 job", "3 jobs".
pub fn count_label(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_size() {
        assert_eq!(file_size(512), "512 B");
        assert_eq!(file_size(1536), "1.5 KiB");
        assert_eq!(file_size(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_joined() {
        assert_eq!(joined::<String>(&[]), "-");
        assert_eq!(joined(&["a", "b"]), "a, b");
        assert_eq!(count_label(1, "job", "jobs"), "1 job");
    }
}
