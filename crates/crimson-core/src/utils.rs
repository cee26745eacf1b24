//! Small formatting helpers shared by adapters.

/// Render a MiB quantity as `"x.xx MiB"` or, from 1024 MiB up, `"x.xx GiB"`.
pub fn format_mib(mib: f64) -> String {
    if mib >= 1024.0 {
        format!("{:.2} GiB", mib / 1024.0)
    } else {
        format!("{:.2} MiB", mib.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_mib_below_a_gib() {
        assert_eq!(format_mib(512.0), "512.00 MiB");
        assert_eq!(format_mib(0.0), "0.00 MiB");
    }

    #[test]
    fn switches_to_gib() {
        assert_eq!(format_mib(1024.0), "1.00 GiB");
        assert_eq!(format_mib(3584.0), "3.50 GiB");
    }
}
