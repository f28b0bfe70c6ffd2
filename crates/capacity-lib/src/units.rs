//! Capacity unit conversion helpers
//!
//! The engine works in GiB end to end; conversions to larger binary units
//! happen only when values are rendered for people.

/// GiB per TiB
pub const GIB_PER_TIB: f64 = 1024.0;

/// GiB per PiB
pub const GIB_PER_PIB: f64 = 1024.0 * 1024.0;

pub fn gib_to_tib(gib: f64) -> f64 {
    gib / GIB_PER_TIB
}

pub fn gib_to_pib(gib: f64) -> f64 {
    gib / GIB_PER_PIB
}

/// Utilization percentage of `used` over `total`; 0 when `total` is not positive
pub fn utilization_pct(used: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    used * 100.0 / total
}

/// Format a GiB quantity with the largest binary unit that keeps it >= 1
pub fn format_gib(gib: f64) -> String {
    let magnitude = gib.abs();
    if magnitude >= GIB_PER_PIB {
        format!("{:.2} PiB", gib_to_pib(gib))
    } else if magnitude >= GIB_PER_TIB {
        format!("{:.2} TiB", gib_to_tib(gib))
    } else {
        format!("{:.2} GiB", gib)
    }
}
