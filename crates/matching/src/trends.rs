//! Industry demand coefficients.
//!
//! Static table refreshed by hand from labour-market reports. Lookups are
//! case-insensitive; unknown industries get [`DEFAULT_TREND`].

pub const DEFAULT_TREND: f64 = 0.4;

const INDUSTRY_TRENDS: &[(&str, f64)] = &[
    ("Technology", 0.85),
    ("Healthcare", 0.80),
    ("Agriculture", 0.75),
    ("Renewable Energy", 0.75),
    ("Logistics", 0.70),
    ("Finance", 0.70),
    ("Telecommunications", 0.68),
    ("Construction", 0.65),
    ("Education", 0.60),
    ("Oil and Gas", 0.55),
    ("Manufacturing", 0.55),
    ("Creative Arts", 0.55),
    ("Retail", 0.50),
    ("Hospitality", 0.45),
    ("Public Sector", 0.42),
];

/// Trend score for an industry.
pub fn trend_for(industry: &str) -> f64 {
    let needle = industry.trim();
    INDUSTRY_TRENDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(needle))
        .map(|(_, score)| *score)
        .unwrap_or(DEFAULT_TREND)
}

/// All known industries, in table order.
pub fn known_industries() -> impl Iterator<Item = &'static str> {
    INDUSTRY_TRENDS.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technology_is_point_eight_five() {
        assert_eq!(trend_for("Technology"), 0.85);
        assert_eq!(trend_for("  technology "), 0.85);
    }

    #[test]
    fn unknown_industry_falls_back() {
        assert_eq!(trend_for("Underwater Basket Weaving"), DEFAULT_TREND);
        assert_eq!(trend_for(""), DEFAULT_TREND);
    }

    #[test]
    fn table_values_are_in_unit_range() {
        for name in known_industries() {
            let t = trend_for(name);
            assert!((0.0..=1.0).contains(&t), "{name} -> {t}");
        }
    }
}
