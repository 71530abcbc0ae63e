use serde::{Deserialize, Serialize};

/// Postal-style location shared by seekers and jobs.
///
/// `state` and `city` are free text from forms and datasets; comparisons are
/// case-insensitive and ignore surrounding whitespace. A blank `city` means
/// the location is incomplete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub state: String,
    pub city: String,
    #[serde(default)]
    pub lga: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Location {
    pub fn new(state: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            city: city.into(),
            ..Self::default()
        }
    }

    pub fn with_lga(mut self, lga: impl Into<String>) -> Self {
        self.lga = lga.into();
        self
    }

    pub fn with_coordinates(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    pub fn has_city(&self) -> bool {
        !self.city.trim().is_empty()
    }

    pub fn same_state(&self, other: &Location) -> bool {
        eq_folded(&self.state, &other.state)
    }

    pub fn same_city(&self, other: &Location) -> bool {
        eq_folded(&self.city, &other.city)
    }
}

fn eq_folded(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
