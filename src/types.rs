use geo::Point;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PharmacyRecord {
    pub name: String,
    pub address: String,
    pub phone: String,
    // Raw comma-separated category text, None when the cell is empty
    pub collected_items: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PharmacyRecord {
    /// Map position (x = longitude, y = latitude) when both coordinates are present and finite.
    pub fn location(&self) -> Option<Point<f64>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some(Point::new(lon, lat)),
            _ => None,
        }
    }

    pub fn items_text(&self) -> &str {
        self.collected_items.as_deref().unwrap_or("")
    }
}

/// Outcome of applying the selection limit to a user's checked categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub categories: Vec<String>,
    pub warning: Option<String>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
