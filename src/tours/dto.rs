use serde::Serialize;
use serde_json::Value;

use super::repo_types::Tour;

/// Query overrides behind `/tours/top-5-cheap`: best rated first, then cheapest.
pub const TOP_CHEAP_ALIAS: [(&str, &str); 3] = [
    ("limit", "5"),
    ("sort", "-ratingsAverage,price"),
    ("fields", "name,price,ratingsAverage,summary,difficulty"),
];

#[derive(Debug, Serialize)]
pub struct ToursData {
    pub tours: Vec<Value>, // projected when `fields` is set
}

#[derive(Debug, Serialize)]
pub struct TourListResponse {
    pub status: &'static str,
    pub results: usize,
    pub data: ToursData,
}

#[derive(Debug, Serialize)]
pub struct TourData {
    pub tour: Tour,
}

#[derive(Debug, Serialize)]
pub struct TourResponse {
    pub status: &'static str,
    pub data: TourData,
}
