use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Declaration order matches the Postgres enum, so both sort the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "tour_difficulty", rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "difficult" => Ok(Difficulty::Difficult),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub duration: i32,       // days
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub price: f64,
    pub summary: Option<String>,
    pub secret_tour: bool, // hidden from every read
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTour {
    pub name: String,
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub price: f64,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub secret_tour: bool,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourPatch {
    pub name: Option<String>,
    pub duration: Option<i32>,
    pub max_group_size: Option<i32>,
    pub difficulty: Option<Difficulty>,
    pub price: Option<f64>,
    pub summary: Option<String>,
    pub secret_tour: Option<bool>,
}

fn check_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if !(10..=40).contains(&len) {
        return Err("A tour name must have between 10 and 40 characters".into());
    }
    Ok(())
}

fn check_positive(value: f64, what: &str) -> Result<(), String> {
    if value <= 0.0 {
        return Err(format!("A tour must have a positive {what}"));
    }
    Ok(())
}

impl NewTour {
    pub fn validate(&self) -> Result<(), String> {
        check_name(&self.name)?;
        check_positive(self.duration as f64, "duration")?;
        check_positive(self.max_group_size as f64, "group size")?;
        check_positive(self.price, "price")
    }
}

impl TourPatch {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(d) = self.duration {
            check_positive(d as f64, "duration")?;
        }
        if let Some(g) = self.max_group_size {
            check_positive(g as f64, "group size")?;
        }
        if let Some(p) = self.price {
            check_positive(p, "price")?;
        }
        Ok(())
    }

    pub fn apply(self, tour: &mut Tour) {
        if let Some(v) = self.name {
            tour.name = v;
        }
        if let Some(v) = self.duration {
            tour.duration = v;
        }
        if let Some(v) = self.max_group_size {
            tour.max_group_size = v;
        }
        if let Some(v) = self.difficulty {
            tour.difficulty = v;
        }
        if let Some(v) = self.price {
            tour.price = v;
        }
        if self.summary.is_some() {
            tour.summary = self.summary;
        }
        if let Some(v) = self.secret_tour {
            tour.secret_tour = v;
        }
    }
}
