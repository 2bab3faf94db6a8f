//! Listing options for the tour catalogue: numeric filters, ordering, field
//! projection and page-based paging, parsed from the query string.
//!
//! Filters use the `field[op]=value` form (`price[lte]=500`, `duration=5`),
//! `sort` takes a comma list with an optional `-` prefix for descending order,
//! and `fields` limits the keys of each returned tour (`id` is always kept).

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use super::repo_types::{Difficulty, Tour};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourField {
    Name,
    Duration,
    MaxGroupSize,
    Difficulty,
    RatingsAverage,
    RatingsQuantity,
    Price,
    Summary,
    CreatedAt,
}

impl TourField {
    const ALL: [TourField; 9] = [
        TourField::Name,
        TourField::Duration,
        TourField::MaxGroupSize,
        TourField::Difficulty,
        TourField::RatingsAverage,
        TourField::RatingsQuantity,
        TourField::Price,
        TourField::Summary,
        TourField::CreatedAt,
    ];

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Name on the wire.
    pub fn key(self) -> &'static str {
        match self {
            TourField::Name => "name",
            TourField::Duration => "duration",
            TourField::MaxGroupSize => "maxGroupSize",
            TourField::Difficulty => "difficulty",
            TourField::RatingsAverage => "ratingsAverage",
            TourField::RatingsQuantity => "ratingsQuantity",
            TourField::Price => "price",
            TourField::Summary => "summary",
            TourField::CreatedAt => "createdAt",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            TourField::Name => "name",
            TourField::Duration => "duration",
            TourField::MaxGroupSize => "max_group_size",
            TourField::Difficulty => "difficulty",
            TourField::RatingsAverage => "ratings_average",
            TourField::RatingsQuantity => "ratings_quantity",
            TourField::Price => "price",
            TourField::Summary => "summary",
            TourField::CreatedAt => "created_at",
        }
    }

    fn sortable(self) -> bool {
        self != TourField::Summary
    }

    fn filterable(self) -> bool {
        matches!(
            self,
            TourField::Duration
                | TourField::MaxGroupSize
                | TourField::RatingsAverage
                | TourField::RatingsQuantity
                | TourField::Price
        )
    }

    fn numeric(self, tour: &Tour) -> Option<f64> {
        match self {
            TourField::Duration => Some(tour.duration as f64),
            TourField::MaxGroupSize => Some(tour.max_group_size as f64),
            TourField::RatingsAverage => Some(tour.ratings_average),
            TourField::RatingsQuantity => Some(tour.ratings_quantity as f64),
            TourField::Price => Some(tour.price),
            _ => None,
        }
    }

    fn compare(self, a: &Tour, b: &Tour) -> Ordering {
        match self {
            TourField::Name => a.name.cmp(&b.name),
            TourField::Duration => a.duration.cmp(&b.duration),
            TourField::MaxGroupSize => a.max_group_size.cmp(&b.max_group_size),
            TourField::Difficulty => a.difficulty.cmp(&b.difficulty),
            TourField::RatingsAverage => a.ratings_average.total_cmp(&b.ratings_average),
            TourField::RatingsQuantity => a.ratings_quantity.cmp(&b.ratings_quantity),
            TourField::Price => a.price.total_cmp(&b.price),
            TourField::Summary => a.summary.cmp(&b.summary),
            TourField::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Cmp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "gt" => Some(Cmp::Gt),
            "gte" => Some(Cmp::Gte),
            "lt" => Some(Cmp::Lt),
            "lte" => Some(Cmp::Lte),
            _ => None,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Cmp::Eq => " = ",
            Cmp::Gt => " > ",
            Cmp::Gte => " >= ",
            Cmp::Lt => " < ",
            Cmp::Lte => " <= ",
        }
    }

    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Cmp::Eq => lhs == rhs,
            Cmp::Gt => lhs > rhs,
            Cmp::Gte => lhs >= rhs,
            Cmp::Lt => lhs < rhs,
            Cmp::Lte => lhs <= rhs,
        }
    }
}

/// One numeric filter, e.g. `price <= 500`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub field: TourField,
    pub cmp: Cmp,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: TourField,
    pub descending: bool,
}

/// What the store needs to answer a list request. Secret tours never match.
#[derive(Debug, Clone, PartialEq)]
pub struct TourListQuery {
    pub bounds: Vec<Bound>,
    pub difficulty: Option<Difficulty>,
    pub sort: Vec<SortKey>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for TourListQuery {
    fn default() -> Self {
        Self {
            bounds: Vec::new(),
            difficulty: None,
            sort: vec![SortKey {
                field: TourField::CreatedAt,
                descending: true,
            }],
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl TourListQuery {
    pub fn matches(&self, tour: &Tour) -> bool {
        if tour.secret_tour {
            return false;
        }
        if self.difficulty.is_some_and(|d| d != tour.difficulty) {
            return false;
        }
        self.bounds.iter().all(|b| {
            b.field
                .numeric(tour)
                .is_some_and(|v| b.cmp.holds(v, b.value))
        })
    }

    /// Sort keys in order, then id so pages are stable.
    pub fn compare(&self, a: &Tour, b: &Tour) -> Ordering {
        for key in &self.sort {
            let ord = key.field.compare(a, b);
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.id.cmp(&b.id)
    }
}

/// Parsed list request: the store query plus an optional projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    pub query: TourListQuery,
    pub fields: Option<Vec<TourField>>,
}

impl ListOptions {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let mut query = TourListQuery::default();
        let mut fields = None;
        let mut page: i64 = 1;

        for (key, value) in params {
            let value = value.trim();
            match key.as_str() {
                "page" => page = parse_int(key, value)?.max(1),
                "limit" => query.limit = parse_int(key, value)?.clamp(1, MAX_LIMIT),
                "sort" => query.sort = parse_sort(value)?,
                "fields" => fields = Some(parse_fields(value)?),
                "difficulty" => {
                    query.difficulty = Some(
                        value
                            .parse()
                            .map_err(|_| format!("Invalid difficulty: {value}"))?,
                    )
                }
                _ => query.bounds.push(parse_bound(key, value)?),
            }
        }

        query.offset = (page - 1).saturating_mul(query.limit);
        Ok(Self { query, fields })
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64, String> {
    value
        .parse()
        .map_err(|_| format!("{key} must be a whole number"))
}

fn parse_sort(value: &str) -> Result<Vec<SortKey>, String> {
    let mut keys = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (descending, name) = match part.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, part),
        };
        let field = TourField::parse(name)
            .filter(|f| f.sortable())
            .ok_or_else(|| format!("Cannot sort by {name}"))?;
        keys.push(SortKey { field, descending });
    }
    if keys.is_empty() {
        return Ok(TourListQuery::default().sort);
    }
    Ok(keys)
}

fn parse_fields(value: &str) -> Result<Vec<TourField>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != "id")
        .map(|p| TourField::parse(p).ok_or_else(|| format!("Unknown field: {p}")))
        .collect()
}

fn parse_bound(key: &str, value: &str) -> Result<Bound, String> {
    let (name, cmp) = match key.split_once('[') {
        Some((name, rest)) => {
            let op = rest
                .strip_suffix(']')
                .ok_or_else(|| format!("Malformed filter: {key}"))?;
            let cmp = Cmp::parse(op).ok_or_else(|| format!("Unknown filter operator: {op}"))?;
            (name, cmp)
        }
        None => (key, Cmp::Eq),
    };
    let field = TourField::parse(name)
        .filter(|f| f.filterable())
        .ok_or_else(|| format!("Unknown query parameter: {key}"))?;
    let value = value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("{key} must be a number"))?;
    Ok(Bound { field, cmp, value })
}

/// Serializes `tour`, keeping only `id` and the requested keys when a projection is set.
pub fn project(tour: &Tour, fields: Option<&[TourField]>) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(tour)?;
    if let (Some(fields), Value::Object(map)) = (fields, &mut value) {
        map.retain(|k, _| k == "id" || fields.iter().any(|f| f.key() == k));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn tour(name: &str, price: f64, duration: i32, difficulty: Difficulty) -> Tour {
        Tour {
            id: Uuid::new_v4(),
            name: name.into(),
            duration,
            max_group_size: 10,
            difficulty,
            ratings_average: 4.5,
            ratings_quantity: 0,
            price,
            summary: None,
            secret_tour: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn defaults() {
        let opts = ListOptions::from_params(&HashMap::new()).unwrap();
        assert_eq!(opts.query, TourListQuery::default());
        assert_eq!(opts.query.limit, 20);
        assert_eq!(opts.query.offset, 0);
        assert_eq!(
            opts.query.sort,
            vec![SortKey {
                field: TourField::CreatedAt,
                descending: true
            }]
        );
        assert!(opts.fields.is_none());
    }

    #[test]
    fn page_and_limit_become_offset() {
        let opts = ListOptions::from_params(&params(&[("page", "3"), ("limit", "10")])).unwrap();
        assert_eq!((opts.query.limit, opts.query.offset), (10, 20));

        let opts = ListOptions::from_params(&params(&[("page", "0"), ("limit", "5000")])).unwrap();
        assert_eq!((opts.query.limit, opts.query.offset), (MAX_LIMIT, 0));

        assert!(ListOptions::from_params(&params(&[("page", "two")])).is_err());
    }

    #[test]
    fn filters_parse() {
        let opts = ListOptions::from_params(&params(&[
            ("price[lte]", "500"),
            ("duration", "5"),
            ("difficulty", "easy"),
        ]))
        .unwrap();
        let mut bounds = opts.query.bounds.clone();
        bounds.sort_by_key(|b| b.field.key());
        assert_eq!(
            bounds,
            vec![
                Bound {
                    field: TourField::Duration,
                    cmp: Cmp::Eq,
                    value: 5.0
                },
                Bound {
                    field: TourField::Price,
                    cmp: Cmp::Lte,
                    value: 500.0
                },
            ]
        );
        assert_eq!(opts.query.difficulty, Some(Difficulty::Easy));
    }

    #[test]
    fn bad_params_are_rejected() {
        for bad in [
            ("price[between]", "1"),
            ("price[gte", "1"),
            ("price", "cheap"),
            ("name", "x"),
            ("colour", "red"),
            ("difficulty", "extreme"),
            ("sort", "summary"),
            ("sort", "-nope"),
            ("fields", "name,secret"),
        ] {
            assert!(
                ListOptions::from_params(&params(&[bad])).is_err(),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn sort_keys_keep_order() {
        let opts = ListOptions::from_params(&params(&[("sort", "-ratingsAverage, price")])).unwrap();
        assert_eq!(
            opts.query.sort,
            vec![
                SortKey {
                    field: TourField::RatingsAverage,
                    descending: true
                },
                SortKey {
                    field: TourField::Price,
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn matching_hides_secret_tours() {
        let q = ListOptions::from_params(&params(&[("price[gte]", "300")]))
            .unwrap()
            .query;
        let mut t = tour("The Forest Hiker", 397.0, 5, Difficulty::Easy);
        assert!(q.matches(&t));
        t.price = 299.0;
        assert!(!q.matches(&t));
        t.price = 397.0;
        t.secret_tour = true;
        assert!(!q.matches(&t));
    }

    #[test]
    fn compare_applies_keys_in_order() {
        let q = ListOptions::from_params(&params(&[("sort", "difficulty,-price")]))
            .unwrap()
            .query;
        let mut tours = vec![
            tour("The Snow Adventurer", 997.0, 4, Difficulty::Difficult),
            tour("The Sea Explorer", 497.0, 7, Difficulty::Medium),
            tour("The Forest Hiker", 397.0, 5, Difficulty::Easy),
            tour("The City Wanderer", 1197.0, 9, Difficulty::Easy),
        ];
        tours.sort_by(|a, b| q.compare(a, b));
        let names: Vec<&str> = tours.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "The City Wanderer",
                "The Forest Hiker",
                "The Sea Explorer",
                "The Snow Adventurer"
            ]
        );
    }

    #[test]
    fn projection_keeps_id() {
        let t = tour("The Forest Hiker", 397.0, 5, Difficulty::Easy);
        let fields = [TourField::Name, TourField::Price];
        let v = project(&t, Some(&fields)).unwrap();
        let obj = v.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, ["id", "name", "price"]);

        let full = project(&t, None).unwrap();
        assert!(full.get("duration").is_some());
    }
}
