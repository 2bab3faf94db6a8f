use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::query::TourListQuery;
use super::repo_types::{NewTour, Tour, TourPatch};
use crate::error::StoreError;

const TOUR_COLUMNS: &str = "id, name, duration, max_group_size, difficulty, ratings_average, \
     ratings_quantity, price, summary, secret_tour, created_at";

/// Tour persistence. Secret tours are invisible to every lookup, update and delete.
#[async_trait]
pub trait TourStore: Send + Sync {
    async fn list(&self, query: &TourListQuery) -> Result<Vec<Tour>, StoreError>;
    async fn get(&self, id: Uuid) -> Result<Option<Tour>, StoreError>;
    async fn create(&self, new_tour: NewTour) -> Result<Tour, StoreError>;
    async fn update(&self, id: Uuid, patch: TourPatch) -> Result<Option<Tour>, StoreError>;
    /// Returns false when no visible tour had that id.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgTourStore {
    db: PgPool,
}

impl PgTourStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TourStore for PgTourStore {
    async fn list(&self, query: &TourListQuery) -> Result<Vec<Tour>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(TOUR_COLUMNS)
            .push(" FROM tours WHERE secret_tour = FALSE");
        if let Some(difficulty) = query.difficulty {
            qb.push(" AND difficulty = ").push_bind(difficulty);
        }
        // column names come from TourField, never from the request
        for bound in &query.bounds {
            qb.push(" AND ")
                .push(bound.field.column())
                .push("::float8")
                .push(bound.cmp.sql())
                .push_bind(bound.value);
        }
        qb.push(" ORDER BY ");
        for key in &query.sort {
            qb.push(key.field.column())
                .push(if key.descending { " DESC, " } else { " ASC, " });
        }
        qb.push("id ASC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let rows = qb.build_query_as::<Tour>().fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Tour>, StoreError> {
        let sql = format!("SELECT {TOUR_COLUMNS} FROM tours WHERE id = $1 AND secret_tour = FALSE");
        let tour = sqlx::query_as::<_, Tour>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(tour)
    }

    async fn create(&self, new_tour: NewTour) -> Result<Tour, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO tours (id, name, duration, max_group_size, difficulty, price, summary,
                               secret_tour)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TOUR_COLUMNS}
            "#
        );
        let tour = sqlx::query_as::<_, Tour>(&sql)
            .bind(Uuid::new_v4())
            .bind(new_tour.name.trim())
            .bind(new_tour.duration)
            .bind(new_tour.max_group_size)
            .bind(new_tour.difficulty)
            .bind(new_tour.price)
            .bind(&new_tour.summary)
            .bind(new_tour.secret_tour)
            .fetch_one(&self.db)
            .await?;
        Ok(tour)
    }

    async fn update(&self, id: Uuid, patch: TourPatch) -> Result<Option<Tour>, StoreError> {
        let sql = format!(
            r#"
            UPDATE tours
               SET name = COALESCE($2, name),
                   duration = COALESCE($3, duration),
                   max_group_size = COALESCE($4, max_group_size),
                   difficulty = COALESCE($5, difficulty),
                   price = COALESCE($6, price),
                   summary = COALESCE($7, summary),
                   secret_tour = COALESCE($8, secret_tour)
             WHERE id = $1 AND secret_tour = FALSE
            RETURNING {TOUR_COLUMNS}
            "#
        );
        let tour = sqlx::query_as::<_, Tour>(&sql)
            .bind(id)
            .bind(patch.name.as_deref().map(str::trim))
            .bind(patch.duration)
            .bind(patch.max_group_size)
            .bind(patch.difficulty)
            .bind(patch.price)
            .bind(&patch.summary)
            .bind(patch.secret_tour)
            .fetch_optional(&self.db)
            .await?;
        Ok(tour)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM tours WHERE id = $1 AND secret_tour = FALSE")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;

    use time::OffsetDateTime;
    use tokio::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct MemoryTourStore {
        tours: RwLock<HashMap<Uuid, Tour>>,
    }

    #[async_trait]
    impl TourStore for MemoryTourStore {
        async fn list(&self, query: &TourListQuery) -> Result<Vec<Tour>, StoreError> {
            let tours = self.tours.read().await;
            let mut hits: Vec<Tour> = tours
                .values()
                .filter(|t| query.matches(t))
                .cloned()
                .collect();
            hits.sort_by(|a, b| query.compare(a, b));
            Ok(hits
                .into_iter()
                .skip(query.offset.max(0) as usize)
                .take(query.limit.max(0) as usize)
                .collect())
        }

        async fn get(&self, id: Uuid) -> Result<Option<Tour>, StoreError> {
            let tours = self.tours.read().await;
            Ok(tours.get(&id).filter(|t| !t.secret_tour).cloned())
        }

        async fn create(&self, new_tour: NewTour) -> Result<Tour, StoreError> {
            let mut tours = self.tours.write().await;
            let name = new_tour.name.trim().to_string();
            if tours.values().any(|t| t.name == name) {
                return Err(StoreError::Duplicate("A tour with that name already exists"));
            }
            let tour = Tour {
                id: Uuid::new_v4(),
                name,
                duration: new_tour.duration,
                max_group_size: new_tour.max_group_size,
                difficulty: new_tour.difficulty,
                ratings_average: 4.5,
                ratings_quantity: 0,
                price: new_tour.price,
                summary: new_tour.summary,
                secret_tour: new_tour.secret_tour,
                created_at: OffsetDateTime::now_utc(),
            };
            tours.insert(tour.id, tour.clone());
            Ok(tour)
        }

        async fn update(&self, id: Uuid, patch: TourPatch) -> Result<Option<Tour>, StoreError> {
            let mut tours = self.tours.write().await;
            Ok(tours
                .get_mut(&id)
                .filter(|t| !t.secret_tour)
                .map(|tour| {
                    patch.apply(tour);
                    tour.clone()
                }))
        }

        async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
            let mut tours = self.tours.write().await;
            if tours.get(&id).is_some_and(|t| !t.secret_tour) {
                tours.remove(&id);
                return Ok(true);
            }
            Ok(false)
        }
    }
}
