//! SQLite adapter for PlanRepository.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{format_date, parse_date, parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::frequency::FrequencySpec;
use crate::domain::models::plan::{GenerationMode, MaintenancePlan, Occurrence};
use crate::domain::ports::plan_repository::{PlanFilter, PlanRepository};

#[derive(Clone)]
pub struct SqlitePlanRepository {
    pool: SqlitePool,
}

impl SqlitePlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PlanRow {
    id: String,
    name: String,
    asset: String,
    description: String,
    #[allow(dead_code)]
    frequency_kind: String,
    frequency_data: String,
    start_date: String,
    generation_mode: String,
    created_at: String,
    updated_at: String,
}

fn row_to_plan(row: PlanRow) -> DomainResult<MaintenancePlan> {
    let frequency: FrequencySpec = serde_json::from_str(&row.frequency_data)
        .map_err(|e| DomainError::SerializationError(format!("frequency_data: {}", e)))?;

    Ok(MaintenancePlan {
        id: parse_uuid(&row.id)?,
        name: row.name,
        asset: row.asset,
        description: row.description,
        frequency,
        start_date: parse_date(&row.start_date)?,
        generation_mode: GenerationMode::from_str(&row.generation_mode).ok_or_else(|| {
            DomainError::SerializationError(format!("generation_mode: unknown value '{}'", row.generation_mode))
        })?,
        created_at: parse_datetime(&row.created_at)?,
        updated_at: parse_datetime(&row.updated_at)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl PlanRepository for SqlitePlanRepository {
    async fn create(&self, plan: &MaintenancePlan) -> DomainResult<()> {
        let frequency_data = serde_json::to_string(&plan.frequency)?;

        sqlx::query(
            "INSERT INTO maintenance_plans
             (id, name, asset, description, frequency_kind, frequency_data,
              start_date, generation_mode, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        )
        .bind(plan.id.to_string())
        .bind(&plan.name)
        .bind(&plan.asset)
        .bind(&plan.description)
        .bind(plan.frequency.kind().as_str())
        .bind(&frequency_data)
        .bind(format_date(plan.start_date))
        .bind(plan.generation_mode.as_str())
        .bind(plan.created_at.to_rfc3339())
        .bind(plan.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::DuplicatePlanName(plan.name.clone())
            } else {
                e.into()
            }
        })?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<MaintenancePlan>> {
        let row: Option<PlanRow> =
            sqlx::query_as("SELECT * FROM maintenance_plans WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_plan).transpose()
    }

    async fn get_by_name(&self, name: &str) -> DomainResult<Option<MaintenancePlan>> {
        let row: Option<PlanRow> =
            sqlx::query_as("SELECT * FROM maintenance_plans WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_plan).transpose()
    }

    async fn update(&self, plan: &MaintenancePlan) -> DomainResult<()> {
        let frequency_data = serde_json::to_string(&plan.frequency)?;

        let result = sqlx::query(
            "UPDATE maintenance_plans SET
             name = ?2, asset = ?3, description = ?4, frequency_kind = ?5,
             frequency_data = ?6, start_date = ?7, generation_mode = ?8, updated_at = ?9
             WHERE id = ?1"
        )
        .bind(plan.id.to_string())
        .bind(&plan.name)
        .bind(&plan.asset)
        .bind(&plan.description)
        .bind(plan.frequency.kind().as_str())
        .bind(&frequency_data)
        .bind(format_date(plan.start_date))
        .bind(plan.generation_mode.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::DuplicatePlanName(plan.name.clone())
            } else {
                e.into()
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::PlanNotFound(plan.id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        sqlx::query("DELETE FROM maintenance_plans WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, filter: PlanFilter) -> DomainResult<Vec<MaintenancePlan>> {
        let rows = sqlx::query_as::<_, PlanRow>(
            "SELECT * FROM maintenance_plans
             WHERE (?1 IS NULL OR generation_mode = ?1)
               AND (?2 IS NULL OR asset = ?2)
             ORDER BY name ASC"
        )
        .bind(filter.generation_mode.map(|m| m.as_str()))
        .bind(filter.asset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_plan).collect()
    }

    async fn claim_occurrence(&self, occurrence: &Occurrence) -> DomainResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO plan_occurrences (plan_id, occurrence_date, materialized_at)
             VALUES (?1, ?2, ?3)"
        )
        .bind(occurrence.plan_id.to_string())
        .bind(format_date(occurrence.date))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn attach_work_order(&self, occurrence: &Occurrence, work_order_id: Uuid) -> DomainResult<()> {
        sqlx::query(
            "UPDATE plan_occurrences SET work_order_id = ?3
             WHERE plan_id = ?1 AND occurrence_date = ?2"
        )
        .bind(occurrence.plan_id.to_string())
        .bind(format_date(occurrence.date))
        .bind(work_order_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn release_occurrence(&self, occurrence: &Occurrence) -> DomainResult<()> {
        sqlx::query(
            "DELETE FROM plan_occurrences
             WHERE plan_id = ?1 AND occurrence_date = ?2 AND work_order_id IS NULL"
        )
        .bind(occurrence.plan_id.to_string())
        .bind(format_date(occurrence.date))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn materialized_dates(&self, plan_id: Uuid) -> DomainResult<Vec<NaiveDate>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT occurrence_date FROM plan_occurrences
             WHERE plan_id = ? AND work_order_id IS NOT NULL
             ORDER BY occurrence_date ASC"
        )
        .bind(plan_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|(date,)| parse_date(date)).collect()
    }

    async fn pending_occurrences(&self, plan_id: Uuid) -> DomainResult<Vec<NaiveDate>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT occurrence_date FROM plan_occurrences
             WHERE plan_id = ? AND work_order_id IS NULL
             ORDER BY occurrence_date ASC"
        )
        .bind(plan_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|(date,)| parse_date(date)).collect()
    }

    async fn last_materialized(&self, plan_id: Uuid) -> DomainResult<Option<NaiveDate>> {
        let (last,): (Option<String>,) = sqlx::query_as(
            "SELECT MAX(occurrence_date) FROM plan_occurrences
             WHERE plan_id = ? AND work_order_id IS NOT NULL"
        )
        .bind(plan_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        last.as_deref().map(parse_date).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::frequency::{DayOfWeek, MonthlyAnchor};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup() -> SqlitePlanRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqlitePlanRepository::new(pool)
    }

    fn weekly_plan(name: &str) -> MaintenancePlan {
        MaintenancePlan::new(
            name,
            "COMP-7",
            FrequencySpec::weekly(2, [DayOfWeek::Mon, DayOfWeek::Thu]).unwrap(),
            date(2025, 1, 1),
        )
        .with_description("Check compressor oil level")
    }

    #[tokio::test]
    async fn test_create_and_get_round_trips_frequency() {
        let repo = setup().await;
        let plan = weekly_plan("compressor-oil");
        repo.create(&plan).await.unwrap();

        let loaded = repo.get(plan.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "compressor-oil");
        assert_eq!(loaded.frequency, plan.frequency);
        assert_eq!(loaded.start_date, plan.start_date);
        assert_eq!(loaded.description, "Check compressor oil level");

        let by_name = repo.get_by_name("compressor-oil").await.unwrap().unwrap();
        assert_eq!(by_name.id, plan.id);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let repo = setup().await;
        repo.create(&weekly_plan("dup")).await.unwrap();
        let err = repo.create(&weekly_plan("dup")).await.unwrap_err();
        assert!(matches!(err, DomainError::DuplicatePlanName(ref n) if n == "dup"));
    }

    #[tokio::test]
    async fn test_update_frequency() {
        let repo = setup().await;
        let mut plan = weekly_plan("boiler");
        repo.create(&plan).await.unwrap();

        let monthly = FrequencySpec::monthly(1, MonthlyAnchor::day_of_month(31).unwrap()).unwrap();
        plan.change_frequency(monthly.clone(), date(2025, 3, 1));
        repo.update(&plan).await.unwrap();

        let loaded = repo.get(plan.id).await.unwrap().unwrap();
        assert_eq!(loaded.frequency, monthly);
        assert_eq!(loaded.start_date, date(2025, 3, 1));
    }

    #[tokio::test]
    async fn test_update_missing_plan() {
        let repo = setup().await;
        let err = repo.update(&weekly_plan("ghost")).await.unwrap_err();
        assert!(matches!(err, DomainError::PlanNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_by_mode_and_asset() {
        let repo = setup().await;
        repo.create(&weekly_plan("a")).await.unwrap();
        repo.create(&weekly_plan("b").with_generation_mode(GenerationMode::Manual))
            .await
            .unwrap();
        let mut other = weekly_plan("c");
        other.asset = "PUMP-1".to_string();
        repo.create(&other).await.unwrap();

        let all = repo.list(PlanFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), ["a", "b", "c"]);

        let manual = repo
            .list(PlanFilter {
                generation_mode: Some(GenerationMode::Manual),
                ..PlanFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(manual.len(), 1);
        assert_eq!(manual[0].name, "b");

        let pumps = repo
            .list(PlanFilter {
                asset: Some("PUMP-1".to_string()),
                ..PlanFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(pumps.len(), 1);
        assert_eq!(pumps[0].name, "c");
    }

    #[tokio::test]
    async fn test_claim_occurrence_is_exclusive() {
        let repo = setup().await;
        let plan = weekly_plan("claims");
        repo.create(&plan).await.unwrap();

        let occurrence = plan.occurrence(date(2025, 1, 2));
        assert!(repo.claim_occurrence(&occurrence).await.unwrap());
        assert!(!repo.claim_occurrence(&occurrence).await.unwrap());

        repo.claim_occurrence(&plan.occurrence(date(2025, 1, 6))).await.unwrap();
        assert_eq!(
            repo.pending_occurrences(plan.id).await.unwrap(),
            vec![date(2025, 1, 2), date(2025, 1, 6)]
        );
    }

    #[tokio::test]
    async fn test_history_counts_only_attached_claims() {
        let repo = setup().await;
        let plan = weekly_plan("attached");
        repo.create(&plan).await.unwrap();

        let done = plan.occurrence(date(2025, 1, 2));
        repo.claim_occurrence(&done).await.unwrap();
        repo.attach_work_order(&done, Uuid::new_v4()).await.unwrap();
        repo.claim_occurrence(&plan.occurrence(date(2025, 1, 6))).await.unwrap();

        assert_eq!(repo.materialized_dates(plan.id).await.unwrap(), vec![date(2025, 1, 2)]);
        assert_eq!(repo.last_materialized(plan.id).await.unwrap(), Some(date(2025, 1, 2)));
        assert_eq!(repo.pending_occurrences(plan.id).await.unwrap(), vec![date(2025, 1, 6)]);
    }

    #[tokio::test]
    async fn test_unknown_generation_mode_is_an_error() {
        let repo = setup().await;
        let plan = weekly_plan("corrupt");
        repo.create(&plan).await.unwrap();
        sqlx::query("UPDATE maintenance_plans SET generation_mode = 'sometimes' WHERE id = ?")
            .bind(plan.id.to_string())
            .execute(&repo.pool)
            .await
            .unwrap();

        let err = repo.get(plan.id).await.unwrap_err();
        assert!(matches!(err, DomainError::SerializationError(ref m) if m.contains("generation_mode")));
        assert!(repo.list(PlanFilter::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_release_only_drops_unattached_claims() {
        let repo = setup().await;
        let plan = weekly_plan("release");
        repo.create(&plan).await.unwrap();

        let attached = plan.occurrence(date(2025, 1, 2));
        let pending = plan.occurrence(date(2025, 1, 6));
        repo.claim_occurrence(&attached).await.unwrap();
        repo.claim_occurrence(&pending).await.unwrap();
        repo.attach_work_order(&attached, Uuid::new_v4()).await.unwrap();

        repo.release_occurrence(&attached).await.unwrap();
        repo.release_occurrence(&pending).await.unwrap();

        assert_eq!(repo.materialized_dates(plan.id).await.unwrap(), vec![date(2025, 1, 2)]);
        assert!(repo.pending_occurrences(plan.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_history() {
        let repo = setup().await;
        let plan = weekly_plan("gone");
        repo.create(&plan).await.unwrap();
        repo.claim_occurrence(&plan.occurrence(date(2025, 1, 2))).await.unwrap();

        repo.delete(plan.id).await.unwrap();
        assert!(repo.get(plan.id).await.unwrap().is_none());
        assert!(repo.pending_occurrences(plan.id).await.unwrap().is_empty());
        assert_eq!(repo.last_materialized(plan.id).await.unwrap(), None);
    }
}
