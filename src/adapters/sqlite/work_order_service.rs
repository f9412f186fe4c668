//! SQLite-backed work-order sink.
//!
//! Stands in for the maintenance system's work-order module: every
//! materialized occurrence becomes a row in `work_orders`, keyed by the
//! occurrence's idempotency key.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{format_date, parse_date, parse_datetime, parse_uuid};
use crate::domain::errors::DomainResult;
use crate::domain::models::plan::{MaintenancePlan, Occurrence};
use crate::domain::models::work_order::WorkOrder;
use crate::domain::ports::work_order_service::WorkOrderService;

#[derive(Clone)]
pub struct SqliteWorkOrderService {
    pool: SqlitePool,
}

impl SqliteWorkOrderService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Work orders for a plan, by due date.
    pub async fn list_for_plan(&self, plan_id: Uuid) -> DomainResult<Vec<WorkOrder>> {
        let rows: Vec<WorkOrderRow> = sqlx::query_as(
            "SELECT * FROM work_orders WHERE plan_id = ? ORDER BY due_date ASC"
        )
        .bind(plan_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_work_order).collect()
    }

    /// Work orders due within `[from, through]`, across all plans.
    pub async fn list_due(&self, from: NaiveDate, through: NaiveDate) -> DomainResult<Vec<WorkOrder>> {
        let rows: Vec<WorkOrderRow> = sqlx::query_as(
            "SELECT * FROM work_orders WHERE due_date >= ?1 AND due_date <= ?2
             ORDER BY due_date ASC, title ASC"
        )
        .bind(format_date(from))
        .bind(format_date(through))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_work_order).collect()
    }

    async fn get_by_key(&self, key: &str) -> DomainResult<Option<WorkOrder>> {
        let row: Option<WorkOrderRow> =
            sqlx::query_as("SELECT * FROM work_orders WHERE idempotency_key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(row_to_work_order).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct WorkOrderRow {
    id: String,
    plan_id: String,
    asset: String,
    title: String,
    description: String,
    due_date: String,
    idempotency_key: String,
    created_at: String,
}

fn row_to_work_order(row: WorkOrderRow) -> DomainResult<WorkOrder> {
    Ok(WorkOrder {
        id: parse_uuid(&row.id)?,
        plan_id: parse_uuid(&row.plan_id)?,
        asset: row.asset,
        title: row.title,
        description: row.description,
        due_date: parse_date(&row.due_date)?,
        idempotency_key: row.idempotency_key,
        created_at: parse_datetime(&row.created_at)?,
    })
}

#[async_trait]
impl WorkOrderService for SqliteWorkOrderService {
    async fn create_work_order(
        &self,
        plan: &MaintenancePlan,
        occurrence: &Occurrence,
    ) -> DomainResult<WorkOrder> {
        let work_order = WorkOrder::for_occurrence(plan, occurrence);

        let result = sqlx::query(
            "INSERT OR IGNORE INTO work_orders
             (id, plan_id, asset, title, description, due_date, idempotency_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        )
        .bind(work_order.id.to_string())
        .bind(work_order.plan_id.to_string())
        .bind(&work_order.asset)
        .bind(&work_order.title)
        .bind(&work_order.description)
        .bind(format_date(work_order.due_date))
        .bind(&work_order.idempotency_key)
        .bind(work_order.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Same occurrence already has a work order; hand that one back.
            if let Some(existing) = self.get_by_key(&work_order.idempotency_key).await? {
                tracing::debug!(key = %existing.idempotency_key, "work order already exists");
                return Ok(existing);
            }
        }

        tracing::info!(
            work_order_id = %work_order.id,
            plan_id = %plan.id,
            due_date = %work_order.due_date,
            "work order created"
        );
        Ok(work_order)
    }
}
