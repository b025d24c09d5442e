//! Dashboard layout persistence.

use sqlx::Row;

use super::repository::{bump_revision, flag, Repository};
use crate::errors::AppError;
use crate::models::{DashboardSection, DashboardSectionType};
use crate::schemas::SchemaEnum;

impl Repository {
    // ==================== DASHBOARD OPERATIONS ====================

    /// The saved layout, or the default one when nothing was saved yet.
    pub async fn get_dashboard_layout(&self, user_id: i64) -> Result<Vec<DashboardSection>, AppError> {
        let rows = sqlx::query(
            "SELECT type, collection_id, enabled, sort_order FROM dashboard_sections WHERE user_id = ? ORDER BY sort_order, rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(DashboardSection::defaults());
        }

        Ok(rows
            .iter()
            .filter_map(|row| {
                let section_type: String = row.get("type");
                Some(DashboardSection {
                    section_type: DashboardSectionType::from_name(&section_type)?,
                    collection_id: row.get("collection_id"),
                    enabled: flag(row, "enabled"),
                    order: row.get("sort_order"),
                })
            })
            .collect())
    }

    /// Replace the whole layout.
    pub async fn replace_dashboard_layout(
        &self,
        user_id: i64,
        sections: &[DashboardSection],
    ) -> Result<Vec<DashboardSection>, AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM dashboard_sections WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        for section in sections {
            sqlx::query(
                "INSERT INTO dashboard_sections (user_id, type, collection_id, enabled, sort_order) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(user_id)
            .bind(section.section_type.as_str())
            .bind(section.collection_id)
            .bind(section.enabled)
            .bind(section.order)
            .execute(&mut *tx)
            .await?;
        }
        bump_revision(&mut tx).await?;
        tx.commit().await?;

        self.get_dashboard_layout(user_id).await
    }
}
