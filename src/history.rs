//! Inspection history storage
//!
//! Two append-only SQLite tables: one summary row per inspection batch, one
//! hazard-count row per (site, timestamp, category). Rows are inserted once
//! and never updated in place.

use crate::aggregate::SiteSummary;
use crate::error::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct RiskHistoryRow {
    pub site_id: String,
    pub inspection_ts: String,
    pub image_count: i64,
    pub weighted_risk_score: f64,
    pub site_severity: String,
    pub highest_image_score: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HazardTrendRow {
    pub category: String,
    pub total_count: i64,
}

pub struct History {
    pool: SqlitePool,
}

impl History {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

        let history = Self { pool };
        history.create_tables().await?;
        Ok(history)
    }

    /// In-memory database for tests. Single connection: every pooled
    /// connection to `:memory:` would otherwise see its own database.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let history = Self { pool };
        history.create_tables().await?;
        Ok(history)
    }

    async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS site_risk_history (
                site_id TEXT NOT NULL,
                inspection_ts TEXT NOT NULL,
                image_count INTEGER NOT NULL,
                weighted_site_risk_score REAL NOT NULL,
                site_severity TEXT NOT NULL,
                highest_image_score INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS site_hazard_history (
                site_id TEXT NOT NULL,
                inspection_ts TEXT NOT NULL,
                hazard_category TEXT NOT NULL,
                hazard_count INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append the summary row and one hazard row per observed category.
    pub async fn record_inspection(
        &self,
        site_id: &str,
        inspection_ts: &str,
        summary: &SiteSummary,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO site_risk_history
             (site_id, inspection_ts, image_count, weighted_site_risk_score,
              site_severity, highest_image_score)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(site_id)
        .bind(inspection_ts)
        .bind(summary.image_count as i64)
        .bind(summary.weighted_risk_score)
        .bind(summary.site_severity.as_str())
        .bind(summary.highest_image_score as i64)
        .execute(&self.pool)
        .await?;

        for hazard in &summary.hazard_counts {
            sqlx::query(
                "INSERT INTO site_hazard_history
                 (site_id, inspection_ts, hazard_category, hazard_count)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(site_id)
            .bind(inspection_ts)
            .bind(&hazard.category)
            .bind(hazard.count as i64)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Per-site inspection history, newest first.
    pub async fn site_history(&self, site_id: &str, limit: i64) -> Result<Vec<RiskHistoryRow>> {
        let rows = sqlx::query_as::<_, (String, String, i64, f64, String, i64)>(
            "SELECT site_id, inspection_ts, image_count, weighted_site_risk_score,
                    site_severity, highest_image_score
             FROM site_risk_history
             WHERE site_id = ?
             ORDER BY inspection_ts DESC
             LIMIT ?",
        )
        .bind(site_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(site_id, inspection_ts, image_count, weighted_risk_score, site_severity, highest_image_score)| {
                RiskHistoryRow {
                    site_id,
                    inspection_ts,
                    image_count,
                    weighted_risk_score,
                    site_severity,
                    highest_image_score,
                }
            })
            .collect())
    }

    /// Moving average of the weighted score over the last `n` inspections.
    pub async fn recent_average(&self, site_id: &str, n: i64) -> Result<Option<f64>> {
        let avg = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT ROUND(AVG(weighted_site_risk_score), 2)
             FROM (
                 SELECT weighted_site_risk_score
                 FROM site_risk_history
                 WHERE site_id = ?
                 ORDER BY inspection_ts DESC
                 LIMIT ?
             )",
        )
        .bind(site_id)
        .bind(n)
        .fetch_one(&self.pool)
        .await?;

        Ok(avg)
    }

    /// Hazard totals per category over the site's last `inspections`
    /// inspections, most frequent first.
    pub async fn hazard_trend(
        &self,
        site_id: &str,
        inspections: i64,
    ) -> Result<Vec<HazardTrendRow>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT hazard_category, SUM(hazard_count) AS total_count
             FROM site_hazard_history
             WHERE site_id = ?
               AND inspection_ts IN (
                   SELECT DISTINCT inspection_ts
                   FROM site_hazard_history
                   WHERE site_id = ?
                   ORDER BY inspection_ts DESC
                   LIMIT ?
               )
             GROUP BY hazard_category
             ORDER BY total_count DESC, hazard_category ASC",
        )
        .bind(site_id)
        .bind(site_id)
        .bind(inspections)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(category, total_count)| HazardTrendRow {
                category,
                total_count,
            })
            .collect())
    }
}
