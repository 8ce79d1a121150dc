//! PostgreSQL page store and conversion sink.
//!
//! Pages and templates live in `landing_pages` / `landing_page_templates`;
//! events are appended to `landing_page_conversions`. Tables are created on
//! connect if missing.
//!
//! Feature-gated behind `postgres-backend`. Uses `sqlx` with the Tokio
//! runtime, so no `spawn_blocking` is needed.

use std::collections::HashMap;

use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::model::{ConversionEvent, PageDefinition, TemplateConfig, TemplateDefinition};
use crate::{ConversionSink, PageStore, StorageError};

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS landing_page_templates (\
        id              TEXT  PRIMARY KEY, \
        template_html   TEXT  NOT NULL, \
        template_config JSONB NOT NULL DEFAULT '{}'::jsonb\
    )",
    "CREATE TABLE IF NOT EXISTS landing_pages (\
        id             TEXT    PRIMARY KEY, \
        slug           TEXT    NOT NULL UNIQUE, \
        title          TEXT    NOT NULL, \
        meta_title     TEXT, \
        template_id    TEXT    NOT NULL REFERENCES landing_page_templates (id), \
        content_config JSONB   NOT NULL DEFAULT '{}'::jsonb, \
        custom_css     TEXT, \
        is_published   BOOLEAN NOT NULL DEFAULT FALSE\
    )",
    "CREATE TABLE IF NOT EXISTS landing_page_conversions (\
        id               BIGSERIAL        PRIMARY KEY, \
        landing_page_id  TEXT             NOT NULL, \
        conversion_type  TEXT             NOT NULL, \
        visitor_id       TEXT             NOT NULL, \
        session_id       TEXT             NOT NULL, \
        form_data        JSONB, \
        conversion_value DOUBLE PRECISION, \
        created_at       TIMESTAMPTZ      NOT NULL\
    )",
    "CREATE INDEX IF NOT EXISTS idx_conversions_page \
     ON landing_page_conversions (landing_page_id, created_at)",
];

type PageRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    Json<TemplateConfig>,
    Json<HashMap<String, String>>,
    Option<String>,
    bool,
);

/// A page store and conversion sink backed by PostgreSQL.
///
/// Thread-safe via `PgPool`. All operations are fully async.
///
/// # Examples
///
/// ```no_run
/// # use lander_storage::PostgresStore;
/// # #[tokio::main]
/// # async fn main() {
/// let store = PostgresStore::connect("postgres://localhost/lander").await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresStore {
    /// Connect to PostgreSQL and create the tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the connection or migration fails.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        // Never echo the URL; it usually carries credentials.
        let open_err = |reason: String| StorageError::Open {
            path: "[database url]".to_owned(),
            reason,
        };

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| open_err(e.to_string()))?;

        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| open_err(format!("migration failed: {e}")))?;
        }

        Ok(Self { pool })
    }

    /// Return a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl PageStore for PostgresStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PageDefinition>, StorageError> {
        let row: Option<PageRow> = sqlx::query_as(
            "SELECT p.id, p.slug, p.title, p.meta_title, t.id, t.template_html, \
                    t.template_config, p.content_config, p.custom_css, p.is_published \
             FROM landing_pages p \
             JOIN landing_page_templates t ON t.id = p.template_id \
             WHERE p.slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Read {
            slug: slug.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(row.map(
            |(
                id,
                slug,
                title,
                meta_title,
                template_id,
                template_html,
                Json(template_config),
                Json(content_values),
                custom_css,
                is_published,
            )| PageDefinition {
                id,
                slug,
                title,
                meta_title,
                template: TemplateDefinition {
                    id: Some(template_id),
                    template_html,
                    template_config,
                },
                content_values,
                custom_css,
                is_published,
            },
        ))
    }
}

#[async_trait::async_trait]
impl ConversionSink for PostgresStore {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "postgres"
    }

    async fn record(&self, event: &ConversionEvent) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO landing_page_conversions \
             (landing_page_id, conversion_type, visitor_id, session_id, form_data, \
              conversion_value, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&event.page_id)
        .bind(event.conversion_type.as_str())
        .bind(&event.visitor_id)
        .bind(&event.session_id)
        .bind(event.form_data.as_ref().map(Json))
        .bind(event.conversion_value)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Write {
            page_id: event.page_id.clone(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}
