//! Postgres-backed record store.
//!
//! Reads the `"Flora"` table owned by the upstream write service. The `type`
//! column is a Postgres enum; it is cast to text in SQL so decoding does not
//! depend on the enum's type name.
//!
//! ## Error Mapping
//!
//! | SQLx Error | RecordStoreError |
//! |------------|------------------|
//! | `ColumnDecode`, `ColumnNotFound`, `TypeNotFound` | `Decode` |
//! | anything else (IO, TLS, pool timeout, closed pool, database) | `Unavailable` |

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use flora_core::{FloraId, FloraRecord, OwnerId, Visibility};

use super::{RecordStore, RecordStoreError};

const SELECT_FLORA: &str = r#"
    SELECT
        id,
        user_id,
        common_name,
        scientific_name,
        type::text AS type
    FROM "Flora"
"#;

/// Postgres-backed flora record store.
///
/// ## Sessions
///
/// Every query checks a connection out of the SQLx pool and returns it when
/// the query completes, so concurrent requests never share a session.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: Arc<PgPool>,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, RecordStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Close the pool, waiting for checked-out connections to come back.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(skip(self), err)]
    async fn list_all(&self) -> Result<Vec<FloraRecord>, RecordStoreError> {
        let rows = sqlx::query(SELECT_FLORA)
            .fetch_all(&*self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(flora_from_row).collect()
    }

    #[instrument(skip(self), fields(flora_id = %id), err)]
    async fn get_by_id(&self, id: FloraId) -> Result<Option<FloraRecord>, RecordStoreError> {
        let sql = format!("{SELECT_FLORA} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(flora_from_row).transpose()
    }

    async fn ping(&self) -> Result<(), RecordStoreError> {
        sqlx::query("SELECT 1")
            .execute(&*self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn flora_from_row(row: &PgRow) -> Result<FloraRecord, RecordStoreError> {
    let decode = |e: sqlx::Error| RecordStoreError::Decode(e.to_string());

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let owner = required("user_id", row.try_get("user_id").map_err(decode)?)?;
    let common_name = required("common_name", row.try_get("common_name").map_err(decode)?)?;
    let scientific_name =
        required("scientific_name", row.try_get("scientific_name").map_err(decode)?)?;
    let visibility = required("type", row.try_get("type").map_err(decode)?)?;

    let visibility = visibility
        .parse::<Visibility>()
        .map_err(|e| RecordStoreError::Decode(e.to_string()))?;

    Ok(FloraRecord {
        id: FloraId::from_uuid(id),
        owner_id: OwnerId::new(owner),
        common_name,
        scientific_name,
        visibility,
    })
}

/// A NULL in a column the record needs is a decode failure, not an empty value.
fn required(column: &str, value: Option<String>) -> Result<String, RecordStoreError> {
    value.ok_or_else(|| RecordStoreError::Decode(format!("column `{column}` is NULL")))
}

fn map_sqlx_error(err: sqlx::Error) -> RecordStoreError {
    match err {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. } => RecordStoreError::Decode(err.to_string()),
        other => RecordStoreError::Unavailable(other.to_string()),
    }
}
