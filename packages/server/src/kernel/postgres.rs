//! Postgres session backend.
//!
//! Every aggregate is one JSONB row in `documents (kind, id, data)`. A
//! session opens its transaction lazily on first use; `stage` writes into it
//! immediately, so reads in the same session see staged writes. `commit`
//! ends the transaction and the next operation starts a new one.
//!
//! Each row carries a `version`. Updates are guarded by the version the
//! session read (`WHERE version = $n`), inserts by `ON CONFLICT DO NOTHING`;
//! a write that touches no row is a [`StoreError::Conflict`]. A concurrent
//! writer holding the row lock makes the guarded update wait, then miss.

use std::collections::HashMap;

use async_trait::async_trait;
use ladle::{Direction, Document, Filter, Op, Query, Session, SessionFactory, StoreError};
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;
use uuid::Uuid;

/// Session factory over a connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionFactory for PgStore {
    async fn open(&self) -> Result<Box<dyn Session>, StoreError> {
        Ok(Box::new(PgSession {
            pool: self.pool.clone(),
            tx: None,
            seen: HashMap::new(),
            closed: false,
        }))
    }
}

pub struct PgSession {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
    /// Row version at first read, or after this session's own write.
    seen: HashMap<(&'static str, Uuid), i64>,
    closed: bool,
}

impl PgSession {
    async fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        if self.tx.is_none() {
            self.tx = Some(self.pool.begin().await.map_err(StoreError::backend)?);
        }
        self.tx.as_mut().ok_or(StoreError::Closed)
    }

    fn remember(&mut self, kind: &'static str, id: Uuid, version: i64) {
        self.seen.entry((kind, id)).or_insert(version);
    }
}

#[async_trait]
impl Session for PgSession {
    async fn load(&mut self, kind: &'static str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let tx = self.tx().await?;
        let row = sqlx::query_as::<_, (i64, Json<Value>)>(
            "SELECT version, data FROM documents WHERE kind = $1 AND id = $2",
        )
        .bind(kind)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(StoreError::backend)?;

        Ok(row.map(|(version, Json(doc))| {
            self.remember(kind, id, version);
            doc
        }))
    }

    async fn load_many(
        &mut self,
        kind: &'static str,
        ids: &[Uuid],
    ) -> Result<Vec<Document>, StoreError> {
        let tx = self.tx().await?;
        let rows = sqlx::query_as::<_, (Uuid, i64, Json<Value>)>(
            "SELECT id, version, data FROM documents WHERE kind = $1 AND id = ANY($2)",
        )
        .bind(kind)
        .bind(ids.to_vec())
        .fetch_all(&mut **tx)
        .await
        .map_err(StoreError::backend)?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for (id, version, Json(doc)) in rows {
            self.remember(kind, id, version);
            by_id.insert(id, doc);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn query(&mut self, kind: &'static str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let mut sql =
            QueryBuilder::<Postgres>::new("SELECT id, version, data FROM documents WHERE kind = ");
        sql.push_bind(kind);
        push_filter(&mut sql, &query.filter);

        match &query.order_by {
            Some(order) => {
                sql.push(" ORDER BY data -> ");
                sql.push_bind(order.field.clone());
                sql.push(match order.direction {
                    Direction::Asc => " ASC NULLS LAST",
                    Direction::Desc => " DESC NULLS LAST",
                });
                sql.push(", id");
            }
            None => {
                sql.push(" ORDER BY id");
            }
        }
        if let Some(limit) = query.limit {
            sql.push(" LIMIT ");
            sql.push_bind(bound("limit", limit)?);
        }
        if query.offset > 0 {
            sql.push(" OFFSET ");
            sql.push_bind(bound("offset", query.offset)?);
        }

        let tx = self.tx().await?;
        let rows = sql
            .build_query_as::<(Uuid, i64, Json<Value>)>()
            .fetch_all(&mut **tx)
            .await
            .map_err(StoreError::backend)?;

        let mut documents = Vec::with_capacity(rows.len());
        for (id, version, Json(doc)) in rows {
            self.remember(kind, id, version);
            documents.push(doc);
        }
        Ok(documents)
    }

    async fn count(&mut self, kind: &'static str, filter: &Filter) -> Result<u64, StoreError> {
        let mut sql = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents WHERE kind = ");
        sql.push_bind(kind);
        push_filter(&mut sql, filter);

        let tx = self.tx().await?;
        let count: i64 = sql
            .build_query_scalar()
            .fetch_one(&mut **tx)
            .await
            .map_err(StoreError::backend)?;
        Ok(count.max(0) as u64)
    }

    async fn stage(
        &mut self,
        kind: &'static str,
        id: Uuid,
        document: Document,
    ) -> Result<(), StoreError> {
        let expected = self.seen.get(&(kind, id)).copied();
        let tx = self.tx().await?;
        let written = match expected {
            Some(version) => {
                sqlx::query(
                    r#"
                    UPDATE documents
                    SET data = $3, version = version + 1, updated_at = NOW()
                    WHERE kind = $1 AND id = $2 AND version = $4
                    "#,
                )
                .bind(kind)
                .bind(id)
                .bind(Json(document))
                .bind(version)
                .execute(&mut **tx)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO documents (kind, id, data, version, updated_at)
                    VALUES ($1, $2, $3, 1, NOW())
                    ON CONFLICT (kind, id) DO NOTHING
                    "#,
                )
                .bind(kind)
                .bind(id)
                .bind(Json(document))
                .execute(&mut **tx)
                .await
            }
        }
        .map_err(StoreError::backend)?;

        if written.rows_affected() == 0 {
            debug!(kind, %id, ?expected, "stale write rejected");
            return Err(StoreError::Conflict { kind, id });
        }
        self.seen.insert((kind, id), expected.map_or(1, |v| v + 1));
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(StoreError::backend)?;
            debug!("postgres transaction committed");
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.seen.clear();
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(StoreError::backend)?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        let result = self.rollback().await;
        self.closed = true;
        result
    }
}

/// Page bounds as Postgres BIGINT.
fn bound(name: &str, value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Backend(format!("{name} {value} is out of range")))
}

/// Append `AND <condition>` for every condition of the filter.
///
/// Fields address top-level keys of the document (`data -> field`), and
/// values are compared as JSONB.
fn push_filter(sql: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    for condition in filter.conditions() {
        sql.push(" AND (data -> ");
        sql.push_bind(condition.field.clone());
        sql.push(")");
        match condition.op {
            Op::Eq => sql.push(" = "),
            Op::Ne => sql.push(" IS DISTINCT FROM "),
            Op::Gt => sql.push(" > "),
            Op::Gte => sql.push(" >= "),
            Op::Lt => sql.push(" < "),
            Op::Lte => sql.push(" <= "),
            Op::In => sql.push(" IN (SELECT jsonb_array_elements("),
            Op::Contains => sql.push(" @> "),
        };
        let value = match condition.op {
            Op::Contains => json!([condition.value.clone()]),
            _ => condition.value.clone(),
        };
        sql.push_bind(Json(value));
        if condition.op == Op::In {
            sql.push("))");
        }
    }
}
