// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Persistence of reimbursements.

use crate::model::{
    Amount, Id, Reimbursement, ReimbursementDetails, ReimbursementFilter, ReimbursementStatus,
    ReimbursementType, Resolution,
};
#[cfg(feature = "postgres")]
use ers_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use ers_core::db::sqlite::{self, build_optional_timestamp, build_timestamp, unpack_timestamp};
use ers_core::db::{DbError, DbResult, Executor};
use ers_core::model::Username;
use sqlx::{QueryBuilder, Row};
#[cfg(feature = "postgres")]
use sqlx::postgres::{PgRow, Postgres};
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::{Sqlite, SqliteRow};
use time::OffsetDateTime;

/// Query to fetch reimbursements along with the names of their author and resolver in PostgreSQL.
#[cfg(feature = "postgres")]
const POSTGRES_SELECT: &str = "
    SELECT
        r.reimb_id, r.amount, r.submitted, r.resolved, r.description, r.receipt,
        a.username AS author, v.username AS resolver, r.status_id, r.type_id
    FROM reimbursements r
    JOIN users a ON r.author_id = a.user_id
    LEFT JOIN users v ON r.resolver_id = v.user_id";

/// Query to fetch reimbursements along with the names of their author and resolver in SQLite.
#[cfg(any(feature = "sqlite", test))]
const SQLITE_SELECT: &str = "
    SELECT
        r.reimb_id, r.amount, r.submitted_secs, r.submitted_nsecs, r.resolved_secs,
        r.resolved_nsecs, r.description, r.receipt,
        a.username AS author, v.username AS resolver, r.status_id, r.type_id
    FROM reimbursements r
    JOIN users a ON r.author_id = a.user_id
    LEFT JOIN users v ON r.resolver_id = v.user_id";

/// Raw contents of a row of the reimbursements queries, before validation.
struct RawReimbursement {
    reimb_id: i32,
    amount: f64,
    submitted: OffsetDateTime,
    resolved: Option<OffsetDateTime>,
    description: String,
    receipt: Option<String>,
    author: String,
    resolver: Option<String>,
    status_id: i32,
    type_id: i32,
}

impl TryFrom<RawReimbursement> for Reimbursement {
    type Error = DbError;

    fn try_from(raw: RawReimbursement) -> DbResult<Self> {
        let details = ReimbursementDetails::new(
            Amount::new(raw.amount)?,
            raw.description,
            raw.receipt,
            ReimbursementType::from_id(raw.type_id)?,
        );
        let resolution = Resolution::new(
            ReimbursementStatus::from_id(raw.status_id)?,
            raw.resolver.map(Username::new).transpose()?,
            raw.resolved,
        );
        Ok(Reimbursement::new(
            Id::new(raw.reimb_id)?,
            Username::new(raw.author)?,
            raw.submitted,
            details,
            resolution,
        ))
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Reimbursement {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let get_err = postgres::map_sqlx_error;
        Reimbursement::try_from(RawReimbursement {
            reimb_id: row.try_get("reimb_id").map_err(get_err)?,
            amount: row.try_get("amount").map_err(get_err)?,
            submitted: row.try_get("submitted").map_err(get_err)?,
            resolved: row.try_get("resolved").map_err(get_err)?,
            description: row.try_get("description").map_err(get_err)?,
            receipt: row.try_get("receipt").map_err(get_err)?,
            author: row.try_get("author").map_err(get_err)?,
            resolver: row.try_get("resolver").map_err(get_err)?,
            status_id: row.try_get("status_id").map_err(get_err)?,
            type_id: row.try_get("type_id").map_err(get_err)?,
        })
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Reimbursement {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let get_err = sqlite::map_sqlx_error;
        let submitted_secs: i64 = row.try_get("submitted_secs").map_err(get_err)?;
        let submitted_nsecs: i64 = row.try_get("submitted_nsecs").map_err(get_err)?;
        let resolved_secs: Option<i64> = row.try_get("resolved_secs").map_err(get_err)?;
        let resolved_nsecs: Option<i64> = row.try_get("resolved_nsecs").map_err(get_err)?;

        Reimbursement::try_from(RawReimbursement {
            reimb_id: row.try_get("reimb_id").map_err(get_err)?,
            amount: row.try_get("amount").map_err(get_err)?,
            submitted: build_timestamp(submitted_secs, submitted_nsecs)?,
            resolved: build_optional_timestamp(resolved_secs, resolved_nsecs)?,
            description: row.try_get("description").map_err(get_err)?,
            receipt: row.try_get("receipt").map_err(get_err)?,
            author: row.try_get("author").map_err(get_err)?,
            resolver: row.try_get("resolver").map_err(get_err)?,
            status_id: row.try_get("status_id").map_err(get_err)?,
            type_id: row.try_get("type_id").map_err(get_err)?,
        })
    }
}

/// Creates a new pending reimbursement filed by `author` at `submitted`.
///
/// `author_id` must be the identifier of the user named `author`.
pub(crate) async fn create_reimbursement(
    ex: &mut Executor,
    author_id: Id,
    author: Username,
    submitted: OffsetDateTime,
    details: ReimbursementDetails,
) -> DbResult<Reimbursement> {
    let resolution = Resolution::pending();

    let reimb_id: i32 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO reimbursements
                    (amount, submitted, description, receipt, author_id, status_id, type_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING reimb_id";
            let row = sqlx::query(query_str)
                .bind(details.amount().as_f64())
                .bind(submitted)
                .bind(details.description().as_str())
                .bind(details.receipt().as_deref())
                .bind(author_id.as_i32())
                .bind(resolution.status().id())
                .bind(details.reimb_type().id())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("reimb_id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (submitted_secs, submitted_nsecs) = unpack_timestamp(submitted);

            let query_str = "
                INSERT INTO reimbursements
                    (amount, submitted_secs, submitted_nsecs, description, receipt, author_id,
                    status_id, type_id)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING reimb_id";
            let row = sqlx::query(query_str)
                .bind(details.amount().as_f64())
                .bind(submitted_secs)
                .bind(submitted_nsecs)
                .bind(details.description().as_str())
                .bind(details.receipt().as_deref())
                .bind(author_id.as_i32())
                .bind(resolution.status().id())
                .bind(details.reimb_type().id())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("reimb_id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(Reimbursement::new(Id::new(reimb_id)?, author, submitted, details, resolution))
}

/// Gets all reimbursements that match `filter`, sorted by their identifier.
///
/// The query carries one `WHERE` condition per set field in `filter`.
pub(crate) async fn get_reimbursements(
    ex: &mut Executor,
    filter: ReimbursementFilter,
) -> DbResult<Vec<Reimbursement>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let mut query = QueryBuilder::<Postgres>::new(POSTGRES_SELECT);
            let mut separator = " WHERE ";
            if let Some(status) = filter.status {
                query.push(separator).push("r.status_id = ").push_bind(status.id());
                separator = " AND ";
            }
            if let Some(reimb_type) = filter.reimb_type {
                query.push(separator).push("r.type_id = ").push_bind(reimb_type.id());
            }
            query.push(" ORDER BY r.reimb_id");

            let rows =
                query.build().fetch_all(ex.conn()).await.map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(Reimbursement::try_from).collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let mut query = QueryBuilder::<Sqlite>::new(SQLITE_SELECT);
            let mut separator = " WHERE ";
            if let Some(status) = filter.status {
                query.push(separator).push("r.status_id = ").push_bind(status.id());
                separator = " AND ";
            }
            if let Some(reimb_type) = filter.reimb_type {
                query.push(separator).push("r.type_id = ").push_bind(reimb_type.id());
            }
            query.push(" ORDER BY r.reimb_id");

            let rows = query.build().fetch_all(ex.conn()).await.map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(Reimbursement::try_from).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Column that identifies a single reimbursement.
enum ReimbursementKey<'a> {
    /// Lookup by identifier.
    Id(Id),

    /// Lookup by the name of the author.
    Author(&'a Username),

    /// Lookup by the name of the resolver.
    Resolver(&'a Username),
}

/// Gets the reimbursement matching `key` with the lowest identifier, if any.
async fn get_reimbursement_by(
    ex: &mut Executor,
    key: ReimbursementKey<'_>,
) -> DbResult<Option<Reimbursement>> {
    let column = match key {
        ReimbursementKey::Id(_) => "r.reimb_id",
        ReimbursementKey::Author(_) => "a.username",
        ReimbursementKey::Resolver(_) => "v.username",
    };

    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                format!("{} WHERE {} = $1 ORDER BY r.reimb_id LIMIT 1", POSTGRES_SELECT, column);
            let query = sqlx::query(&query_str);
            let query = match key {
                ReimbursementKey::Id(id) => query.bind(id.as_i32()),
                ReimbursementKey::Author(username) | ReimbursementKey::Resolver(username) => {
                    query.bind(username.as_str())
                }
            };
            let row = query.fetch_optional(ex.conn()).await.map_err(postgres::map_sqlx_error)?;
            row.map(Reimbursement::try_from).transpose()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                format!("{} WHERE {} = ? ORDER BY r.reimb_id LIMIT 1", SQLITE_SELECT, column);
            let query = sqlx::query(&query_str);
            let query = match key {
                ReimbursementKey::Id(id) => query.bind(id.as_i32()),
                ReimbursementKey::Author(username) | ReimbursementKey::Resolver(username) => {
                    query.bind(username.as_str())
                }
            };
            let row = query.fetch_optional(ex.conn()).await.map_err(sqlite::map_sqlx_error)?;
            row.map(Reimbursement::try_from).transpose()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the reimbursement with identifier `id`, if it exists.
pub(crate) async fn get_reimbursement_by_id(
    ex: &mut Executor,
    id: Id,
) -> DbResult<Option<Reimbursement>> {
    get_reimbursement_by(ex, ReimbursementKey::Id(id)).await
}

/// Gets the oldest reimbursement filed by `author`, if any.
pub(crate) async fn get_reimbursement_by_author(
    ex: &mut Executor,
    author: &Username,
) -> DbResult<Option<Reimbursement>> {
    get_reimbursement_by(ex, ReimbursementKey::Author(author)).await
}

/// Gets the oldest reimbursement resolved by `resolver`, if any.
pub(crate) async fn get_reimbursement_by_resolver(
    ex: &mut Executor,
    resolver: &Username,
) -> DbResult<Option<Reimbursement>> {
    get_reimbursement_by(ex, ReimbursementKey::Resolver(resolver)).await
}

/// Replaces the mutable properties of the reimbursement with identifier `id`.
///
/// `resolver_id` and `resolved` are stored as given, so callers are responsible for keeping them
/// consistent with `status`.
pub(crate) async fn update_reimbursement(
    ex: &mut Executor,
    id: Id,
    details: &ReimbursementDetails,
    status: ReimbursementStatus,
    resolver_id: Option<Id>,
    resolved: Option<OffsetDateTime>,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE reimbursements
                SET amount = $1, description = $2, receipt = $3, type_id = $4, status_id = $5,
                    resolver_id = $6, resolved = $7
                WHERE reimb_id = $8";
            let done = sqlx::query(query_str)
                .bind(details.amount().as_f64())
                .bind(details.description().as_str())
                .bind(details.receipt().as_deref())
                .bind(details.reimb_type().id())
                .bind(status.id())
                .bind(resolver_id.map(Id::as_i32))
                .bind(resolved)
                .bind(id.as_i32())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (resolved_secs, resolved_nsecs) = match resolved.map(unpack_timestamp) {
                Some((secs, nsecs)) => (Some(secs), Some(nsecs)),
                None => (None, None),
            };

            let query_str = "
                UPDATE reimbursements
                SET amount = ?, description = ?, receipt = ?, type_id = ?, status_id = ?,
                    resolver_id = ?, resolved_secs = ?, resolved_nsecs = ?
                WHERE reimb_id = ?";
            let done = sqlx::query(query_str)
                .bind(details.amount().as_f64())
                .bind(details.description().as_str())
                .bind(details.receipt().as_deref())
                .bind(details.reimb_type().id())
                .bind(status.id())
                .bind(resolver_id.map(Id::as_i32))
                .bind(resolved_secs)
                .bind(resolved_nsecs)
                .bind(id.as_i32())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Update affected more than one row".to_owned())),
    }
}

/// Deletes the reimbursement with identifier `id`.
///
/// Deleting a reimbursement that does not exist is not an error.
pub(crate) async fn delete_reimbursement(ex: &mut Executor, id: Id) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("DELETE FROM reimbursements WHERE reimb_id = $1")
                .bind(id.as_i32())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("DELETE FROM reimbursements WHERE reimb_id = ?")
                .bind(id.as_i32())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 | 1 => Ok(()),
        _ => Err(DbError::BackendError("Deletion affected more than one row".to_owned())),
    }
}
