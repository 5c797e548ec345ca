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

//! Persistence of users.

use crate::model::{HashedPassword, Id, Role, User, UserDetails};
#[cfg(feature = "postgres")]
use ers_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use ers_core::db::sqlite;
use ers_core::db::{DbError, DbResult, Executor};
use ers_core::model::{EmailAddress, Username};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;

/// Columns to fetch to build a `User`, valid for all backends.
const USER_COLUMNS: &str = "user_id, username, password, first_name, last_name, email, role_id";

/// Builds a user out of its raw parts as stored in the database.
fn build_user(
    user_id: i32,
    username: String,
    password: String,
    first_name: String,
    last_name: String,
    email: String,
    role_id: i32,
) -> DbResult<User> {
    let details = UserDetails::new(
        Username::new(username)?,
        first_name,
        last_name,
        EmailAddress::new(email)?,
        Role::from_id(role_id),
    );
    Ok(User::new(Id::new(user_id)?, details).with_password(HashedPassword::new(password)))
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for User {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let user_id: i32 = row.try_get("user_id").map_err(postgres::map_sqlx_error)?;
        let username: String = row.try_get("username").map_err(postgres::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(postgres::map_sqlx_error)?;
        let first_name: String = row.try_get("first_name").map_err(postgres::map_sqlx_error)?;
        let last_name: String = row.try_get("last_name").map_err(postgres::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(postgres::map_sqlx_error)?;
        let role_id: i32 = row.try_get("role_id").map_err(postgres::map_sqlx_error)?;

        build_user(user_id, username, password, first_name, last_name, email, role_id)
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for User {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let user_id: i32 = row.try_get("user_id").map_err(sqlite::map_sqlx_error)?;
        let username: String = row.try_get("username").map_err(sqlite::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(sqlite::map_sqlx_error)?;
        let first_name: String = row.try_get("first_name").map_err(sqlite::map_sqlx_error)?;
        let last_name: String = row.try_get("last_name").map_err(sqlite::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(sqlite::map_sqlx_error)?;
        let role_id: i32 = row.try_get("role_id").map_err(sqlite::map_sqlx_error)?;

        build_user(user_id, username, password, first_name, last_name, email, role_id)
    }
}

/// Creates a new user with `details` and a `password` in hashed form.
///
/// Returns the persisted user, including the identifier assigned by the database.  Clashes on the
/// username or the email address return `DbError::AlreadyExists`.
pub(crate) async fn create_user(
    ex: &mut Executor,
    details: UserDetails,
    password: HashedPassword,
) -> DbResult<User> {
    let user_id: i32 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO users (username, password, first_name, last_name, email, role_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING user_id";
            let row = sqlx::query(query_str)
                .bind(details.username().as_str())
                .bind(password.as_str())
                .bind(details.first_name().as_str())
                .bind(details.last_name().as_str())
                .bind(details.email().as_str())
                .bind(details.role().id())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("user_id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO users (username, password, first_name, last_name, email, role_id)
                VALUES (?, ?, ?, ?, ?, ?)
                RETURNING user_id";
            let row = sqlx::query(query_str)
                .bind(details.username().as_str())
                .bind(password.as_str())
                .bind(details.first_name().as_str())
                .bind(details.last_name().as_str())
                .bind(details.email().as_str())
                .bind(details.role().id())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("user_id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(User::new(Id::new(user_id)?, details).with_password(password))
}

/// Gets all users, sorted by their identifier.
pub(crate) async fn get_users(ex: &mut Executor) -> DbResult<Vec<User>> {
    let query_str = format!("SELECT {} FROM users ORDER BY user_id", USER_COLUMNS);
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let rows = sqlx::query(&query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(User::try_from).collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let rows = sqlx::query(&query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(User::try_from).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Column of the `users` table that uniquely identifies a user.
enum UserKey<'a> {
    /// Lookup by `user_id`.
    Id(Id),

    /// Lookup by `username`.
    Username(&'a Username),

    /// Lookup by `email`.
    Email(&'a EmailAddress),
}

/// Gets the single user matching `key`, if any.
async fn get_user_by(ex: &mut Executor, key: UserKey<'_>) -> DbResult<Option<User>> {
    let column = match key {
        UserKey::Id(_) => "user_id",
        UserKey::Username(_) => "username",
        UserKey::Email(_) => "email",
    };

    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
            let query = sqlx::query(&query_str);
            let query = match key {
                UserKey::Id(id) => query.bind(id.as_i32()),
                UserKey::Username(username) => query.bind(username.as_str()),
                UserKey::Email(email) => query.bind(email.as_str()),
            };
            let row = query.fetch_optional(ex.conn()).await.map_err(postgres::map_sqlx_error)?;
            row.map(User::try_from).transpose()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
            let query = sqlx::query(&query_str);
            let query = match key {
                UserKey::Id(id) => query.bind(id.as_i32()),
                UserKey::Username(username) => query.bind(username.as_str()),
                UserKey::Email(email) => query.bind(email.as_str()),
            };
            let row = query.fetch_optional(ex.conn()).await.map_err(sqlite::map_sqlx_error)?;
            row.map(User::try_from).transpose()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the user with identifier `id`, if it exists.
pub(crate) async fn get_user_by_id(ex: &mut Executor, id: Id) -> DbResult<Option<User>> {
    get_user_by(ex, UserKey::Id(id)).await
}

/// Gets the user named `username`, if it exists.
pub(crate) async fn get_user_by_username(
    ex: &mut Executor,
    username: &Username,
) -> DbResult<Option<User>> {
    get_user_by(ex, UserKey::Username(username)).await
}

/// Gets the user with the `email` address, if it exists.
pub(crate) async fn get_user_by_email(
    ex: &mut Executor,
    email: &EmailAddress,
) -> DbResult<Option<User>> {
    get_user_by(ex, UserKey::Email(email)).await
}

/// Replaces all mutable properties of the user with identifier `id`.
pub(crate) async fn update_user(
    ex: &mut Executor,
    id: Id,
    details: &UserDetails,
    password: &HashedPassword,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE users
                SET username = $1, password = $2, first_name = $3, last_name = $4, email = $5,
                    role_id = $6
                WHERE user_id = $7";
            let done = sqlx::query(query_str)
                .bind(details.username().as_str())
                .bind(password.as_str())
                .bind(details.first_name().as_str())
                .bind(details.last_name().as_str())
                .bind(details.email().as_str())
                .bind(details.role().id())
                .bind(id.as_i32())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE users
                SET username = ?, password = ?, first_name = ?, last_name = ?, email = ?,
                    role_id = ?
                WHERE user_id = ?";
            let done = sqlx::query(query_str)
                .bind(details.username().as_str())
                .bind(password.as_str())
                .bind(details.first_name().as_str())
                .bind(details.last_name().as_str())
                .bind(details.email().as_str())
                .bind(details.role().id())
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

/// Deletes the user with identifier `id` along with its sessions and reimbursements.
///
/// Deleting a user that does not exist is not an error.
pub(crate) async fn delete_user(ex: &mut Executor, id: Id) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("DELETE FROM users WHERE user_id = $1")
                .bind(id.as_i32())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("DELETE FROM users WHERE user_id = ?")
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
