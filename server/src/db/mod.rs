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

//! Database abstraction to manipulate users, sessions and reimbursements.
//!
//! Every function takes an `Executor` and issues the SQL dialect of the backend behind it.  Lookups
//! that may legitimately find nothing return `Option`s, while operations on records that must
//! exist return `DbError::NotFound`.

#[cfg(feature = "postgres")]
use ers_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use ers_core::db::sqlite;
use ers_core::db::{DbResult, Executor};

mod reimbursements;
pub(crate) use reimbursements::*;
mod sessions;
pub(crate) use sessions::*;
mod users;
pub(crate) use users::*;


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}
