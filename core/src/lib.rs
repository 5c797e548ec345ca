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

//! Shared layers for the expense reimbursement service.
//!
//! The service follows a layered architecture and every crate built on top of this one should
//! define the same modules:
//!
//! 1.  `model`: The base layer.  High-level data types that represent concepts in the domain of
//!     the application, most of them newtypes that validate their contents on construction.
//!
//! 1.  `db`: The persistence layer.  Plain functions that take an `Executor` and issue one or a
//!     few SQL statements against it, converting rows into model types.
//!
//! 1.  `driver`: The business logic layer.  A `Driver` type holds the in-memory state of the app,
//!     validates untrusted input and coordinates access to the database, usually within a single
//!     transaction per operation.
//!
//! 1.  `rest`: The HTTP layer.  An `axum::Router` whose handlers parse requests, enforce role
//!     guards, call into the `Driver` and serialize the results.
//!
//! 1.  `main`: The launcher.  Gathers configuration from environment variables and starts the
//!     server.
//!
//! Every layer has its own result and error types, such as `DbResult` and `DbError`.  Errors float
//! up via the `?` operator and are translated to HTTP status codes once they leave the REST layer.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod clocks;
pub mod db;
pub mod driver;
pub mod env;
pub mod model;
pub mod rest;
