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

//! Employee reimbursement tracking service.
//!
//! Users with the administrator role manage accounts, employees file reimbursement requests and
//! financial managers approve or deny them.  The layers follow the `ers_core` conventions:
//! `model` for the domain types, `db` for persistence, `driver` for the business rules and `rest`
//! for the HTTP API, plus `validator` for the shape checks on untrusted payloads.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use axum::Router;
use log::info;
use std::error::Error;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub mod db;
pub mod driver;
pub mod model;
pub mod rest;
mod validator;

/// Serves the `app` on `bind_addr` until the server fails.
pub async fn serve(bind_addr: impl Into<SocketAddr>, app: Router) -> Result<(), Box<dyn Error>> {
    let bind_addr = bind_addr.into();
    let listener = TcpListener::bind(bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
