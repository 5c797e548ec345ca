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

//! API to list users or to look one up by a unique property.

use crate::driver::Driver;
use crate::model::Guard;
use crate::rest::require;
use crate::validator::is_empty_object;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use ers_core::rest::{EmptyBody, RestError};
use std::collections::BTreeMap;

/// GET handler for this API.
///
/// Without a query, returns all users.  With a single `key=value` query, returns the one user
/// that matches it.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    _: EmptyBody,
) -> Result<Response, RestError> {
    require(driver.clone(), &headers, Guard::AdminOnly).await?;

    if is_empty_object(&query) {
        let users = driver.get_all_users().await?;
        Ok(Json(users).into_response())
    } else {
        let user = driver.get_user_by_unique_key(query).await?;
        Ok(Json(user).into_response())
    }
}
