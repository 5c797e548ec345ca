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

//! API to create a user.

use crate::driver::Driver;
use crate::model::{Guard, UserFields};
use crate::rest::require;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use ers_core::rest::RestError;

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
    Json(fields): Json<UserFields>,
) -> Result<impl IntoResponse, RestError> {
    require(driver.clone(), &headers, Guard::AdminOnly).await?;

    let user = driver.add_new_user(fields).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
