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

//! API to open a session for an existing user.

use crate::driver::Driver;
use crate::model::{AccessToken, User};
use crate::rest::get_basic_auth;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use ers_core::rest::{EmptyBody, RestError};
#[cfg(test)]
use serde::Deserialize;
use serde::Serialize;

/// Message returned by the server after a successful login attempt.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub(crate) struct LoginResponse {
    /// Access token for this session.
    pub(crate) access_token: AccessToken,

    /// The user that owns the session.
    pub(crate) user: User,
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<impl IntoResponse, RestError> {
    let (username, password) = get_basic_auth(&headers)?;

    let (session, user) = driver.login(&username, &password).await?;
    let response = LoginResponse { access_token: session.take_access_token(), user };

    Ok(Json(response))
}
