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

//! API to terminate the session of the caller.

use crate::driver::Driver;
use crate::rest::get_bearer_auth;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use ers_core::rest::{EmptyBody, RestError};

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<StatusCode, RestError> {
    let token = get_bearer_auth(&headers)?;
    driver.logout(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccessToken, Role};
    use crate::rest::testutils::*;
    use axum::http;
    use ers_core::rest::testutils::*;
    use ers_core::test_payload_must_be_empty;

    fn route() -> (http::Method, String) {
        (http::Method::POST, "/auth/logout".to_owned())
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let token = context.login("jdoe", Role::Employee).await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(context.app(), route())
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("Session not found")
            .await;
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), route())
            .with_bearer_auth(AccessToken::generate().as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::NOT_FOUND)
            .expect_error("Session not found")
            .await;
    }

    #[tokio::test]
    async fn test_malformed_token() {
        let context = TestContext::setup().await;

        OneShotBuilder::new(context.into_app(), route())
            .with_bearer_auth("short")
            .send_empty()
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error("Invalid access token")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route());
}
