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

//! API to delete a user.

use crate::driver::Driver;
use crate::model::Guard;
use crate::rest::require;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use ers_core::rest::{EmptyBody, RestError};

/// DELETE handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    Path(id): Path<String>,
    headers: HeaderMap,
    _: EmptyBody,
) -> Result<StatusCode, RestError> {
    require(driver.clone(), &headers, Guard::AdminOnly).await?;

    driver.delete_user_by_id(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReimbursementType, Role};
    use crate::rest::testutils::*;
    use axum::http;
    use ers_core::rest::testutils::*;
    use ers_core::test_payload_must_be_empty;

    fn route(id: &str) -> (http::Method, String) {
        (http::Method::DELETE, format!("/users/{}", id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let token = context.login("root", Role::Admin).await;
        let user = context.create_user("jdoe", Role::Employee).await;
        let reimbursement = context.file_reimbursement(&user, 5.0, ReimbursementType::Food).await;

        OneShotBuilder::new(context.app(), route(&user.id().to_string()))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        assert!(context.get_user(user.id()).await.is_none());
        assert!(context.get_reimbursement(*reimbursement.id()).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_is_ok() {
        let context = TestContext::setup().await;
        let token = context.login("root", Role::Admin).await;

        OneShotBuilder::new(context.into_app(), route("42"))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::NO_CONTENT)
            .expect_empty()
            .await;
    }

    #[tokio::test]
    async fn test_invalid_id() {
        let context = TestContext::setup().await;
        let token = context.login("root", Role::Admin).await;

        OneShotBuilder::new(context.into_app(), route("0"))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_error("Invalid id")
            .await;
    }

    #[tokio::test]
    async fn test_deleting_self_ends_access() {
        let context = TestContext::setup().await;
        let (admin, token) = context.login_user("root", Role::Admin).await;

        OneShotBuilder::new(context.app(), route(&admin.id().to_string()))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(context.app(), route(&admin.id().to_string()))
            .with_bearer_auth(token.as_str())
            .send_empty()
            .await
            .expect_status(http::StatusCode::UNAUTHORIZED)
            .expect_error("Invalid session")
            .await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route("1"));
}
