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

//! REST interface for the reimbursement service.

use crate::driver::Driver;
use axum::Router;
use http::{Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

mod auth_login_post;
mod auth_logout_post;
mod httputils;
mod reimbursement_delete;
mod reimbursement_get;
mod reimbursement_put;
mod reimbursements_get;
mod reimbursements_post;
#[cfg(test)]
mod testutils;
mod user_delete;
mod user_get;
mod user_put;
mod users_get;
mod users_post;

use httputils::{get_basic_auth, get_bearer_auth, require};

/// Creates the CORS policy for browser clients served from any origin.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
}

/// Creates the router for the application.
pub fn app(driver: Driver) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/auth/login", post(auth_login_post::handler))
        .route("/auth/logout", post(auth_logout_post::handler))
        .route("/users", get(users_get::handler).post(users_post::handler))
        .route(
            "/users/:id",
            get(user_get::handler).put(user_put::handler).delete(user_delete::handler),
        )
        .route(
            "/reimbursements",
            get(reimbursements_get::handler).post(reimbursements_post::handler),
        )
        .route(
            "/reimbursements/:id",
            get(reimbursement_get::handler)
                .put(reimbursement_put::handler)
                .delete(reimbursement_delete::handler),
        )
        .with_state(driver)
        .layer(cors())
}

#[cfg(test)]
mod tests {
    use super::auth_login_post::LoginResponse;
    use super::testutils::*;
    use crate::model::{Reimbursement, ReimbursementStatus, Role, User};
    use ers_core::rest::testutils::*;
    use http::{Method, StatusCode, header};
    use serde_json::json;

    #[tokio::test]
    async fn test_cors_preflight() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.app(), (Method::OPTIONS, "/users"))
            .with_header(header::ORIGIN, "http://app.example.com")
            .with_header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
            .with_header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
            .send_empty()
            .await
            .take_response();

        let headers = response.headers();
        assert_eq!("http://app.example.com", headers[header::ACCESS_CONTROL_ALLOW_ORIGIN]);
        assert_eq!("true", headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS]);
        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
        assert!(methods.contains("PUT"), "{}", methods);
        let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS].to_str().unwrap();
        assert!(allowed.contains("authorization"), "{}", allowed);
    }

    #[tokio::test]
    async fn test_cors_simple_request() {
        let context = TestContext::setup().await;

        let response = OneShotBuilder::new(context.app(), (Method::GET, "/users"))
            .with_header(header::ORIGIN, "http://other.example.com")
            .send_empty()
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .take_response();
        assert_eq!(
            "http://other.example.com",
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN]
        );
    }

    #[tokio::test]
    async fn test_e2e_reimbursement_flow() {
        let context = TestContext::setup().await;
        let admin = context.login("root", Role::Admin).await;

        for (username, role) in [("jdoe", "EMPLOYEE"), ("boss", "FINANCIAL MANAGER")] {
            let request = json!({
                "username": username,
                "password": "secret",
                "first_name": "Some",
                "last_name": "Body",
                "email": format!("{}@example.com", username),
                "role": role,
            });
            OneShotBuilder::new(context.app(), (Method::POST, "/users"))
                .with_bearer_auth(admin.as_str())
                .send_json(request)
                .await
                .expect_status(StatusCode::CREATED)
                .expect_json::<User>()
                .await;
        }

        let employee = OneShotBuilder::new(context.app(), (Method::POST, "/auth/login"))
            .with_basic_auth("jdoe", "secret")
            .send_empty()
            .await
            .expect_json::<LoginResponse>()
            .await;
        let manager = OneShotBuilder::new(context.app(), (Method::POST, "/auth/login"))
            .with_basic_auth("boss", "secret")
            .send_empty()
            .await
            .expect_json::<LoginResponse>()
            .await;
        assert_eq!(&Role::FinancialManager, manager.user.details().role());

        let request = json!({
            "amount": 42.5,
            "description": "Hotel",
            "author": "jdoe",
            "type": "LODGING",
        });
        let filed = OneShotBuilder::new(context.app(), (Method::POST, "/reimbursements"))
            .with_bearer_auth(employee.access_token.as_str())
            .send_json(request)
            .await
            .expect_status(StatusCode::CREATED)
            .expect_json::<Reimbursement>()
            .await;

        let path = format!("/reimbursements/{}", filed.id());
        let request = json!({
            "amount": 42.5,
            "description": "Hotel",
            "type": "LODGING",
            "status": "APPROVED",
        });
        OneShotBuilder::new(context.app(), (Method::PUT, &path))
            .with_bearer_auth(manager.access_token.as_str())
            .send_json(request)
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        let approved = OneShotBuilder::new(context.app(), (Method::GET, &path))
            .with_bearer_auth(employee.access_token.as_str())
            .send_empty()
            .await
            .expect_json::<Reimbursement>()
            .await;
        assert_eq!(&ReimbursementStatus::Approved, approved.resolution().status());
        assert_eq!("boss", approved.resolution().resolver().as_ref().unwrap().as_str());

        OneShotBuilder::new(context.app(), (Method::POST, "/auth/logout"))
            .with_bearer_auth(employee.access_token.as_str())
            .send_empty()
            .await
            .expect_status(StatusCode::NO_CONTENT)
            .expect_empty()
            .await;

        OneShotBuilder::new(context.app(), (Method::GET, &path))
            .with_bearer_auth(employee.access_token.as_str())
            .send_empty()
            .await
            .expect_status(StatusCode::UNAUTHORIZED)
            .expect_error("Invalid session")
            .await;
    }
}
