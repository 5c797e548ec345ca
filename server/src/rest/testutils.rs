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

//! Test utilities for the REST API.

use crate::db;
use crate::driver::testutils::TestContext as DriverTestContext;
use crate::model::{
    AccessToken, Amount, Id, Reimbursement, ReimbursementDetails, ReimbursementType, Role, User,
};
use crate::rest::app;
use axum::Router;
use ers_core::db::Executor;

pub(crate) use crate::driver::testutils::TEST_PASSWORD;

/// State of a running test.
pub(crate) struct TestContext {
    /// Driver-level context, which owns the database and the clock.
    inner: DriverTestContext,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Initializes the app on top of an in-memory database.
    pub(crate) async fn setup() -> Self {
        let inner = DriverTestContext::setup().await;
        let app = app(inner.driver());
        Self { inner, app }
    }

    /// Gets a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and transforms it into the app router.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.inner.ex().await
    }

    /// Creates a user with `role` directly in the database.  The returned user has no password.
    pub(crate) async fn create_user(&self, username: &'static str, role: Role) -> User {
        self.inner.create_user(username, role).await.without_password()
    }

    /// Creates a user with `role` and returns an access token for a fresh session.
    pub(crate) async fn login(&self, username: &'static str, role: Role) -> AccessToken {
        self.inner.create_user_and_login(username, role).await.1
    }

    /// Same as `login` but also returns the created user.
    pub(crate) async fn login_user(
        &self,
        username: &'static str,
        role: Role,
    ) -> (User, AccessToken) {
        self.inner.create_user_and_login(username, role).await
    }

    /// Files a pending reimbursement on behalf of `author` directly in the database.
    pub(crate) async fn file_reimbursement(
        &self,
        author: &User,
        amount: f64,
        reimb_type: ReimbursementType,
    ) -> Reimbursement {
        let details = ReimbursementDetails::new(
            Amount::new(amount).unwrap(),
            format!("Expense of {}", amount),
            None,
            reimb_type,
        );
        db::create_reimbursement(
            &mut self.ex().await,
            author.id(),
            author.details().username().clone(),
            self.inner.clock_now(),
            details,
        )
        .await
        .unwrap()
    }

    /// Gets a user directly from the database.
    pub(crate) async fn get_user(&self, id: Id) -> Option<User> {
        db::get_user_by_id(&mut self.ex().await, id).await.unwrap().map(User::without_password)
    }

    /// Gets a reimbursement directly from the database.
    pub(crate) async fn get_reimbursement(&self, id: Id) -> Option<Reimbursement> {
        db::get_reimbursement_by_id(&mut self.ex().await, id).await.unwrap()
    }
}
