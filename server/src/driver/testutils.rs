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

//! Utilities to help testing the driver.

use crate::db;
use crate::driver::{Driver, DriverOptions};
use crate::model::{AccessToken, HashedPassword, Password, Role, Session, User, UserDetails};
use ers_core::clocks::Clock;
use ers_core::clocks::testutils::{SettableClock, utc_datetime};
use ers_core::db::{Db, Executor};
use ers_core::model::{EmailAddress, Username};
use std::sync::Arc;
use time::OffsetDateTime;

/// Password given to all users created by `TestContext::create_user`.
pub(crate) const TEST_PASSWORD: &str = "test0password";

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock used by the driver, which tests can move at will.
    pub(crate) clock: Arc<SettableClock>,

    /// The driver under test.
    driver: Driver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database and a settable clock.
    pub(crate) async fn setup() -> Self {
        Self::setup_with(DriverOptions::default()).await
    }

    /// Same as `setup` but with custom driver options.
    pub(crate) async fn setup_with(opts: DriverOptions) -> Self {
        let db = Arc::new(ers_core::db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let db: Arc<dyn Db + Send + Sync> = db;

        let clock = Arc::new(SettableClock::new(utc_datetime(2023, 5, 10, 9, 0, 0)));
        let driver = Driver::new(db.clone(), clock.clone(), opts);

        Self { db, clock, driver }
    }

    /// Gets a direct executor against the database.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Gets a copy of the driver in this test context.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Syntactic sugar to create a user with `role` whose password is `TEST_PASSWORD`.
    ///
    /// The returned user carries its password hash.
    pub(crate) async fn create_user(&self, username: &'static str, role: Role) -> User {
        let details = UserDetails::new(
            Username::from(username),
            format!("{}-first", username),
            format!("{}-last", username),
            EmailAddress::new(format!("{}@example.com", username)).unwrap(),
            role,
        );
        let password: HashedPassword = Password::from(TEST_PASSWORD).hash().unwrap();
        db::create_user(&mut self.ex().await, details, password).await.unwrap()
    }

    /// Syntactic sugar to open a session for `user` at the current time.
    pub(crate) async fn open_session(&self, user: &User) -> AccessToken {
        let session = Session::new(AccessToken::generate(), user.id(), self.clock_now(), None);
        db::put_session(&mut self.ex().await, &session).await.unwrap();
        session.take_access_token()
    }

    /// Syntactic sugar to create a user with `role` and log them in.
    pub(crate) async fn create_user_and_login(
        &self,
        username: &'static str,
        role: Role,
    ) -> (User, AccessToken) {
        let user = self.create_user(username, role).await;
        let token = self.open_session(&user).await;
        (user.without_password(), token)
    }

    /// Returns the current time of the fake clock.
    pub(crate) fn clock_now(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }
}
