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

//! Extends the driver with authentication and authorization.

use crate::db;
use crate::driver::{Driver, not_found_as, password_failure};
use crate::model::{AccessToken, Guard, Password, Role, Session, User, UserDetails};
use crate::validator::is_valid_strings;
use ers_core::db::Executor;
use ers_core::driver::{DriverError, DriverResult};
use ers_core::model::{EmailAddress, Username};
use log::{info, warn};

/// Message returned for any credentials that do not match a user.
const BAD_CREDENTIALS: &str = "Bad credentials provided.";

/// Message returned for access tokens that do not match a live session.
const INVALID_SESSION: &str = "Invalid session";

/// Checks that the untrusted `username` and `password` belong to a user and returns it.
///
/// The returned user carries its password hash.
async fn check_credentials(
    ex: &mut Executor,
    username: &str,
    password: &str,
) -> DriverResult<User> {
    if !is_valid_strings(&[username, password]) {
        return Err(DriverError::InvalidInput("Username and password are required".to_owned()));
    }

    // Values that cannot be valid cannot match any stored user either.
    let bad_credentials = |_| DriverError::Unauthenticated(BAD_CREDENTIALS.to_owned());
    let username = Username::new(username).map_err(bad_credentials)?;
    let password = Password::new(password).map_err(bad_credentials)?;

    let user = match db::get_user_by_username(ex, &username).await? {
        Some(user) => user,
        None => return Err(DriverError::Unauthenticated(BAD_CREDENTIALS.to_owned())),
    };
    let matches = match user.password() {
        Some(hash) => password.verify(hash).map_err(password_failure)?,
        None => false,
    };
    if !matches {
        return Err(DriverError::Unauthenticated(BAD_CREDENTIALS.to_owned()));
    }
    Ok(user)
}

impl Driver {
    /// Returns the user that matches the untrusted `username` and `password`, without its password.
    pub(crate) async fn authenticate_user(
        self,
        username: &str,
        password: &str,
    ) -> DriverResult<User> {
        let user = check_credentials(&mut self.db.ex().await?, username, password).await?;
        Ok(user.without_password())
    }

    /// Authenticates the untrusted `username` and `password` and opens a new session for them.
    pub(crate) async fn login(
        self,
        username: &str,
        password: &str,
    ) -> DriverResult<(Session, User)> {
        let mut tx = self.db.begin().await?;
        let user = check_credentials(tx.ex(), username, password).await?;

        let session = Session::new(AccessToken::generate(), user.id(), self.clock.now_utc(), None);
        db::put_session(tx.ex(), &session).await?;
        tx.commit().await?;

        info!("User {} logged in", user.details().username());
        Ok((session, user.without_password()))
    }

    /// Terminates the session identified by `token`.
    pub(crate) async fn logout(self, token: AccessToken) -> DriverResult<()> {
        let now = self.clock.now_utc();
        db::delete_session(&mut self.db.ex().await?, &token, now)
            .await
            .map_err(not_found_as("Session not found".to_owned()))
    }

    /// Resolves the user that owns the session identified by `token` and checks that the `guard`
    /// lets them through.
    pub(crate) async fn authorize(self, token: AccessToken, guard: Guard) -> DriverResult<User> {
        let mut ex = self.db.ex().await?;
        let now = self.clock.now_utc();

        let session = match db::get_session(&mut ex, &token).await? {
            Some(session) => session,
            None => return Err(DriverError::Unauthenticated(INVALID_SESSION.to_owned())),
        };

        let login_time = session.login_time();
        let expired = login_time < (now - self.opts.session_max_age);
        let skew = login_time > (now + self.opts.session_max_skew);
        if expired || skew {
            return Err(DriverError::Unauthenticated(
                "Session expired; please log in again".to_owned(),
            ));
        }

        let user = match db::get_user_by_id(&mut ex, session.user_id()).await? {
            Some(user) => user,
            None => return Err(DriverError::Unauthenticated(INVALID_SESSION.to_owned())),
        };

        if !guard.allows(*user.details().role()) {
            return Err(DriverError::Forbidden(format!(
                "Role {} cannot perform this operation",
                user.details().role()
            )));
        }
        Ok(user.without_password())
    }

    /// Creates an administrator account named `username` unless a user with that name exists.
    ///
    /// Returns true if the account was created.
    pub async fn bootstrap_admin(
        self,
        username: Username,
        password: Password,
        email: EmailAddress,
    ) -> DriverResult<bool> {
        let mut tx = self.db.begin().await?;

        if let Some(user) = db::get_user_by_username(tx.ex(), &username).await? {
            if *user.details().role() != Role::Admin {
                warn!("Bootstrap user {} exists but is not an administrator", username);
            }
            return Ok(false);
        }

        let details = UserDetails::new(
            username,
            "System".to_owned(),
            "Administrator".to_owned(),
            email,
            Role::Admin,
        );
        let password = password.hash().map_err(password_failure)?;
        let user = db::create_user(tx.ex(), details, password).await?;
        tx.commit().await?;

        info!("Created administrator {} with id {}", user.details().username(), user.id());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::DriverOptions;
    use crate::driver::testutils::*;
    use crate::model::HashedPassword;
    use std::time::Duration;

    #[tokio::test]
    async fn test_authenticate_user_ok() {
        let context = TestContext::setup().await;
        let user = context.create_user("jdoe", Role::Employee).await;

        let found = context.driver().authenticate_user("jdoe", TEST_PASSWORD).await.unwrap();
        assert_eq!(user.without_password(), found);
        assert!(found.password().is_none());
    }

    #[tokio::test]
    async fn test_authenticate_user_empty_inputs() {
        let context = TestContext::setup().await;
        for (username, password) in [("user", ""), ("", "pw"), ("", "")] {
            match context.driver().authenticate_user(username, password).await {
                Err(DriverError::InvalidInput(_)) => (),
                e => panic!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_authenticate_user_bad_credentials() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;

        for (username, password) in
            [("jdoe", "wrong"), ("ghost", TEST_PASSWORD), ("bad name", TEST_PASSWORD)]
        {
            match context.driver().authenticate_user(username, password).await {
                Err(DriverError::Unauthenticated(msg)) => assert_eq!(BAD_CREDENTIALS, msg),
                e => panic!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_authenticate_user_corrupt_hash() {
        let context = TestContext::setup().await;
        let details = UserDetails::new(
            Username::from("jdoe"),
            "John".to_owned(),
            "Doe".to_owned(),
            EmailAddress::from("jdoe@example.com"),
            Role::Employee,
        );
        db::create_user(&mut context.ex().await, details, HashedPassword::new("not-bcrypt"))
            .await
            .unwrap();

        match context.driver().authenticate_user("jdoe", TEST_PASSWORD).await {
            Err(DriverError::BackendError(msg)) => assert_eq!("Internal server error", msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_login_ok() {
        let context = TestContext::setup().await;
        let user = context.create_user("jdoe", Role::Employee).await;

        let (session, logged_in) = context.driver().login("JDOE", TEST_PASSWORD).await.unwrap();
        assert_eq!(user.without_password(), logged_in);
        assert_eq!(logged_in.id(), session.user_id());
        assert_eq!(context.clock_now(), session.login_time());

        let stored =
            db::get_session(&mut context.ex().await, session.access_token()).await.unwrap();
        assert_eq!(Some(session), stored);
    }

    #[tokio::test]
    async fn test_login_bad_password() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;
        match context.driver().login("jdoe", "nope").await {
            Err(DriverError::Unauthenticated(msg)) => assert_eq!(BAD_CREDENTIALS, msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_logout_ok() {
        let context = TestContext::setup().await;
        let (_user, token) = context.create_user_and_login("jdoe", Role::Employee).await;

        context.driver().logout(token.clone()).await.unwrap();
        assert_eq!(None, db::get_session(&mut context.ex().await, &token).await.unwrap());

        match context.driver().logout(token).await {
            Err(DriverError::NotFound(msg)) => assert_eq!("Session not found", msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_authorize_ok() {
        let context = TestContext::setup().await;
        let (user, token) = context.create_user_and_login("jdoe", Role::Employee).await;
        let found = context.driver().authorize(token, Guard::Staff).await.unwrap();
        assert_eq!(user, found);
    }

    #[tokio::test]
    async fn test_authorize_unknown_session() {
        let context = TestContext::setup().await;
        match context.driver().authorize(AccessToken::generate(), Guard::Authenticated).await {
            Err(DriverError::Unauthenticated(msg)) => assert_eq!(INVALID_SESSION, msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_authorize_after_logout() {
        let context = TestContext::setup().await;
        let (_user, token) = context.create_user_and_login("jdoe", Role::Employee).await;
        context.driver().logout(token.clone()).await.unwrap();
        match context.driver().authorize(token, Guard::Authenticated).await {
            Err(DriverError::Unauthenticated(msg)) => assert_eq!(INVALID_SESSION, msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_authorize_expiration_and_skew() {
        let opts = DriverOptions {
            session_max_age: Duration::from_secs(24 * 3600),
            session_max_skew: Duration::from_secs(3600),
        };
        let context = TestContext::setup_with(opts).await;
        let (_user, token) = context.create_user_and_login("jdoe", Role::Employee).await;
        let login_time = context.clock_now();

        for delta in [-50 * 60, 0, 10 * 60, 23 * 3600] {
            context.clock.set(login_time + time::Duration::seconds(delta));
            context.driver().authorize(token.clone(), Guard::Authenticated).await.unwrap();
        }

        for delta in [-2 * 3600, 25 * 3600] {
            context.clock.set(login_time + time::Duration::seconds(delta));
            match context.driver().authorize(token.clone(), Guard::Authenticated).await {
                Err(DriverError::Unauthenticated(msg)) => assert!(msg.contains("expired")),
                e => panic!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_authorize_wrong_role() {
        let context = TestContext::setup().await;
        let (_user, token) = context.create_user_and_login("jdoe", Role::Employee).await;
        match context.driver().authorize(token, Guard::AdminOnly).await {
            Err(DriverError::Forbidden(msg)) => assert!(msg.contains("EMPLOYEE")),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_authorize_locked_user() {
        let context = TestContext::setup().await;
        let (_user, token) = context.create_user_and_login("jdoe", Role::Locked).await;
        match context.driver().authorize(token, Guard::Authenticated).await {
            Err(DriverError::Forbidden(_)) => (),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_authorize_deleted_user() {
        let context = TestContext::setup().await;
        let (user, token) = context.create_user_and_login("jdoe", Role::Admin).await;
        db::delete_user(&mut context.ex().await, user.id()).await.unwrap();
        match context.driver().authorize(token, Guard::AdminOnly).await {
            Err(DriverError::Unauthenticated(_)) => (),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_bootstrap_admin() {
        let context = TestContext::setup().await;
        let username = Username::from("root");
        let email = EmailAddress::from("root@example.com");

        assert!(
            context
                .driver()
                .bootstrap_admin(username.clone(), Password::from("pw"), email.clone())
                .await
                .unwrap()
        );
        assert!(
            !context
                .driver()
                .bootstrap_admin(username.clone(), Password::from("other"), email)
                .await
                .unwrap()
        );

        let user = context.driver().authenticate_user("root", "pw").await.unwrap();
        assert_eq!(&Role::Admin, user.details().role());
    }
}
