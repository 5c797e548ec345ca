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

//! Extends the driver with the operations on users.

use crate::db;
use crate::driver::{Driver, not_found_as, password_failure, single_unique_key};
use crate::model::{Id, Password, Role, User, UserFields};
use crate::validator::is_valid_object;
use ers_core::db::Executor;
use ers_core::driver::{DriverError, DriverResult};
use ers_core::model::{EmailAddress, Username};
use log::info;
use std::collections::BTreeMap;

/// Properties of a user payload that may be left empty when creating the user.
const NULLABLE_ON_CREATE: &[&str] = &["id", "role"];

/// Properties of a user payload that may be left empty when replacing the user.
const NULLABLE_ON_UPDATE: &[&str] = &["id"];

/// Message returned when the requested username belongs to someone else.
const USERNAME_TAKEN: &str = "The provided username is already taken.";

/// Message returned when the requested email address belongs to someone else.
const EMAIL_TAKEN: &str = "The provided email is already taken.";

/// Fails if `username` or `email` belong to a user other than `except`.
async fn check_availability(
    ex: &mut Executor,
    username: &Username,
    email: &EmailAddress,
    except: Option<Id>,
) -> DriverResult<()> {
    let is_other = |user: &User| Some(user.id()) != except;
    if db::get_user_by_username(ex, username).await?.as_ref().is_some_and(is_other) {
        return Err(DriverError::AlreadyExists(USERNAME_TAKEN.to_owned()));
    }
    if db::get_user_by_email(ex, email).await?.as_ref().is_some_and(is_other) {
        return Err(DriverError::AlreadyExists(EMAIL_TAKEN.to_owned()));
    }
    Ok(())
}

impl Driver {
    /// Gets all users.  Fails with `NotFound` if there are none.
    pub(crate) async fn get_all_users(self) -> DriverResult<Vec<User>> {
        let users = db::get_users(&mut self.db.ex().await?).await?;
        if users.is_empty() {
            return Err(DriverError::NotFound("No users found".to_owned()));
        }
        Ok(users.into_iter().map(User::without_password).collect())
    }

    /// Gets the user whose identifier is the untrusted `id`.
    pub(crate) async fn get_user_by_id(self, id: &str) -> DriverResult<User> {
        let id = Id::parse(id)?;
        match db::get_user_by_id(&mut self.db.ex().await?, id).await? {
            Some(user) => Ok(user.without_password()),
            None => Err(DriverError::NotFound(format!("No user found with id {}", id))),
        }
    }

    /// Gets the user identified by the single key/value pair in `query`.
    pub(crate) async fn get_user_by_unique_key(
        self,
        query: BTreeMap<String, String>,
    ) -> DriverResult<User> {
        let (key, value) = single_unique_key::<UserFields>(&query)?;

        let user = match key {
            "id" => return self.get_user_by_id(value).await,
            "username" => {
                let username = Username::new(value)?;
                db::get_user_by_username(&mut self.db.ex().await?, &username).await?
            }
            "email" => {
                let email = EmailAddress::new(value)?;
                db::get_user_by_email(&mut self.db.ex().await?, &email).await?
            }
            key => return Err(DriverError::InvalidInput(format!("Cannot look up by '{}'", key))),
        };

        match user {
            Some(user) => Ok(user.without_password()),
            None => Err(DriverError::NotFound(format!("No user found with {} {}", key, value))),
        }
    }

    /// Creates a new user out of the untrusted `fields`.
    ///
    /// The identifier in `fields` is ignored and users get the employee role unless `fields`
    /// names a different one.
    pub(crate) async fn add_new_user(self, fields: UserFields) -> DriverResult<User> {
        if !is_valid_object(&fields, NULLABLE_ON_CREATE) {
            return Err(DriverError::InvalidInput(
                "User must have a username, password, first and last names and email".to_owned(),
            ));
        }
        let role = match fields.role.as_deref() {
            None | Some("") => Role::Employee,
            Some(role) => Role::parse(role)?,
        };
        let details = fields.to_details(role)?;
        let password = Password::new(fields.password)?.hash().map_err(password_failure)?;

        let mut tx = self.db.begin().await?;
        check_availability(tx.ex(), details.username(), details.email(), None).await?;
        let user = db::create_user(tx.ex(), details, password).await?;
        tx.commit().await?;

        info!("Created user {} with id {}", user.details().username(), user.id());
        Ok(user.without_password())
    }

    /// Replaces all properties of the user whose identifier is the untrusted `id` with `fields`.
    pub(crate) async fn update_user(self, id: &str, fields: UserFields) -> DriverResult<()> {
        let id = Id::parse(id)?;
        if !is_valid_object(&fields, NULLABLE_ON_UPDATE) {
            return Err(DriverError::InvalidInput(
                "User must have a username, password, first and last names, email and role"
                    .to_owned(),
            ));
        }
        let role = Role::parse(fields.role.as_deref().unwrap_or_default())?;
        let details = fields.to_details(role)?;
        let password = Password::new(fields.password)?.hash().map_err(password_failure)?;

        let mut tx = self.db.begin().await?;
        check_availability(tx.ex(), details.username(), details.email(), Some(id)).await?;
        db::update_user(tx.ex(), id, &details, &password)
            .await
            .map_err(not_found_as(format!("No user found with id {}", id)))?;
        tx.commit().await?;
        Ok(())
    }

    /// Deletes the user whose identifier is the untrusted `id`, if it exists.
    pub(crate) async fn delete_user_by_id(self, id: &str) -> DriverResult<()> {
        let id = Id::parse(id)?;
        db::delete_user(&mut self.db.ex().await?, id).await?;
        info!("Deleted user with id {}", id);
        Ok(())
    }
}
