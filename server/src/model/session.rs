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

//! The `Session` data type.

use crate::model::{AccessToken, Id};
use time::OffsetDateTime;

/// Represents a user session.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    /// The access token for the session, which acts as its identifier.
    access_token: AccessToken,

    /// The user that owns this session.
    user_id: Id,

    /// Timestamp to represent when the session was initiated.
    login_time: OffsetDateTime,

    /// Timestamp to represent when the session was terminated, if it was.
    logout_time: Option<OffsetDateTime>,
}

impl Session {
    /// Creates a new session from its parts.
    pub(crate) fn new(
        access_token: AccessToken,
        user_id: Id,
        login_time: OffsetDateTime,
        logout_time: Option<OffsetDateTime>,
    ) -> Self {
        Self { access_token, user_id, login_time, logout_time }
    }

    /// Returns the session's access token.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Returns the identifier of the user that owns the session.
    pub fn user_id(&self) -> Id {
        self.user_id
    }

    /// Returns the session's login time.
    pub fn login_time(&self) -> OffsetDateTime {
        self.login_time
    }

    /// Returns the session's logout time.
    pub fn logout_time(&self) -> Option<OffsetDateTime> {
        self.logout_time
    }

    /// Consumes the session and extracts its access token.
    pub(crate) fn take_access_token(self) -> AccessToken {
        self.access_token
    }
}
