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

//! Utilities to deal with HTTP authorization.

use crate::driver::Driver;
use crate::model::{AccessToken, Guard, User};
use base64::Engine;
use base64::engine::general_purpose;
use ers_core::rest::{RestError, RestResult, get_unique_header};
use http::header::HeaderMap;

/// Validates that the `Authorization` HTTP header contains a textual payload for the
/// `exp_scheme` scheme and returns it.
fn get_authorization_header<'a>(
    headers: &'a HeaderMap,
    exp_scheme: &'static str,
) -> RestResult<&'a str> {
    let authz = match get_unique_header(headers, "Authorization") {
        Ok(Some(value)) => value,
        Ok(None) => {
            return Err(RestError::Unauthorized("Missing Authorization header".to_owned()));
        }
        Err(e) => return Err(RestError::Unauthorized(e.to_string())),
    };

    let authz = match authz.to_str() {
        Ok(value) => value,
        Err(e) => {
            return Err(RestError::Unauthorized(format!(
                "Bad encoding in Authorization header: {}",
                e
            )));
        }
    };

    let (scheme, payload) = match authz.split_once(' ') {
        Some((scheme, _)) if scheme.is_empty() => {
            return Err(RestError::Unauthorized(
                "Bad Authorization header: missing scheme".to_owned(),
            ));
        }
        Some(parts) => parts,
        None => {
            return Err(RestError::Unauthorized(
                "Bad Authorization header: missing payload".to_owned(),
            ));
        }
    };

    if !scheme.eq_ignore_ascii_case(exp_scheme) {
        return Err(RestError::Unauthorized("Unsupported scheme".to_owned()));
    }

    Ok(payload)
}

/// Assumes that the `headers` contain basic authentication credentials and extracts them.
///
/// The credentials are returned as given so that the caller can validate them.
pub(crate) fn get_basic_auth(headers: &HeaderMap) -> RestResult<(String, String)> {
    let base64_payload = get_authorization_header(headers, "Basic")?;

    let payload = match general_purpose::STANDARD.decode(base64_payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Err(RestError::Unauthorized(format!("Bad base64 encoding in payload: {}", e)));
        }
    };

    let payload = match String::from_utf8(payload) {
        Ok(s) => s,
        Err(e) => {
            return Err(RestError::Unauthorized(format!("Bad UTF-8 encoding in payload: {}", e)));
        }
    };

    match payload.split_once(':') {
        Some((username, password)) => Ok((username.to_owned(), password.to_owned())),
        None => Err(RestError::Unauthorized("Bad content".to_owned())),
    }
}

/// Assumes that the `headers` contain a bearer access token and extracts it.
pub(crate) fn get_bearer_auth(headers: &HeaderMap) -> RestResult<AccessToken> {
    let payload = get_authorization_header(headers, "Bearer")?;
    AccessToken::new(payload).map_err(|e| RestError::Unauthorized(e.to_string()))
}

/// Resolves the principal of the request carrying `headers` and ensures `guard` admits them.
pub(crate) async fn require(
    driver: Driver,
    headers: &HeaderMap,
    guard: Guard,
) -> RestResult<User> {
    let token = get_bearer_auth(headers)?;
    Ok(driver.authorize(token, guard).await?)
}
