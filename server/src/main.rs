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

//! Entry point to the reimbursement service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use ers_core::clocks::SystemClock;
use ers_core::db::Db;
use ers_core::db::postgres::{PostgresDb, PostgresOptions};
use ers_core::env::get_optional_var;
use ers_core::model::{EmailAddress, Username};
use ers_server::db::init_schema;
use ers_server::driver::{Driver, DriverOptions};
use ers_server::model::Password;
use ers_server::rest::app;
use ers_server::serve;
use std::error::Error;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Port to listen on when `ERS_PORT` is not set.
const DEFAULT_PORT: u16 = 3000;

/// Credentials of the administrator account to create at startup.
type AdminAccount = (Username, Password, EmailAddress);

/// Reads the administrator account to bootstrap from the `ERS_ADMIN_*` variables, if any.
fn admin_from_env() -> Result<Option<AdminAccount>, Box<dyn Error>> {
    let username = get_optional_var::<String>("ERS_ADMIN", "USERNAME")?;
    let password = get_optional_var::<String>("ERS_ADMIN", "PASSWORD")?;
    let email = get_optional_var::<String>("ERS_ADMIN", "EMAIL")?;
    match (username, password, email) {
        (Some(username), Some(password), Some(email)) => Ok(Some((
            Username::new(username)?,
            Password::new(password)?,
            EmailAddress::new(email)?,
        ))),
        (None, None, None) => Ok(None),
        _ => Err("ERS_ADMIN_USERNAME, ERS_ADMIN_PASSWORD and ERS_ADMIN_EMAIL go together".into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let port = get_optional_var::<u16>("ERS", "PORT")?.unwrap_or(DEFAULT_PORT);
    let driver_opts = DriverOptions::from_env("ERS")?;
    let admin = admin_from_env()?;

    let db_opts = PostgresOptions::from_env("PGSQL_PROD")?;
    let db = Arc::new(PostgresDb::connect(db_opts)?);
    init_schema(&mut db.ex().await?).await?;
    let db: Arc<dyn Db + Send + Sync> = db;

    let driver = Driver::new(db.clone(), Arc::new(SystemClock::default()), driver_opts);
    if let Some((username, password, email)) = admin {
        driver.clone().bootstrap_admin(username, password, email).await?;
    }

    let result = serve((Ipv4Addr::UNSPECIFIED, port), app(driver)).await;
    db.close().await;
    result
}
