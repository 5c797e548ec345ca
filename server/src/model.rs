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

//! High-level data types.

mod accesstoken;
pub use accesstoken::AccessToken;
mod id;
pub use id::Id;
mod passwords;
pub use passwords::{HashedPassword, Password};
mod reimbursement;
pub use reimbursement::{
    Amount, Reimbursement, ReimbursementDetails, ReimbursementFields, ReimbursementFilter,
    ReimbursementStatus, ReimbursementType, Resolution,
};
mod role;
pub use role::{Guard, Role};
mod session;
pub use session::Session;
mod user;
pub use user::{User, UserDetails, UserFields};
