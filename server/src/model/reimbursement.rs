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

//! The `Reimbursement` data type and its request payload.

use crate::model::Id;
use crate::validator::Record;
use derive_getters::Getters;
use derive_more::Constructor;
use ers_core::model::{ModelError, ModelResult, Username};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Generates the conversions between a closed enumeration stored as a foreign key and its
/// database identifier and public label.
macro_rules! lookup_enum [
    ( $name:ident, $what:literal, $( $variant:ident = $id:literal => $label:literal ),+ ) => {
        impl $name {
            /// All values of the enumeration, in the order of their identifiers.
            pub const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            /// Maps an identifier as stored in the database.
            pub fn from_id(id: i32) -> ModelResult<Self> {
                match id {
                    $( $id => Ok($name::$variant), )+
                    _ => Err(ModelError(format!("Unknown {} id {}", $what, id))),
                }
            }

            /// Returns the identifier of the value in the database.
            pub fn id(self) -> i32 {
                match self {
                    $( $name::$variant => $id, )+
                }
            }

            /// Returns the public label of the value.
            pub fn label(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )+
                }
            }

            /// Parses a label coming from untrusted input, ignoring case.
            pub fn parse(label: &str) -> ModelResult<Self> {
                let label = label.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|value| value.label().eq_ignore_ascii_case(label))
                    .ok_or_else(|| ModelError(format!("Unknown {} '{}'", $what, label)))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    }
];

/// Processing state of a reimbursement request.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReimbursementStatus {
    /// Waiting for a financial manager.
    Pending,

    /// Accepted for payment.
    Approved,

    /// Rejected.
    Denied,
}

lookup_enum!(
    ReimbursementStatus, "status",
    Pending = 1 => "PENDING",
    Approved = 2 => "APPROVED",
    Denied = 3 => "DENIED"
);

impl ReimbursementStatus {
    /// Returns true if the request has been decided upon.
    pub fn is_resolved(self) -> bool {
        self != ReimbursementStatus::Pending
    }
}

/// Category of an expense.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReimbursementType {
    /// Hotels and similar.
    Lodging,

    /// Transportation.
    Travel,

    /// Meals.
    Food,

    /// Anything else.
    Other,
}

lookup_enum!(
    ReimbursementType, "type",
    Lodging = 1 => "LODGING",
    Travel = 2 => "TRAVEL",
    Food = 3 => "FOOD",
    Other = 4 => "OTHER"
);

/// Money requested by a reimbursement.  Always finite and strictly positive.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct Amount(f64);

impl Amount {
    /// Creates an amount from an untrusted value.
    pub fn new(amount: f64) -> ModelResult<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ModelError(format!("Invalid amount {}", amount)));
        }
        Ok(Self(amount))
    }

    /// Returns the raw value.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl From<Amount> for f64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl TryFrom<f64> for Amount {
    type Error = ModelError;

    fn try_from(amount: f64) -> ModelResult<Self> {
        Amount::new(amount)
    }
}

/// The properties of a reimbursement chosen by its author.
#[derive(Clone, Constructor, Debug, Deserialize, Getters, PartialEq, Serialize)]
pub struct ReimbursementDetails {
    /// Money requested.
    amount: Amount,

    /// Free-form explanation of the expense.
    description: String,

    /// Reference to the receipt backing the expense, if any.
    receipt: Option<String>,

    /// Category of the expense.
    #[serde(rename = "type")]
    reimb_type: ReimbursementType,
}

/// The decision taken on a reimbursement.
#[derive(Clone, Debug, Deserialize, Getters, PartialEq, Serialize)]
pub struct Resolution {
    /// Current state.
    status: ReimbursementStatus,

    /// Who decided on the request.  Unset while pending or if the resolver was deleted.
    resolver: Option<Username>,

    /// When the request was decided upon.  Unset while pending.
    #[serde(with = "time::serde::rfc3339::option")]
    resolved: Option<OffsetDateTime>,
}

impl Resolution {
    /// Creates the resolution of a request that nobody has looked at yet.
    pub fn pending() -> Self {
        Self { status: ReimbursementStatus::Pending, resolver: None, resolved: None }
    }

    /// Creates a resolution from its parts, as read back from the database.
    pub fn new(
        status: ReimbursementStatus,
        resolver: Option<Username>,
        resolved: Option<OffsetDateTime>,
    ) -> Self {
        Self { status, resolver, resolved }
    }
}

/// Representation of a persisted reimbursement request.
#[derive(Clone, Debug, Deserialize, Getters, PartialEq, Serialize)]
pub struct Reimbursement {
    /// Identifier assigned by the database.
    id: Id,

    /// Who asked for the money.
    author: Username,

    /// When the request was filed.
    #[serde(with = "time::serde::rfc3339")]
    submitted: OffsetDateTime,

    /// Properties chosen by the author.
    #[serde(flatten)]
    details: ReimbursementDetails,

    /// Decision taken on the request.
    #[serde(flatten)]
    resolution: Resolution,
}

impl Reimbursement {
    /// Creates a reimbursement from its parts.
    pub(crate) fn new(
        id: Id,
        author: Username,
        submitted: OffsetDateTime,
        details: ReimbursementDetails,
        resolution: Resolution,
    ) -> Self {
        Self { id, author, submitted, details, resolution }
    }
}

/// Optional conditions to select reimbursements.  Unset fields match everything.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReimbursementFilter {
    /// Only return requests in this state.
    pub status: Option<ReimbursementStatus>,

    /// Only return requests of this category.
    pub reimb_type: Option<ReimbursementType>,
}

/// Body of the requests that create or replace a reimbursement.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReimbursementFields {
    /// Identifier, ignored on creation and superseded by the path on updates.
    pub id: Option<i64>,

    /// Money requested.
    pub amount: f64,

    /// Free-form explanation of the expense.
    pub description: String,

    /// Reference to the receipt, if any.
    pub receipt: Option<String>,

    /// Username of the author.
    pub author: String,

    /// Username of the resolver.  Ignored on creation.
    pub resolver: Option<String>,

    /// Status label.  Ignored on creation.
    pub status: Option<String>,

    /// Type label.
    #[serde(rename = "type")]
    pub reimb_type: String,
}

impl ReimbursementFields {
    /// Converts the payload into validated reimbursement details.
    pub(crate) fn to_details(&self) -> ModelResult<ReimbursementDetails> {
        let receipt = self.receipt.clone().filter(|receipt| !receipt.is_empty());
        Ok(ReimbursementDetails::new(
            Amount::new(self.amount)?,
            self.description.clone(),
            receipt,
            ReimbursementType::parse(&self.reimb_type)?,
        ))
    }

    /// Parses the requested status, defaulting to pending when absent.
    pub(crate) fn parse_status(&self) -> ModelResult<ReimbursementStatus> {
        match self.status.as_deref() {
            None | Some("") => Ok(ReimbursementStatus::Pending),
            Some(status) => ReimbursementStatus::parse(status),
        }
    }

    /// Parses the requested resolver, if any.
    pub(crate) fn parse_resolver(&self) -> ModelResult<Option<Username>> {
        match self.resolver.as_deref() {
            None | Some("") => Ok(None),
            Some(resolver) => Ok(Some(Username::new(resolver)?)),
        }
    }
}

impl Record for ReimbursementFields {
    const FIELDS: &'static [&'static str] =
        &["id", "amount", "description", "receipt", "author", "resolver", "status", "type"];
    const UNIQUE_KEYS: &'static [&'static str] = &["id", "author", "resolver"];

    fn has_value(&self, field: &str) -> bool {
        let is_set = |value: &Option<String>| value.as_ref().is_some_and(|v| !v.is_empty());
        match field {
            "id" => self.id.is_some_and(|id| id != 0),
            "amount" => self.amount != 0.0 && !self.amount.is_nan(),
            "description" => !self.description.is_empty(),
            "receipt" => is_set(&self.receipt),
            "author" => !self.author.is_empty(),
            "resolver" => is_set(&self.resolver),
            "status" => is_set(&self.status),
            "type" => !self.reimb_type.is_empty(),
            _ => false,
        }
    }
}
