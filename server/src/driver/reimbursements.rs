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

//! Extends the driver with the operations on reimbursements.

use crate::db;
use crate::driver::{Driver, not_found_as, single_unique_key};
use crate::model::{
    Guard, Id, Reimbursement, ReimbursementFields, ReimbursementFilter, ReimbursementStatus,
    ReimbursementType, User,
};
use crate::validator::is_valid_object;
use ers_core::db::Executor;
use ers_core::driver::{DriverError, DriverResult};
use ers_core::model::Username;
use log::info;
use std::collections::BTreeMap;

/// Properties of a reimbursement payload that may be left empty when filing the request.
const NULLABLE_ON_CREATE: &[&str] = &["id", "receipt", "resolver", "status"];

/// Properties of a reimbursement payload that may be left empty when replacing the request.
const NULLABLE_ON_UPDATE: &[&str] = &["id", "author", "receipt", "resolver"];

/// Resolves `username` to the identifier of an existing user that may resolve reimbursements.
async fn lookup_resolver_id(ex: &mut Executor, username: &Username) -> DriverResult<Id> {
    match db::get_user_by_username(ex, username).await? {
        Some(user) if Guard::FinanceOnly.allows(*user.details().role()) => Ok(user.id()),
        Some(_) => Err(DriverError::InvalidInput(format!(
            "Resolver '{}' is not a financial manager",
            username
        ))),
        None => Err(DriverError::InvalidInput(format!("Unknown resolver '{}'", username))),
    }
}

impl Driver {
    /// Gets all reimbursements.  Fails with `NotFound` if there are none.
    pub(crate) async fn get_all_reimbursements(self) -> DriverResult<Vec<Reimbursement>> {
        let filter = ReimbursementFilter::default();
        let reimbursements = db::get_reimbursements(&mut self.db.ex().await?, filter).await?;
        if reimbursements.is_empty() {
            return Err(DriverError::NotFound("No reimbursements found".to_owned()));
        }
        Ok(reimbursements)
    }

    /// Gets the reimbursement whose identifier is the untrusted `id`.
    pub(crate) async fn get_reimbursement_by_id(self, id: &str) -> DriverResult<Reimbursement> {
        let id = Id::parse(id)?;
        match db::get_reimbursement_by_id(&mut self.db.ex().await?, id).await? {
            Some(reimbursement) => Ok(reimbursement),
            None => Err(DriverError::NotFound(format!("No reimbursement found with id {}", id))),
        }
    }

    /// Gets the reimbursement identified by the single key/value pair in `query`.
    ///
    /// Lookups by author or resolver return the oldest matching reimbursement.
    pub(crate) async fn get_reimbursement_by_unique_key(
        self,
        query: BTreeMap<String, String>,
    ) -> DriverResult<Reimbursement> {
        let (key, value) = single_unique_key::<ReimbursementFields>(&query)?;

        let reimbursement = match key {
            "id" => return self.get_reimbursement_by_id(value).await,
            "author" => {
                let author = Username::new(value)?;
                db::get_reimbursement_by_author(&mut self.db.ex().await?, &author).await?
            }
            "resolver" => {
                let resolver = Username::new(value)?;
                db::get_reimbursement_by_resolver(&mut self.db.ex().await?, &resolver).await?
            }
            key => return Err(DriverError::InvalidInput(format!("Cannot look up by '{}'", key))),
        };

        match reimbursement {
            Some(reimbursement) => Ok(reimbursement),
            None => Err(DriverError::NotFound(format!(
                "No reimbursement found with {} {}",
                key, value
            ))),
        }
    }

    /// Gets the reimbursements that match the untrusted `status` and `reimb_type` labels.
    ///
    /// Absent filters match everything and an empty result is not an error.
    pub(crate) async fn get_reimbursements_by_filter(
        self,
        status: Option<&str>,
        reimb_type: Option<&str>,
    ) -> DriverResult<Vec<Reimbursement>> {
        let filter = ReimbursementFilter {
            status: status.map(ReimbursementStatus::parse).transpose()?,
            reimb_type: reimb_type.map(ReimbursementType::parse).transpose()?,
        };
        Ok(db::get_reimbursements(&mut self.db.ex().await?, filter).await?)
    }

    /// Files a new reimbursement request out of the untrusted `fields` on behalf of `acting`,
    /// who must be the author named in `fields`.
    ///
    /// The request starts as pending regardless of the resolution details in `fields`.
    pub(crate) async fn add_new_reimbursement(
        self,
        fields: ReimbursementFields,
        acting: &User,
    ) -> DriverResult<Reimbursement> {
        if !is_valid_object(&fields, NULLABLE_ON_CREATE) {
            return Err(DriverError::InvalidInput(
                "Reimbursement must have an amount, description, author and type".to_owned(),
            ));
        }
        let details = fields.to_details()?;
        let author = Username::new(fields.author)?;
        if &author != acting.details().username() {
            return Err(DriverError::Forbidden(format!(
                "User {} cannot file reimbursements on behalf of {}",
                acting.details().username(),
                author
            )));
        }
        let now = self.clock.now_utc();

        let reimbursement =
            db::create_reimbursement(&mut self.db.ex().await?, acting.id(), author, now, details)
                .await?;

        info!(
            "Reimbursement {} filed by {} for {}",
            reimbursement.id(),
            reimbursement.author(),
            reimbursement.details().amount().as_f64()
        );
        Ok(reimbursement)
    }

    /// Replaces the details and the resolution of the reimbursement whose identifier is the
    /// untrusted `id` with `fields`, on behalf of `acting`.
    ///
    /// Resolving a request stamps it with the current time and, unless `fields` names another
    /// financial manager, with `acting` as the resolver.  Moving a request back to pending clears
    /// both.
    pub(crate) async fn update_reimbursement(
        self,
        id: &str,
        fields: ReimbursementFields,
        acting: &User,
    ) -> DriverResult<()> {
        let id = Id::parse(id)?;
        if !is_valid_object(&fields, NULLABLE_ON_UPDATE) {
            return Err(DriverError::InvalidInput(
                "Reimbursement must have an amount, description, status and type".to_owned(),
            ));
        }
        let details = fields.to_details()?;
        let status = fields.parse_status()?;
        let resolver = fields.parse_resolver()?;

        let mut tx = self.db.begin().await?;
        let (resolver_id, resolved) = if status.is_resolved() {
            let resolver_id = match resolver {
                Some(resolver) if &resolver != acting.details().username() => {
                    lookup_resolver_id(tx.ex(), &resolver).await?
                }
                _ => acting.id(),
            };
            (Some(resolver_id), Some(self.clock.now_utc()))
        } else {
            (None, None)
        };
        db::update_reimbursement(tx.ex(), id, &details, status, resolver_id, resolved)
            .await
            .map_err(not_found_as(format!("No reimbursement found with id {}", id)))?;
        tx.commit().await?;

        info!("Reimbursement {} set to {} by {}", id, status, acting.details().username());
        Ok(())
    }

    /// Deletes the reimbursement whose identifier is the untrusted `id`, if it exists.
    pub(crate) async fn delete_reimbursement_by_id(self, id: &str) -> DriverResult<()> {
        let id = Id::parse(id)?;
        db::delete_reimbursement(&mut self.db.ex().await?, id).await?;
        info!("Deleted reimbursement with id {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testutils::*;
    use crate::model::Role;

    /// Builds a valid payload for a reimbursement filed by `author`.
    fn fields(author: &str, amount: f64, reimb_type: &str) -> ReimbursementFields {
        ReimbursementFields {
            amount,
            description: format!("Expense of {}", amount),
            author: author.to_owned(),
            reimb_type: reimb_type.to_owned(),
            ..Default::default()
        }
    }

    /// Builds a payload that replaces a reimbursement with `status`.
    fn resolution(status: &str, resolver: Option<&str>) -> ReimbursementFields {
        ReimbursementFields {
            amount: 12.5,
            description: "Taxi".to_owned(),
            receipt: Some("receipt-1".to_owned()),
            resolver: resolver.map(str::to_owned),
            status: Some(status.to_owned()),
            reimb_type: "TRAVEL".to_owned(),
            ..Default::default()
        }
    }

    /// Looks up the stored user called `username`.
    async fn user(context: &TestContext, username: &str) -> User {
        let username = Username::new(username).unwrap();
        db::get_user_by_username(&mut context.ex().await, &username).await.unwrap().unwrap()
    }

    /// Files a reimbursement through the driver on behalf of its author.
    async fn file(context: &TestContext, author: &str, amount: f64, t: &str) -> Reimbursement {
        let acting = user(context, author).await;
        context.driver().add_new_reimbursement(fields(author, amount, t), &acting).await.unwrap()
    }

    /// Builds a single-entry lookup query.
    fn query(key: &str, value: &str) -> BTreeMap<String, String> {
        let mut query = BTreeMap::default();
        query.insert(key.to_owned(), value.to_owned());
        query
    }

    #[tokio::test]
    async fn test_get_all_reimbursements_empty() {
        let context = TestContext::setup().await;
        match context.driver().get_all_reimbursements().await {
            Err(DriverError::NotFound(msg)) => assert_eq!("No reimbursements found", msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_add_and_get_all_reimbursements() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;

        let r1 = file(&context, "jdoe", 10.0, "food").await;
        let r2 = file(&context, "JDOE", 20.0, "LODGING").await;
        assert_eq!(&ReimbursementStatus::Pending, r1.resolution().status());
        assert_eq!(&context.clock_now(), r1.submitted());
        assert_eq!("jdoe", r2.author().as_str());
        assert_eq!(&ReimbursementType::Lodging, r2.details().reimb_type());

        let all = context.driver().get_all_reimbursements().await.unwrap();
        assert_eq!(vec![r1, r2], all);
    }

    #[tokio::test]
    async fn test_add_new_reimbursement_ignores_resolution() {
        let context = TestContext::setup().await;
        let jdoe = context.create_user("jdoe", Role::Employee).await;
        context.create_user("boss", Role::FinancialManager).await;

        let mut fields = fields("jdoe", 10.0, "OTHER");
        fields.status = Some("APPROVED".to_owned());
        fields.resolver = Some("boss".to_owned());
        let reimbursement = context.driver().add_new_reimbursement(fields, &jdoe).await.unwrap();
        assert_eq!(&ReimbursementStatus::Pending, reimbursement.resolution().status());
        assert_eq!(&None, reimbursement.resolution().resolver());
        assert_eq!(&None, reimbursement.resolution().resolved());
    }

    #[tokio::test]
    async fn test_add_new_reimbursement_invalid_shape() {
        let context = TestContext::setup().await;
        let jdoe = context.create_user("jdoe", Role::Employee).await;

        let mutations: [fn(&mut ReimbursementFields); 4] = [
            |f| f.amount = 0.0,
            |f| f.description.clear(),
            |f| f.author.clear(),
            |f| f.reimb_type.clear(),
        ];
        for mutate in mutations {
            let mut fields = fields("jdoe", 10.0, "FOOD");
            mutate(&mut fields);
            match context.driver().add_new_reimbursement(fields, &jdoe).await {
                Err(DriverError::InvalidInput(_)) => (),
                e => panic!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_add_new_reimbursement_invalid_values() {
        let context = TestContext::setup().await;
        let jdoe = context.create_user("jdoe", Role::Employee).await;

        for (amount, reimb_type, exp_error) in
            [(-3.0, "FOOD", "amount"), (f64::INFINITY, "FOOD", "amount"), (5.0, "GIFT", "GIFT")]
        {
            let fields = fields("jdoe", amount, reimb_type);
            match context.driver().add_new_reimbursement(fields, &jdoe).await {
                Err(DriverError::InvalidInput(msg)) => assert!(msg.contains(exp_error), "{}", msg),
                e => panic!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_add_new_reimbursement_for_someone_else() {
        let context = TestContext::setup().await;
        let jdoe = context.create_user("jdoe", Role::Employee).await;
        let boss = context.create_user("boss", Role::FinancialManager).await;

        for (acting, author) in [(&jdoe, "boss"), (&boss, "jdoe"), (&jdoe, "ghost")] {
            match context.driver().add_new_reimbursement(fields(author, 1.0, "FOOD"), acting).await
            {
                Err(DriverError::Forbidden(msg)) => {
                    assert!(msg.contains("on behalf of"), "{}", msg)
                }
                e => panic!("{:?}", e),
            }
        }
        assert!(db::get_reimbursements(&mut context.ex().await, ReimbursementFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_get_reimbursement_by_id() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;
        let reimbursement = file(&context, "jdoe", 10.0, "FOOD").await;

        let id = reimbursement.id().to_string();
        assert_eq!(reimbursement, context.driver().get_reimbursement_by_id(&id).await.unwrap());

        match context.driver().get_reimbursement_by_id("77").await {
            Err(DriverError::NotFound(msg)) => {
                assert_eq!("No reimbursement found with id 77", msg)
            }
            e => panic!("{:?}", e),
        }
        for id in ["0", "-2", "0.5", "NaN"] {
            match context.driver().get_reimbursement_by_id(id).await {
                Err(DriverError::InvalidInput(_)) => (),
                e => panic!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_get_reimbursement_by_unique_key() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;
        let boss = context.create_user("boss", Role::FinancialManager).await;
        let first = file(&context, "jdoe", 10.0, "FOOD").await;
        let second = file(&context, "jdoe", 20.0, "FOOD").await;

        let id = second.id().to_string();
        context
            .driver()
            .update_reimbursement(&id, resolution("DENIED", None), &boss)
            .await
            .unwrap();

        let by_author = context.driver().get_reimbursement_by_unique_key(query("author", "jdoe"));
        assert_eq!(first, by_author.await.unwrap());

        let by_id = context.driver().get_reimbursement_by_unique_key(query("id", &id));
        let second = by_id.await.unwrap();
        assert_eq!(&ReimbursementStatus::Denied, second.resolution().status());

        let by_resolver =
            context.driver().get_reimbursement_by_unique_key(query("resolver", "boss"));
        assert_eq!(second, by_resolver.await.unwrap());

        match context.driver().get_reimbursement_by_unique_key(query("resolver", "jdoe")).await {
            Err(DriverError::NotFound(msg)) => {
                assert_eq!("No reimbursement found with resolver jdoe", msg)
            }
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_get_reimbursement_by_unique_key_bad_keys() {
        let context = TestContext::setup().await;
        for (key, exp_error) in [
            ("color", "Unknown property 'color'"),
            ("amount", "does not identify a single record"),
        ] {
            match context.driver().get_reimbursement_by_unique_key(query(key, "1")).await {
                Err(DriverError::InvalidInput(msg)) => assert!(msg.contains(exp_error), "{}", msg),
                e => panic!("{:?}", e),
            }
        }
    }

    #[tokio::test]
    async fn test_get_reimbursements_by_filter() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;
        let boss = context.create_user("boss", Role::FinancialManager).await;
        let food = file(&context, "jdoe", 10.0, "FOOD").await;
        let travel = file(&context, "jdoe", 20.0, "TRAVEL").await;
        let other = file(&context, "jdoe", 30.0, "OTHER").await;

        let id = other.id().to_string();
        context
            .driver()
            .update_reimbursement(&id, resolution("APPROVED", None), &boss)
            .await
            .unwrap();

        let all = context.driver().get_reimbursements_by_filter(None, None).await.unwrap();
        assert_eq!(3, all.len());

        let pending =
            context.driver().get_reimbursements_by_filter(Some("pending"), None).await.unwrap();
        assert_eq!(vec![food.clone(), travel.clone()], pending);

        let travel_only =
            context.driver().get_reimbursements_by_filter(None, Some("TRAVEL")).await.unwrap();
        assert_eq!(2, travel_only.len());

        let both = context
            .driver()
            .get_reimbursements_by_filter(Some("PENDING"), Some("TRAVEL"))
            .await
            .unwrap();
        assert_eq!(vec![travel], both);

        let none = context
            .driver()
            .get_reimbursements_by_filter(Some("DENIED"), None)
            .await
            .unwrap();
        assert!(none.is_empty());

        match context.driver().get_reimbursements_by_filter(Some("LOST"), None).await {
            Err(DriverError::InvalidInput(msg)) => assert!(msg.contains("LOST")),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_update_reimbursement_resolves_with_acting_user() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;
        let boss = context.create_user("boss", Role::FinancialManager).await;
        let reimbursement = file(&context, "jdoe", 10.0, "FOOD").await;

        context.clock.advance(std::time::Duration::from_secs(60));
        let id = reimbursement.id().to_string();
        context
            .driver()
            .update_reimbursement(&id, resolution("approved", None), &boss)
            .await
            .unwrap();

        let updated = context.driver().get_reimbursement_by_id(&id).await.unwrap();
        assert_eq!(reimbursement.submitted(), updated.submitted());
        assert_eq!(reimbursement.author(), updated.author());
        assert_eq!(12.5, updated.details().amount().as_f64());
        assert_eq!(&Some("receipt-1".to_owned()), updated.details().receipt());
        assert_eq!(&ReimbursementType::Travel, updated.details().reimb_type());
        assert_eq!(&ReimbursementStatus::Approved, updated.resolution().status());
        assert_eq!(&Some(Username::from("boss")), updated.resolution().resolver());
        assert_eq!(&Some(context.clock_now()), updated.resolution().resolved());
    }

    #[tokio::test]
    async fn test_update_reimbursement_named_resolver() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;
        let boss = context.create_user("boss", Role::FinancialManager).await;
        context.create_user("other", Role::FinancialManager).await;
        let reimbursement = file(&context, "jdoe", 10.0, "FOOD").await;

        let id = reimbursement.id().to_string();
        context
            .driver()
            .update_reimbursement(&id, resolution("DENIED", Some("other")), &boss)
            .await
            .unwrap();
        let updated = context.driver().get_reimbursement_by_id(&id).await.unwrap();
        assert_eq!(&Some(Username::from("other")), updated.resolution().resolver());

        match context
            .driver()
            .update_reimbursement(&id, resolution("DENIED", Some("ghost")), &boss)
            .await
        {
            Err(DriverError::InvalidInput(msg)) => assert_eq!("Unknown resolver 'ghost'", msg),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_update_reimbursement_resolver_must_be_financial_manager() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;
        context.create_user("root", Role::Admin).await;
        let boss = context.create_user("boss", Role::FinancialManager).await;
        let reimbursement = file(&context, "jdoe", 10.0, "FOOD").await;

        let id = reimbursement.id().to_string();
        for resolver in ["jdoe", "root"] {
            match context
                .driver()
                .update_reimbursement(&id, resolution("APPROVED", Some(resolver)), &boss)
                .await
            {
                Err(DriverError::InvalidInput(msg)) => assert_eq!(
                    format!("Resolver '{}' is not a financial manager", resolver),
                    msg
                ),
                e => panic!("{:?}", e),
            }
        }

        let unchanged = context.driver().get_reimbursement_by_id(&id).await.unwrap();
        assert_eq!(reimbursement, unchanged);
    }

    #[tokio::test]
    async fn test_update_reimbursement_back_to_pending() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;
        let boss = context.create_user("boss", Role::FinancialManager).await;
        let reimbursement = file(&context, "jdoe", 10.0, "FOOD").await;

        let id = reimbursement.id().to_string();
        for status in ["APPROVED", "PENDING"] {
            context
                .driver()
                .update_reimbursement(&id, resolution(status, Some("boss")), &boss)
                .await
                .unwrap();
        }
        let updated = context.driver().get_reimbursement_by_id(&id).await.unwrap();
        assert_eq!(&ReimbursementStatus::Pending, updated.resolution().status());
        assert_eq!(&None, updated.resolution().resolver());
        assert_eq!(&None, updated.resolution().resolved());
    }

    #[tokio::test]
    async fn test_update_reimbursement_errors() {
        let context = TestContext::setup().await;
        let boss = context.create_user("boss", Role::FinancialManager).await;

        match context.driver().update_reimbursement("5", resolution("DENIED", None), &boss).await {
            Err(DriverError::NotFound(msg)) => {
                assert_eq!("No reimbursement found with id 5", msg)
            }
            e => panic!("{:?}", e),
        }

        let mut fields = resolution("DENIED", None);
        fields.status = None;
        match context.driver().update_reimbursement("5", fields, &boss).await {
            Err(DriverError::InvalidInput(_)) => (),
            e => panic!("{:?}", e),
        }

        match context.driver().update_reimbursement("x", resolution("DENIED", None), &boss).await {
            Err(DriverError::InvalidInput(msg)) => assert!(msg.contains("Invalid id")),
            e => panic!("{:?}", e),
        }
    }

    #[tokio::test]
    async fn test_delete_reimbursement_by_id() {
        let context = TestContext::setup().await;
        context.create_user("jdoe", Role::Employee).await;
        let reimbursement = file(&context, "jdoe", 10.0, "FOOD").await;

        let id = reimbursement.id().to_string();
        context.driver().delete_reimbursement_by_id(&id).await.unwrap();
        context.driver().delete_reimbursement_by_id(&id).await.unwrap();
        match context.driver().get_reimbursement_by_id(&id).await {
            Err(DriverError::NotFound(_)) => (),
            e => panic!("{:?}", e),
        }

        match context.driver().delete_reimbursement_by_id("0").await {
            Err(DriverError::InvalidInput(_)) => (),
            e => panic!("{:?}", e),
        }
    }
}
