use crate::balance::{compute_balances, validate_expense};
use crate::error::SettlementError;
use crate::schemas::{GroupRecord, Member, NewExpense, NewGroup};
use crate::settlement::SettlementResolver;
use crate::store::{LedgerStore, StoreError};
use crate::summary::settle_group;
use actix_web::http::StatusCode;
use actix_web::{get, post, put, web, HttpResponse, ResponseError};
use serde_json::json;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Settlement(#[from] SettlementError),
    #[error("member {0} is listed more than once")]
    DuplicateMember(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::GroupNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::GroupExists(_)) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::MemberExists { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Settlement(SettlementError::InvalidExpense { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Settlement(SettlementError::UnbalancedLedger { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::DuplicateMember(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Store(StoreError::Database(_) | StoreError::Encoding(_)) => {
                tracing::error!(error = %self, "store failure");
                "internal error".to_string()
            }
            ApiError::Settlement(SettlementError::UnbalancedLedger { .. }) => {
                "could not compute settlement for this group".to_string()
            }
            _ => self.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

type ApiResult = Result<HttpResponse, ApiError>;

#[get("/")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "OpenSplit settlement API", "status": "running" }))
}

#[get("/groups")]
#[tracing::instrument(skip(store))]
async fn list_groups(store: web::Data<dyn LedgerStore>) -> ApiResult {
    Ok(HttpResponse::Ok().json(store.list_groups().await?))
}

#[put("/groups/{id}")]
#[tracing::instrument(skip(store))]
async fn add_group(
    store: web::Data<dyn LedgerStore>,
    id: web::Path<String>,
    json: web::Json<NewGroup>,
) -> ApiResult {
    let NewGroup { name, members } = json.into_inner();
    let mut seen = HashSet::new();
    if let Some(member) = members.iter().find(|member| !seen.insert(member.id.as_str())) {
        return Err(ApiError::DuplicateMember(member.id.clone()));
    }
    let record = GroupRecord {
        id: id.into_inner(),
        name,
        members,
        expenses: vec![],
    };
    let group = record.group();
    store.insert_group(record).await?;
    tracing::info!(group_id = %group.id, "group added");
    Ok(HttpResponse::Created().json(group))
}

#[get("/groups/{id}")]
#[tracing::instrument(skip(store))]
async fn get_group(store: web::Data<dyn LedgerStore>, id: web::Path<String>) -> ApiResult {
    let record = store.find_group(&id).await?;
    Ok(HttpResponse::Ok().json(record.group()))
}

#[post("/groups/{id}/members")]
#[tracing::instrument(skip(store))]
async fn add_member(
    store: web::Data<dyn LedgerStore>,
    id: web::Path<String>,
    member: web::Json<Member>,
) -> ApiResult {
    store.add_member(&id, member.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Member added" })))
}

#[post("/groups/{id}/expenses")]
#[tracing::instrument(skip(store))]
async fn add_expense(
    store: web::Data<dyn LedgerStore>,
    id: web::Path<String>,
    expense: web::Json<NewExpense>,
) -> ApiResult {
    let record = store.find_group(&id).await?;
    let expense = expense.into_inner().into_expense();
    if let Err(err) = validate_expense(&record.group(), &expense) {
        tracing::warn!(group_id = %record.id, error = %err, "expense rejected");
        return Err(err.into());
    }
    store.add_expense(&id, expense.clone()).await?;
    tracing::info!(group_id = %record.id, expense_id = %expense.id, "expense added");
    Ok(HttpResponse::Created().json(expense))
}

#[get("/groups/{id}/expenses")]
#[tracing::instrument(skip(store))]
async fn get_expenses(store: web::Data<dyn LedgerStore>, id: web::Path<String>) -> ApiResult {
    let mut expenses = store.find_expenses(&id).await?;
    // Newest first; expenses sharing a date keep ledger order.
    expenses.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(HttpResponse::Ok().json(expenses))
}

#[get("/groups/{id}/balance")]
#[tracing::instrument(skip(store))]
async fn get_balance(store: web::Data<dyn LedgerStore>, id: web::Path<String>) -> ApiResult {
    let record = store.find_group(&id).await?;
    let balances = compute_balances(&record.group(), &record.expenses)?;
    Ok(HttpResponse::Ok().json(balances))
}

#[get("/groups/{id}/settlement")]
#[tracing::instrument(skip(store, resolver))]
async fn get_settlement(
    store: web::Data<dyn LedgerStore>,
    resolver: web::Data<SettlementResolver>,
    id: web::Path<String>,
) -> ApiResult {
    let record = store.find_group(&id).await?;
    let summary = settle_group(&record.group(), &record.expenses, &resolver)?;
    Ok(HttpResponse::Ok().json(summary))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(list_groups)
        .service(add_group)
        .service(get_group)
        .service(add_member)
        .service(add_expense)
        .service(get_expenses)
        .service(get_balance)
        .service(get_settlement);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::store::MemoryStore;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::sync::Arc;

    macro_rules! app {
        () => {{
            let store: Arc<dyn LedgerStore> = Arc::new(MemoryStore::new());
            test::init_service(
                App::new()
                    .app_data(web::Data::from(store))
                    .app_data(web::Data::new(SettlementResolver::new(Money::ZERO)))
                    .configure(configure),
            )
            .await
        }};
    }

    fn members(ids: &[&str]) -> Value {
        Value::Array(
            ids.iter()
                .map(|id| json!({ "id": id, "name": format!("Name {id}") }))
                .collect(),
        )
    }

    #[actix_web::test]
    async fn settles_a_group_end_to_end() {
        let app = app!();

        let req = test::TestRequest::put()
            .uri("/groups/trip")
            .set_json(json!({ "name": "Trip", "members": members(&["A", "B"]) }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/groups/trip/members")
            .set_json(json!({ "id": "C", "name": "Name C" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let expenses = [
            ("90.00", "A", vec!["A", "B", "C"]),
            ("30", "B", vec!["B", "C"]),
        ];
        for (amount, payer, split) in expenses {
            let req = test::TestRequest::post()
                .uri("/groups/trip/expenses")
                .set_json(json!({ "amount": amount, "paid_by": payer, "split_among": split }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = test::TestRequest::get().uri("/groups/trip/settlement").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["group"]["id"], "trip");
        assert_eq!(body["group"]["members"][2]["name"], "Name C");
        assert_eq!(body["total_expenses"], "120.00");
        assert_eq!(
            body["member_balances"],
            json!({ "A": "60.00", "B": "-15.00", "C": "-45.00" })
        );
        let settlements: Vec<(&str, &str, &str)> = body["settlements"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| {
                (
                    s["debtor_id"].as_str().unwrap(),
                    s["creditor_id"].as_str().unwrap(),
                    s["amount"].as_str().unwrap(),
                )
            })
            .collect();
        assert_eq!(settlements, vec![("C", "A", "45.00"), ("B", "A", "15.00")]);

        let req = test::TestRequest::get().uri("/groups/trip/balance").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({ "A": "60.00", "B": "-15.00", "C": "-45.00" }));
    }

    #[actix_web::test]
    async fn rejects_malformed_expense() {
        let app = app!();
        let req = test::TestRequest::put()
            .uri("/groups/g")
            .set_json(json!({ "name": "G", "members": members(&["A", "B"]) }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );

        let req = test::TestRequest::post()
            .uri("/groups/g/expenses")
            .set_json(json!({ "amount": "10.00", "paid_by": "A", "split_among": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("split_among is empty"));

        let req = test::TestRequest::post()
            .uri("/groups/g/expenses")
            .set_json(json!({ "amount": "10.00", "paid_by": "Z", "split_among": ["A"] }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::get().uri("/groups/g/expenses").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn oversized_amount_never_reaches_the_ledger() {
        let app = app!();
        let req = test::TestRequest::put()
            .uri("/groups/g")
            .set_json(json!({ "name": "G", "members": members(&["A", "B"]) }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/groups/g/expenses")
                .set_json(json!({
                    "amount": "50000000000000000.00",
                    "paid_by": "A",
                    "split_among": ["A", "B"]
                }))
                .to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::BAD_REQUEST
            );
        }

        let req = test::TestRequest::get().uri("/groups/g/settlement").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_expenses"], "0.00");
        assert_eq!(body["settlements"], json!([]));
    }

    #[actix_web::test]
    async fn lists_expenses_newest_first() {
        let app = app!();
        let req = test::TestRequest::put()
            .uri("/groups/g")
            .set_json(json!({ "name": "G", "members": members(&["A", "B"]) }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );

        let dated = [
            ("5.00", "2024-03-02T10:00:00Z"),
            ("7.00", "2024-03-09T10:00:00Z"),
            ("1.00", "2024-03-01T10:00:00Z"),
        ];
        for (amount, date) in dated {
            let req = test::TestRequest::post()
                .uri("/groups/g/expenses")
                .set_json(json!({
                    "amount": amount,
                    "paid_by": "A",
                    "split_among": ["A", "B"],
                    "date": date
                }))
                .to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::CREATED
            );
        }

        let req = test::TestRequest::get().uri("/groups/g/expenses").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let amounts: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|expense| expense["amount"].as_str().unwrap())
            .collect();
        assert_eq!(amounts, vec!["7.00", "5.00", "1.00"]);
    }

    #[actix_web::test]
    async fn reports_missing_and_duplicate_groups() {
        let app = app!();
        let req = test::TestRequest::get().uri("/groups/nope/settlement").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );

        for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
            let req = test::TestRequest::put()
                .uri("/groups/g")
                .set_json(json!({ "name": "G", "members": members(&["A"]) }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), expected);
        }

        let req = test::TestRequest::put()
            .uri("/groups/h")
            .set_json(json!({ "name": "H", "members": members(&["A", "A"]) }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::get().uri("/groups").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));
    }

    #[actix_web::test]
    async fn unbalanced_ledger_is_a_server_error() {
        let err = ApiError::from(SettlementError::UnbalancedLedger {
            member_id: "A".to_string(),
            residual: Money::from_minor(3),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
