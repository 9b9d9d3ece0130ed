use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::application::LedgerService;
use crate::domain::{
    AccountBalance, Cents, EntryKind, LedgerEntry, UserId, cents_from_units, cents_to_units,
};

use super::ApiError;

pub type AppState = Arc<LedgerService>;

/// Body shared by every endpoint. Missing fields default to zero/empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BalanceRequest {
    pub id: UserId,
    pub balance: f64,
    pub id_to: Option<UserId>,
    pub field: String,
}

impl BalanceRequest {
    fn decode(body: &[u8]) -> Result<Self, ApiError> {
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidInput(e.to_string()))
    }

    fn amount(&self) -> Result<Cents, ApiError> {
        cents_from_units(self.balance).map_err(|e| ApiError::InvalidInput(e.to_string()))
    }

    fn destination(&self) -> Result<UserId, ApiError> {
        self.id_to
            .filter(|id| *id != 0)
            .ok_or_else(|| ApiError::InvalidInput("missing transfer destination id_to".into()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CurrencyQuery {
    #[serde(default)]
    pub currency: String,
}

/// One row of `/info`.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub id: i64,
    pub kind: EntryKind,
    pub to_id: Option<UserId>,
    pub from_id: Option<UserId>,
    pub money: f64,
    pub created: DateTime<Utc>,
}

impl From<LedgerEntry> for EntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind(),
            to_id: entry.to_id,
            from_id: entry.from_id,
            money: cents_to_units(entry.amount_cents),
            created: entry.created_at,
        }
    }
}

fn success() -> Json<Value> {
    Json(json!({ "status": "success" }))
}

/// `POST /user?currency=XXX`
pub async fn get_balance(
    State(service): State<AppState>,
    query: Result<Query<CurrencyQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<AccountBalance>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let request = BalanceRequest::decode(&body)?;
    let balance = service
        .get_balance_in_currency(request.id, &query.currency)
        .await?;
    Ok(Json(balance))
}

/// `POST /balance/add`
pub async fn deposit(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request = BalanceRequest::decode(&body)?;
    service.deposit(request.id, request.amount()?).await?;
    Ok(success())
}

/// `POST /balance/reduce`
pub async fn withdraw(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request = BalanceRequest::decode(&body)?;
    service.withdraw(request.id, request.amount()?).await?;
    Ok(success())
}

/// `POST /balance/transfer`
pub async fn transfer(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request = BalanceRequest::decode(&body)?;
    let to_id = request.destination()?;
    service
        .transfer(request.id, to_id, request.amount()?)
        .await?;
    Ok(success())
}

/// `POST /info`
pub async fn list_transactions(
    State(service): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<EntryResponse>>, ApiError> {
    let request = BalanceRequest::decode(&body)?;
    let entries = service
        .list_transactions(request.id, &request.field)
        .await?;
    Ok(Json(entries.into_iter().map(EntryResponse::from).collect()))
}
