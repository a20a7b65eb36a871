//! Travel order endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use common::{TravelOrderId, TravelOrderStatus, UserId};
use domain::{
    Caller, DomainError, ListingRequest, StatusTransitionService, TravelOrderPolicy,
    parse_show_query, scoped_query, validate_new_order, validate_status_change,
};
use notifier::{NotificationQueue, StatusChangedJob};
use serde::Serialize;
use serde_json::Value;
use store::{OrderPage, OrderStore, TravelOrder, User, UserDirectory};

use crate::auth::CurrentUser;
use crate::error::ApiError;

/// Path of the collection, also reported as `meta.path` in listings.
pub const COLLECTION_PATH: &str = "/travel-orders";

/// Storage the API can run on.
pub trait AppStore: OrderStore + UserDirectory + Clone + 'static {}

impl<T: OrderStore + UserDirectory + Clone + 'static> AppStore for T {}

/// Shared application state accessible from all handlers.
pub struct AppState<S: AppStore> {
    pub store: S,
    pub transitions: StatusTransitionService<S>,
    pub notifications: NotificationQueue,
}

type QueryPairs = Vec<(String, String)>;

// -- Response types --

#[derive(Debug, Serialize)]
pub struct UserResource {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserResource {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TravelOrderResource {
    pub id: TravelOrderId,
    pub requester_name: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub status: TravelOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResource>,
}

impl TravelOrderResource {
    pub fn new(order: TravelOrder, owner: Option<&User>) -> Self {
        Self {
            id: order.id,
            requester_name: order.requester_name,
            destination: order.destination,
            departure_date: order.departure_date,
            return_date: order.return_date,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
            user: owner.map(UserResource::from),
        }
    }
}

#[derive(Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
    pub data: TravelOrderResource,
}

#[derive(Debug, Serialize)]
pub struct PaginationLinks {
    pub first: String,
    pub last: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub path: &'static str,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub data: Vec<TravelOrderResource>,
    pub links: PaginationLinks,
    pub meta: PaginationMeta,
}

impl ListResponse {
    fn new(page: OrderPage, request: &ListingRequest, owners: &HashMap<UserId, User>) -> Self {
        let last_page = page.last_page();
        let current = page.page;

        let links = PaginationLinks {
            first: page_url(request, 1),
            last: page_url(request, last_page),
            prev: (current > 1).then(|| page_url(request, current - 1)),
            next: (current < last_page).then(|| page_url(request, current + 1)),
        };
        let meta = PaginationMeta {
            current_page: current,
            per_page: page.per_page,
            total: page.total,
            last_page,
            from: page.from(),
            to: page.to(),
            path: COLLECTION_PATH,
        };
        let data = page
            .items
            .into_iter()
            .map(|order| {
                let owner = owners.get(&order.user_id);
                TravelOrderResource::new(order, owner)
            })
            .collect();

        Self { data, links, meta }
    }
}

fn page_url(request: &ListingRequest, page: u32) -> String {
    let query = request.to_query_string();
    if query.is_empty() {
        format!("{COLLECTION_PATH}?page={page}")
    } else {
        format!("{COLLECTION_PATH}?{query}&page={page}")
    }
}

// -- Handlers --

/// POST /travel-orders: create an order owned by the caller.
#[tracing::instrument(skip_all)]
pub async fn create<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let new_order = validate_new_order(user.id, &payload, Utc::now().date_naive())?;
    let order = state.store.insert(new_order).await?;

    metrics::counter!("travel_orders_created_total").increment(1);
    tracing::info!(order_id = %order.id, user_id = %user.id, "travel order created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Your order has been created successfully.",
            data: TravelOrderResource::new(order, None),
        }),
    ))
}

/// GET /travel-orders/{id}: fetch one order the caller may view.
#[tracing::instrument(skip(state, user, query))]
pub async fn show<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<DataResponse<TravelOrderResource>>, ApiError> {
    let Query(pairs) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let include_user = parse_show_query(pairs)?;

    let order = load_order(&state, &id).await?;
    TravelOrderPolicy::authorize(TravelOrderPolicy::view(&Caller::from(&user), &order))?;

    let owner = if include_user {
        state.store.find_user(order.user_id).await?
    } else {
        None
    };

    Ok(Json(DataResponse {
        data: TravelOrderResource::new(order, owner.as_ref()),
    }))
}

/// GET /travel-orders: paginated listing scoped to what the caller may see.
#[tracing::instrument(skip_all)]
pub async fn list<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<ListResponse>, ApiError> {
    let caller = Caller::from(&user);
    TravelOrderPolicy::authorize(TravelOrderPolicy::view_any(&caller))?;

    let Query(pairs) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = ListingRequest::parse(pairs)?;

    let page = state.store.list(&scoped_query(&caller, &request)).await?;
    tracing::debug!(total = page.total, page = page.page, "travel orders listed");

    let owners = if request.include_user {
        load_owners(&state.store, &page.items).await?
    } else {
        HashMap::new()
    };

    Ok(Json(ListResponse::new(page, &request, &owners)))
}

/// PATCH /travel-orders/{id}/status: approve or cancel an order (administrators only).
#[tracing::instrument(skip(state, user, payload))]
pub async fn update_status<S: AppStore>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let order = load_order(&state, &id).await?;
    TravelOrderPolicy::authorize(TravelOrderPolicy::approve(&Caller::from(&user), &order))?;

    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let target = validate_status_change(&payload)?;

    let from = order.status;
    let updated = state.transitions.change(order, target).await?;

    if from != target {
        state
            .notifications
            .enqueue(StatusChangedJob::new(updated.id, from, target));
    }

    Ok(Json(MessageResponse {
        message: "Travel order status has been updated successfully.",
        data: TravelOrderResource::new(updated, None),
    }))
}

/// Loads a live order; unparseable ids are reported as missing.
async fn load_order<S: AppStore>(state: &AppState<S>, id: &str) -> Result<TravelOrder, ApiError> {
    let id = TravelOrderId::parse(id).ok_or(DomainError::NotFound)?;
    let order = state.store.find(id).await?.ok_or(DomainError::NotFound)?;
    Ok(order)
}

async fn load_owners<S: AppStore>(
    store: &S,
    orders: &[TravelOrder],
) -> Result<HashMap<UserId, User>, ApiError> {
    let mut owners = HashMap::new();

    for order in orders {
        if owners.contains_key(&order.user_id) {
            continue;
        }
        if let Some(user) = store.find_user(order.user_id).await? {
            owners.insert(order.user_id, user);
        }
    }

    Ok(owners)
}
