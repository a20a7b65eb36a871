//! Listing requests: query-string parsing and role scoping.
//!
//! Query parameters follow the JSON:API style used by the frontend:
//! `filter[status]=approved&sort=-created_at,destination&page=2&page[size]=30&include=user`.
//! `page.size` is accepted as a spelling of `page[size]`. Other top-level
//! parameters (cache busters and the like) are ignored.

use std::collections::BTreeSet;

use common::TravelOrderStatus;
use store::{DEFAULT_PER_PAGE, MAX_PER_PAGE, OrderFilters, OrderQuery, SortField, SortKey};

use crate::validation::parse_date;
use crate::{Caller, DomainError, ValidationErrors};

pub const ALLOWED_FILTERS: [&str; 6] = [
    "status",
    "destination",
    "from",
    "to",
    "created_from",
    "created_to",
];
pub const ALLOWED_INCLUDES: [&str; 1] = ["user"];

/// A parsed, not yet scoped, listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub filters: OrderFilters,
    /// Requested sort keys; empty means the default order.
    pub sort: Vec<SortKey>,
    pub page: u32,
    pub per_page: u32,
    /// Whether the owning user should be embedded in each order.
    pub include_user: bool,
}

impl Default for ListingRequest {
    fn default() -> Self {
        Self {
            filters: OrderFilters::default(),
            sort: Vec::new(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            include_user: false,
        }
    }
}

impl ListingRequest {
    /// Parses raw query pairs.
    ///
    /// Unknown filters, sort keys and includes fail with
    /// [`DomainError::InvalidQuery`] naming them; unknown top-level
    /// parameters are ignored. Malformed filter values fail
    /// with a validation error keyed `filter.<name>`. Empty values are ignored
    /// and a repeated key keeps its last value.
    pub fn parse<I, K, V>(pairs: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = ListingRequest::default();
        let mut unknown_filters = BTreeSet::new();
        let mut filter_values: Vec<(String, String)> = Vec::new();
        let mut sort = None;
        let mut include = None;
        let mut page = None;
        let mut page_size = None;

        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.as_ref().trim().to_string();

            if let Some(name) = key
                .strip_prefix("filter[")
                .and_then(|rest| rest.strip_suffix(']'))
            {
                if ALLOWED_FILTERS.contains(&name) {
                    filter_values.push((name.to_string(), value));
                } else {
                    unknown_filters.insert(name.to_string());
                }
                continue;
            }

            match key {
                "sort" => sort = Some(value),
                "include" => include = Some(value),
                "page" => page = Some(value),
                "page[size]" | "page.size" => page_size = Some(value),
                other => tracing::debug!(parameter = other, "ignoring query parameter"),
            }
        }

        if !unknown_filters.is_empty() {
            return Err(not_allowed("filter", &unknown_filters, &ALLOWED_FILTERS));
        }
        if let Some(include) = include {
            request.include_user = parse_includes(&include)?;
        }
        if let Some(sort) = sort {
            request.sort = parse_sort(&sort)?;
        }

        request.filters = parse_filters(filter_values)?;
        request.page = page
            .and_then(|p| p.parse::<u32>().ok())
            .unwrap_or(1)
            .max(1);
        request.per_page = page_size
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);

        Ok(request)
    }

    /// Returns the query string equivalent of this request without the page,
    /// used to build pagination links.
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        let filters = &self.filters;

        if let Some(status) = filters.status {
            parts.push(format!("filter[status]={}", status.as_str()));
        }
        if let Some(ref destination) = filters.destination {
            parts.push(format!("filter[destination]={}", encode(destination)));
        }
        if let Some(from) = filters.departure_from {
            parts.push(format!("filter[from]={from}"));
        }
        if let Some(to) = filters.return_to {
            parts.push(format!("filter[to]={to}"));
        }
        if let Some(from) = filters.created_from {
            parts.push(format!("filter[created_from]={from}"));
        }
        if let Some(to) = filters.created_to {
            parts.push(format!("filter[created_to]={to}"));
        }
        if !self.sort.is_empty() {
            let keys: Vec<String> = self.sort.iter().map(SortKey::to_string).collect();
            parts.push(format!("sort={}", keys.join(",")));
        }
        if self.include_user {
            parts.push("include=user".to_string());
        }
        if self.per_page != DEFAULT_PER_PAGE {
            parts.push(format!("page.size={}", self.per_page));
        }

        parts.join("&")
    }
}

/// Parses the query of a single-order fetch, where only `include` is read.
///
/// Returns whether the owning user should be embedded. Unknown includes fail
/// with [`DomainError::InvalidQuery`]; other parameters are ignored.
pub fn parse_show_query<I, K, V>(pairs: I) -> Result<bool, DomainError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut include_user = false;

    for (key, value) in pairs {
        match key.as_ref() {
            "include" => include_user = parse_includes(value.as_ref())?,
            other => tracing::debug!(parameter = other, "ignoring query parameter"),
        }
    }

    Ok(include_user)
}

/// Builds the store query for `caller`.
///
/// Non-administrators are scoped to their own orders before any filter is
/// applied, so no filter combination can reach another user's orders.
pub fn scoped_query(caller: &Caller, request: &ListingRequest) -> OrderQuery {
    let base = if caller.is_admin {
        OrderQuery::unscoped()
    } else {
        OrderQuery::scoped_to(caller.id)
    };

    base.with_filters(request.filters.clone())
        .sort_by(request.sort.clone())
        .paginate(request.page, request.per_page)
}

fn parse_filters(values: Vec<(String, String)>) -> Result<OrderFilters, DomainError> {
    let mut filters = OrderFilters::new();
    let mut errors = ValidationErrors::new();

    for (name, value) in values {
        if value.is_empty() {
            continue;
        }
        let field = format!("filter.{name}");

        match name.as_str() {
            "status" => match value.parse::<TravelOrderStatus>() {
                Ok(status) => filters.status = Some(status),
                Err(_) => errors.add(field, "The selected filter.status is invalid."),
            },
            "destination" => filters.destination = Some(value),
            date_filter => match parse_date(&value) {
                Some(date) => match date_filter {
                    "from" => filters.departure_from = Some(date),
                    "to" => filters.return_to = Some(date),
                    "created_from" => filters.created_from = Some(date),
                    _ => filters.created_to = Some(date),
                },
                None => errors.add(
                    field.clone(),
                    format!("The {field} field must match the format Y-m-d."),
                ),
            },
        }
    }

    errors.into_result()?;
    Ok(filters)
}

fn parse_sort(raw: &str) -> Result<Vec<SortKey>, DomainError> {
    let mut keys = Vec::new();
    let mut unknown = BTreeSet::new();

    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, descending) = match part.strip_prefix('-') {
            Some(name) => (name, true),
            None => (part, false),
        };
        match SortField::parse(name) {
            Some(field) if descending => keys.push(SortKey::desc(field)),
            Some(field) => keys.push(SortKey::asc(field)),
            None => {
                unknown.insert(name.to_string());
            }
        }
    }

    if !unknown.is_empty() {
        let allowed: Vec<&str> = SortField::ALL.iter().map(|f| f.as_str()).collect();
        return Err(not_allowed("sort", &unknown, &allowed));
    }
    Ok(keys)
}

fn parse_includes(raw: &str) -> Result<bool, DomainError> {
    let mut include_user = false;
    let mut unknown = BTreeSet::new();

    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if ALLOWED_INCLUDES.contains(&name) {
            include_user = true;
        } else {
            unknown.insert(name.to_string());
        }
    }

    if !unknown.is_empty() {
        return Err(not_allowed("include", &unknown, &ALLOWED_INCLUDES));
    }
    Ok(include_user)
}

fn not_allowed(kind: &str, unknown: &BTreeSet<String>, allowed: &[&str]) -> DomainError {
    let unknown: Vec<&str> = unknown.iter().map(String::as_str).collect();
    DomainError::InvalidQuery(format!(
        "Requested {kind}(s) `{}` are not allowed. Allowed {kind}(s) are `{}`.",
        unknown.join(", "),
        allowed.join(", ")
    ))
}

/// Percent-encodes a query value.
fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
