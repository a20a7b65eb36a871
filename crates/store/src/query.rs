use std::cmp::Ordering;

use chrono::NaiveDate;
use common::{TravelOrderStatus, UserId};

use crate::TravelOrder;

/// Page size used when the caller does not pick one.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// Largest page size a caller may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Columns a listing may be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    CreatedAt,
    DepartureDate,
    ReturnDate,
    Destination,
    Status,
}

impl SortField {
    pub const ALL: [SortField; 5] = [
        SortField::CreatedAt,
        SortField::DepartureDate,
        SortField::ReturnDate,
        SortField::Destination,
        SortField::Status,
    ];

    /// Returns the public name, which is also the column name.
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::DepartureDate => "departure_date",
            SortField::ReturnDate => "return_date",
            SortField::Destination => "destination",
            SortField::Status => "status",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        SortField::ALL.into_iter().find(|f| f.as_str() == name)
    }

    fn compare(self, a: &TravelOrder, b: &TravelOrder) -> Ordering {
        match self {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::DepartureDate => a.departure_date.cmp(&b.departure_date),
            SortField::ReturnDate => a.return_date.cmp(&b.return_date),
            SortField::Destination => a
                .destination
                .to_lowercase()
                .cmp(&b.destination.to_lowercase()),
            SortField::Status => a.status.as_str().cmp(b.status.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A single sort instruction, written `field` or `-field` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    fn compare(&self, a: &TravelOrder, b: &TravelOrder) -> Ordering {
        let ordering = self.field.compare(a, b);
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "{}", self.field.as_str()),
            SortDirection::Desc => write!(f, "-{}", self.field.as_str()),
        }
    }
}

/// User-selectable filters. All set filters must match (logical AND).
///
/// Deliberately carries no owner: visibility scope lives on [`OrderQuery`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilters {
    /// Status equals.
    pub status: Option<TravelOrderStatus>,

    /// Case-insensitive substring of the destination.
    pub destination: Option<String>,

    /// Departure date on or after (inclusive).
    pub departure_from: Option<NaiveDate>,

    /// Return date on or before (inclusive).
    pub return_to: Option<NaiveDate>,

    /// Created on or after this date (inclusive, UTC).
    pub created_from: Option<NaiveDate>,

    /// Created on or before this date (inclusive, UTC).
    pub created_to: Option<NaiveDate>,
}

impl OrderFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: TravelOrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn destination(mut self, needle: impl Into<String>) -> Self {
        self.destination = Some(needle.into());
        self
    }

    pub fn departure_from(mut self, date: NaiveDate) -> Self {
        self.departure_from = Some(date);
        self
    }

    pub fn return_to(mut self, date: NaiveDate) -> Self {
        self.return_to = Some(date);
        self
    }

    pub fn created_from(mut self, date: NaiveDate) -> Self {
        self.created_from = Some(date);
        self
    }

    pub fn created_to(mut self, date: NaiveDate) -> Self {
        self.created_to = Some(date);
        self
    }

    /// Evaluates the filters against a single order.
    pub fn matches(&self, order: &TravelOrder) -> bool {
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        if let Some(ref needle) = self.destination
            && !order
                .destination
                .to_lowercase()
                .contains(&needle.to_lowercase())
        {
            return false;
        }
        if let Some(from) = self.departure_from
            && order.departure_date < from
        {
            return false;
        }
        if let Some(to) = self.return_to
            && order.return_date > to
        {
            return false;
        }
        let created = order.created_at.date_naive();
        if let Some(from) = self.created_from
            && created < from
        {
            return false;
        }
        if let Some(to) = self.created_to
            && created > to
        {
            return false;
        }
        true
    }
}

/// A paginated, sorted, filtered listing request.
///
/// The owner scope is fixed when the query is constructed. Nothing applied
/// afterwards (filters, sort, pagination) can widen or change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    owner: Option<UserId>,
    filters: OrderFilters,
    sort: Vec<SortKey>,
    page: u32,
    per_page: u32,
}

impl OrderQuery {
    /// A query across every owner's orders.
    pub fn unscoped() -> Self {
        Self {
            owner: None,
            filters: OrderFilters::default(),
            sort: vec![SortKey::desc(SortField::CreatedAt)],
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// A query restricted to orders owned by `owner`.
    pub fn scoped_to(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::unscoped()
        }
    }

    /// Replaces the user filters.
    pub fn with_filters(mut self, filters: OrderFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Replaces the sort keys. An empty list keeps the default (`-created_at`).
    pub fn sort_by(mut self, keys: Vec<SortKey>) -> Self {
        if !keys.is_empty() {
            self.sort = keys;
        }
        self
    }

    /// Selects a page. Page is at least 1; page size is clamped to `1..=MAX_PER_PAGE`.
    pub fn paginate(mut self, page: u32, per_page: u32) -> Self {
        self.page = page.max(1);
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn filters(&self) -> &OrderFilters {
        &self.filters
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of rows to skip before the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Returns true if `order` is visible under the scope and matches the filters.
    pub fn matches(&self, order: &TravelOrder) -> bool {
        if order.is_deleted() {
            return false;
        }
        if let Some(owner) = self.owner
            && order.user_id != owner
        {
            return false;
        }
        self.filters.matches(order)
    }

    /// Orders two records by the sort keys, falling back to id for stable pages.
    pub fn compare(&self, a: &TravelOrder, b: &TravelOrder) -> Ordering {
        self.sort
            .iter()
            .map(|key| key.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self::unscoped()
    }
}

/// One page of a listing plus the totals needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage {
    pub items: Vec<TravelOrder>,
    /// Number of matching orders across all pages.
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl OrderPage {
    /// The last page number (at least 1, even for an empty listing).
    pub fn last_page(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.per_page.max(1)));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    /// 1-based position of the first item on this page, if any.
    pub fn from(&self) -> Option<u64> {
        (!self.items.is_empty()).then(|| u64::from(self.page - 1) * u64::from(self.per_page) + 1)
    }

    /// 1-based position of the last item on this page, if any.
    pub fn to(&self) -> Option<u64> {
        self.from().map(|from| from + self.items.len() as u64 - 1)
    }
}
