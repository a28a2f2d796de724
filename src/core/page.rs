//! Paging and sorting: page requests, sorts, pages and slices

use crate::core::entity::Probe;
use crate::core::error::{DataResult, ValidationError};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// A single `property direction` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }
}

/// Ordered list of sort orders, applied left to right
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sort {
    pub orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Sort every property in the same direction
    pub fn by<I, S>(direction: Direction, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            orders: properties
                .into_iter()
                .map(|p| Order {
                    property: p.into(),
                    direction,
                })
                .collect(),
        }
    }

    /// Append the orders of `other` after this sort's orders
    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    /// Parse `prop[:dir],prop[:dir]`, e.g. `username:desc,age`
    pub fn parse(expr: &str) -> DataResult<Self> {
        let mut orders = Vec::new();
        for part in expr.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (property, direction) = match part.split_once(':') {
                Some((prop, dir)) => {
                    let direction = match dir.to_ascii_lowercase().as_str() {
                        "asc" => Direction::Asc,
                        "desc" => Direction::Desc,
                        other => {
                            return Err(ValidationError::InvalidPage {
                                message: format!("unknown sort direction '{}'", other),
                            }
                            .into());
                        }
                    };
                    (prop.trim(), direction)
                }
                None => (part, Direction::Asc),
            };
            orders.push(Order {
                property: property.to_string(),
                direction,
            });
        }
        Ok(Self { orders })
    }

    /// Reject properties the entity does not expose
    pub fn validate(&self, entity_type: &str, allowed: &[&str]) -> DataResult<()> {
        for order in &self.orders {
            if !allowed.contains(&order.property.as_str()) {
                return Err(ValidationError::UnknownProperty {
                    entity_type: entity_type.to_string(),
                    property: order.property.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Compare two records according to this sort
    pub fn compare<T: Probe>(&self, a: &T, b: &T) -> Ordering {
        for order in &self.orders {
            let left = a.field_value(&order.property);
            let right = b.field_value(&order.property);
            let ordering = match (left, right) {
                (Some(l), Some(r)) => l.compare(&r).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            let ordering = match order.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Sort a collection in place (stable)
    pub fn apply<T: Probe>(&self, items: &mut [T]) {
        if !self.is_unsorted() {
            items.sort_by(|a, b| self.compare(a, b));
        }
    }
}

/// Zero-based page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    size: u64,
    sort: Sort,
}

impl PageRequest {
    /// Page `page` (0-based) of `size` rows, unsorted
    pub fn of(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            sort: Sort::unsorted(),
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn page_number(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.size
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Number of rows to skip, saturating for requests that fail `validate`
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    /// Size and offset must be positive and representable as SQL bigints,
    /// with room for the look-ahead row of a slice.
    pub fn validate(&self) -> DataResult<()> {
        if self.size == 0 {
            return Err(invalid_page("page size must be at least 1"));
        }
        if self.size >= MAX_WINDOW {
            return Err(invalid_page(format!("page size {} is too large", self.size)));
        }
        match self.page.checked_mul(self.size) {
            Some(offset) if offset <= MAX_WINDOW => Ok(()),
            _ => Err(invalid_page(format!(
                "page {} of size {} is out of range",
                self.page, self.size
            ))),
        }
    }
}

/// Largest offset or limit a backend accepts
const MAX_WINDOW: u64 = i64::MAX as u64;

fn invalid_page(message: impl Into<String>) -> crate::core::error::DataError {
    ValidationError::InvalidPage {
        message: message.into(),
    }
    .into()
}

/// Check a raw offset/limit pair and convert it to SQL bigints
pub fn window_bounds(offset: u64, limit: u64) -> DataResult<(i64, i64)> {
    let offset = i64::try_from(offset)
        .map_err(|_| invalid_page(format!("offset {} is out of range", offset)))?;
    let limit = i64::try_from(limit)
        .map_err(|_| invalid_page(format!("limit {} is out of range", limit)))?;
    Ok((offset, limit))
}

/// One page of results plus the total row count
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    number: u64,
    size: u64,
    total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            number: request.page_number(),
            size: request.page_size(),
            total_elements,
        }
    }

    /// Slice an already filtered and sorted collection
    pub fn from_all(all: Vec<T>, request: &PageRequest) -> Self {
        let total = all.len() as u64;
        let content = all
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(request.page_size()).unwrap_or(usize::MAX))
            .collect();
        Self::new(content, request, total)
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 1;
        }
        self.total_elements.div_ceil(self.size)
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn has_next(&self) -> bool {
        self.number + 1 < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    /// Convert the content, keeping the paging metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}

impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Page", 8)?;
        state.serialize_field("content", &self.content)?;
        state.serialize_field("number", &self.number)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("number_of_elements", &self.content.len())?;
        state.serialize_field("total_elements", &self.total_elements)?;
        state.serialize_field("total_pages", &self.total_pages())?;
        state.serialize_field("first", &self.is_first())?;
        state.serialize_field("last", &self.is_last())?;
        state.end()
    }
}

/// A page without a total count.
///
/// Backends fetch `size + 1` rows to learn whether another slice follows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice<T> {
    pub content: Vec<T>,
    pub number: u64,
    pub size: u64,
    pub has_next: bool,
}

impl<T> Slice<T> {
    /// Build from up to `size + 1` fetched rows
    pub fn from_overfetch(mut rows: Vec<T>, request: &PageRequest) -> Self {
        let has_next = rows.len() as u64 > request.page_size();
        rows.truncate(request.page_size() as usize);
        Self {
            content: rows,
            number: request.page_number(),
            size: request.page_size(),
            has_next,
        }
    }
}

/// Paging parameters taken from a URL query string
///
/// ```text
/// GET /members?page=1&size=10&sort=username:desc
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PageParams {
    /// Page number (0-based)
    pub page: Option<u64>,

    /// Rows per page
    pub size: Option<u64>,

    /// `prop[:dir]` list, comma separated
    pub sort: Option<String>,
}

impl PageParams {
    /// Resolve against the configured default and maximum page sizes
    pub fn to_page_request(&self, default_size: u64, max_size: u64) -> DataResult<PageRequest> {
        let size = self.size.unwrap_or(default_size).clamp(1, max_size.max(1));
        let sort = match &self.sort {
            Some(expr) => Sort::parse(expr)?,
            None => Sort::unsorted(),
        };
        let request = PageRequest::of(self.page.unwrap_or(0), size).with_sort(sort);
        request.validate()?;
        Ok(request)
    }
}
