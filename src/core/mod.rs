//! Core module containing the entity traits and query building blocks

pub mod entity;
pub mod error;
pub mod example;
pub mod field;
pub mod hints;
pub mod page;
pub mod specification;

pub use entity::{Auditable, Entity, Probe};
pub use error::{DataError, DataResult};
pub use example::{Example, ExampleMatcher, ExampleProbe, StringMatcher};
pub use field::FieldValue;
pub use hints::{LockMode, QueryHints};
pub use page::{Direction, Order, Page, PageParams, PageRequest, Slice, Sort, window_bounds};
pub use specification::{Criterion, Specification};
