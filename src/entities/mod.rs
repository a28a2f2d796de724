//! Domain entities: members, teams and items

pub mod item;
pub mod member;
pub mod team;

pub use item::Item;
pub use member::{Member, MemberWithTeam};
pub use team::Team;
