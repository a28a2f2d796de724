//! Reusable member specifications

use crate::core::Specification;
use crate::entities::Member;

pub struct MemberSpecification;

impl MemberSpecification {
    pub fn username(username: &str) -> Specification<Member> {
        Specification::eq("username", username)
    }

    /// Members of the team called `team_name`; a blank name matches everyone
    pub fn team_name(team_name: &str) -> Specification<Member> {
        if team_name.trim().is_empty() {
            return Specification::all();
        }
        Specification::eq("team.name", team_name)
    }

    pub fn older_than(age: i32) -> Specification<Member> {
        Specification::gt("age", age)
    }
}
