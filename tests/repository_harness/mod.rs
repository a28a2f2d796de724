//! Shared test harness for repository backends
//!
//! Each suite is a macro taking an expression that yields a fresh, empty
//! [`Repositories`]. Backends invoke the macros from their own test file:
//!
//! ```rust,ignore
//! #[macro_use]
//! mod repository_harness;
//!
//! use repository_harness::*;
//!
//! member_repository_tests!(Repositories::in_memory());
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod member_tests;
#[macro_use]
pub mod team_tests;
#[macro_use]
pub mod item_tests;

pub use datamap::prelude::*;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn save_member(repos: &Repositories, username: &str, age: i32) -> Member {
    repos
        .members
        .save(Member::with_age(username, age))
        .await
        .unwrap()
}

/// Save a team together with its members
pub async fn save_team(repos: &Repositories, name: &str, members: &[(&str, i32)]) -> Team {
    let mut team = Team::new(name);
    for (username, age) in members {
        Member::with_team(*username, *age, &mut team);
    }
    repos.teams.save(team).await.unwrap()
}

/// teamA: member1, member2; teamB: member3, member4
pub async fn two_teams(repos: &Repositories) -> (Team, Team) {
    let team_a = save_team(repos, "teamA", &[("member1", 10), ("member2", 20)]).await;
    let team_b = save_team(repos, "teamB", &[("member3", 30), ("member4", 40)]).await;
    (team_a, team_b)
}

pub fn usernames(members: &[Member]) -> Vec<&str> {
    members.iter().map(|m| m.username.as_str()).collect()
}

pub fn sorted_usernames(members: &[Member]) -> Vec<&str> {
    let mut names = usernames(members);
    names.sort_unstable();
    names
}
