//! Macro-generated test suite for the `TeamRepository` contract.
//!
//! Cascading saves, moving members between teams and cascading deletes.

#[macro_export]
macro_rules! team_repository_tests {
    ($factory:expr) => {
        mod team_repository_contract_tests {
            use super::*;
            use datamap::core::error::EntityError;

            #[tokio::test]
            async fn test_save_cascades_members() {
                let repos = $factory;
                let team = save_team(&repos, "teamA", &[("member1", 10), ("member2", 20)]).await;

                let team_id = team.id.expect("team should get an id");
                assert_eq!(team.members.len(), 2);
                assert!(team.members.iter().all(|m| m.id.is_some()));
                assert!(team.members.iter().all(|m| m.team_id == Some(team_id)));
                assert_eq!(repos.members.count().await.unwrap(), 2);

                let loaded = repos.teams.find_by_id(&team_id).await.unwrap().unwrap();
                assert_eq!(loaded.name, "teamA");
                assert_eq!(usernames(&loaded.members), vec!["member1", "member2"]);
            }

            #[tokio::test]
            async fn test_find_by_name() {
                let repos = $factory;
                two_teams(&repos).await;

                let found = repos.teams.find_by_name("teamB").await.unwrap();
                assert_eq!(found.len(), 1);
                assert_eq!(usernames(&found[0].members), vec!["member3", "member4"]);
                assert!(repos.teams.find_by_name("teamZ").await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_rename_keeps_members() {
                let repos = $factory;
                let (team_a, _) = two_teams(&repos).await;

                let mut loaded = repos.teams.find_by_id(&team_a.id.unwrap()).await.unwrap().unwrap();
                loaded.name = "renamed".to_string();
                repos.teams.save(loaded).await.unwrap();

                let reloaded = repos.teams.find_by_id(&team_a.id.unwrap()).await.unwrap().unwrap();
                assert_eq!(reloaded.name, "renamed");
                assert_eq!(reloaded.members.len(), 2);
                assert_eq!(repos.members.count().await.unwrap(), 4);
            }

            #[tokio::test]
            async fn test_change_team_moves_member() {
                let repos = $factory;
                let (team_a, mut team_b) = two_teams(&repos).await;

                let mut member = repos.members.find_member_by_username("member1").await.unwrap();
                member.change_team(&mut team_b);
                repos.members.save(member).await.unwrap();

                let a = repos.teams.find_by_id(&team_a.id.unwrap()).await.unwrap().unwrap();
                let b = repos.teams.find_by_id(&team_b.id.unwrap()).await.unwrap().unwrap();
                assert_eq!(usernames(&a.members), vec!["member2"]);
                assert_eq!(sorted_usernames(&b.members), vec!["member1", "member3", "member4"]);
            }

            #[tokio::test]
            async fn test_save_with_unknown_id_is_not_found() {
                let repos = $factory;
                let mut team = Team::new("ghost");
                team.id = Some(987_654);

                let err = repos.teams.save(team).await.unwrap_err();
                assert!(matches!(err, DataError::Entity(EntityError::NotFound { .. })));
                assert_eq!(repos.teams.count().await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_delete_team_removes_its_members() {
                let repos = $factory;
                let (team_a, _) = two_teams(&repos).await;
                save_member(&repos, "loner", 50).await;

                repos.teams.delete_by_id(&team_a.id.unwrap()).await.unwrap();

                assert!(repos.teams.find_by_id(&team_a.id.unwrap()).await.unwrap().is_none());
                let remaining = repos.members.find_all().await.unwrap();
                assert_eq!(usernames(&remaining), vec!["member3", "member4", "loner"]);
            }

            #[tokio::test]
            async fn test_delete_all_keeps_teamless_members() {
                let repos = $factory;
                two_teams(&repos).await;
                save_member(&repos, "loner", 50).await;

                repos.teams.delete_all().await.unwrap();

                assert_eq!(repos.teams.count().await.unwrap(), 0);
                let remaining = repos.members.find_all().await.unwrap();
                assert_eq!(usernames(&remaining), vec!["loner"]);
            }

            #[tokio::test]
            async fn test_sorted_and_paged() {
                let repos = $factory;
                two_teams(&repos).await;
                save_team(&repos, "teamC", &[]).await;

                let sorted = repos
                    .teams
                    .find_all_sorted(&Sort::by(Direction::Desc, ["name"]))
                    .await
                    .unwrap();
                let names: Vec<&str> = sorted.iter().map(|t| t.name.as_str()).collect();
                assert_eq!(names, vec!["teamC", "teamB", "teamA"]);

                let page = repos
                    .teams
                    .find_all_paged(&PageRequest::of(1, 2).with_sort(Sort::by(Direction::Asc, ["name"])))
                    .await
                    .unwrap();
                assert_eq!(page.total_elements(), 3);
                assert_eq!(page.content().len(), 1);
                assert_eq!(page.content()[0].name, "teamC");
            }
        }
    };
}
