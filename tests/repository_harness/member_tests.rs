//! Macro-generated test suite for the `MemberRepository` contract.
//!
//! Covers CRUD with auditing, derived queries, single/optional results,
//! paging and slicing, bulk updates, fetch joins, projections, query hints,
//! specifications, query by example and the native queries.

/// Generate the member repository suite.
///
/// `$factory` must produce an empty `Repositories`.
#[macro_export]
macro_rules! member_repository_tests {
    ($factory:expr) => {
        mod member_repository_contract_tests {
            use super::*;
            use datamap::core::error::{EntityError, ValidationError};

            // ==================================================================
            // CRUD and auditing
            // ==================================================================

            #[tokio::test]
            async fn test_save_and_find_by_id() {
                let repos = $factory;
                let saved = save_member(&repos, "memberA", 0).await;

                assert!(saved.id.is_some());
                assert!(saved.created_date.is_some());
                assert_eq!(saved.created_date, saved.last_modified_date);

                let found = repos.members.find_by_id(&saved.id.unwrap()).await.unwrap();
                let found = found.expect("saved member should be found");
                assert_eq!(found, saved);
                assert_eq!(found.username, "memberA");
                assert_eq!(repos.members.count().await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_update_stamps_last_modified_only() {
                let repos = $factory;
                let saved = save_member(&repos, "memberA", 10).await;

                let mut changed = saved.clone();
                changed.username = "memberB".to_string();
                let updated = repos.members.save(changed).await.unwrap();

                assert_eq!(updated.id, saved.id);
                assert_eq!(updated.created_date, saved.created_date);
                assert!(updated.last_modified_date >= saved.last_modified_date);
                assert_eq!(repos.members.count().await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_save_with_unknown_id_is_not_found() {
                let repos = $factory;
                let mut member = Member::new("ghost");
                member.id = Some(987_654);

                let err = repos.members.save(member).await.unwrap_err();
                assert!(matches!(err, DataError::Entity(EntityError::NotFound { .. })));
            }

            #[tokio::test]
            async fn test_save_with_unsaved_team_is_rejected() {
                let repos = $factory;
                let mut member = Member::new("memberA");
                member.team_id = Some(987_654);

                let err = repos.members.save(member).await.unwrap_err();
                assert!(matches!(
                    err,
                    DataError::Entity(EntityError::TransientReference { .. })
                ));
                assert_eq!(repos.members.count().await.unwrap(), 0);
            }

            #[tokio::test]
            async fn test_save_all_and_find_all() {
                let repos = $factory;
                repos
                    .members
                    .save_all(vec![Member::new("member1"), Member::new("member2")])
                    .await
                    .unwrap();

                let all = repos.members.find_all().await.unwrap();
                assert_eq!(usernames(&all), vec!["member1", "member2"]);
            }

            #[tokio::test]
            async fn test_delete() {
                let repos = $factory;
                let member1 = save_member(&repos, "member1", 0).await;
                let member2 = save_member(&repos, "member2", 0).await;

                repos.members.delete(&member1).await.unwrap();
                repos.members.delete_by_id(&member2.id.unwrap()).await.unwrap();
                // missing ids are ignored
                repos.members.delete_by_id(&member2.id.unwrap()).await.unwrap();

                assert_eq!(repos.members.count().await.unwrap(), 0);
                assert!(
                    !repos
                        .members
                        .exists_by_id(&member1.id.unwrap())
                        .await
                        .unwrap()
                );
            }

            #[tokio::test]
            async fn test_find_all_sorted() {
                let repos = $factory;
                save_member(&repos, "b", 10).await;
                save_member(&repos, "a", 10).await;
                save_member(&repos, "c", 5).await;

                let sort = Sort::parse("age:desc,username").unwrap();
                let members = repos.members.find_all_sorted(&sort).await.unwrap();
                assert_eq!(usernames(&members), vec!["a", "b", "c"]);
            }

            #[tokio::test]
            async fn test_sort_on_unknown_property_is_rejected() {
                let repos = $factory;
                let sort = Sort::parse("nickname").unwrap();
                let err = repos.members.find_all_sorted(&sort).await.unwrap_err();
                assert!(matches!(
                    err,
                    DataError::Validation(ValidationError::UnknownProperty { .. })
                ));
            }

            // ==================================================================
            // Derived queries
            // ==================================================================

            #[tokio::test]
            async fn test_find_by_username_and_age_greater_than() {
                let repos = $factory;
                save_member(&repos, "AAA", 10).await;
                save_member(&repos, "AAA", 20).await;

                let result = repos
                    .members
                    .find_by_username_and_age_greater_than("AAA", 15)
                    .await
                    .unwrap();
                assert_eq!(result.len(), 1);
                assert_eq!(result[0].username, "AAA");
                assert_eq!(result[0].age, 20);
            }

            #[tokio::test]
            async fn test_find_user_matches_username_and_age() {
                let repos = $factory;
                save_member(&repos, "AAA", 10).await;
                save_member(&repos, "BBB", 20).await;

                let result = repos.members.find_user("AAA", 10).await.unwrap();
                assert_eq!(usernames(&result), vec!["AAA"]);
                assert!(repos.members.find_user("AAA", 20).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_find_username_list() {
                let repos = $factory;
                save_member(&repos, "AAA", 10).await;
                save_member(&repos, "BBB", 20).await;

                let names = repos.members.find_username_list().await.unwrap();
                assert_eq!(names, vec!["AAA".to_string(), "BBB".to_string()]);
            }

            #[tokio::test]
            async fn test_find_member_dto_only_lists_team_members() {
                let repos = $factory;
                save_team(&repos, "teamA", &[("AAA", 10)]).await;
                save_member(&repos, "loner", 10).await;

                let dtos = repos.members.find_member_dto().await.unwrap();
                assert_eq!(dtos.len(), 1);
                assert_eq!(dtos[0].username, "AAA");
                assert_eq!(dtos[0].team_name.as_deref(), Some("teamA"));
            }

            #[tokio::test]
            async fn test_find_by_names() {
                let repos = $factory;
                save_member(&repos, "AAA", 10).await;
                save_member(&repos, "BBB", 20).await;
                save_member(&repos, "CCC", 30).await;

                let names = vec!["AAA".to_string(), "CCC".to_string()];
                let result = repos.members.find_by_names(&names).await.unwrap();
                assert_eq!(usernames(&result), vec!["AAA", "CCC"]);
                assert!(repos.members.find_by_names(&[]).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_return_type_variants() {
                let repos = $factory;
                save_member(&repos, "AAA", 10).await;
                save_member(&repos, "BBB", 20).await;

                let list = repos.members.find_list_by_username("AAA").await.unwrap();
                assert_eq!(list.len(), 1);
                assert!(
                    repos
                        .members
                        .find_list_by_username("nobody")
                        .await
                        .unwrap()
                        .is_empty()
                );

                let single = repos.members.find_member_by_username("AAA").await.unwrap();
                assert_eq!(single.age, 10);

                let optional = repos.members.find_optional_by_username("AAA").await.unwrap();
                assert_eq!(optional.map(|m| m.username), Some("AAA".to_string()));
                assert!(
                    repos
                        .members
                        .find_optional_by_username("nobody")
                        .await
                        .unwrap()
                        .is_none()
                );
            }

            #[tokio::test]
            async fn test_single_result_errors() {
                let repos = $factory;
                save_member(&repos, "AAA", 10).await;
                save_member(&repos, "AAA", 20).await;

                let missing = repos.members.find_member_by_username("nobody").await;
                assert!(matches!(
                    missing,
                    Err(DataError::Entity(EntityError::NotFound { .. }))
                ));

                let duplicate = repos.members.find_member_by_username("AAA").await;
                assert!(matches!(
                    duplicate,
                    Err(DataError::Entity(EntityError::NonUniqueResult { count: 2, .. }))
                ));

                let optional = repos.members.find_optional_by_username("AAA").await;
                assert!(matches!(
                    optional,
                    Err(DataError::Entity(EntityError::NonUniqueResult { .. }))
                ));
            }

            // ==================================================================
            // Paging
            // ==================================================================

            async fn five_members_aged_ten(repos: &Repositories) {
                for i in 1..=5 {
                    save_member(repos, &format!("member{}", i), 10).await;
                }
                save_member(repos, "other", 20).await;
            }

            fn by_username_desc(page: u64, size: u64) -> PageRequest {
                PageRequest::of(page, size).with_sort(Sort::by(Direction::Desc, ["username"]))
            }

            #[tokio::test]
            async fn test_find_by_age_page() {
                let repos = $factory;
                five_members_aged_ten(&repos).await;

                let page = repos
                    .members
                    .find_by_age(10, &by_username_desc(0, 3))
                    .await
                    .unwrap();

                assert_eq!(usernames(page.content()), vec!["member5", "member4", "member3"]);
                assert_eq!(page.total_elements(), 5);
                assert_eq!(page.number(), 0);
                assert_eq!(page.total_pages(), 2);
                assert!(page.is_first());
                assert!(page.has_next());

                let last = repos
                    .members
                    .find_by_age(10, &by_username_desc(1, 3))
                    .await
                    .unwrap();
                assert_eq!(usernames(last.content()), vec!["member2", "member1"]);
                assert!(last.is_last());
                assert!(!last.has_next());
                assert!(last.has_previous());
            }

            #[tokio::test]
            async fn test_page_past_the_end_is_empty() {
                let repos = $factory;
                five_members_aged_ten(&repos).await;

                let page = repos
                    .members
                    .find_by_age(10, &by_username_desc(5, 3))
                    .await
                    .unwrap();
                assert!(page.content().is_empty());
                assert_eq!(page.total_elements(), 5);
            }

            #[tokio::test]
            async fn test_page_map_keeps_metadata() {
                let repos = $factory;
                five_members_aged_ten(&repos).await;

                let page = repos
                    .members
                    .find_by_age(10, &by_username_desc(0, 3))
                    .await
                    .unwrap();
                let names = page.map(|m| m.username);
                assert_eq!(names.total_elements(), 5);
                assert_eq!(names.content()[0], "member5");
            }

            #[tokio::test]
            async fn test_find_slice_by_age() {
                let repos = $factory;
                five_members_aged_ten(&repos).await;

                let slice = repos
                    .members
                    .find_slice_by_age(10, &by_username_desc(0, 3))
                    .await
                    .unwrap();
                assert_eq!(usernames(&slice.content), vec!["member5", "member4", "member3"]);
                assert!(slice.has_next);

                let last = repos
                    .members
                    .find_slice_by_age(10, &by_username_desc(1, 3))
                    .await
                    .unwrap();
                assert_eq!(last.content.len(), 2);
                assert!(!last.has_next);
            }

            #[tokio::test]
            async fn test_offset_limit_paging() {
                let repos = $factory;
                five_members_aged_ten(&repos).await;

                let rows = repos.members.find_by_page(10, 0, 3).await.unwrap();
                assert_eq!(usernames(&rows), vec!["member5", "member4", "member3"]);
                let rest = repos.members.find_by_page(10, 3, 3).await.unwrap();
                assert_eq!(usernames(&rest), vec!["member2", "member1"]);
                assert_eq!(repos.members.total_count(10).await.unwrap(), 5);
            }

            #[tokio::test]
            async fn test_out_of_range_windows_are_rejected() {
                let repos = $factory;
                five_members_aged_ten(&repos).await;

                let slice = repos
                    .members
                    .find_slice_by_age(10, &PageRequest::of(0, u64::MAX))
                    .await;
                assert!(matches!(
                    slice,
                    Err(DataError::Validation(ValidationError::InvalidPage { .. }))
                ));

                let page = repos
                    .members
                    .find_by_age(10, &PageRequest::of(u64::MAX, 10))
                    .await;
                assert!(matches!(
                    page,
                    Err(DataError::Validation(ValidationError::InvalidPage { .. }))
                ));

                let rows = repos.members.find_by_page(10, u64::MAX, 3).await;
                assert!(matches!(
                    rows,
                    Err(DataError::Validation(ValidationError::InvalidPage { .. }))
                ));
                let rows = repos.members.find_by_page(10, 0, u64::MAX).await;
                assert!(matches!(
                    rows,
                    Err(DataError::Validation(ValidationError::InvalidPage { .. }))
                ));
            }

            #[tokio::test]
            async fn test_find_all_paged() {
                let repos = $factory;
                five_members_aged_ten(&repos).await;

                let request = PageRequest::of(0, 4).with_sort(Sort::by(Direction::Asc, ["username"]));
                let page = repos.members.find_all_paged(&request).await.unwrap();
                assert_eq!(page.total_elements(), 6);
                assert_eq!(
                    usernames(page.content()),
                    vec!["member1", "member2", "member3", "member4"]
                );
            }

            // ==================================================================
            // Bulk update
            // ==================================================================

            #[tokio::test]
            async fn test_bulk_age_plus() {
                let repos = $factory;
                save_member(&repos, "member1", 10).await;
                save_member(&repos, "member2", 19).await;
                save_member(&repos, "member3", 20).await;
                save_member(&repos, "member4", 21).await;
                let member5 = save_member(&repos, "member5", 40).await;

                let affected = repos.members.bulk_age_plus(20).await.unwrap();
                assert_eq!(affected, 3);

                let reloaded = repos
                    .members
                    .find_by_id(&member5.id.unwrap())
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(reloaded.age, 41);
                assert_eq!(reloaded.last_modified_date, member5.last_modified_date);

                let untouched = repos.members.find_member_by_username("member2").await.unwrap();
                assert_eq!(untouched.age, 19);
            }

            // ==================================================================
            // Joins and projections
            // ==================================================================

            #[tokio::test]
            async fn test_fetch_join_loads_teams() {
                let repos = $factory;
                two_teams(&repos).await;
                save_member(&repos, "loner", 50).await;

                let rows = repos.members.find_member_fetch_join().await.unwrap();
                assert_eq!(rows.len(), 5);
                let pairs: Vec<(&str, Option<&str>)> = rows
                    .iter()
                    .map(|r| (r.member.username.as_str(), r.team_name()))
                    .collect();
                assert_eq!(
                    pairs,
                    vec![
                        ("member1", Some("teamA")),
                        ("member2", Some("teamA")),
                        ("member3", Some("teamB")),
                        ("member4", Some("teamB")),
                        ("loner", None),
                    ]
                );
            }

            #[tokio::test]
            async fn test_entity_graph_by_username() {
                let repos = $factory;
                two_teams(&repos).await;

                let rows = repos
                    .members
                    .find_entity_graph_by_username("member3")
                    .await
                    .unwrap();
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].team.as_ref().map(|t| t.name.as_str()), Some("teamB"));
            }

            #[tokio::test]
            async fn test_projections() {
                let repos = $factory;
                two_teams(&repos).await;
                save_member(&repos, "loner", 50).await;

                let closed: Vec<UsernameOnly> = repos
                    .members
                    .find_projections_by_username("member1")
                    .await
                    .unwrap();
                assert_eq!(closed, vec![UsernameOnly { username: "member1".to_string() }]);

                let dtos: Vec<UsernameOnlyDto> = repos
                    .members
                    .find_projections_by_username("member1")
                    .await
                    .unwrap();
                assert_eq!(dtos[0].username(), "member1");

                let nested: Vec<NestedClosedProjection> = repos
                    .members
                    .find_projections_by_username("member1")
                    .await
                    .unwrap();
                assert_eq!(
                    nested[0].team.as_ref().map(|t| t.name.as_str()),
                    Some("teamA")
                );

                let teamless: Vec<NestedClosedProjection> = repos
                    .members
                    .find_projections_by_username("loner")
                    .await
                    .unwrap();
                assert_eq!(teamless.len(), 1);
                assert!(teamless[0].team.is_none());
            }

            // ==================================================================
            // Query hints
            // ==================================================================

            #[tokio::test]
            async fn test_read_only_and_lock() {
                let repos = $factory;
                save_member(&repos, "member1", 10).await;

                let read_only = repos
                    .members
                    .find_read_only_by_username("member1")
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(read_only.age, 10);

                let locked = repos.members.find_lock_by_username("member1").await.unwrap();
                assert_eq!(locked.len(), 1);

                // the lock is released once the read completes
                let mut changed = locked[0].clone();
                changed.age = 11;
                assert_eq!(repos.members.save(changed).await.unwrap().age, 11);
            }

            // ==================================================================
            // Specifications and query by example
            // ==================================================================

            #[tokio::test]
            async fn test_specification_username_and_team() {
                let repos = $factory;
                save_team(&repos, "teamA", &[("m1", 0), ("m2", 0)]).await;

                let spec = MemberSpecification::username("m1")
                    .and(MemberSpecification::team_name("teamA"));
                let result = repos.members.find_all_matching(&spec).await.unwrap();
                assert_eq!(usernames(&result), vec!["m1"]);

                let other_team = MemberSpecification::username("m1")
                    .and(MemberSpecification::team_name("teamB"));
                assert!(repos.members.find_all_matching(&other_team).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_specification_blank_team_matches_everyone() {
                let repos = $factory;
                save_team(&repos, "teamA", &[("m1", 0)]).await;
                save_member(&repos, "m2", 0).await;

                let spec = MemberSpecification::team_name("");
                let result = repos.members.find_all_matching(&spec).await.unwrap();
                assert_eq!(result.len(), 2);
            }

            #[tokio::test]
            async fn test_specification_combinators() {
                let repos = $factory;
                two_teams(&repos).await;

                let spec = MemberSpecification::older_than(15)
                    .and(MemberSpecification::team_name("teamA").or(Specification::eq("username", "member4")));
                let result = repos.members.find_all_matching(&spec).await.unwrap();
                assert_eq!(sorted_usernames(&result), vec!["member2", "member4"]);

                let like = Specification::like("username", "member%")
                    .and(Specification::is_in("age", [10_i64, 40]));
                let result = repos.members.find_all_matching(&like).await.unwrap();
                assert_eq!(sorted_usernames(&result), vec!["member1", "member4"]);
            }

            #[tokio::test]
            async fn test_specification_unknown_property_is_rejected() {
                let repos = $factory;
                let spec = Specification::<Member>::eq("nickname", "x");
                let err = repos.members.find_all_matching(&spec).await.unwrap_err();
                assert!(matches!(
                    err,
                    DataError::Validation(ValidationError::UnknownProperty { .. })
                ));
            }

            #[tokio::test]
            async fn test_query_by_example() {
                let repos = $factory;
                let (team_a, _) = two_teams(&repos).await;

                let mut probe = Member::new("member1");
                probe.team_id = team_a.id;
                let example = Example::with_matcher(
                    probe,
                    ExampleMatcher::matching().with_ignore_paths(["age"]),
                );
                let result = repos.members.find_all_by_example(&example).await.unwrap();
                assert_eq!(usernames(&result), vec!["member1"]);

                // age 0 on the probe constrains the search unless ignored
                let strict = Example::of(Member::new("member1"));
                assert!(repos.members.find_all_by_example(&strict).await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_query_by_example_string_matching() {
                let repos = $factory;
                two_teams(&repos).await;
                save_member(&repos, "other", 10).await;

                let matcher = ExampleMatcher::matching()
                    .with_ignore_paths(["age"])
                    .with_string_matcher(StringMatcher::StartsWith)
                    .with_ignore_case();
                let example = Example::with_matcher(Member::new("MEMBER"), matcher);
                let result = repos.members.find_all_by_example(&example).await.unwrap();
                assert_eq!(result.len(), 4);
            }

            // ==================================================================
            // Native queries
            // ==================================================================

            #[tokio::test]
            async fn test_native_query() {
                let repos = $factory;
                two_teams(&repos).await;

                let found = repos.members.find_by_native_query("member2").await.unwrap();
                assert_eq!(found.map(|m| m.age), Some(20));
                assert!(repos.members.find_by_native_query("nobody").await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_native_projection_page() {
                let repos = $factory;
                two_teams(&repos).await;
                save_member(&repos, "loner", 50).await;

                let request = PageRequest::of(0, 10).with_sort(Sort::by(Direction::Asc, ["username"]));
                let page = repos.members.find_by_native_projection(&request).await.unwrap();
                assert_eq!(page.total_elements(), 5);

                let rows: Vec<(&str, Option<&str>)> = page
                    .content()
                    .iter()
                    .map(|p| (p.username.as_str(), p.team_name.as_deref()))
                    .collect();
                assert_eq!(rows[0], ("loner", None));
                assert_eq!(rows[1], ("member1", Some("teamA")));
            }
        }
    };
}
