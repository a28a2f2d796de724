//! Macro-generated test suite for the `ItemRepository` contract.
//!
//! Items carry an assigned string id, so "new" is decided by the missing
//! creation timestamp rather than by the id.

#[macro_export]
macro_rules! item_repository_tests {
    ($factory:expr) => {
        mod item_repository_contract_tests {
            use super::*;
            use datamap::core::error::{EntityError, ValidationError};

            #[tokio::test]
            async fn test_save_new_item_stamps_creation() {
                let repos = $factory;
                let item = Item::new("A");
                assert!(item.is_new());

                let saved = repos.items.save(item).await.unwrap();
                assert_eq!(saved.id, "A");
                assert!(saved.created_datetime.is_some());
                assert!(!saved.is_new());

                let found = repos.items.find_by_id(&"A".to_string()).await.unwrap().unwrap();
                assert_eq!(found.created_datetime, saved.created_datetime);
            }

            #[tokio::test]
            async fn test_duplicate_new_item_is_rejected() {
                let repos = $factory;
                repos.items.save(Item::new("A")).await.unwrap();

                let err = repos.items.save(Item::new("A")).await.unwrap_err();
                assert!(matches!(
                    err,
                    DataError::Entity(EntityError::AlreadyExists { ref id, .. }) if id == "A"
                ));
                assert_eq!(repos.items.count().await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_resave_persisted_item() {
                let repos = $factory;
                let saved = repos.items.save(Item::new("A")).await.unwrap();

                let again = repos.items.save(saved.clone()).await.unwrap();
                assert_eq!(again.created_datetime, saved.created_datetime);
                assert_eq!(repos.items.count().await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_persisted_item_missing_from_store() {
                let repos = $factory;
                let mut item = Item::new("ghost");
                item.created_datetime = Some(chrono::Utc::now());

                let err = repos.items.save(item).await.unwrap_err();
                assert!(matches!(err, DataError::Entity(EntityError::NotFound { .. })));
            }

            #[tokio::test]
            async fn test_blank_id_is_rejected() {
                let repos = $factory;
                let err = repos.items.save(Item::new("  ")).await.unwrap_err();
                assert!(matches!(
                    err,
                    DataError::Validation(ValidationError::FieldError { .. })
                ));
            }

            #[tokio::test]
            async fn test_find_all_sorted_and_delete() {
                let repos = $factory;
                for id in ["B", "A", "C"] {
                    repos.items.save(Item::new(id)).await.unwrap();
                }

                let sorted = repos
                    .items
                    .find_all_sorted(&Sort::by(Direction::Asc, ["id"]))
                    .await
                    .unwrap();
                let ids: Vec<&str> = sorted.iter().map(|i| i.id.as_str()).collect();
                assert_eq!(ids, vec!["A", "B", "C"]);

                repos.items.delete_by_id(&"B".to_string()).await.unwrap();
                assert!(!repos.items.exists_by_id(&"B".to_string()).await.unwrap());

                repos.items.delete_all().await.unwrap();
                assert_eq!(repos.items.count().await.unwrap(), 0);
            }
        }
    };
}
