//! Integration tests for the unit of work against SQLite

use tablekit::test_helpers::{temp_database, User};
use tablekit::{Connection, Filter, IsolationLevel, Repository, TableRepository, UnitOfWork};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_save_without_begin_is_invalid_state() {
    let db = temp_database().await.unwrap();
    let uow = UnitOfWork::new(db.context.clone());
    let cancel = CancellationToken::new();

    assert!(!uow.is_in_transaction());
    assert!(uow.save_changes(&cancel).await.unwrap_err().is_invalid_state());
    assert!(uow
        .discard_changes(&cancel)
        .await
        .unwrap_err()
        .is_invalid_state());
}

#[tokio::test]
async fn test_double_begin_is_rejected() {
    let db = temp_database().await.unwrap();
    let uow = UnitOfWork::new(db.context.clone());
    let cancel = CancellationToken::new();

    uow.begin_transaction(&cancel).await.unwrap();
    assert!(uow
        .begin_transaction(&cancel)
        .await
        .unwrap_err()
        .is_invalid_state());
    assert!(uow.is_in_transaction());
    uow.discard_changes(&cancel).await.unwrap();
}

#[tokio::test]
async fn test_save_changes_persists_and_closes() {
    let db = temp_database().await.unwrap();
    let repo = TableRepository::<User>::for_record(db.context.clone());
    let uow = UnitOfWork::with_isolation(db.context.clone(), IsolationLevel::Serializable);
    let cancel = CancellationToken::new();

    uow.begin_transaction(&cancel).await.unwrap();
    assert!(uow.is_in_transaction());
    repo.insert(&User::new("a@x.com"), &cancel).await.unwrap();
    repo.insert(&User::new("b@x.com"), &cancel).await.unwrap();
    // Reads inside the transaction see its writes.
    assert_eq!(repo.count(Filter::all(), &cancel).await.unwrap(), 2);
    let page = repo
        .get_pagination::<User>(Filter::all(), 1, 1, &cancel)
        .await
        .unwrap();
    assert_eq!((page.total, page.pages), (2, 2));

    uow.save_changes(&cancel).await.unwrap();
    assert!(!uow.is_in_transaction());
    assert!(!db.connection.is_open());

    assert_eq!(repo.count(Filter::all(), &cancel).await.unwrap(), 2);
}

#[tokio::test]
async fn test_discard_changes_rolls_back() {
    let db = temp_database().await.unwrap();
    let repo = TableRepository::<User>::for_record(db.context.clone());
    let uow = UnitOfWork::new(db.context.clone());
    let cancel = CancellationToken::new();

    repo.insert(&User::new("kept@x.com"), &cancel).await.unwrap();

    uow.begin_transaction(&cancel).await.unwrap();
    repo.insert(&User::new("dropped@x.com"), &cancel).await.unwrap();
    repo.destroy(Filter::eq("email", "kept@x.com"), &cancel)
        .await
        .unwrap();
    uow.discard_changes(&cancel).await.unwrap();

    let emails: Vec<String> = repo
        .get::<User>(Filter::all(), &cancel)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.email)
        .collect();
    assert_eq!(emails, vec!["kept@x.com".to_string()]);
}

#[tokio::test]
async fn test_transaction_can_be_reused_after_completion() {
    let db = temp_database().await.unwrap();
    let repo = TableRepository::<User>::for_record(db.context.clone());
    let uow = UnitOfWork::new(db.context.clone());
    let cancel = CancellationToken::new();

    for email in ["a@x.com", "b@x.com"] {
        uow.begin_transaction(&cancel).await.unwrap();
        repo.insert(&User::new(email), &cancel).await.unwrap();
        uow.save_changes(&cancel).await.unwrap();
    }
    assert_eq!(repo.count(Filter::all(), &cancel).await.unwrap(), 2);
}
