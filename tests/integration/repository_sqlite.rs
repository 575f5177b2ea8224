//! Integration tests for the generic repository against SQLite
//!
//! Each test gets its own temporary database from `test_helpers`.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tablekit::test_helpers::{temp_database, Note, User};
use tablekit::{
    DataError, DbContext, Filter, Operator, QueryFilter, Record, Repository, TableRepository,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// `notes` row whose key is assigned by the database and never written
#[derive(Debug, Record, Deserialize)]
#[table_name = "notes"]
struct ServerNote {
    #[skip_write]
    id: i64,
    body: String,
}

/// Same table, for rows that have not been read back yet
#[derive(Debug, Record, Deserialize)]
#[table_name = "notes"]
struct DraftNote {
    #[skip_write]
    id: Option<i64>,
    body: String,
}

/// Hand-written repository that refuses to delete every user at once
struct UserRepository {
    context: Arc<DbContext>,
}

#[async_trait]
impl Repository<User> for UserRepository {
    fn context(&self) -> &DbContext {
        &self.context
    }

    fn table(&self) -> &str {
        "users"
    }

    async fn destroy(&self, filter: Filter, cancel: &CancellationToken) -> tablekit::Result<u64> {
        if matches!(filter, Filter::All) {
            return Err(DataError::InvalidStateError(
                "refusing to delete every user".to_string(),
            ));
        }
        let ctx = self.context();
        let query = filter.into_query::<User>();
        ctx.execute(&ctx.compiler().delete(self.table(), &query), cancel)
            .await
    }
}

fn users(db: &tablekit::test_helpers::TestDatabase) -> TableRepository<User> {
    TableRepository::for_record(db.context.clone())
}

#[tokio::test]
async fn test_users_scenario() {
    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();

    assert!(!repo.any(Filter::all(), &cancel).await.unwrap());

    repo.insert(&User::new("a@x.com"), &cancel).await.unwrap();
    repo.insert(&User::new("b@x.com"), &cancel).await.unwrap();

    assert!(repo.any(Filter::all(), &cancel).await.unwrap());
    assert_eq!(repo.count(Filter::all(), &cancel).await.unwrap(), 2);

    let page = repo
        .get_pagination::<User>(Filter::all(), 1, 1, &cancel)
        .await
        .unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.take, 1);
    assert_eq!(page.total, 2);
    assert_eq!(page.pages, 2);
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn test_insert_generates_identifier_and_round_trips_fields() {
    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();

    let mut user = User::new("a@x.com");
    user.role_id = Some(Uuid::new_v4());
    user.two_factor = true;
    user.tags = vec!["admin".to_string(), "ops".to_string()];
    user.avatar = Some(vec![0, 1, 254, 255]);

    let id: Uuid = repo.insert_get_id(&user, &cancel).await.unwrap();
    assert_ne!(id, user.id);

    let stored: User = repo.first(Filter::id(id), &cancel).await.unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.role_id, user.role_id);
    assert_eq!(stored.email, user.email);
    assert!(stored.two_factor);
    assert_eq!(stored.tags, user.tags);
    assert_eq!(stored.avatar, user.avatar);
    // Skipped on write, filled by the column default.
    assert!(stored.created_at.is_some());
}

#[tokio::test]
async fn test_insert_get_id_reads_back_server_generated_key() {
    let db = temp_database().await.unwrap();
    let notes = TableRepository::<Note>::for_record(db.context.clone());
    let cancel = CancellationToken::new();

    let first: i64 = notes
        .insert_get_id(&Note { id: 0, body: "one".to_string() }, &cancel)
        .await
        .unwrap();
    let second: i64 = notes
        .insert_get_id(&Note { id: 0, body: "two".to_string() }, &cancel)
        .await
        .unwrap();
    assert!(second > first);

    let note: Note = notes.first(Filter::id(second), &cancel).await.unwrap();
    assert_eq!(note.body, "two");
}

#[tokio::test]
async fn test_first_and_first_or_default_on_missing_row() {
    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();
    let missing = Filter::id(Uuid::new_v4());

    let err = repo.first::<User>(missing.clone(), &cancel).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(repo
        .first_or_default::<User>(missing, &cancel)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_filter_shapes_agree() {
    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();
    for email in ["a@x.com", "b@x.com", "c@y.com"] {
        repo.insert(&User::new(email), &cancel).await.unwrap();
    }

    let eq = repo.count(Filter::eq("email", "b@x.com"), &cancel).await.unwrap();
    let cmp = repo
        .count(Filter::compare("email", Operator::Eq, "b@x.com"), &cancel)
        .await
        .unwrap();
    let query = repo
        .count(
            QueryFilter::new()
                .where_op("email", Operator::Eq, "b@x.com")
                .into(),
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!((eq, cmp, query), (1, 1, 1));

    let like: Operator = "LIKE".parse().unwrap();
    assert_eq!(
        repo.count(Filter::compare("email", like, "%@x.com"), &cancel)
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        repo.count(Filter::compare("email", Operator::NotEq, "a@x.com"), &cancel)
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_count_matches_get_for_windowed_and_ordered_queries() {
    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();
    for i in 0..5 {
        repo.insert(&User::new(&format!("user{i}@x.com")), &cancel)
            .await
            .unwrap();
    }

    let filters = [
        Filter::all(),
        Filter::eq("email", "user3@x.com"),
        QueryFilter::new().order_by_desc("email").limit(2).into(),
        QueryFilter::new().offset(3).into(),
        QueryFilter::new().limit(10).offset(4).into(),
    ];
    for filter in filters {
        let count = repo.count(filter.clone(), &cancel).await.unwrap();
        let rows: Vec<User> = repo.get(filter, &cancel).await.unwrap();
        assert_eq!(count, rows.len() as u64);
    }
}

#[tokio::test]
async fn test_pagination_bounds() {
    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();
    for i in 0..7 {
        repo.insert(&User::new(&format!("user{i}@x.com")), &cancel)
            .await
            .unwrap();
    }

    let ordered: Filter = QueryFilter::new().order_by_asc("email").into();
    let mut seen = Vec::new();
    for page in 1..=3 {
        let result = repo
            .get_pagination::<User>(ordered.clone(), page, 3, &cancel)
            .await
            .unwrap();
        assert_eq!(result.total, 7);
        assert_eq!(result.pages, 3);
        assert!(result.items.len() <= 3);
        seen.extend(result.items.into_iter().map(|u| u.email));
    }
    let expected: Vec<String> = (0..7).map(|i| format!("user{i}@x.com")).collect();
    assert_eq!(seen, expected);

    let past_end = repo
        .get_pagination::<User>(ordered, 9, 3, &cancel)
        .await
        .unwrap();
    assert!(past_end.items.is_empty());
    assert_eq!(past_end.page, 9);
}

#[tokio::test]
async fn test_projection_decodes_into_other_shape() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Email {
        email: String,
    }

    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();
    repo.insert(&User::new("a@x.com"), &cancel).await.unwrap();

    let emails: Vec<Email> = repo
        .get(QueryFilter::new().columns(["email"]).into(), &cancel)
        .await
        .unwrap();
    assert_eq!(
        emails,
        vec![Email {
            email: "a@x.com".to_string()
        }]
    );
}

#[tokio::test]
async fn test_update_keeps_identifier() {
    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();

    let id: Uuid = repo
        .insert_get_id(&User::new("a@x.com"), &cancel)
        .await
        .unwrap();
    let mut user: User = repo.first(Filter::id(id), &cancel).await.unwrap();
    user.email = "changed@x.com".to_string();
    user.tags = vec!["edited".to_string()];

    assert_eq!(repo.update(&user, &cancel).await.unwrap(), 1);

    let stored: User = repo.first(Filter::id(id), &cancel).await.unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.email, "changed@x.com");
    assert_eq!(stored.tags, vec!["edited".to_string()]);
    assert_eq!(repo.count(Filter::all(), &cancel).await.unwrap(), 1);
}

#[tokio::test]
async fn test_destroy_then_any_is_false() {
    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();

    let id: Uuid = repo
        .insert_get_id(&User::new("a@x.com"), &cancel)
        .await
        .unwrap();
    repo.insert(&User::new("b@x.com"), &cancel).await.unwrap();

    assert_eq!(repo.destroy(Filter::id(id), &cancel).await.unwrap(), 1);
    assert!(!repo.any(Filter::id(id), &cancel).await.unwrap());
    assert!(repo.any(Filter::all(), &cancel).await.unwrap());

    assert_eq!(
        repo.destroy(Filter::eq("email", "b@x.com"), &cancel)
            .await
            .unwrap(),
        1
    );
    assert!(!repo.any(Filter::all(), &cancel).await.unwrap());
}

#[tokio::test]
async fn test_bulk_insert_generates_distinct_identifiers() {
    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();

    let batch: Vec<User> = (0..4)
        .map(|i| User::new(&format!("bulk{i}@x.com")))
        .collect();
    assert_eq!(repo.insert_many(&batch, &cancel).await.unwrap(), 4);
    assert_eq!(repo.insert_many(&[], &cancel).await.unwrap(), 0);

    let stored: Vec<User> = repo.get(Filter::all(), &cancel).await.unwrap();
    assert_eq!(stored.len(), 4);
    let ids: HashSet<Uuid> = stored.iter().map(|u| u.id).collect();
    assert_eq!(ids.len(), 4);
    assert!(!ids.contains(&Uuid::nil()));
}

#[tokio::test]
async fn test_cancelled_token_aborts_before_running() {
    let db = temp_database().await.unwrap();
    let repo = users(&db);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = repo.insert(&User::new("a@x.com"), &cancel).await.unwrap_err();
    assert!(matches!(err, DataError::Cancelled));

    let live = CancellationToken::new();
    assert!(!repo.any(Filter::all(), &live).await.unwrap());
}

#[tokio::test]
async fn test_update_with_server_assigned_identifier() {
    let db = temp_database().await.unwrap();
    let notes = TableRepository::<ServerNote>::for_record(db.context.clone());
    let cancel = CancellationToken::new();

    let id: i64 = notes
        .insert_get_id(&ServerNote { id: 0, body: "one".to_string() }, &cancel)
        .await
        .unwrap();
    let mut note: ServerNote = notes.first(Filter::id(id), &cancel).await.unwrap();
    note.body = "changed".to_string();

    assert_eq!(notes.update(&note, &cancel).await.unwrap(), 1);
    let stored: ServerNote = notes.first(Filter::id(id), &cancel).await.unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.body, "changed");
}

#[tokio::test]
async fn test_update_with_null_identifier_is_mapping_error() {
    let db = temp_database().await.unwrap();
    let notes = TableRepository::<DraftNote>::for_record(db.context.clone());
    let cancel = CancellationToken::new();

    notes
        .insert(&DraftNote { id: None, body: "one".to_string() }, &cancel)
        .await
        .unwrap();
    let err = notes
        .update(&DraftNote { id: None, body: "two".to_string() }, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::MappingError(_)));

    let stored: DraftNote = notes.first(Filter::all(), &cancel).await.unwrap();
    assert_eq!(stored.body, "one");
    assert!(stored.id.is_some());
}

#[tokio::test]
async fn test_overridden_verb_leaves_defaults_intact() {
    let db = temp_database().await.unwrap();
    let repo = UserRepository {
        context: db.context.clone(),
    };
    let cancel = CancellationToken::new();

    repo.insert(&User::new("a@x.com"), &cancel).await.unwrap();
    repo.insert(&User::new("b@x.com"), &cancel).await.unwrap();

    let err = repo.destroy(Filter::all(), &cancel).await.unwrap_err();
    assert!(err.is_invalid_state());
    assert_eq!(repo.count(Filter::all(), &cancel).await.unwrap(), 2);

    assert_eq!(
        repo.destroy(Filter::eq("email", "a@x.com"), &cancel)
            .await
            .unwrap(),
        1
    );
    let rest: Vec<User> = repo.get(Filter::all(), &cancel).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].email, "b@x.com");
    assert!(repo.any(Filter::eq("email", "b@x.com"), &cancel).await.unwrap());
}
