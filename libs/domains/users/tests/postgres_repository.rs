//! Store and repository against a real Postgres. Needs Docker:
//! `cargo test -p domain_users -- --ignored`

use chrono::{DateTime, TimeZone, Utc};
use domain_users::{
    CLAIMS_TTL, Claims, CredentialEngine, ErrorKind, Field, HashingConfig, NewUser,
    PostgresUserRepository, RepositoryError, Role, UniqueKey, UpdateUser, User, UserRepository,
    UserStore,
};
use test_utils::{TestDataBuilder, TestDatabase};

const ISSUER: &str = "users service";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

fn engine() -> CredentialEngine {
    CredentialEngine::new(&HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

fn admin() -> Claims {
    Claims::issue("admin", vec![Role::Admin], ISSUER, now(), CLAIMS_TTL)
}

#[tokio::test]
#[ignore = "needs Docker"]
async fn test_store_round_trip() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("test_store_round_trip");
    let store = UserStore::new(PostgresUserRepository::new(db.connection()), engine(), ISSUER);

    let email = builder.email("bill");
    let created = store
        .create(
            NewUser {
                name: "Bill Kennedy".into(),
                email: email.clone(),
                roles: vec!["ADMIN".into(), "USER".into()],
                password: "gophers".into(),
                password_confirm: "gophers".into(),
            },
            now(),
        )
        .await
        .unwrap();
    let id = created.id.to_string();

    let found = store.query_by_id(&admin(), &id).await.unwrap();
    assert_eq!(found.email, email);
    assert_eq!(found.roles, vec![Role::Admin, Role::User]);
    assert_eq!(found.date_created, now());
    assert!(engine().verify(&found.password_hash, "gophers").await);

    let update = UpdateUser {
        name: Field::Value("William Kennedy".into()),
        roles: Field::Empty,
        ..Default::default()
    };
    store.update(&admin(), &id, update, now()).await.unwrap();

    let found = store.query_by_email(&admin(), &email).await.unwrap();
    assert_eq!(found.name, "William Kennedy");
    assert!(found.roles.is_empty());

    let claims = store.authenticate(now(), &email, "gophers").await.unwrap();
    assert_eq!(claims.sub, id);

    store.delete(&admin(), &id).await.unwrap();
    let err = store.query_by_id(&admin(), &id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[ignore = "needs Docker"]
async fn test_repository_constraints_and_paging() {
    let db = TestDatabase::new().await;
    let repo = PostgresUserRepository::new(db.connection());

    let mut inserted = Vec::new();
    for i in 0..25 {
        let user = User::new(
            format!("user {i}"),
            format!("user{i}@example.com"),
            vec![Role::User],
            "hash".into(),
            now(),
        );
        repo.insert(&user).await.unwrap();
        inserted.push(user);
    }
    inserted.sort_by_key(|u| u.id);

    let page = repo.list(10, 10).await.unwrap();
    let ids: Vec<_> = page.iter().map(|u| u.id).collect();
    let expected: Vec<_> = inserted[10..20].iter().map(|u| u.id).collect();
    assert_eq!(ids, expected);

    let duplicate = User::new(
        "copy".into(),
        "user0@example.com".into(),
        vec![Role::User],
        "hash".into(),
        now(),
    );
    assert!(matches!(
        repo.insert(&duplicate).await,
        Err(RepositoryError::UniqueViolation(UniqueKey::Email))
    ));

    assert!(matches!(
        repo.replace(&duplicate).await,
        Err(RepositoryError::NoRows)
    ));

    db.truncate_users().await;
    assert!(repo.list(0, 10).await.unwrap().is_empty());
}
