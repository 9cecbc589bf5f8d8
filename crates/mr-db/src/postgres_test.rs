use super::*;

fn config(conn_str: &str) -> Config {
    Config::from_str(conn_str).unwrap()
}

#[test]
fn test_sslmode_disable_skips_tls() {
    assert!(!uses_tls(&config("host=db user=app sslmode=disable")));
    assert!(!uses_tls(&config(
        "postgres://app@db/donasi?sslmode=disable"
    )));
}

#[test]
fn test_tls_negotiated_by_default_and_when_required() {
    assert!(uses_tls(&config("host=db user=app")));
    assert!(uses_tls(&config("host=db user=app sslmode=prefer")));
    assert!(uses_tls(&config("postgresql://app@db/donasi?sslmode=require")));
}

#[tokio::test]
async fn test_connect_rejects_malformed_config() {
    let err = PostgresBackend::connect("host=db sslmode=sometimes")
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DbError::ConnectionError(_)));
}

/// Live server, when `TEST_POSTGRES_URL` is set
async fn live_backend() -> Option<PostgresBackend> {
    let url = std::env::var("TEST_POSTGRES_URL").ok()?;
    Some(PostgresBackend::connect(&url).await.unwrap())
}

#[tokio::test]
async fn test_live_column_names_qualified_and_unqualified() {
    let Some(db) = live_backend().await else {
        return;
    };
    db.execute_batch(
        "DROP SCHEMA IF EXISTS mr_column_names CASCADE;
         CREATE SCHEMA mr_column_names;
         CREATE TABLE mr_column_names.donatur (id INTEGER, no_hp TEXT, nama TEXT);
         DROP TABLE IF EXISTS public.mr_column_names_t;
         CREATE TABLE public.mr_column_names_t (id INTEGER, phone TEXT);",
    )
    .await
    .unwrap();

    assert_eq!(
        db.column_names("mr_column_names.donatur").await.unwrap(),
        vec!["id", "no_hp", "nama"]
    );
    assert_eq!(
        db.column_names("mr_column_names_t").await.unwrap(),
        vec!["id", "phone"]
    );
    assert!(db.column_names("no_such_table").await.unwrap().is_empty());

    db.execute_batch(
        "DROP SCHEMA mr_column_names CASCADE; DROP TABLE public.mr_column_names_t;",
    )
    .await
    .unwrap();
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_live_execute_error_carries_server_message() {
    let Some(db) = live_backend().await else {
        return;
    };
    let err = db
        .execute_batch("SELECT * FROM mr_does_not_exist")
        .await
        .unwrap_err();
    match err {
        DbError::ExecutionError(msg) => {
            assert!(msg.starts_with("ERROR (42P01): "), "{msg}");
            assert!(msg.contains("mr_does_not_exist"));
        }
        other => panic!("unexpected error: {other}"),
    }
    db.close().await.unwrap();
}

#[tokio::test]
async fn test_live_close_is_idempotent() {
    let Some(db) = live_backend().await else {
        return;
    };
    assert_eq!(db.db_type(), "postgres");
    db.close().await.unwrap();
    db.close().await.unwrap();
    assert!(matches!(
        db.execute_batch("SELECT 1").await,
        Err(DbError::Closed)
    ));
    assert!(matches!(db.column_names("t").await, Err(DbError::Closed)));
}
