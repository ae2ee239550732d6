//! Bootstrap against a real Postgres.
//!
//! Uses `POSTGRES_HOST` / `POSTGRES_PORT` when set, otherwise starts a
//! container (needs docker). Run with `--features test-postgres`.

#![cfg(feature = "test-postgres")]

use hearthbook::catalog::{self, NAMESPACES};
use hearthbook::{
    Bootstrapper, ColumnDef, Namespace, PgStore, PgType, QualifiedName, SchemaStore, StoreError,
    TableDef, bootstrap,
};
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

const STRAY: TableDef = TableDef {
    namespace: "nowhere",
    name: "stray",
    doc: "",
    columns: &[ColumnDef::id("id"), ColumnDef::new("note", PgType::Text)],
    checks: &[],
};

struct TestDb {
    config: tokio_postgres::Config,
    _container: Option<ContainerAsync<Postgres>>,
}

async fn test_db() -> TestDb {
    let mut config = tokio_postgres::Config::new();
    config.user("postgres").password("postgres").dbname("postgres");

    if let Ok(host) = std::env::var("POSTGRES_HOST") {
        let port = std::env::var("POSTGRES_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5432);
        config.host(&host).port(port);
        return TestDb {
            config,
            _container: None,
        };
    }

    let container = Postgres::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();
    config.host(&host.to_string()).port(port);
    TestDb {
        config,
        _container: Some(container),
    }
}

async fn drop_namespaces(config: &tokio_postgres::Config) {
    let (client, connection) = config.connect(tokio_postgres::NoTls).await.unwrap();
    tokio::spawn(connection);
    for namespace in NAMESPACES {
        client
            .batch_execute(&format!("DROP SCHEMA IF EXISTS \"{namespace}\" CASCADE"))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_bootstrap_twice() {
    let db = test_db().await;
    drop_namespaces(&db.config).await;
    let catalog = catalog::household().unwrap();

    let first = bootstrap(&db.config, &catalog).await.unwrap();
    assert_eq!(first.namespaces.created.len(), 2);
    assert_eq!(first.tables_created.len(), 18);

    let second = bootstrap(&db.config, &catalog).await.unwrap();
    assert!(second.is_noop());
    assert_eq!(second.tables_present.len(), 18);

    // Duplicates are told apart from other failures by SQLSTATE
    let mut store = PgStore::connect(&db.config).await.unwrap();
    let income = Namespace::parse("income").unwrap();
    let err = store.create_namespace(&income).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }), "{err:?}");

    let employer = catalog
        .get_table(&QualifiedName::new("income", "employer"))
        .unwrap();
    let err = store.create_table(employer).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }), "{err:?}");

    let stray = STRAY.to_table().unwrap();
    let err = store.create_table(&stray).await.unwrap_err();
    assert!(matches!(err, StoreError::Postgres(_)), "{err:?}");
    assert!(!store.table_exists(&stray.name).await.unwrap());

    // A third run through an explicit store, checking each table by hand
    let third = Bootstrapper::new(&catalog).run(&mut store).await.unwrap();
    assert!(third.is_noop());
    for table in catalog.iter_tables() {
        assert!(store.table_exists(&table.name).await.unwrap());
    }
    store.close().await;

    // The paystub source check is enforced by the store
    let (client, connection) = db.config.connect(tokio_postgres::NoTls).await.unwrap();
    tokio::spawn(connection);
    let employer: i32 = client
        .query_one(
            "INSERT INTO income.employer (employer_name) VALUES ('Acme') RETURNING id",
            &[],
        )
        .await
        .unwrap()
        .get(0);

    client
        .execute(
            "INSERT INTO income.paystub (employer_id) VALUES ($1)",
            &[&employer],
        )
        .await
        .unwrap();

    let err = client
        .execute("INSERT INTO income.paystub (gross_pay) VALUES (100)", &[])
        .await
        .unwrap_err();
    assert_eq!(
        err.code(),
        Some(&tokio_postgres::error::SqlState::CHECK_VIOLATION)
    );

    drop(client);
    drop_namespaces(&db.config).await;
}
