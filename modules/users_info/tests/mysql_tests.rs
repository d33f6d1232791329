#![cfg(feature = "integration")]
//! Data access client against a real MySQL server in a container.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::mysql::Mysql;

use userdb_db::{ConnectOpts, DbHandle};
use users_info::client::UserDbClient;
use users_info::error::ServiceError;
use users_info::infra::storage::{ensure_schema, SqlUserDbClient};
use users_info::model::User;

async fn wait_for_tcp(port: u16) -> Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
    while tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_err() {
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("mysql did not come up on port {port}");
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    Ok(())
}

#[tokio::test]
async fn user_table_round_trip() -> Result<()> {
    let container = Mysql::default().start().await?;
    let port = container.get_host_port_ipv4(3306).await?;
    wait_for_tcp(port).await?;

    let dsn = format!("mysql://root@127.0.0.1:{port}/test");
    let db = Arc::new(DbHandle::connect(&dsn, ConnectOpts::default()).await?);
    ensure_schema(&db).await?;
    let client = SqlUserDbClient::shared(db.clone(), format!("127.0.0.1:{port}"), Duration::from_secs(10));

    let mut alice = User {
        password: "secret".into(),
        ..User::new("alice", "p1", "a@x.com")
    };
    alice.password = alice.pwd_hash(true);
    client.add(&alice).await?;

    let err = client.add(&alice).await.unwrap_err();
    assert!(err.is(&ServiceError::DB_PKEY), "{err}");

    alice.last_login = "20240601100000".into();
    alice.validated = "20240601100500".into();
    client.update(&alice).await?;

    let mut got = alice.key_only();
    assert!(client.fetch_info(&mut got).await?);
    assert!(got.matches(&alice));
    assert_eq!(got.last_login, "20240601100000");
    assert_eq!(got.validated, "20240601100500");

    client.delete(&alice).await?;
    client.delete(&alice).await?;
    let mut gone = alice.key_only();
    assert!(!client.fetch_info(&mut gone).await?);

    client.close().await;
    db.close().await;
    Ok(())
}
