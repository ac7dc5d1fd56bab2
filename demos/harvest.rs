//! Seed a record from several backends and watch it change.
//!
//! Run with: `cargo run --example harvest`

use fieldwatch::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fieldwatch::record! {
    #[derive(Debug, Default)]
    pub struct Database {
        #[source(seed = "localhost", consul = "demo/db/host")]
        pub host: SyncString,
        #[source(vault = "demo/db/password")]
        pub password: Secret,
    }
}

fieldwatch::record! {
    #[derive(Debug, Default)]
    pub struct AppConfig {
        /// Display name.
        #[source(seed = "John Doe")]
        pub name: SyncString,
        #[source(env = "DEMO_AGE", consul = "demo/age")]
        pub age: SyncInt64,
        #[source(seed = "1.0", redis = "demo/sample_rate")]
        pub sample_rate: SyncFloat64,
        pub db: Database,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "fieldwatch=debug".into()))
        .init();

    let consul = MemoryStore::new(Source::Consul);
    consul.put_many([("demo/db/host", "db.internal"), ("demo/age", "30")]);
    let vault = MemoryStore::new(Source::Vault);
    vault.put("demo/db/password", "hunter2");
    let redis = MemoryStore::new(Source::Redis);

    let cfg = AppConfig::default();
    let harvester = Harvester::builder()
        .with_getter(Source::Consul, Arc::new(consul.clone()))
        .with_getter(Source::Vault, Arc::new(vault.clone()))
        .with_getter(Source::Redis, Arc::new(redis.clone()))
        .with_watcher(Source::Consul, Arc::new(consul.clone()))
        .with_watcher(Source::Vault, Arc::new(vault.clone()))
        .with_watcher(
            Source::Redis,
            Arc::new(PollingWatcher::new(redis.clone(), Duration::from_millis(200))),
        )
        .build(&cfg)?;

    let cancel = CancellationToken::new();
    let handle = harvester.harvest(&cancel).await?;
    println!("seeded:\n{}", harvester.config());

    consul.put("demo/age", "31");
    vault.put("demo/db/password", "correct-horse");
    redis.put("demo/sample_rate", "0.1");
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("updated:\n{}", harvester.config());
    println!("{cfg:?}");

    cancel.cancel();
    if let Some(handle) = handle {
        handle.stopped().await;
    }
    Ok(())
}
