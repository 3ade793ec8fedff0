use migration::{Migrator, MigratorTrait};
use server::ServerConfig;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "stockroom={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let config = ServerConfig {
        bind: settings.server.addr()?,
        request_timeout: settings.server.request_timeout(),
    };

    let db = sea_orm::Database::connect(settings.database.connect_options()).await?;
    Migrator::up(&db, None).await?;
    tracing::info!("database ready, migrations applied");

    let engine = engine::Engine::builder().database(db).build().await?;
    server::run(engine, config).await;

    Ok(())
}
