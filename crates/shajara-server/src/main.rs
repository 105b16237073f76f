//! Shajara Server — application entry point.

use shajara_db::repository::{
    SurrealMemberRepository, SurrealNotificationRepository, SurrealUserRepository,
};
use shajara_db::{DbConfig, DbError, DbManager};
use shajara_tree::{MemberService, StoreNotifier, TreeConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), DbError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("shajara=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Shajara server...");

    let config = DbConfig::from_env();
    let manager = DbManager::connect(&config).await?;
    shajara_db::run_migrations(manager.client()).await?;

    let db = manager.client().clone();
    let members = SurrealMemberRepository::new(db.clone());
    let users = SurrealUserRepository::new(db.clone());
    let notifications = SurrealNotificationRepository::new(db);
    let notifier = StoreNotifier::new(users.clone(), notifications);
    let _members = MemberService::new(members, users, notifier, TreeConfig::default());

    tracing::info!("Relationship engine ready");

    // TODO: mount the HTTP routes on top of the services
    // TODO: wire an SMTP transport behind the Mailer trait

    tracing::info!("Shajara server stopped.");
    Ok(())
}
