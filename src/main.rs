use tento_assessment::{app_state::Repositories, config::Config, db::Database, errors::AppResult};

/// Connects to MongoDB and makes sure every collection carries its indexes.
#[tokio::main]
async fn main() -> AppResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let db = Database::connect(&config).await?;
    Repositories::mongo(&db, &config).await?;

    log::info!(
        "Assessment store '{}' ready: quizzes in '{}', attempts in '{}', prerequisites in '{}'",
        db.name(),
        config.quizzes_collection,
        config.attempts_collection,
        config.prerequisites_collection
    );
    Ok(())
}
