use tracing::{error, info, warn};

use mailroom::{Config, Database, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = mailroom::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        mailroom::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("Startup failed: {e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> mailroom::Result<()> {
    config.validate()?;

    info!("Mailroom - department mail tracking");

    let db = Database::from_config(&config.database).await?;
    info!("Database ready at {}", config.database.path);

    match config.bootstrap.admin_credentials() {
        Some((username, password)) => {
            if let Some(admin) = mailroom::ensure_super_admin(db.pool(), username, password).await?
            {
                info!(username = %admin.username, "Created initial super admin");
            }
        }
        None => warn!("No bootstrap admin configured; sign up a super_admin account manually"),
    }

    let server = WebServer::new(&config, db)?;
    info!("Server configured on {}", server.addr());
    server.run().await?;
    Ok(())
}
