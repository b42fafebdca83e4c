/// Clinic Server - appointment scheduling backend
use clap::{Parser, Subcommand};
use clinic_core::{CreateUser, Role};
use clinic_server::{config::ServerConfig, create_router, services::AuthService, state::AppState};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinic-server")]
#[command(about = "Clinic appointment scheduling server", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./config.toml when present)
    #[arg(short, long, global = true, env = "CLINIC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Create a new user
    AddUser {
        /// Username
        #[arg(short, long)]
        username: String,
        /// Password
        #[arg(short, long)]
        password: String,
        /// Role: admin, doctor or patient
        #[arg(short, long, default_value = "patient")]
        role: Role,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        #[arg(long)]
        email: Option<String>,
        /// Grant full access (implies the admin role)
        #[arg(long)]
        superuser: bool,
    },
    /// List all users
    ListUsers {
        /// Only users with this role
        #[arg(short, long)]
        role: Option<Role>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "clinic_server=info,clinic_storage=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => {
            serve(config).await?;
        }
        Commands::AddUser {
            username,
            password,
            role,
            first_name,
            last_name,
            email,
            superuser,
        } => {
            let user = CreateUser {
                username,
                first_name,
                last_name,
                email,
                role,
                is_superuser: superuser,
                password_hash: None,
            };
            add_user(config, user, &password).await?;
        }
        Commands::ListUsers { role } => {
            list_users(config, role).await?;
        }
    }

    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;

    tracing::info!("Starting Clinic Server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);

    // Initialize database
    let pool = clinic_storage::connect(&config.storage.database_url).await?;
    tracing::info!("Database connected");

    // Initialize auth service
    let auth_service = Arc::new(auth_service(&config));
    tracing::info!("Auth service initialized");

    if config.cache.enabled {
        tracing::info!(
            "Response cache enabled ({} entries, {}s TTL)",
            config.cache.capacity,
            config.cache.ttl_seconds
        );
    }

    // Create server address
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    // Build application state and router
    let app_state = AppState::new(pool, auth_service, config);
    let app = create_router(app_state);

    tracing::info!("Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn add_user(
    config: ServerConfig,
    mut user: CreateUser,
    password: &str,
) -> anyhow::Result<()> {
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }

    let pool = clinic_storage::connect(&config.storage.database_url).await?;

    // Hashing needs no secret; tokens are never issued here
    user.password_hash = Some(auth_service(&config).hash_password(password)?);
    let user = clinic_storage::users::create(&pool, user).await?;

    println!(
        "Created user {} ({}) with role {}{}",
        user.username,
        user.id,
        user.role,
        if user.is_superuser { ", superuser" } else { "" }
    );

    Ok(())
}

async fn list_users(config: ServerConfig, role: Option<Role>) -> anyhow::Result<()> {
    let pool = clinic_storage::connect(&config.storage.database_url).await?;
    let users = clinic_storage::users::get_all(&pool, role).await?;

    println!("Users:");
    for user in users {
        println!(
            "  {} - {} ({} {}) [{}{}]",
            user.id,
            user.username,
            user.first_name,
            user.last_name,
            user.role,
            if user.is_superuser { ", superuser" } else { "" }
        );
    }

    Ok(())
}

fn auth_service(config: &ServerConfig) -> AuthService {
    AuthService::new(
        &config.auth.jwt_secret,
        config.auth.jwt_expiration_hours,
        config.auth.jwt_refresh_expiration_days,
    )
}
