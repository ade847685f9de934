//! create-admin - Provision the administrator account.
//!
//! Reads `--email`, `--password`, and `--name` flags, falling back to
//! the `ADMIN_EMAIL`, `ADMIN_PASSWORD`, and `ADMIN_NAME` environment
//! variables and then to built-in defaults. Exits cleanly when the
//! account already exists, so it is safe to run on every deploy.

use planeo::config::Config;
use planeo::hours::Hours;
use planeo::password::hash_password;
use planeo::store::users::NewUser;
use planeo::store::SqliteStore;

const DEFAULT_EMAIL: &str = "admin@example.com";
const DEFAULT_PASSWORD: &str = "admin123";
const DEFAULT_NAME: &str = "Administrador";

/// Matches the schema default for new accounts.
const DEFAULT_DAILY_LIMIT: Hours = Hours::from_hundredths(600);

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|pair| pair[0] == flag)
        .map(|pair| pair[1].clone())
}

fn option(args: &[String], flag: &str, env: &str, default: &str) -> String {
    flag_value(args, flag)
        .or_else(|| std::env::var(env).ok())
        .unwrap_or_else(|| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let email = option(&args, "--email", "ADMIN_EMAIL", DEFAULT_EMAIL)
        .trim()
        .to_lowercase();
    let password = option(&args, "--password", "ADMIN_PASSWORD", DEFAULT_PASSWORD);
    let name = option(&args, "--name", "ADMIN_NAME", DEFAULT_NAME);

    let config = Config::from_env()?;
    let store = SqliteStore::open(config.db_path()).await?;

    if store.user_by_email(&email).await?.is_some() {
        println!("El usuario con correo '{}' ya existe.", email);
        return Ok(());
    }

    store
        .create_user(NewUser {
            email: email.clone(),
            name,
            password_hash: hash_password(&password),
            daily_hours_limit: DEFAULT_DAILY_LIMIT,
        })
        .await?;

    println!("Usuario administrador creado: {}", email);

    Ok(())
}
