use std::sync::Arc;

use apm_core::auth::Session;
use apm_core::models::auth::RegisterRequest;
use apm_core::storage::keys;
use apm_core::{ApiClient, ClientConfig};
use serde::Serialize;
use serde_json::json;

use crate::cli::{AccessPointAction, Cli, Commands, StatKind};
use crate::{Error, Result};

pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::from_env();
    if let Some(server) = cli.server.clone() {
        config.server = Some(server);
    }
    if let Some(path) = cli.storage.clone() {
        config.storage_path = path;
    }

    let client = ApiClient::from_config(config)?;
    let result = dispatch(&client, cli).await;
    client.shutdown().await;
    result
}

async fn dispatch(client: &ApiClient, cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { email, password } => {
            let server = cli.server.ok_or_else(|| {
                Error::Custom("No server given. Pass --server or set APM_SERVER.".into())
            })?;
            let session = client.login(&server, &email, &password).await?;
            log::info!("Logged in as {} ({})", session.display_name, session.role);
            print_json(&identity(&session))
        }
        Commands::Logout => {
            if client.scope().server().is_none() {
                if let Some(server) = client.storage().get::<String>(keys::SERVER) {
                    client.scope().set_server(&server)?;
                }
            }
            client.logout().await?;
            log::info!("Logged out");
            Ok(())
        }
        Commands::Whoami => {
            let session = require_session(client).await?;
            print_json(&identity(&session))
        }
        Commands::Refresh => {
            // Restoring a session always exchanges the stored refresh token.
            let session = require_session(client).await?;
            print_json(&json!({ "expiresAt": session.expires_at }))
        }
        Commands::Register {
            name,
            email,
            password,
            password_repeat,
        } => {
            let server = cli.server.ok_or_else(|| {
                Error::Custom("No server given. Pass --server or set APM_SERVER.".into())
            })?;
            let request = RegisterRequest {
                name,
                email,
                password_repeat: password_repeat.unwrap_or_else(|| password.clone()),
                password,
            };
            client.auth().register(&server, &request).await?;
            log::info!("Account created, log in with `apm login`");
            Ok(())
        }
        Commands::AccessPoints { action } => {
            require_session(client).await?;
            let points = client.access_points();
            match action {
                AccessPointAction::List { full } => print_json(&points.list(full, true).await?),
                AccessPointAction::Get { id, full } => print_json(&points.by_id(&id, full).await?),
                AccessPointAction::Search { keyword } => print_json(&points.search(&keyword).await?),
                AccessPointAction::Runs { full } => print_json(&points.run_ids(full).await?),
            }
        }
        Commands::Stats {
            kind,
            limit,
            no_cache,
        } => {
            require_session(client).await?;
            let points = client.access_points();
            let allow_cache = !no_cache;
            match kind {
                StatKind::Signal => print_json(&points.greatest_signal_range(limit, allow_cache).await?),
                StatKind::Frequency => print_json(&points.frequency(limit, allow_cache).await?),
                StatKind::Manufacturer => {
                    print_json(&points.most_common_manufacturer(limit, allow_cache).await?)
                }
                StatKind::Encryption => {
                    print_json(&points.most_common_encryption(limit, allow_cache).await?)
                }
            }
        }
        Commands::Upload { format, file } => {
            let content = std::fs::read(&file)?;
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("scan")
                .to_string();
            require_session(client).await?;
            client.access_points().upload(format, &file_name, content).await?;
            log::info!("Uploaded {} as {}", file.display(), format);
            Ok(())
        }
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), apm_core::version());
            Ok(())
        }
    }
}

async fn require_session(client: &ApiClient) -> Result<Arc<Session>> {
    client
        .restore_session()
        .await
        .ok_or_else(|| Error::Custom("Not logged in. Run `apm login` first.".into()))
}

fn identity(session: &Session) -> serde_json::Value {
    json!({
        "id": session.subject_id,
        "name": session.display_name,
        "email": session.email,
        "role": session.role.as_str(),
        "expiresAt": session.expires_at,
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
