//! Account command handlers

use std::collections::BTreeMap;

use super::secret_or_prompt;
use crate::config::Config;
use crate::services::{AccountError, AccountService, RegistrationRequest};

pub async fn cmd_register(
    config: &Config,
    username: &str,
    email: &str,
    first_name: Option<String>,
    last_name: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let service = crate::account_service(config).await?;
    let password = secret_or_prompt(password, "Password")?;

    let mut attributes = BTreeMap::new();
    attributes.insert("username".to_string(), username.to_string());
    attributes.insert("email".to_string(), email.to_string());
    if let Some(first_name) = first_name {
        attributes.insert("firstName".to_string(), first_name);
    }
    if let Some(last_name) = last_name {
        attributes.insert("lastName".to_string(), last_name);
    }

    let registration = service
        .register(RegistrationRequest {
            attributes,
            password,
        })
        .await?;

    let id = registration
        .user
        .id
        .map_or_else(|| "?".to_string(), |id| id.to_string());
    println!("✓ Registered '{}' (ID: {})", registration.user.username, id);

    if let Some(key) = registration.activation_key {
        println!("Account is inactive until the email address is verified.");
        println!("Activation key: {key}");
        println!("Verify with: usrkit verify-email {} <key>", registration.user.username);
    }

    Ok(())
}

pub async fn cmd_login(
    config: &Config,
    username: &str,
    password: Option<String>,
) -> anyhow::Result<()> {
    let service = crate::account_service(config).await?;
    let password = secret_or_prompt(password, "Password")?;

    match service.login(username, &password).await {
        Ok(result) => {
            println!("✓ Logged in as {} (ID: {})", result.username, result.id);
            println!("Auth key: {}", result.auth_key);
            Ok(())
        }
        Err(
            e @ (AccountError::InvalidCredentials | AccountError::Inactive | AccountError::Disabled),
        ) => {
            println!("✗ {e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn cmd_activation_key(config: &Config, username: &str) -> anyhow::Result<()> {
    let service = crate::account_service(config).await?;
    let key = service.request_activation_key(username).await?;

    println!("Activation key for {username}: {key}");
    println!("Any previously issued key is no longer valid.");
    Ok(())
}

pub async fn cmd_verify_email(config: &Config, username: &str, key: &str) -> anyhow::Result<()> {
    let service = crate::account_service(config).await?;
    service.confirm_email(username, key).await?;

    println!("✓ Email address verified for {username}");
    Ok(())
}

pub async fn cmd_passwd(
    config: &Config,
    username: &str,
    current: Option<String>,
    new: Option<String>,
) -> anyhow::Result<()> {
    let service = crate::account_service(config).await?;
    let current = secret_or_prompt(current, "Current password")?;
    let new = secret_or_prompt(new, "New password")?;

    service.change_password(username, &current, &new).await?;

    println!("✓ Password changed for {username}");
    Ok(())
}
