//! User listing and status command handlers

use crate::cli::UserFilterArgs;
use crate::config::Config;
use crate::domain::{StatusKind, UserId};
use crate::identity::Timestamps;
use crate::search::SearchFilter;
use crate::services::{AccountService, UserSummary};

impl From<&UserFilterArgs> for SearchFilter {
    fn from(args: &UserFilterArgs) -> Self {
        Self {
            id: args.id,
            created_on: args.created_on.clone(),
            updated_on: args.updated_on.clone(),
            last_visit_on: args.last_visit_on.clone(),
            email_verified: args.verified,
            is_active: args.active,
            is_disabled: args.disabled,
            username: args.username.clone(),
            first_name: args.first_name.clone(),
            last_name: args.last_name.clone(),
            email: args.email.clone(),
        }
    }
}

pub async fn cmd_users(config: &Config, args: &UserFilterArgs) -> anyhow::Result<()> {
    let service = crate::account_service(config).await?;
    let page = service
        .list_users(SearchFilter::from(args), args.page, args.page_size)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.items.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    println!(
        "Users (page {}/{}, {} total)",
        page.page,
        page.total_pages.max(1),
        page.total_items
    );
    println!("{:-<70}", "");

    for user in &page.items {
        print_user(user);
    }

    println!();
    println!("Legend: ✓ Verified | ● Active | ⛔ Disabled");
    Ok(())
}

pub async fn cmd_toggle_status(config: &Config, id: i32, status: StatusKind) -> anyhow::Result<()> {
    let service = crate::account_service(config).await?;
    let user = service.toggle_status(UserId::new(id), status).await?;

    println!("✓ Updated {}", user.username);
    print_user(&user);
    Ok(())
}

fn print_user(user: &UserSummary) {
    let flags = [
        (user.email_verified, "✓"),
        (user.is_active, "●"),
        (user.is_disabled, "⛔"),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .map(|(_, symbol)| *symbol)
    .collect::<Vec<_>>()
    .join(" ");

    let name = match (&user.first_name, &user.last_name) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(name), None) | (None, Some(name)) => name.clone(),
        (None, None) => "-".to_string(),
    };

    let id = user.id.map_or_else(|| "?".to_string(), |id| id.to_string());
    println!("[{}] {} <{}> {}", id, user.username, user.email, flags);

    let last_visit = match &user.timestamps {
        Timestamps::All(all) => all.get("lastVisitOn").cloned().flatten(),
        Timestamps::Single(value) => value.clone(),
    };
    println!(
        "  Name: {} | Last visit: {}",
        name,
        last_visit.as_deref().unwrap_or("never")
    );
}
