mod account;
mod users;

pub use account::{cmd_activation_key, cmd_login, cmd_passwd, cmd_register, cmd_verify_email};
pub use users::{cmd_toggle_status, cmd_users};

/// Prompts on stdout and reads one line from stdin.
fn read_secret(prompt: &str) -> anyhow::Result<String> {
    use std::io::Write;

    print!("{prompt}: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

fn secret_or_prompt(value: Option<String>, prompt: &str) -> anyhow::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => read_secret(prompt),
    }
}
