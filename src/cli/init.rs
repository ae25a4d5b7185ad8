use std::path::PathBuf;

use colored::Colorize;

use crate::db::{get_connection, init_db};
use crate::error::{DeskError, Result};
use crate::permissions::BusinessRole;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, user: Option<String>, role: Option<String>) -> Result<()> {
    let mut settings = load_settings();

    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(user) = user {
        settings.user_name = user.trim().to_string();
    }
    if let Some(role) = role {
        let parsed = BusinessRole::parse(&role).ok_or_else(|| {
            let known: Vec<_> = BusinessRole::ALL.iter().map(|r| r.name()).collect();
            DeskError::Settings(format!("Unknown role '{role}'. Expected one of: {}", known.join(", ")))
        })?;
        settings.role = parsed.name().to_string();
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;

    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;

    println!(
        "{} Initialized compliance desk at {}",
        "✓".green(),
        resolved.display()
    );
    println!(
        "  User: {}  Role: {}",
        if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name },
        settings.role
    );
    Ok(())
}
