use crate::config::Config;
use crate::db::Store;
use crate::domain::Role;
use crate::services::{SeaOrmUserService, UserError, UserService};

pub async fn cmd_set_role(config: &Config, email: &str, role: &str) -> anyhow::Result<()> {
    let Ok(role) = role.parse::<Role>() else {
        println!("Unknown role: {role}");
        println!("Use one of: user, admin, admin-master");
        return Ok(());
    };

    let store = Store::new(&config.general.database_path).await?;
    let users = SeaOrmUserService::new(store, config.security.clone());

    match users.set_role(email, role).await {
        Ok(user) => {
            println!("✓ {} <{}> is now {}", user.name, user.email, user.role);
            Ok(())
        }
        Err(UserError::NotFound) => {
            println!("No account with email {email}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
