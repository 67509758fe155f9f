//! Admin registry and broadcast commands

use anyhow::Result;
use taskbot_core::UserId;

use crate::context::AppContext;
use crate::{AdminAction, Cli};

pub async fn handle(cli: &Cli, action: &AdminAction) -> Result<()> {
    let ctx = AppContext::build(cli).await?;
    let acting = ctx.acting(cli)?;

    match action {
        AdminAction::Add { user_id, level } => {
            ctx.console
                .add_admin(acting, UserId(*user_id), level.to_level())
                .await?;
            println!("Added admin {user_id}");
        }
        AdminAction::Remove { user_id } => {
            ctx.console.remove_admin(acting, UserId(*user_id)).await?;
            println!("Removed admin {user_id}");
        }
        AdminAction::SetLevel { user_id, level } => {
            ctx.console
                .set_admin_level(acting, UserId(*user_id), level.to_level())
                .await?;
            println!("Changed admin {user_id}");
        }
        AdminAction::List => {
            for admin in ctx.console.admins(acting).await? {
                let root = if admin.is_root { " (root)" } else { "" };
                println!("{:12} {}{}", admin.user_id.value(), admin.level, root);
            }
        }
    }

    ctx.close().await;
    Ok(())
}

pub async fn broadcast(cli: &Cli, text: &str) -> Result<()> {
    let ctx = AppContext::build(cli).await?;
    let acting = ctx.acting(cli)?;

    let report = ctx.console.broadcast(acting, text).await?;
    println!("Broadcast done: {report}");

    ctx.close().await;
    Ok(())
}
