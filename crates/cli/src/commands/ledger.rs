//! Balance and approval commands

use anyhow::Result;
use rust_decimal::Decimal;
use taskbot_core::{NodeId, UserId};
use taskbot_ledger::{ApproveOutcome, CreditReason};

use crate::context::AppContext;
use crate::Cli;

pub async fn show_balance(cli: &Cli, user_id: i64) -> Result<()> {
    let ctx = AppContext::build(cli).await?;
    let user = UserId(user_id);

    let balance = ctx.console.ledger().balance_of(user).await?;
    println!("Balance of {user}: {balance}");

    let credits = ctx.console.ledger().credits_of(user).await?;
    if !credits.is_empty() {
        println!("History:");
        for entry in credits {
            println!(
                "  {}  {:>10}  {}",
                entry.created_at.format("%Y-%m-%d %H:%M:%S"),
                entry.delta,
                entry.reason
            );
        }
    }

    ctx.close().await;
    Ok(())
}

pub async fn credit(cli: &Cli, user_id: i64, amount: Decimal) -> Result<()> {
    let ctx = AppContext::build(cli).await?;
    ctx.acting(cli)?;

    let balance = ctx
        .console
        .ledger()
        .credit(UserId(user_id), amount, CreditReason::Adjustment)
        .await?;
    println!("New balance of {user_id}: {balance}");

    ctx.close().await;
    Ok(())
}

pub async fn approve(cli: &Cli, user_id: i64, node_id: i64) -> Result<()> {
    let ctx = AppContext::build(cli).await?;
    let acting = ctx.acting(cli)?;

    let outcome = ctx
        .console
        .approve(acting, UserId(user_id), NodeId(node_id))
        .await?;

    match outcome {
        ApproveOutcome::Approved { reward, commission } => {
            println!("Approved: {reward} credited to {user_id}");
            if let Some(commission) = commission {
                println!(
                    "Referral commission: {} credited to {}",
                    commission.amount, commission.referrer
                );
            }
        }
        ApproveOutcome::AlreadyApproved => {
            println!("Already approved, nothing credited");
        }
    }

    ctx.close().await;
    Ok(())
}
