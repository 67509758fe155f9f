//! Interactive router simulation
//!
//! Feeds stdin lines to the inbound router as one user:
//! plain text becomes a text event, `:action <id>` an action selection,
//! `:media <ref>` a media upload. Replies print with their buttons.

use anyhow::Result;
use std::io::{BufRead, Write};
use taskbot_console::{InboundEvent, OutboundMessage};
use taskbot_core::{InlineButton, UserId};

use crate::context::AppContext;
use crate::Cli;

pub async fn run(cli: &Cli, user: i64) -> Result<()> {
    let ctx = AppContext::build(cli).await?;
    let from = UserId(user);

    println!("Simulating user {from}. Lines are text; ':action <id>' selects, ':media <ref>' uploads. Ctrl-D quits.");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{from}> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = if let Some(action) = line.strip_prefix(":action ") {
            InboundEvent::Action {
                from,
                action: action.trim().to_string(),
            }
        } else if let Some(reference) = line.strip_prefix(":media ") {
            InboundEvent::Media {
                from,
                reference: reference.trim().to_string(),
            }
        } else {
            InboundEvent::Text {
                from,
                text: line.to_string(),
            }
        };

        match ctx.router.handle(event).await {
            Ok(replies) => {
                for reply in replies {
                    print_reply(&reply);
                }
            }
            Err(err) => println!("error: {err}"),
        }
    }

    ctx.close().await;
    Ok(())
}

fn print_reply(message: &OutboundMessage) {
    println!("{}", message.text);
    if let Some(image) = &message.image {
        println!("  (image: {image})");
    }
    for button in &message.buttons {
        match button {
            InlineButton::Url { label, url } => println!("  [{label}] -> {url}"),
            InlineButton::Action { label, action } => println!("  [{label}] ({action})"),
        }
    }
}
