//! Content tree commands

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use taskbot_catalog::{ContentNode, NewNode};
use taskbot_core::{parse_buttons, Amount, NodeId};
use taskbot_wizard::WizardReply;

use crate::context::AppContext;
use crate::{Cli, NodeAction};

pub async fn handle(cli: &Cli, action: &NodeAction) -> Result<()> {
    let ctx = AppContext::build(cli).await?;

    match action {
        NodeAction::Create {
            name,
            parent,
            body,
            image,
            price,
            buttons,
        } => {
            let acting = ctx.acting(cli)?;
            let buttons = match buttons {
                Some(json) => parse_buttons(json).context("Invalid --buttons JSON")?,
                None => Vec::new(),
            };
            let price = (*price)
                .map(|p| Amount::new(p).context("Price must be non-negative"))
                .transpose()?;

            let id = ctx
                .console
                .create_node(
                    acting,
                    NewNode {
                        name: name.clone(),
                        parent_id: NodeId(*parent),
                        body: body.clone(),
                        image: image.clone(),
                        price,
                        buttons,
                    },
                )
                .await?;
            println!("Created node {id}");
        }

        NodeAction::Author => {
            author(&ctx, cli).await?;
        }

        NodeAction::List => {
            let acting = ctx.acting(cli)?;
            let nodes = ctx.console.list_nodes(acting).await?;
            if nodes.is_empty() {
                println!("No nodes yet");
            }
            for node in nodes {
                print_node_line(&node);
            }
        }

        NodeAction::Show { node_id } => {
            let node = ctx
                .console
                .catalog()
                .get(NodeId(*node_id))
                .await?
                .with_context(|| format!("Node {node_id} not found"))?;
            print_node(&node);
        }

        NodeAction::Delete { node_id } => {
            let acting = ctx.acting(cli)?;
            ctx.console.delete_node(acting, NodeId(*node_id)).await?;
            println!("Deleted node {node_id}");
        }
    }

    ctx.close().await;
    Ok(())
}

/// Walk the authoring wizard over stdin, one prompt per line
async fn author(ctx: &AppContext, cli: &Cli) -> Result<()> {
    let acting = ctx.acting(cli)?;
    let step = ctx.console.begin_authoring(acting).await?;
    println!("{}", step.prompt());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next() else {
            ctx.console.wizard().cancel(acting);
            bail!("Input closed, authoring cancelled");
        };
        let line = line?;

        match ctx.console.author_input(acting, &line).await {
            Ok(WizardReply::Prompt(step)) => println!("{}", step.prompt()),
            Ok(WizardReply::Committed(id)) => {
                println!("Created node {id}");
                return Ok(());
            }
            Err(taskbot_console::ConsoleError::Wizard(taskbot_wizard::WizardError::Validation(
                err,
            ))) => {
                println!("{err}");
                if let Some(step) = ctx.console.wizard().step_of(acting) {
                    println!("{}", step.prompt());
                }
            }
            Err(other) => return Err(other.into()),
        }
    }
}

fn print_node_line(node: &ContentNode) {
    let price = node
        .price
        .map(|p| format!(" price={p}"))
        .unwrap_or_default();
    println!(
        "{:4}  parent={:<4} {}{}",
        node.id.value(),
        node.parent_id.value(),
        node.name,
        price
    );
}

fn print_node(node: &ContentNode) {
    println!("Node {}", node.id);
    println!("  name:    {}", node.name);
    println!("  parent:  {}", node.parent_id);
    println!("  body:    {}", node.body);
    if let Some(image) = &node.image {
        println!("  image:   {image}");
    }
    if let Some(price) = node.price {
        println!("  price:   {price}");
    }
    for button in &node.buttons {
        println!("  button:  {}", button.label());
    }
}
