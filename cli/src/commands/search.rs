use anyhow::{Context, Result};
use std::process;

use eiyo_core::dataset::Dataset;
use eiyo_core::normalize::query_tokens;

use super::helpers::{json_error, print_food_detail, print_food_table};

pub(crate) fn cmd_search(dataset: &Dataset, query: &str, json: bool) -> Result<()> {
    if query_tokens(query).is_empty() {
        anyhow::bail!("Search query is empty");
    }

    let matches = dataset.matching(query);
    if matches.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No results found for '{query}'");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
    } else {
        print_food_table(&matches);
    }

    Ok(())
}

pub(crate) fn cmd_show(dataset: &Dataset, id: &str, json: bool) -> Result<()> {
    let food = id
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|id| dataset.get(id));

    let Some(food) = food else {
        let message = format!("No food with ID {id}");
        if json {
            println!("{}", json_error(&message));
        } else {
            eprintln!("{message}");
        }
        process::exit(2);
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(food).context("Failed to serialize food")?
        );
    } else {
        print_food_detail(food);
    }

    Ok(())
}
