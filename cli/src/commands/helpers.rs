use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use eiyo_core::models::{FoodRow, Nutrient, format_amount};

pub(crate) fn print_food_table(foods: &[&FoodRow]) {
    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "kcal/100g")]
        energy: String,
        #[tabled(rename = "P/100g")]
        protein: String,
        #[tabled(rename = "F/100g")]
        fat: String,
        #[tabled(rename = "C/100g")]
        carbs: String,
    }

    let rows: Vec<Row> = foods
        .iter()
        .enumerate()
        .map(|(i, f)| Row {
            idx: i + 1,
            id: f.id,
            name: truncate(&f.name, 35),
            energy: cell(f, Nutrient::Energy),
            protein: cell(f, Nutrient::Protein),
            fat: cell(f, Nutrient::Fat),
            carbs: cell(f, Nutrient::Carbohydrate),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_food_detail(food: &FoodRow) {
    #[derive(Tabled)]
    struct Line {
        #[tabled(rename = "Nutrient")]
        name: String,
        #[tabled(rename = "Per 100g")]
        value: String,
    }

    println!("{} (ID {})", food.name, food.id);
    let lines: Vec<Line> = food
        .detail_lines()
        .into_iter()
        .map(|l| Line {
            name: l.name,
            value: l.value,
        })
        .collect();
    let table = Table::new(&lines).with(Style::rounded()).to_string();
    println!("{table}");
}

/// Raw cell text, or "-" for a blank cell.
fn cell(food: &FoodRow, nutrient: Nutrient) -> String {
    let raw = food.raw(nutrient).trim();
    if raw.is_empty() {
        "-".to_string()
    } else if raw.parse::<f64>().is_ok() {
        format_amount(food.amount(nutrient))
    } else {
        raw.to_string()
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
