use std::collections::BTreeSet;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::models::{CartEntry, CartLine, FoodRow, Nutrient, NutrientTotals, format_amount};

/// Ordered list of selections owned by one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append `grams` of `row`. Quantities must be positive.
    pub fn add(&mut self, row: &FoodRow, grams: f64) -> Result<()> {
        if !(grams.is_finite() && grams > 0.0) {
            bail!("grams must be greater than 0");
        }
        self.entries.push(CartEntry {
            food_id: row.id,
            name: row.name.clone(),
            grams,
        });
        Ok(())
    }

    /// Replace quantities position by position. `None` keeps the current
    /// quantity; a value `<= 0` drops the entry.
    pub fn update_quantities(&mut self, grams: &[Option<f64>]) {
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .enumerate()
            .filter_map(|(i, mut entry)| match grams.get(i).copied().flatten() {
                Some(g) if !g.is_finite() => Some(entry),
                Some(g) if g <= 0.0 => None,
                Some(g) => {
                    entry.grams = g;
                    Some(entry)
                }
                None => Some(entry),
            })
            .collect();
    }

    /// Remove the entries at `positions`; out-of-range positions are ignored.
    pub fn delete_selected(&mut self, positions: &[usize]) {
        let doomed: BTreeSet<usize> = positions.iter().copied().collect();
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !doomed.contains(i))
            .map(|(_, e)| e)
            .collect();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, e)| CartLine {
                index,
                food_id: e.food_id,
                name: e.name.clone(),
                grams: format_amount(e.grams),
                amount: e.grams.to_string(),
            })
            .collect()
    }
}

/// Sum every nutrient across the cart, scaling each row by `grams / 100`.
///
/// Entries are resolved by id, then by exact name; entries that resolve to
/// nothing are skipped without comment.
#[must_use]
pub fn aggregate(entries: &[CartEntry], dataset: &Dataset) -> NutrientTotals {
    let mut totals = NutrientTotals::zero();
    for entry in entries {
        let Some(row) = dataset
            .get(entry.food_id)
            .or_else(|| dataset.find_by_name(&entry.name))
        else {
            continue;
        };
        let ratio = entry.grams / 100.0;
        for nutrient in Nutrient::ALL {
            totals.add(nutrient, row.amount(nutrient) * ratio);
        }
    }
    totals
}
