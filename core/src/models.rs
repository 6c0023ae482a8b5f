use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Nutrient columns carried by the dataset, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Energy,
    Protein,
    Fat,
    Carbohydrate,
    Fiber,
    SaltEquivalent,
    Calcium,
    Iron,
    VitaminA,
    VitaminC,
}

impl Nutrient {
    pub const ALL: [Nutrient; 10] = [
        Nutrient::Energy,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Carbohydrate,
        Nutrient::Fiber,
        Nutrient::SaltEquivalent,
        Nutrient::Calcium,
        Nutrient::Iron,
        Nutrient::VitaminA,
        Nutrient::VitaminC,
    ];

    /// Column header as it appears in the food composition table.
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Energy => "エネルギー",
            Self::Protein => "たんぱく質",
            Self::Fat => "脂質",
            Self::Carbohydrate => "炭水化物",
            Self::Fiber => "食物繊維総量",
            Self::SaltEquivalent => "食塩相当量",
            Self::Calcium => "カ ル シ ウ ム",
            Self::Iron => "鉄",
            Self::VitaminA => "ビタミンA",
            Self::VitaminC => "ビタミンC",
        }
    }

    /// Display label (the header without the table's padding spaces).
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Calcium => "カルシウム",
            other => other.column(),
        }
    }

    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::Energy => "kcal",
            Self::Protein | Self::Fat | Self::Carbohydrate | Self::Fiber | Self::SaltEquivalent => {
                "g"
            }
            Self::Calcium | Self::Iron | Self::VitaminC => "mg",
            Self::VitaminA => "µg",
        }
    }
}

pub const ID_COLUMN: &str = "食品番号";
pub const NAME_COLUMN: &str = "食品名(100g当たり)";
pub const REMARKS_COLUMN: &str = "備　　考";
pub const REMARKS_LABEL: &str = "備考";

/// Serving size used when an add-to-cart request carries no amount.
pub const DEFAULT_GRAMS: f64 = 100.0;

/// One row of the food composition table. Values are kept as the raw cell
/// text; numeric interpretation happens through [`parse_or_zero`].
#[derive(Debug, Clone, Serialize)]
pub struct FoodRow {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub normalized_name: String,
    pub nutrients: BTreeMap<Nutrient, String>,
    pub remarks: String,
}

impl FoodRow {
    /// Raw cell text for a nutrient (empty when the cell was blank).
    #[must_use]
    pub fn raw(&self, nutrient: Nutrient) -> &str {
        self.nutrients.get(&nutrient).map_or("", String::as_str)
    }

    /// Numeric value per 100 g; unparseable cells count as zero.
    #[must_use]
    pub fn amount(&self, nutrient: Nutrient) -> f64 {
        parse_or_zero(self.raw(nutrient))
    }

    /// Per-nutrient detail lines followed by the remarks line.
    #[must_use]
    pub fn detail_lines(&self) -> Vec<DetailLine> {
        let mut lines: Vec<DetailLine> = Nutrient::ALL
            .iter()
            .map(|&n| DetailLine {
                name: n.label().to_string(),
                value: format!("{} {}", self.raw(n), n.unit()).trim().to_string(),
            })
            .collect();
        lines.push(DetailLine {
            name: REMARKS_LABEL.to_string(),
            value: self.remarks.trim().to_string(),
        });
        lines
    }
}

/// Parse a table cell as a number, yielding `0.0` for anything that is not
/// a finite number ("Tr", "-", "(0.1)", blanks).
#[must_use]
pub fn parse_or_zero(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub food_id: i64,
    pub name: String,
    pub grams: f64,
}

/// Gram-scaled nutrient sums over the full nutrient key set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientTotals(BTreeMap<Nutrient, f64>);

impl NutrientTotals {
    #[must_use]
    pub fn zero() -> Self {
        Self(Nutrient::ALL.iter().map(|&n| (n, 0.0)).collect())
    }

    #[must_use]
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        self.0.get(&nutrient).copied().unwrap_or(0.0)
    }

    pub fn add(&mut self, nutrient: Nutrient, value: f64) {
        *self.0.entry(nutrient).or_insert(0.0) += value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Nutrient, f64)> + '_ {
        self.0.iter().map(|(&n, &v)| (n, v))
    }

    #[must_use]
    pub fn lines(&self) -> Vec<TotalLine> {
        self.iter()
            .map(|(n, v)| TotalLine {
                key: n,
                name: n.label().to_string(),
                value: format_amount(v),
                unit: n.unit().to_string(),
            })
            .collect()
    }
}

impl Default for NutrientTotals {
    fn default() -> Self {
        Self::zero()
    }
}

/// Round to two decimals and drop trailing zeros: `178.0` → "178", `3.05` → "3.05".
#[must_use]
pub fn format_amount(value: f64) -> String {
    let s = format!("{value:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

// --- View models ---

#[derive(Debug, Clone, Serialize)]
pub struct DetailLine {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalLine {
    pub key: Nutrient,
    pub name: String,
    pub value: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodDetail {
    pub id: i64,
    pub name: String,
    pub lines: Vec<DetailLine>,
}

impl From<&FoodRow> for FoodDetail {
    fn from(row: &FoodRow) -> Self {
        Self {
            id: row.id,
            name: row.name.clone(),
            lines: row.detail_lines(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub index: usize,
    pub food_id: i64,
    pub name: String,
    /// Rounded for display.
    pub grams: String,
    /// Exact amount, for form inputs that are posted back.
    pub amount: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexPage {
    pub query: String,
    pub message: Option<String>,
    pub selected: Option<FoodDetail>,
    pub candidates: Vec<Candidate>,
    pub cart: Vec<CartLine>,
    pub totals: Vec<TotalLine>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TotalPage {
    pub message: Option<String>,
    pub cart: Vec<CartLine>,
    pub totals: Vec<TotalLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeCard {
    pub title: String,
    pub url: String,
    pub image: Option<String>,
    pub indication: String,
    pub cost: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CookPage {
    pub enabled: bool,
    pub recipes: Vec<RecipeCard>,
}
