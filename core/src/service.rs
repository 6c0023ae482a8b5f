use std::sync::Arc;

use anyhow::Result;

use crate::cart::{Cart, aggregate};
use crate::dataset::{Dataset, SearchOutcome};
use crate::models::{DEFAULT_GRAMS, FoodDetail, IndexPage, NutrientTotals, TotalPage};
use crate::session::{CartStore, SessionId};

pub const MSG_EMPTY_QUERY: &str = "食品名を入力してください。";
pub const MSG_NOT_FOUND: &str = "該当する食品がありません。";
pub const MSG_CANDIDATES: &str = "候補があります。";
pub const MSG_INVALID_GRAMS: &str = "グラム数は0より大きい数値で入力してください。";
pub const MSG_IGNORED_QUANTITIES: &str = "数値でない分量は変更していません。";

fn msg_detail(name: &str) -> String {
    format!("{name} の栄養素")
}

fn msg_unknown_food(raw: &str) -> String {
    format!("食品が見つかりません (id: {raw})")
}

/// What happened to an add-to-cart request.
#[derive(Debug)]
pub enum AddOutcome {
    Added,
    /// Nothing was added; the page explains why.
    Rejected(IndexPage),
}

/// Parse an optional gram amount from form input. Blank means the default
/// serving; anything else must be a positive number.
#[must_use]
pub fn parse_grams(raw: Option<&str>) -> Option<f64> {
    match raw.map(str::trim) {
        None | Some("") => Some(DEFAULT_GRAMS),
        Some(s) => s
            .trim_end_matches('g')
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|g| g.is_finite() && *g > 0.0),
    }
}

/// Request-level operations behind the web pages. Every cart operation is a
/// load / modify / save round trip against the cart store.
pub struct NutritionService {
    dataset: Arc<Dataset>,
    carts: Arc<dyn CartStore>,
}

impl NutritionService {
    pub fn new(dataset: Arc<Dataset>, carts: Arc<dyn CartStore>) -> Self {
        Self { dataset, carts }
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn totals(&self, session: &SessionId) -> Result<NutrientTotals> {
        let cart = self.carts.load(session)?;
        Ok(aggregate(cart.entries(), &self.dataset))
    }

    fn index_for(&self, cart: &Cart) -> IndexPage {
        IndexPage {
            cart: cart.lines(),
            totals: aggregate(cart.entries(), &self.dataset).lines(),
            ..IndexPage::default()
        }
    }

    fn total_for(&self, cart: &Cart, message: Option<String>) -> TotalPage {
        TotalPage {
            message,
            cart: cart.lines(),
            totals: aggregate(cart.entries(), &self.dataset).lines(),
        }
    }

    pub fn index_page(&self, session: &SessionId) -> Result<IndexPage> {
        let cart = self.carts.load(session)?;
        Ok(self.index_for(&cart))
    }

    pub fn search(&self, session: &SessionId, query: &str) -> Result<IndexPage> {
        let cart = self.carts.load(session)?;
        let mut page = self.index_for(&cart);
        page.query = query.trim().to_string();

        match self.dataset.search(query) {
            SearchOutcome::EmptyQuery => page.message = Some(MSG_EMPTY_QUERY.to_string()),
            SearchOutcome::NotFound => page.message = Some(MSG_NOT_FOUND.to_string()),
            SearchOutcome::Single(row) => {
                page.message = Some(msg_detail(&row.name));
                page.selected = Some(FoodDetail::from(row));
            }
            SearchOutcome::Candidates(candidates) => {
                page.message = Some(MSG_CANDIDATES.to_string());
                page.candidates = candidates;
            }
        }
        Ok(page)
    }

    pub fn select(&self, session: &SessionId, food_id: &str) -> Result<IndexPage> {
        let cart = self.carts.load(session)?;
        let mut page = self.index_for(&cart);

        match food_id.trim().parse::<i64>().ok().and_then(|id| self.dataset.get(id)) {
            Some(row) => {
                page.message = Some(msg_detail(&row.name));
                page.selected = Some(FoodDetail::from(row));
            }
            None => page.message = Some(msg_unknown_food(food_id.trim())),
        }
        Ok(page)
    }

    pub fn add_to_cart(
        &self,
        session: &SessionId,
        food_id: &str,
        grams: Option<&str>,
    ) -> Result<AddOutcome> {
        let mut cart = self.carts.load(session)?;

        let Some(row) = food_id
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|id| self.dataset.get(id))
        else {
            let mut page = self.index_for(&cart);
            page.message = Some(msg_unknown_food(food_id.trim()));
            return Ok(AddOutcome::Rejected(page));
        };

        let Some(grams) = parse_grams(grams) else {
            let mut page = self.index_for(&cart);
            page.message = Some(MSG_INVALID_GRAMS.to_string());
            page.selected = Some(FoodDetail::from(row));
            return Ok(AddOutcome::Rejected(page));
        };

        cart.add(row, grams)?;
        tracing::debug!(%session, food_id = row.id, grams, "added to cart");
        self.carts.save(session, cart)?;
        Ok(AddOutcome::Added)
    }

    pub fn total_page(&self, session: &SessionId) -> Result<TotalPage> {
        let cart = self.carts.load(session)?;
        Ok(self.total_for(&cart, None))
    }

    /// Apply new quantities by position. Blank or non-numeric values leave
    /// the entry as it was; zero or negative values remove it.
    pub fn update_quantities(&self, session: &SessionId, grams: &[String]) -> Result<TotalPage> {
        let mut cart = self.carts.load(session)?;
        let mut ignored = false;
        let parsed: Vec<Option<f64>> = grams
            .iter()
            .map(|raw| {
                let raw = raw.trim();
                if raw.is_empty() {
                    return None;
                }
                let value = raw
                    .trim_end_matches('g')
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|g| g.is_finite());
                if value.is_none() {
                    ignored = true;
                }
                value
            })
            .collect();

        cart.update_quantities(&parsed);
        let page = self.total_for(&cart, ignored.then(|| MSG_IGNORED_QUANTITIES.to_string()));
        self.carts.save(session, cart)?;
        Ok(page)
    }

    pub fn delete_selected(&self, session: &SessionId, positions: &[String]) -> Result<TotalPage> {
        let mut cart = self.carts.load(session)?;
        let positions: Vec<usize> = positions
            .iter()
            .filter_map(|p| p.trim().parse::<usize>().ok())
            .collect();
        cart.delete_selected(&positions);
        let page = self.total_for(&cart, None);
        self.carts.save(session, cart)?;
        Ok(page)
    }

    pub fn clear(&self, session: &SessionId) -> Result<TotalPage> {
        let mut cart = self.carts.load(session)?;
        cart.clear();
        let page = self.total_for(&cart, None);
        self.carts.save(session, cart)?;
        Ok(page)
    }
}
