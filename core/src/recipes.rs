use serde::Deserialize;

use crate::models::RecipeCard;

/// Category ranking response from the Rakuten recipe API.
#[derive(Debug, Deserialize)]
pub struct RankingResponse {
    #[serde(default)]
    pub result: Vec<RankingItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingItem {
    pub recipe_title: Option<String>,
    pub recipe_url: Option<String>,
    pub food_image_url: Option<String>,
    pub medium_image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub recipe_indication: Option<String>,
    pub recipe_cost: Option<String>,
    pub recipe_description: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// Map a ranking item to a display card. Items without a title or link are
/// dropped; the image is the first of the three image fields that is set.
#[must_use]
pub fn item_to_card(item: RankingItem) -> Option<RecipeCard> {
    let title = non_empty(item.recipe_title)?;
    let url = non_empty(item.recipe_url)?;
    let image = non_empty(item.food_image_url)
        .or_else(|| non_empty(item.medium_image_url))
        .or_else(|| non_empty(item.small_image_url));

    Some(RecipeCard {
        title,
        url,
        image,
        indication: item.recipe_indication.unwrap_or_default(),
        cost: item.recipe_cost.unwrap_or_default(),
        description: item.recipe_description.unwrap_or_default(),
    })
}

#[must_use]
pub fn ranking_to_cards(resp: RankingResponse) -> Vec<RecipeCard> {
    resp.result.into_iter().filter_map(item_to_card).collect()
}
