use std::time::Duration;

use anyhow::{Context, Result, bail};

use eiyo_core::models::RecipeCard;
use eiyo_core::recipes::{RankingResponse, ranking_to_cards};

const RANKING_URL: &str = "https://app.rakuten.co.jp/services/api/Recipe/CategoryRanking/20170426";
/// 人気メニュー
const CATEGORY_ID: &str = "30";

pub struct RecipeClient {
    client: reqwest::Client,
    app_id: Option<String>,
    endpoint: String,
}

impl RecipeClient {
    pub fn new(app_id: Option<String>) -> Result<Self> {
        Self::with_endpoint(app_id, RANKING_URL)
    }

    pub fn with_endpoint(app_id: Option<String>, endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("eiyo/{} (nutrition lookup)", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(3))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            app_id,
            endpoint: endpoint.to_string(),
        })
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.app_id.is_some()
    }

    /// Ranked recipes for the fixed category. Never fails: a missing
    /// credential or any transport/payload problem yields an empty list.
    pub async fn ranking(&self) -> Vec<RecipeCard> {
        let Some(app_id) = self.app_id.as_deref() else {
            return Vec::new();
        };
        match self.fetch_ranking(app_id).await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::warn!("recipe ranking unavailable: {e:#}");
                Vec::new()
            }
        }
    }

    async fn fetch_ranking(&self, app_id: &str) -> Result<Vec<RecipeCard>> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("applicationId", app_id),
                ("categoryId", CATEGORY_ID),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Failed to reach recipe API")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("recipe API returned {status}");
        }

        let data: RankingResponse = resp
            .json()
            .await
            .context("Failed to parse recipe ranking response")?;

        Ok(ranking_to_cards(data))
    }
}
