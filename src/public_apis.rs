use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::QuotaError;

/// Unmetered public endpoints: jokes and cat pictures.
#[derive(Clone)]
pub struct PublicApis {
    joke_url: String,
    cat_url: String,
    http: Client,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Joke {
    Single { joke: String },
    Twopart { setup: String, delivery: String },
}

impl Joke {
    pub fn render(&self) -> String {
        match self {
            Joke::Single { joke } => joke.clone(),
            Joke::Twopart { setup, delivery } => format!("{setup}\n{delivery}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatImage {
    pub url: String,
}

pub fn first_cat_url(images: Vec<CatImage>) -> Result<String, QuotaError> {
    images
        .into_iter()
        .next()
        .map(|img| img.url)
        .ok_or_else(|| QuotaError::MalformedResponse("cat API returned no images".into()))
}

impl PublicApis {
    pub fn new(joke_url: String, cat_url: String) -> Self {
        Self { joke_url, cat_url, http: Client::new() }
    }

    pub async fn joke(&self) -> Result<String, QuotaError> {
        debug!(url = %self.joke_url, "public_apis.joke");
        let joke: Joke = self
            .http
            .get(&self.joke_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(joke.render())
    }

    pub async fn cat_url(&self) -> Result<String, QuotaError> {
        debug!(url = %self.cat_url, "public_apis.cat");
        let images: Vec<CatImage> = self
            .http
            .get(&self.cat_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        first_cat_url(images)
    }
}
