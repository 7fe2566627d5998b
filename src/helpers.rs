use std::str::FromStr;

use crate::consts::{LOCAL_API_URL, PRODUCTION_API_URL, STAGING_API_URL};

/// Backend environment the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    Production,
    Staging,
    Localhost,
    /// Any other deployment, given as a full URL.
    Custom(String),
}

impl BaseUrl {
    pub fn get_url(&self) -> String {
        match self {
            BaseUrl::Production => PRODUCTION_API_URL.to_string(),
            BaseUrl::Staging => STAGING_API_URL.to_string(),
            BaseUrl::Localhost => LOCAL_API_URL.to_string(),
            BaseUrl::Custom(url) => url.trim_end_matches('/').to_string(),
        }
    }
}

impl FromStr for BaseUrl {
    type Err = std::convert::Infallible;

    /// Named environments are matched case-insensitively; anything else is a custom URL.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "production" | "prod" => BaseUrl::Production,
            "staging" => BaseUrl::Staging,
            "localhost" | "local" => BaseUrl::Localhost,
            _ => BaseUrl::Custom(s.to_string()),
        })
    }
}
