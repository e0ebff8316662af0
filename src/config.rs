use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where the dashboard configuration is served from, relative to the page
/// origin.
pub const CONFIG_PATH: &str = "/user-config/config.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Token,
    OAuth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthOption {
    Token,
    OAuth { oauth_api_url: String },
}

fn default_auth_options() -> Vec<AuthOption> {
    vec![AuthOption::Token]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub astarte_api_url: Option<String>,
    #[serde(default)]
    pub appengine_api_url: Option<String>,
    #[serde(default)]
    pub realm_management_api_url: Option<String>,
    #[serde(default)]
    pub pairing_api_url: Option<String>,
    #[serde(default)]
    pub flow_api_url: Option<String>,
    #[serde(default)]
    pub default_realm: Option<String>,
    #[serde(default)]
    pub default_auth: AuthType,
    #[serde(default)]
    pub enable_flow_preview: bool,
    #[serde(default = "default_auth_options")]
    pub auth: Vec<AuthOption>,
}

/// Base URLs of the Astarte APIs the dashboard talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrls {
    pub appengine: String,
    pub realm_management: String,
    pub pairing: String,
    pub flow: String,
}

impl DashboardConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| anyhow!("invalid dashboard configuration: {err}"))
    }

    /// Resolves every API URL: an explicit per-service URL wins, otherwise
    /// the service is expected under `astarte_api_url`.
    pub fn api_urls(&self) -> Result<ApiUrls> {
        let resolve = |explicit: &Option<String>, service: &str| -> Result<String> {
            match (explicit, &self.astarte_api_url) {
                (Some(url), _) => Ok(url.trim_end_matches('/').to_string()),
                (None, Some(base)) => Ok(format!("{}/{service}", base.trim_end_matches('/'))),
                (None, None) => Err(anyhow!(
                    "no URL configured for {service}, set astarte_api_url or its own URL"
                )),
            }
        };

        Ok(ApiUrls {
            appengine: resolve(&self.appengine_api_url, "appengine")?,
            realm_management: resolve(&self.realm_management_api_url, "realmmanagement")?,
            pairing: resolve(&self.pairing_api_url, "pairing")?,
            flow: resolve(&self.flow_api_url, "flow")?,
        })
    }

    pub fn oauth_api_url(&self) -> Option<&str> {
        self.auth.iter().find_map(|option| match option {
            AuthOption::OAuth { oauth_api_url } => Some(oauth_api_url.as_str()),
            AuthOption::Token => None,
        })
    }
}

/// Fetches the configuration served next to the dashboard.
pub async fn load_config(origin: &str) -> Result<DashboardConfig> {
    let url = format!("{}{CONFIG_PATH}", origin.trim_end_matches('/'));
    debug!(%url, "loading dashboard configuration");

    let response = reqwest::get(&url).await?;
    if !response.status().is_success() {
        return Err(anyhow!(
            "could not load {url}: status {}",
            response.status()
        ));
    }

    DashboardConfig::from_json(&response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_from_base() {
        let config =
            DashboardConfig::from_json(r#"{ "astarte_api_url": "https://api.astarte.example/" }"#)
                .unwrap();

        let urls = config.api_urls().unwrap();
        assert_eq!(urls.appengine, "https://api.astarte.example/appengine");
        assert_eq!(
            urls.realm_management,
            "https://api.astarte.example/realmmanagement"
        );
        assert_eq!(urls.pairing, "https://api.astarte.example/pairing");
        assert_eq!(urls.flow, "https://api.astarte.example/flow");
        assert_eq!(config.default_auth, AuthType::Token);
        assert_eq!(config.auth, vec![AuthOption::Token]);
    }

    #[test]
    fn test_explicit_urls_win() {
        let config = DashboardConfig::from_json(
            r#"{
                "astarte_api_url": "https://api.astarte.example",
                "appengine_api_url": "http://localhost:4002/",
                "default_realm": "test",
                "default_auth": "oauth",
                "auth": [
                    { "type": "token" },
                    { "type": "oauth", "oauth_api_url": "https://auth.example" }
                ]
            }"#,
        )
        .unwrap();

        let urls = config.api_urls().unwrap();
        assert_eq!(urls.appengine, "http://localhost:4002");
        assert_eq!(
            urls.realm_management,
            "https://api.astarte.example/realmmanagement"
        );
        assert_eq!(config.default_realm.as_deref(), Some("test"));
        assert_eq!(config.default_auth, AuthType::OAuth);
        assert_eq!(config.oauth_api_url(), Some("https://auth.example"));
    }

    #[test]
    fn test_missing_urls() {
        let config =
            DashboardConfig::from_json(r#"{ "appengine_api_url": "http://localhost:4002" }"#)
                .unwrap();

        let err = config.api_urls().unwrap_err();
        assert!(err.to_string().contains("realmmanagement"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(DashboardConfig::from_json("{ astarte_api_url: }").is_err());
    }
}
