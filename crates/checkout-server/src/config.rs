//! Server Configuration

/// Settings read from the environment at startup
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address (`BIND_ADDR`)
    pub bind_addr: String,

    /// Public origin of the site, used to build Stripe return URLs (`SITE_URL`)
    pub site_url: String,

    /// Single allowed CORS origin; any origin when unset (`CORS_ALLOWED_ORIGIN`)
    pub cors_allowed_origin: Option<String>,

    /// Stripe endpoint signing secret (`STRIPE_WEBHOOK_SECRET`)
    pub webhook_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            site_url: "http://localhost:3000".into(),
            cors_allowed_origin: None,
            webhook_secret: None,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: non_empty("BIND_ADDR").unwrap_or(defaults.bind_addr),
            site_url: non_empty("SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.site_url),
            cors_allowed_origin: non_empty("CORS_ALLOWED_ORIGIN"),
            webhook_secret: non_empty("STRIPE_WEBHOOK_SECRET"),
        }
    }

    /// Redirect flow: page Stripe sends the customer to after paying
    pub fn success_url(&self) -> String {
        format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", self.site_url)
    }

    /// Redirect flow: page Stripe sends the customer back to on cancel
    pub fn cancel_url(&self) -> String {
        format!("{}/checkout?canceled=true", self.site_url)
    }

    /// Embedded flow: where Stripe navigates once payment finishes
    pub fn return_url(&self) -> String {
        format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}&embedded=true", self.site_url)
    }
}
