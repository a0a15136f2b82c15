use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub mail_from: String,
    pub contact_inbox: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")?;
        // SMTP is optional; without a host the contact form logs instead of sending.
        let smtp_host = env::var("SMTP_HOST").ok().filter(|h| !h.is_empty());
        let smtp_port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(587);
        let smtp_username = env::var("SMTP_USERNAME").ok();
        let smtp_password = env::var("SMTP_PASSWORD").ok();
        let mail_from = env::var("MAIL_FROM")
            .unwrap_or_else(|_| "Storefront <noreply@storefront.local>".to_string());
        let contact_inbox =
            env::var("CONTACT_INBOX").unwrap_or_else(|_| "owner@storefront.local".to_string());
        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            mail_from,
            contact_inbox,
        })
    }
}
