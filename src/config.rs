pub const DEFAULT_JWT_SECRET: &str = "curbcast-dev-secret";

pub struct Config {
    pub port: u16,
    pub jwt_secret: String,
    pub allowed_origins: Vec<String>,
    pub service_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("CURBCAST_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            jwt_secret: std::env::var("CURBCAST_JWT_SECRET")
                .unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            allowed_origins,
            service_key: std::env::var("CURBCAST_SERVICE_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
        }
    }
}
