use std::env;

// ========================// Config //======================== //

/// Configure of the App
#[derive(Debug, Clone)]
pub struct Config {
    pub ip: String,
    pub port: String,
    pub allowed_origins: Vec<String>,
    pub hub_channel_capacity: usize,
    pub client_channel_capacity: usize,
}

impl Config {
    /// Initialize the Config from env
    pub fn from_env() -> Config {
        let ip = env::var("SERVER_IP").expect("failed to parse SERVER_IP");
        let port = env::var("SERVER_PORT").expect("failed to parse SERVER_PORT");

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|origin| origin.trim().to_owned())
            .filter(|origin| !origin.is_empty())
            .collect();

        let hub_channel_capacity = env::var("HUB_CHANNEL_CAPACITY")
            .unwrap_or("100".to_owned())
            .parse()
            .expect("failed to parse HUB_CHANNEL_CAPACITY");

        let client_channel_capacity = env::var("CLIENT_CHANNEL_CAPACITY")
            .unwrap_or("256".to_owned())
            .parse()
            .expect("failed to parse CLIENT_CHANNEL_CAPACITY");

        Config {
            ip,
            port,
            allowed_origins,
            hub_channel_capacity,
            client_channel_capacity,
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}
