/// Every user carries the same placeholder token; real authentication is a
/// non-goal of this server.
pub const PLACEHOLDER_AUTH_TOKEN: &str = "supersecretmessage";

/// Seconds between keepalive pings on an otherwise idle connection.
pub const KEEPALIVE_INTERVAL_SECS: u64 = 50;
