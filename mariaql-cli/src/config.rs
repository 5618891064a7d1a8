//! Connection configuration from the environment. The translator core reads
//! none of these; they belong to the driver glue only.

use std::env;

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_database: String,
    pub database: Option<String>,
    pub ssl: bool,
    pub timeout_ms: u64,
    pub app_name: String,
    pub retry_writes: bool,
    pub write_concern: Option<String>,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

impl MongoConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or("MONGO_HOST", "localhost"),
            port: env_or("MONGO_PORT", "27017").parse().unwrap_or(27017),
            username: env::var("MONGO_USERNAME").ok().filter(|v| !v.is_empty()),
            password: env::var("MONGO_PASSWORD").ok().filter(|v| !v.is_empty()),
            auth_database: env_or("MONGO_AUTH_DATABASE", "admin"),
            database: env::var("MONGO_DATABASE").ok().filter(|v| !v.is_empty()),
            ssl: env_bool("MONGODB_SSL", false),
            timeout_ms: env_or("MONGODB_TIMEOUT", "10000").parse().unwrap_or(10000),
            app_name: env_or("MONGO_APP_NAME", "mariaql"),
            retry_writes: env_bool("MONGO_RETRY_WRITES", true),
            write_concern: env::var("MONGO_WRITE_CONCERN").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn uri(&self) -> String {
        let credentials = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{user}:{pass}@"),
            (Some(user), None) => format!("{user}@"),
            _ => String::new(),
        };
        let mut uri = format!(
            "mongodb://{credentials}{}:{}/?authSource={}&appName={}&retryWrites={}\
             &serverSelectionTimeoutMS={}",
            self.host, self.port, self.auth_database, self.app_name, self.retry_writes,
            self.timeout_ms,
        );
        if self.ssl {
            uri.push_str("&tls=true");
        }
        if let Some(w) = &self.write_concern {
            uri.push_str(&format!("&w={w}"));
        }
        uri
    }
}
