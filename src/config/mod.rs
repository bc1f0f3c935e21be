use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub gcp: GcpConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcpConfig {
    pub project_id: String,
    /// Talk to local Firestore/Auth emulators instead of the live APIs
    pub use_emulator: bool,
    pub firestore_emulator_host: String,
    pub identity_emulator_host: String,
    pub service_account_email: String,
    /// PKCS#8 PEM, stored with literal "\n"s to make it easier to enter
    pub service_account_key: String,
    pub service_account_kid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// Verified-email requirement for mutating endpoints
    pub require_verified_email: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub profile_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // GCP overrides
        if let Ok(v) = env::var("GCP_PROJECT_ID") {
            self.gcp.project_id = v;
        }
        if let Ok(v) = env::var("USE_EMULATOR") {
            self.gcp.use_emulator = v.parse().unwrap_or(self.gcp.use_emulator);
        }
        if let Ok(v) = env::var("FIRESTORE_EMULATOR_HOST") {
            self.gcp.firestore_emulator_host = v;
        }
        if let Ok(v) = env::var("IDENTITY_EMULATOR_HOST") {
            self.gcp.identity_emulator_host = v;
        }
        if let Ok(v) = env::var("SERVICE_ACCOUNT_EMAIL") {
            self.gcp.service_account_email = v;
        }
        if let Ok(v) = env::var("SERVICE_ACCOUNT_KEY") {
            self.gcp.service_account_key = v;
        }
        if let Ok(v) = env::var("SERVICE_ACCOUNT_KID") {
            self.gcp.service_account_kid = v;
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_REQUIRE_VERIFIED_EMAIL") {
            self.security.require_verified_email =
                v.parse().unwrap_or(self.security.require_verified_email);
        }

        // Cache overrides
        if let Ok(v) = env::var("CACHE_PROFILE_TTL_SECS") {
            self.cache.profile_ttl_secs = v.parse().unwrap_or(self.cache.profile_ttl_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            gcp: GcpConfig {
                project_id: "clubhub-dev".to_string(),
                use_emulator: true,
                firestore_emulator_host: "http://localhost:8080".to_string(),
                identity_emulator_host: "http://localhost:9099".to_string(),
                service_account_email: String::new(),
                service_account_key: String::new(),
                service_account_kid: String::new(),
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                require_verified_email: false,
            },
            cache: CacheConfig {
                profile_ttl_secs: 60,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            gcp: GcpConfig {
                project_id: "clubhub-staging".to_string(),
                use_emulator: false,
                firestore_emulator_host: String::new(),
                identity_emulator_host: String::new(),
                service_account_email: String::new(),
                service_account_key: String::new(),
                service_account_kid: String::new(),
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.clubhub.app".to_string()],
                require_verified_email: true,
            },
            cache: CacheConfig {
                profile_ttl_secs: 3600,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            gcp: GcpConfig {
                project_id: "clubhub-prod".to_string(),
                use_emulator: false,
                firestore_emulator_host: String::new(),
                identity_emulator_host: String::new(),
                service_account_email: String::new(),
                service_account_key: String::new(),
                service_account_kid: String::new(),
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://clubhub.app".to_string()],
                require_verified_email: true,
            },
            cache: CacheConfig {
                // 1 week, matching the edge cache the public profile used to live behind
                profile_ttl_secs: 604_800,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
