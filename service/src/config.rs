use run_coach_feedback::RemoteConfig;

/// Service configuration, read from the environment. Missing remote
/// credentials are not an error here: the dependent feedback calls are
/// abandoned and logged at the point of use.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub session_id: String,
    pub feedback_enabled: bool,
    pub remote: RemoteConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let bind_address = std::env::var("RUN_COACH_BIND").unwrap_or_else(|_| "127.0.0.1:3169".to_string());
        let session_id = std::env::var("RUN_COACH_SESSION_ID").unwrap_or_default();
        let feedback_enabled = std::env::var("RUN_COACH_FEEDBACK").map(|v| v != "0").unwrap_or(true);

        let remote = RemoteConfig::new(
            std::env::var("RUN_COACH_REMOTE_URL").unwrap_or_default(),
            std::env::var("RUN_COACH_API_KEY").unwrap_or_default(),
            std::env::var("RUN_COACH_USER_TOKEN").unwrap_or_default(),
        );

        Self {
            bind_address,
            session_id,
            feedback_enabled,
            remote,
        }
    }
}
