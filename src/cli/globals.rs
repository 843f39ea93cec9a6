use secrecy::SecretString;

/// Simulator knobs shared across the server wiring.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    /// Fixed artificial delay applied to every response, in milliseconds.
    pub latency_ms: u64,
    /// Access-token lifetime in seconds. Deliberately short by default so
    /// the refresh path is observable quickly.
    pub access_ttl_secs: u64,
    pub demo_email: String,
    pub demo_password: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(demo_email: String, demo_password: SecretString) -> Self {
        Self {
            latency_ms: 250,
            access_ttl_secs: 10,
            demo_email,
            demo_password,
        }
    }
}
