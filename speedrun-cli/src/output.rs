//! Output formatting for API responses

use serde::Serialize;
use speedrun_http_client::{AuthState, EndpointInfo};

/// Output formatter for responses and status lines
pub struct OutputFormatter {
    compact: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(compact: bool) -> Self {
        Self { compact }
    }

    /// Render a value as JSON, pretty unless compact
    pub fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, serde_json::Error> {
        if self.compact {
            serde_json::to_string(value)
        } else {
            serde_json::to_string_pretty(value)
        }
    }

    /// Print a value as JSON on stdout
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), serde_json::Error> {
        println!("{}", self.render(value)?);
        Ok(())
    }

    /// Print the outcome of a login step
    pub fn print_auth_state(&self, state: AuthState) {
        println!("{}", describe_state(state));
    }

    /// Print the endpoint catalog
    pub fn print_endpoints(&self, catalog: &[EndpointInfo]) {
        for info in catalog {
            println!("{:<5}{}", info.verb, info.name);
        }
    }
}

fn describe_state(state: AuthState) -> &'static str {
    match state {
        AuthState::Unauthenticated => "✗ Not logged in",
        AuthState::AwaitingSecondFactor => "✉ A login token was sent to your email",
        AuthState::Authenticated => "✓ Logged in",
    }
}
