//! User-Agent header for the Build phase.

use reqchain_core::{NamedHandler, Request};

/// Name of the Build step installed by [`user_agent_handler`]
pub const USER_AGENT_HANDLER: &str = "reqchain.UserAgent";

/// Build step: `<config.user_agent> [<service>/<api_version>]`.
///
/// The service component is only added when both the service name and the
/// API version are configured.
#[must_use]
pub fn user_agent_handler() -> NamedHandler {
    NamedHandler::new(USER_AGENT_HANDLER, |request: &mut Request| {
        let config = &request.service.config;
        let agent = match &config.api_version {
            Some(version) if !config.service_name.is_empty() => {
                format!("{} {}/{version}", config.user_agent, config.service_name)
            }
            _ => config.user_agent.clone(),
        };
        request.http_request.set_header("user-agent", agent);
    })
}
