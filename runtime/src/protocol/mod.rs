//! Wire-format phases (Build, Unmarshal, UnmarshalError) per protocol.

pub mod json;

use reqchain_core::Handlers;

/// Install the JSON protocol steps at the end of their phases.
pub fn install_json(handlers: &mut Handlers) {
    handlers.build.push_back_named(json::build_handler());
    handlers.unmarshal.push_back_named(json::unmarshal_handler());
    handlers
        .unmarshal_error
        .push_back_named(json::unmarshal_error_handler());
}
