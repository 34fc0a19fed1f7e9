//! Federation services: invitation lifecycle, access-token management and
//! outbound connections to peer servers.

mod connector;
mod error;
mod tokens;

pub use connector::{ConnectOutcome, ConnectorConfig, ServerConnector};
pub use error::FederationError;
pub use tokens::{IssueInvitation, RedeemOutcome, TokenService};
