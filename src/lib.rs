//! Domain-ownership validation for tenant sites.
//!
//! A tenant's custom domain becomes `active` only after its DNS is shown to
//! point at the platform ([`dns`]) and the platform's signed `/health`
//! answer is reachable over HTTPS on that name ([`probe`]). [`validate`]
//! sequences the two checks and persists the result; [`gatekeeper`] answers
//! the TLS terminator's "may I issue a certificate for this host" question.
pub mod api;
pub mod config;
pub mod dns;
pub mod domain;
pub mod gatekeeper;
pub mod model;
pub mod notice;
pub mod observability;
pub mod probe;
pub mod registry;
pub mod validate;
