//! Pingora proxy wiring (the edge of the gateway): turns an inbound HTTP
//! request into a [`crate::service::RequestContext`], drives it through the
//! Object Service, and writes the resulting [`crate::service::ServiceResponse`]
//! back onto the session. The gateway never proxies to an upstream peer in
//! the usual Pingora sense — every request is terminated in
//! `request_filter`, since the actual "upstream" is the blob store reached
//! through the origin client, not another HTTP peer Pingora would connect
//! to.

mod filter;

pub use filter::GatewayProxy;
