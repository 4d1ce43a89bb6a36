//! Inbound adapters exposing the proxy to the outside world.

pub mod http;
