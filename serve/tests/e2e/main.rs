//! End-to-end tests: spawn the server on an ephemeral port with mock
//! connectors and a scripted LLM, then exercise the HTTP surface.

mod common;

mod admin;
mod chat_stream;
mod exclusion;
mod incidents;
mod resolve;
