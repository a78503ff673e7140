//! Assistant backend: health probe and chat completion over HTTP.
//!
//! [`AssistantBackend`] is the seam the controller talks through; [`AssistantClient`] is the
//! reqwest implementation against `GET /health` and `POST /chat`.

mod client;

pub use client::{
    AssistantBackend, AssistantClient, AssistantError, ChatMessage, ChatRequest, ChatResponse,
    HealthStatus,
};
