mod client;

pub use client::{OpenRouterClient, OPENROUTER_API_BASE};
