pub mod breaker;
pub mod client;
pub mod types;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use client::{
    IntelligenceClient, IntelligenceConfig, IntelligenceTransport, RetryConfig, TransportError,
};
pub use types::{ClientStats, SkillSnapshot, TrajectoryAnalysis};
