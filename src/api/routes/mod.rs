pub mod health;
pub mod metrics;
pub mod prom;
pub mod servers;
pub mod stats;
