pub mod builder;
pub mod clock;
pub mod config;
pub mod documents;
pub mod duration;
pub mod index;
pub mod rates;
pub mod service;

pub use builder::AvgxServiceBuilder;
pub use service::AvgxService;
