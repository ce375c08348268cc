pub mod directory_cache;
pub mod nse_feed;

pub use directory_cache::SymbolDirectory;
pub use nse_feed::NseSymbolFeed;
