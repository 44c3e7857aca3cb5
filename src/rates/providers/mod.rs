pub mod coingecko;
pub mod open_exchange_rates;

pub use coingecko::CoinGeckoSource;
pub use open_exchange_rates::OpenExchangeRatesSource;
