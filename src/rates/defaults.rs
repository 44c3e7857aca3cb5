//! Last-resort rates used when neither the live source nor the baseline has a
//! code. Values are rough long-run levels, good enough to keep a basket complete.

use super::AssetClass;

/// Rate used for any code not in the tables below.
pub const GENERIC_DEFAULT_RATE: f64 = 1.0;

/// Units per USD.
const FIAT_DEFAULTS: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("JPY", 150.0),
    ("CNY", 7.2),
    ("CHF", 0.88),
    ("CAD", 1.36),
    ("AUD", 1.52),
    ("NZD", 1.65),
    ("SEK", 10.5),
    ("NOK", 10.6),
    ("DKK", 6.9),
    ("SGD", 1.35),
    ("HKD", 7.8),
    ("KRW", 1350.0),
    ("INR", 83.0),
    ("BRL", 5.0),
    ("MXN", 17.0),
    ("ZAR", 18.5),
    ("TRY", 32.0),
    ("RUB", 90.0),
    ("PLN", 4.0),
    ("AED", 3.6725),
    ("SAR", 3.75),
];

/// USD per unit.
const CRYPTO_DEFAULTS: &[(&str, f64)] = &[
    ("BTC", 60000.0),
    ("ETH", 3000.0),
    ("USDT", 1.0),
    ("USDC", 1.0),
    ("DAI", 1.0),
    ("BNB", 550.0),
    ("SOL", 150.0),
    ("XRP", 0.5),
    ("ADA", 0.45),
    ("DOGE", 0.15),
    ("LTC", 80.0),
];

/// Static default for `code`, or [`GENERIC_DEFAULT_RATE`] when unlisted.
pub fn default_rate(class: AssetClass, code: &str) -> f64 {
    let table = match class {
        AssetClass::Fiat => FIAT_DEFAULTS,
        AssetClass::Crypto => CRYPTO_DEFAULTS,
    };
    let code = code.to_uppercase();
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, rate)| *rate)
        .unwrap_or(GENERIC_DEFAULT_RATE)
}
