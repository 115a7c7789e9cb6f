//! Domain types: symbols, date ranges, price bars and series.

pub mod bar;
pub mod range;
pub mod symbol;

pub use bar::{PriceBar, PriceSeries};
pub use range::{DateRange, RangeError};
pub use symbol::{Exchange, Symbol, SymbolError};
