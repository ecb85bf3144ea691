pub mod cache;
pub mod check;
pub mod compile;
pub mod lookup;
pub mod resolve;
