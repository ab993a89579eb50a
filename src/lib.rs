pub mod checkout;
pub mod credentials;
pub mod env;
pub mod errors;
pub mod hermes;
pub mod normalize;
pub mod signature;
pub mod token;
pub mod transport;
pub mod types;
