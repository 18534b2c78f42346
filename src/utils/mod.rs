pub mod crypto;
pub mod random;
pub mod token;
pub mod validation;
