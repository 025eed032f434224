pub mod deploy;
pub mod hash;
pub mod principal;
