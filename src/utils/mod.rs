pub mod email;
pub mod identity;
pub mod scope;
