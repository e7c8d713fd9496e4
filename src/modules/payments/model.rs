pub use registrar_models::payments::*;
