pub use registrar_models::results::*;
