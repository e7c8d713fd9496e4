pub use registrar_models::attendance::*;
