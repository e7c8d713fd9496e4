pub use registrar_models::students::*;
