pub use registrar_models::teachers::*;
