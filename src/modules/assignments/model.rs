pub use registrar_models::assignments::*;
