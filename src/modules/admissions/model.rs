pub use registrar_models::admissions::*;
