pub use registrar_models::subject_offerings::*;
