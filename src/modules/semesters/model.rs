pub use registrar_models::semesters::*;
