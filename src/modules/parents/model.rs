pub use registrar_models::parents::*;
pub use registrar_models::teachers::PersonFilterParams;
