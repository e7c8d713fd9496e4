pub use registrar_models::courses::{
    CatalogFilterParams, CreateSubjectDto, PaginatedSubjectsResponse, Subject, UpdateSubjectDto,
};
