pub use registrar_models::courses::{
    CatalogFilterParams, Course, CreateCourseDto, PaginatedCoursesResponse, UpdateCourseDto,
};
pub use registrar_models::semesters::{CreateSemesterDto, PaginatedSemestersResponse, Semester};
