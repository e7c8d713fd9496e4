use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use registrar_core::{PaginationMeta, PaginationParams};
use registrar_models::admissions::{
    Admission, AdmissionReceipt, AdmissionStatus, AdmissionStatusCount, AdmissionStatusResponse,
    PaginatedAdmissionsResponse, RejectAdmissionDto, SubmitAdmissionDto,
};
use registrar_models::assignments::{
    Assignment, CreateAssignmentDto, PaginatedAssignmentsResponse, UpdateAssignmentDto,
};
use registrar_models::attendance::{
    Attendance, AttendanceMark, AttendanceSummary, PaginatedAttendanceResponse,
    RecordAttendanceDto,
};
use registrar_models::auth::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, MessageResponse,
};
use registrar_models::courses::{
    Course, CreateCourseDto, CreateSubjectDto, PaginatedCoursesResponse,
    PaginatedSubjectsResponse, Subject, UpdateCourseDto, UpdateSubjectDto,
};
use registrar_models::dashboard::DashboardSummary;
use registrar_models::enrollments::{
    CreateEnrollmentDto, Enrollment, PaginatedEnrollmentsResponse,
};
use registrar_models::lessons::{
    CreateLessonDto, Lesson, LessonOccurrence, PaginatedLessonsResponse, ScheduleResponse,
    UpdateLessonDto, Weekday,
};
use registrar_models::parents::{
    CreateParentDto, PaginatedParentsResponse, Parent, ParentWithChildren, UpdateParentDto,
};
use registrar_models::payments::{Payment, PaymentStatus, RejectPaymentDto, SubmitPaymentDto};
use registrar_models::results::{
    PaginatedResultsResponse, ResultEntry, SubjectResult, UpdateResultDto, UpsertResultsDto,
    UpsertResultsResponse,
};
use registrar_models::semesters::{
    CreateSemesterDto, PaginatedSemestersResponse, Semester, UpdateSemesterDto,
};
use registrar_models::students::{
    CreateStudentDto, PaginatedStudentsResponse, Student, UpdateStudentDto,
};
use registrar_models::subject_offerings::{
    CreateSubjectOfferingDto, PaginatedSubjectOfferingsResponse, SubjectOffering,
    SubjectOfferingDetail, UpdateSubjectOfferingDto,
};
use registrar_models::teachers::{
    CreateTeacherDto, PaginatedTeachersResponse, Teacher, UpdateTeacherDto,
};
use registrar_models::{Role, User};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::me,
        crate::modules::auth::controller::change_password,
        crate::modules::courses::controller::create_course,
        crate::modules::courses::controller::list_courses,
        crate::modules::courses::controller::get_course,
        crate::modules::courses::controller::update_course,
        crate::modules::courses::controller::delete_course,
        crate::modules::courses::controller::create_course_semester,
        crate::modules::courses::controller::list_course_semesters,
        crate::modules::semesters::controller::list_semesters,
        crate::modules::semesters::controller::get_semester,
        crate::modules::semesters::controller::update_semester,
        crate::modules::semesters::controller::delete_semester,
        crate::modules::subjects::controller::create_subject,
        crate::modules::subjects::controller::list_subjects,
        crate::modules::subjects::controller::get_subject,
        crate::modules::subjects::controller::update_subject,
        crate::modules::subjects::controller::delete_subject,
        crate::modules::teachers::controller::create_teacher,
        crate::modules::teachers::controller::list_teachers,
        crate::modules::teachers::controller::get_my_teacher_profile,
        crate::modules::teachers::controller::get_teacher,
        crate::modules::teachers::controller::update_teacher,
        crate::modules::teachers::controller::delete_teacher,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::list_students,
        crate::modules::students::controller::get_my_student_profile,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::parents::controller::create_parent,
        crate::modules::parents::controller::list_parents,
        crate::modules::parents::controller::get_my_parent_profile,
        crate::modules::parents::controller::get_parent,
        crate::modules::parents::controller::update_parent,
        crate::modules::parents::controller::delete_parent,
        crate::modules::subject_offerings::controller::create_offering,
        crate::modules::subject_offerings::controller::list_offerings,
        crate::modules::subject_offerings::controller::get_offering,
        crate::modules::subject_offerings::controller::update_offering,
        crate::modules::subject_offerings::controller::delete_offering,
        crate::modules::lessons::controller::create_lesson,
        crate::modules::lessons::controller::list_lessons,
        crate::modules::lessons::controller::get_schedule,
        crate::modules::lessons::controller::get_lesson,
        crate::modules::lessons::controller::update_lesson,
        crate::modules::lessons::controller::delete_lesson,
        crate::modules::enrollments::controller::enroll_student,
        crate::modules::enrollments::controller::list_enrollments,
        crate::modules::enrollments::controller::remove_enrollment,
        crate::modules::attendance::controller::record_attendance,
        crate::modules::attendance::controller::list_attendance,
        crate::modules::attendance::controller::attendance_summary,
        crate::modules::assignments::controller::create_assignment,
        crate::modules::assignments::controller::list_assignments,
        crate::modules::assignments::controller::get_assignment,
        crate::modules::assignments::controller::update_assignment,
        crate::modules::assignments::controller::delete_assignment,
        crate::modules::results::controller::upsert_results,
        crate::modules::results::controller::list_results,
        crate::modules::results::controller::get_result,
        crate::modules::results::controller::update_result,
        crate::modules::results::controller::delete_result,
        crate::modules::admissions::controller::submit_admission,
        crate::modules::admissions::controller::verify_parent,
        crate::modules::admissions::controller::list_admissions,
        crate::modules::admissions::controller::get_admission,
        crate::modules::admissions::controller::reject_admission,
        crate::modules::admissions::controller::resend_verification,
        crate::modules::payments::controller::submit_payment,
        crate::modules::payments::controller::list_admission_payments,
        crate::modules::payments::controller::approve_payment,
        crate::modules::payments::controller::reject_payment,
        crate::modules::dashboard::controller::get_summary,
    ),
    components(
        schemas(
            ErrorResponse,
            MessageResponse,
            PaginationMeta,
            PaginationParams,
            Role,
            User,
            LoginRequest,
            LoginResponse,
            MeResponse,
            ChangePasswordRequest,
            Course,
            CreateCourseDto,
            UpdateCourseDto,
            PaginatedCoursesResponse,
            Semester,
            CreateSemesterDto,
            UpdateSemesterDto,
            PaginatedSemestersResponse,
            Subject,
            CreateSubjectDto,
            UpdateSubjectDto,
            PaginatedSubjectsResponse,
            Teacher,
            CreateTeacherDto,
            UpdateTeacherDto,
            PaginatedTeachersResponse,
            Student,
            CreateStudentDto,
            UpdateStudentDto,
            PaginatedStudentsResponse,
            Parent,
            ParentWithChildren,
            CreateParentDto,
            UpdateParentDto,
            PaginatedParentsResponse,
            SubjectOffering,
            SubjectOfferingDetail,
            CreateSubjectOfferingDto,
            UpdateSubjectOfferingDto,
            PaginatedSubjectOfferingsResponse,
            Weekday,
            Lesson,
            CreateLessonDto,
            UpdateLessonDto,
            PaginatedLessonsResponse,
            LessonOccurrence,
            ScheduleResponse,
            Enrollment,
            CreateEnrollmentDto,
            PaginatedEnrollmentsResponse,
            Attendance,
            AttendanceMark,
            RecordAttendanceDto,
            AttendanceSummary,
            PaginatedAttendanceResponse,
            Assignment,
            CreateAssignmentDto,
            UpdateAssignmentDto,
            PaginatedAssignmentsResponse,
            SubjectResult,
            ResultEntry,
            UpsertResultsDto,
            UpsertResultsResponse,
            UpdateResultDto,
            PaginatedResultsResponse,
            AdmissionStatus,
            Admission,
            SubmitAdmissionDto,
            AdmissionReceipt,
            AdmissionStatusResponse,
            RejectAdmissionDto,
            PaginatedAdmissionsResponse,
            AdmissionStatusCount,
            PaymentStatus,
            Payment,
            SubmitPaymentDto,
            RejectPaymentDto,
            DashboardSummary,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login and the current account"),
        (name = "Courses", description = "Courses and their semesters"),
        (name = "Semesters", description = "Semester management"),
        (name = "Subjects", description = "Subject catalogue"),
        (name = "Teachers", description = "Teacher profiles"),
        (name = "Students", description = "Student profiles"),
        (name = "Parents", description = "Parent profiles and their children"),
        (name = "Subject Offerings", description = "Subjects taught by a teacher in a semester"),
        (name = "Lessons", description = "Weekly lessons and the dated schedule"),
        (name = "Enrollments", description = "Students enrolled in offerings"),
        (name = "Attendance", description = "Attendance per lesson occurrence"),
        (name = "Assignments", description = "Coursework per offering"),
        (name = "Results", description = "Scores and grades"),
        (name = "Admissions", description = "Public intake and verification workflow"),
        (name = "Payments", description = "Admission fee payments and review"),
        (name = "Dashboard", description = "Admin counters")
    ),
    info(
        title = "Registrar API",
        version = "0.1.0",
        description = "College administration REST API built with Rust, Axum, and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_public_admission_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/admissions"));
        assert!(doc.paths.paths.contains_key("/api/admissions/verify-parent"));
        assert!(doc.paths.paths.contains_key("/api/admissions/{id}/payments"));
    }

    #[test]
    fn test_openapi_has_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
