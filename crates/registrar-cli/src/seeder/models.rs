//! Seed rows and the knobs that size a seeding run.

use chrono::NaiveDate;
use registrar_models::Role;
use registrar_models::ids::{CourseId, ParentId, SemesterId, StudentId, SubjectId, TeacherId};

/// Marker for seeded catalogue rows; `clear-seed` deletes by it.
pub const SEED_CODE_PREFIX: &str = "SEED-";
/// Domain of every seeded email address.
pub const SEED_EMAIL_DOMAIN: &str = "example.com";

pub struct CourseSeed {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub duration_semesters: i32,
}

pub struct SemesterSeed {
    pub course_id: CourseId,
    pub number: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub struct SubjectSeed {
    pub name: String,
    pub code: String,
}

/// One person with a login, inserted into `users` and then the profile table.
pub struct PersonSeed {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
}

/// Everything the catalogue step created, consumed by later steps.
pub struct SeededCatalog {
    pub courses: Vec<CourseId>,
    /// `(semester, course, number)`
    pub semesters: Vec<(SemesterId, CourseId, i32)>,
    pub subjects: Vec<SubjectId>,
}

pub struct SeededPeople {
    pub teachers: Vec<TeacherId>,
    pub parents: Vec<ParentId>,
    /// `(student, course)`
    pub students: Vec<(StudentId, CourseId)>,
}

#[derive(Clone)]
pub struct PeopleCounts {
    pub teachers: usize,
    pub parents: usize,
    pub students_per_course: usize,
}

impl Default for PeopleCounts {
    fn default() -> Self {
        Self {
            teachers: 8,
            parents: 40,
            students_per_course: 30,
        }
    }
}

/// Complete configuration for a seeding run.
#[derive(Clone)]
pub struct SeedConfig {
    pub num_courses: usize,
    pub semesters_per_course: usize,
    pub num_subjects: usize,
    pub subjects_per_semester: usize,
    pub people: PeopleCounts,
    /// Password set on every seeded account
    pub password: String,
    pub first_semester_start: NaiveDate,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            num_courses: 3,
            semesters_per_course: 2,
            num_subjects: 12,
            subjects_per_semester: 4,
            people: PeopleCounts::default(),
            password: "password123".to_string(),
            first_semester_start: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap_or_default(),
        }
    }
}

impl SeedConfig {
    pub fn new(num_courses: usize) -> Self {
        Self {
            num_courses,
            ..Default::default()
        }
    }

    pub fn with_people(mut self, people: PeopleCounts) -> Self {
        self.people = people;
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn total_students(&self) -> usize {
        self.num_courses * self.people.students_per_course
    }
}
