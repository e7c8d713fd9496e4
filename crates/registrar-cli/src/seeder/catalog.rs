//! Courses, their semesters, and subjects.

use chrono::{Days, Months, NaiveDate};
use fake::Fake;
use fake::faker::company::en::{Buzzword, Industry};
use rayon::prelude::*;
use registrar_models::ids::{CourseId, SemesterId, SubjectId};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;

use super::models::{CourseSeed, SEED_CODE_PREFIX, SemesterSeed, SeededCatalog, SubjectSeed};

const BATCH_SIZE: usize = 500;
const SEMESTER_LENGTH_DAYS: u64 = 139;

pub fn generate_courses(count: usize, semesters: usize) -> Vec<CourseSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let code = format!("{}C{:03}", SEED_CODE_PREFIX, idx + 1);
            let industry: String = Industry().fake();
            CourseSeed {
                name: format!("{} ({})", industry, code),
                code,
                description: Some(format!("Diploma programme in {}", industry.to_lowercase())),
                duration_semesters: semesters.max(1) as i32,
            }
        })
        .collect()
}

/// Consecutive half-year semesters starting at `first_start`.
pub fn semester_dates(first_start: NaiveDate, number: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = first_start.checked_add_months(Months::new(6 * number.saturating_sub(1)))?;
    let end = start.checked_add_days(Days::new(SEMESTER_LENGTH_DAYS))?;
    Some((start, end))
}

pub fn generate_semesters(
    courses: &[CourseId],
    per_course: usize,
    first_start: NaiveDate,
) -> Vec<SemesterSeed> {
    courses
        .iter()
        .flat_map(|&course_id| {
            (1..=per_course as u32).filter_map(move |number| {
                let (start_date, end_date) = semester_dates(first_start, number)?;
                Some(SemesterSeed {
                    course_id,
                    number: number as i32,
                    name: format!("Semester {}", number),
                    start_date,
                    end_date,
                })
            })
        })
        .collect()
}

pub fn generate_subjects(count: usize) -> Vec<SubjectSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let code = format!("{}S{:03}", SEED_CODE_PREFIX, idx + 1);
            let topic: String = Buzzword().fake();
            SubjectSeed {
                name: format!("{} {}", capitalize(&topic), idx + 1),
                code,
            }
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub async fn seed_catalog(
    db: &PgPool,
    num_courses: usize,
    semesters_per_course: usize,
    num_subjects: usize,
    first_start: NaiveDate,
) -> Result<SeededCatalog, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!(
        "📚 Seeding {} courses x {} semesters and {} subjects...",
        num_courses, semesters_per_course, num_subjects
    );

    let courses = generate_courses(num_courses, semesters_per_course);
    let subjects = generate_subjects(num_subjects);

    let mut tx = db.begin().await?;

    let mut course_ids = Vec::with_capacity(courses.len());
    for chunk in courses.chunks(BATCH_SIZE) {
        course_ids.extend(insert_courses(&mut tx, chunk).await?);
    }

    let semesters = generate_semesters(&course_ids, semesters_per_course, first_start);
    let mut semester_rows = Vec::with_capacity(semesters.len());
    for chunk in semesters.chunks(BATCH_SIZE) {
        let ids = insert_semesters(&mut tx, chunk).await?;
        semester_rows.extend(
            ids.into_iter()
                .zip(chunk)
                .map(|(id, seed)| (id, seed.course_id, seed.number)),
        );
    }

    let mut subject_ids = Vec::with_capacity(subjects.len());
    for chunk in subjects.chunks(BATCH_SIZE) {
        subject_ids.extend(insert_subjects(&mut tx, chunk).await?);
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} courses, {} semesters, {} subjects in {:?}",
        course_ids.len(),
        semester_rows.len(),
        subject_ids.len(),
        start_time.elapsed()
    );

    Ok(SeededCatalog {
        courses: course_ids,
        semesters: semester_rows,
        subjects: subject_ids,
    })
}

async fn insert_courses(
    tx: &mut Transaction<'_, Postgres>,
    courses: &[CourseSeed],
) -> Result<Vec<CourseId>, Box<dyn std::error::Error>> {
    if courses.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO courses (name, code, description, duration_semesters) ",
    );
    qb.push_values(courses, |mut row, course| {
        row.push_bind(&course.name)
            .push_bind(&course.code)
            .push_bind(&course.description)
            .push_bind(course.duration_semesters);
    });
    qb.push(" RETURNING id");

    let ids = qb
        .build_query_scalar::<CourseId>()
        .fetch_all(&mut **tx)
        .await?;
    Ok(ids)
}

async fn insert_semesters(
    tx: &mut Transaction<'_, Postgres>,
    semesters: &[SemesterSeed],
) -> Result<Vec<SemesterId>, Box<dyn std::error::Error>> {
    if semesters.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO semesters (course_id, number, name, start_date, end_date) ",
    );
    qb.push_values(semesters, |mut row, semester| {
        row.push_bind(semester.course_id)
            .push_bind(semester.number)
            .push_bind(&semester.name)
            .push_bind(semester.start_date)
            .push_bind(semester.end_date);
    });
    qb.push(" RETURNING id");

    let ids = qb
        .build_query_scalar::<SemesterId>()
        .fetch_all(&mut **tx)
        .await?;
    Ok(ids)
}

async fn insert_subjects(
    tx: &mut Transaction<'_, Postgres>,
    subjects: &[SubjectSeed],
) -> Result<Vec<SubjectId>, Box<dyn std::error::Error>> {
    if subjects.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO subjects (name, code) ");
    qb.push_values(subjects, |mut row, subject| {
        row.push_bind(&subject.name).push_bind(&subject.code);
    });
    qb.push(" RETURNING id");

    let ids = qb
        .build_query_scalar::<SubjectId>()
        .fetch_all(&mut **tx)
        .await?;
    Ok(ids)
}

/// Deletes seeded courses and subjects. Semesters, offerings and everything
/// scheduled under them cascade.
pub async fn clear_catalog(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded courses and subjects...");

    let pattern = format!("{}%", SEED_CODE_PREFIX);
    let mut tx = db.begin().await?;

    let courses = sqlx::query("DELETE FROM courses WHERE code LIKE $1")
        .bind(&pattern)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let subjects = sqlx::query("DELETE FROM subjects WHERE code LIKE $1")
        .bind(&pattern)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    println!(
        "   ✓ Deleted {} courses and {} subjects in {:?}",
        courses,
        subjects,
        start_time.elapsed()
    );

    Ok(courses + subjects)
}
