//! Subject offerings, their weekly lessons, and enrollments.

use chrono::NaiveTime;
use registrar_models::Weekday;
use registrar_models::ids::{
    CourseId, SemesterId, StudentId, SubjectId, SubjectOfferingId, TeacherId,
};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use std::time::Instant;

use super::models::{SeededCatalog, SeededPeople};

const BATCH_SIZE: usize = 1000;
const WEEKDAYS: [Weekday; 5] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
];
const FIRST_HOUR: u32 = 8;
const HOURS_PER_DAY: usize = 9;

/// The `n`th free hour of a teacher's week, Monday 08:00 first. Distinct for
/// the first 45 lessons of a teacher, so seeded lessons never overlap.
pub fn weekly_slot(n: usize) -> (Weekday, NaiveTime, NaiveTime) {
    let day = WEEKDAYS[n % WEEKDAYS.len()];
    let hour = FIRST_HOUR + ((n / WEEKDAYS.len()) % HOURS_PER_DAY) as u32;
    let start = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default();
    let end = NaiveTime::from_hms_opt(hour + 1, 0, 0).unwrap_or_default();
    (day, start, end)
}

pub struct OfferingSeed {
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub semester_id: SemesterId,
}

/// Gives every semester `per_semester` distinct subjects and rotates
/// teachers across offerings.
pub fn plan_offerings(
    semesters: &[(SemesterId, CourseId, i32)],
    subjects: &[SubjectId],
    teachers: &[TeacherId],
    per_semester: usize,
) -> Vec<OfferingSeed> {
    if subjects.is_empty() || teachers.is_empty() {
        return Vec::new();
    }
    let per_semester = per_semester.min(subjects.len());

    let mut offerings = Vec::with_capacity(semesters.len() * per_semester);
    for (sem_idx, (semester_id, _, _)) in semesters.iter().enumerate() {
        for j in 0..per_semester {
            offerings.push(OfferingSeed {
                subject_id: subjects[(sem_idx * per_semester + j) % subjects.len()],
                teacher_id: teachers[offerings.len() % teachers.len()],
                semester_id: *semester_id,
            });
        }
    }
    offerings
}

pub struct LessonSeed {
    pub subject_offering_id: SubjectOfferingId,
    pub day: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

pub async fn seed_timetable(
    db: &PgPool,
    catalog: &SeededCatalog,
    people: &SeededPeople,
    per_semester: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let planned = plan_offerings(
        &catalog.semesters,
        &catalog.subjects,
        &people.teachers,
        per_semester,
    );
    println!("🗓️  Seeding {} subject offerings with lessons...", planned.len());

    let mut tx = db.begin().await?;

    let mut offering_ids = Vec::with_capacity(planned.len());
    for chunk in planned.chunks(BATCH_SIZE) {
        offering_ids.extend(insert_offerings(&mut tx, chunk).await?);
    }

    let mut teacher_load: HashMap<TeacherId, usize> = HashMap::new();
    let lessons: Vec<LessonSeed> = offering_ids
        .iter()
        .zip(&planned)
        .map(|(offering_id, seed)| {
            let n = teacher_load.entry(seed.teacher_id).or_default();
            let (day, start_time, end_time) = weekly_slot(*n);
            *n += 1;
            LessonSeed {
                subject_offering_id: *offering_id,
                day,
                start_time,
                end_time,
            }
        })
        .collect();
    for chunk in lessons.chunks(BATCH_SIZE) {
        insert_lessons(&mut tx, chunk).await?;
    }

    // Students take every offering of their course's first semester.
    let first_semesters: HashMap<CourseId, SemesterId> = catalog
        .semesters
        .iter()
        .filter(|(_, _, number)| *number == 1)
        .map(|(semester_id, course_id, _)| (*course_id, *semester_id))
        .collect();
    let enrollments: Vec<(StudentId, SubjectOfferingId)> = people
        .students
        .iter()
        .filter_map(|(student_id, course_id)| {
            first_semesters
                .get(course_id)
                .map(|semester_id| (student_id, semester_id))
        })
        .flat_map(|(student_id, semester_id)| {
            offering_ids
                .iter()
                .zip(&planned)
                .filter(move |(_, seed)| seed.semester_id == *semester_id)
                .map(move |(offering_id, _)| (*student_id, *offering_id))
        })
        .collect();
    for chunk in enrollments.chunks(BATCH_SIZE) {
        insert_enrollments(&mut tx, chunk).await?;
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} offerings, {} lessons, {} enrollments in {:?}",
        offering_ids.len(),
        lessons.len(),
        enrollments.len(),
        start_time.elapsed()
    );

    Ok(())
}

async fn insert_offerings(
    tx: &mut Transaction<'_, Postgres>,
    offerings: &[OfferingSeed],
) -> Result<Vec<SubjectOfferingId>, Box<dyn std::error::Error>> {
    if offerings.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO subject_offerings (subject_id, teacher_id, semester_id) ",
    );
    qb.push_values(offerings, |mut row, offering| {
        row.push_bind(offering.subject_id)
            .push_bind(offering.teacher_id)
            .push_bind(offering.semester_id);
    });
    qb.push(" RETURNING id");

    let ids = qb
        .build_query_scalar::<SubjectOfferingId>()
        .fetch_all(&mut **tx)
        .await?;
    Ok(ids)
}

async fn insert_lessons(
    tx: &mut Transaction<'_, Postgres>,
    lessons: &[LessonSeed],
) -> Result<(), Box<dyn std::error::Error>> {
    if lessons.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO lessons (subject_offering_id, name, day, start_time, end_time, room) ",
    );
    qb.push_values(lessons.iter().enumerate(), |mut row, (idx, lesson)| {
        row.push_bind(lesson.subject_offering_id)
            .push_bind("Lecture")
            .push_bind(lesson.day)
            .push_bind(lesson.start_time)
            .push_bind(lesson.end_time)
            .push_bind(format!("R{}", 100 + idx % 40));
    });

    qb.build().execute(&mut **tx).await?;
    Ok(())
}

async fn insert_enrollments(
    tx: &mut Transaction<'_, Postgres>,
    enrollments: &[(StudentId, SubjectOfferingId)],
) -> Result<(), Box<dyn std::error::Error>> {
    if enrollments.is_empty() {
        return Ok(());
    }

    let mut qb =
        QueryBuilder::<Postgres>::new("INSERT INTO enrollments (student_id, subject_offering_id) ");
    qb.push_values(enrollments, |mut row, (student_id, offering_id)| {
        row.push_bind(*student_id).push_bind(*offering_id);
    });
    qb.push(" ON CONFLICT (student_id, subject_offering_id) DO NOTHING");

    qb.build().execute(&mut **tx).await?;
    Ok(())
}
