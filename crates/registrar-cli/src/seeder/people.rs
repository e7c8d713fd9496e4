//! Teachers, parents and students, each with a login account.

use chrono::{Days, NaiveDate};
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use fake::faker::phone_number::en::PhoneNumber;
use rayon::prelude::*;
use registrar_core::hash_password;
use registrar_models::Role;
use registrar_models::ids::{CourseId, ParentId, StudentId, TeacherId, UserId};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use std::time::Instant;

use super::models::{PeopleCounts, PersonSeed, SEED_EMAIL_DOMAIN, SeededPeople};

// Students insert 8 binds per row, well under the bind limit.
const BATCH_SIZE: usize = 800;

fn email_part(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

/// Unique address per role and index, so reruns only collide with
/// themselves.
pub fn seed_email(first_name: &str, last_name: &str, role: Role, idx: usize) -> String {
    format!(
        "{}.{}+{}{}@{}",
        email_part(first_name),
        email_part(last_name),
        role.as_str(),
        idx,
        SEED_EMAIL_DOMAIN
    )
}

pub fn generate_people(role: Role, count: usize) -> Vec<PersonSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let first_name: String = FirstName().fake();
            let last_name: String = LastName().fake();
            let phone: String = PhoneNumber().fake();
            PersonSeed {
                email: seed_email(&first_name, &last_name, role, idx),
                first_name,
                last_name,
                phone: phone.chars().take(30).collect(),
                role,
            }
        })
        .collect()
}

fn random_birth_date() -> NaiveDate {
    let base = NaiveDate::from_ymd_opt(2004, 1, 1).unwrap_or_default();
    let offset: u64 = (0..1460).fake();
    base.checked_add_days(Days::new(offset)).unwrap_or(base)
}

pub async fn seed_people(
    db: &PgPool,
    courses: &[CourseId],
    counts: &PeopleCounts,
    password: &str,
) -> Result<SeededPeople, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let total_students = courses.len() * counts.students_per_course;
    println!(
        "👥 Seeding {} teachers, {} parents and {} students...",
        counts.teachers, counts.parents, total_students
    );

    // Every seeded account shares one hash.
    let password_hash =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let teachers = generate_people(Role::Teacher, counts.teachers);
    let parents = generate_people(Role::Parent, counts.parents);
    let students = generate_people(Role::Student, total_students);

    let mut tx = db.begin().await?;

    let mut teacher_ids = Vec::with_capacity(teachers.len());
    for chunk in teachers.chunks(BATCH_SIZE) {
        let users = insert_accounts(&mut tx, chunk, &password_hash).await?;
        let ids = insert_profiles::<TeacherId>(&mut tx, "teachers", chunk, &users).await?;
        teacher_ids.extend(ids);
    }

    let mut parent_ids = Vec::with_capacity(parents.len());
    for chunk in parents.chunks(BATCH_SIZE) {
        let users = insert_accounts(&mut tx, chunk, &password_hash).await?;
        let ids = insert_profiles::<ParentId>(&mut tx, "parents", chunk, &users).await?;
        parent_ids.extend(ids);
    }

    // Students are spread evenly over courses, siblings share a parent.
    let placements: Vec<(CourseId, Option<ParentId>)> = (0..total_students)
        .map(|idx| {
            let course = courses[(idx / counts.students_per_course.max(1)) % courses.len()];
            let parent = (!parent_ids.is_empty()).then(|| parent_ids[idx % parent_ids.len()]);
            (course, parent)
        })
        .collect();

    let mut student_rows = Vec::with_capacity(students.len());
    for (chunk, placement) in students.chunks(BATCH_SIZE).zip(placements.chunks(BATCH_SIZE)) {
        let users = insert_accounts(&mut tx, chunk, &password_hash).await?;
        let ids = insert_students(&mut tx, chunk, &users, placement).await?;
        student_rows.extend(ids.into_iter().zip(placement.iter().map(|(course, _)| *course)));
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} accounts in {:?}",
        teacher_ids.len() + parent_ids.len() + student_rows.len(),
        start_time.elapsed()
    );

    Ok(SeededPeople {
        teachers: teacher_ids,
        parents: parent_ids,
        students: student_rows,
    })
}

async fn insert_accounts(
    tx: &mut Transaction<'_, Postgres>,
    people: &[PersonSeed],
    password_hash: &str,
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    if people.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO users (first_name, last_name, email, password, role) ",
    );
    qb.push_values(people, |mut row, person| {
        row.push_bind(&person.first_name)
            .push_bind(&person.last_name)
            .push_bind(&person.email)
            .push_bind(password_hash)
            .push_bind(person.role);
    });
    qb.push(" RETURNING id");

    let ids = qb
        .build_query_scalar::<UserId>()
        .fetch_all(&mut **tx)
        .await?;
    Ok(ids)
}

/// Teachers and parents share the same profile columns.
async fn insert_profiles<Id>(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    people: &[PersonSeed],
    users: &[UserId],
) -> Result<Vec<Id>, Box<dyn std::error::Error>>
where
    Id: Send + Unpin,
    (Id,): for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
{
    if people.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "INSERT INTO {} (user_id, first_name, last_name, email, phone) ",
        table
    ));
    qb.push_values(people.iter().zip(users), |mut row, (person, user_id)| {
        row.push_bind(*user_id)
            .push_bind(&person.first_name)
            .push_bind(&person.last_name)
            .push_bind(&person.email)
            .push_bind(&person.phone);
    });
    qb.push(" RETURNING id");

    let ids = qb.build_query_scalar::<Id>().fetch_all(&mut **tx).await?;
    Ok(ids)
}

async fn insert_students(
    tx: &mut Transaction<'_, Postgres>,
    people: &[PersonSeed],
    users: &[UserId],
    placements: &[(CourseId, Option<ParentId>)],
) -> Result<Vec<StudentId>, Box<dyn std::error::Error>> {
    if people.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Postgres>::new(
        "INSERT INTO students
            (user_id, first_name, last_name, email, phone, date_of_birth, course_id, parent_id) ",
    );
    qb.push_values(
        people.iter().zip(users).zip(placements),
        |mut row, ((person, user_id), (course_id, parent_id))| {
            row.push_bind(*user_id)
                .push_bind(&person.first_name)
                .push_bind(&person.last_name)
                .push_bind(&person.email)
                .push_bind(&person.phone)
                .push_bind(random_birth_date())
                .push_bind(*course_id)
                .push_bind(*parent_id);
        },
    );
    qb.push(" RETURNING id");

    let ids = qb
        .build_query_scalar::<StudentId>()
        .fetch_all(&mut **tx)
        .await?;
    Ok(ids)
}

/// Deletes seeded profiles and their accounts. Admins are never touched.
pub async fn clear_people(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded people...");

    let pattern = format!("%@{}", SEED_EMAIL_DOMAIN);
    let mut tx = db.begin().await?;

    let mut deleted = 0;
    for table in ["students", "parents", "teachers"] {
        deleted += sqlx::query(&format!("DELETE FROM {} WHERE email LIKE $1", table))
            .bind(&pattern)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    let accounts = sqlx::query("DELETE FROM users WHERE email LIKE $1 AND role <> $2")
        .bind(&pattern)
        .bind(Role::Admin)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    println!(
        "   ✓ Deleted {} profiles and {} accounts in {:?}",
        deleted,
        accounts,
        start_time.elapsed()
    );

    Ok(deleted + accounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_email_strips_punctuation() {
        assert_eq!(
            seed_email("Mary-Ann", "O'Neil", Role::Student, 7),
            "maryann.oneil+student7@example.com"
        );
    }

    #[test]
    fn test_generated_people_have_unique_emails() {
        let people = generate_people(Role::Teacher, 50);
        let mut emails: Vec<_> = people.iter().map(|p| p.email.as_str()).collect();
        emails.sort_unstable();
        emails.dedup();
        assert_eq!(emails.len(), 50);
        assert!(people.iter().all(|p| p.role == Role::Teacher));
    }
}
