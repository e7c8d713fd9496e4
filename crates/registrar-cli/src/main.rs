use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use registrar_cli::admin;
use registrar_cli::seeder::{self, PeopleCounts, SeedConfig};
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "registrar-cli")]
#[command(about = "Registrar CLI - Administrative tools for the Registrar API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an administrator account
    CreateAdmin {
        /// First name of the admin
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        /// Last name of the admin
        #[arg(short = 'l', long)]
        last_name: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Seed the database with fake courses, people, and a timetable
    Seed {
        /// Number of courses to create
        #[arg(short = 'c', long, default_value = "3")]
        courses: usize,

        /// Semesters per course
        #[arg(long, default_value = "2")]
        semesters: usize,

        /// Number of subjects in the catalogue
        #[arg(long, default_value = "12")]
        subjects: usize,

        /// Subjects offered per semester
        #[arg(long, default_value = "4")]
        subjects_per_semester: usize,

        /// Number of teachers
        #[arg(long, default_value = "8")]
        teachers: usize,

        /// Number of parents
        #[arg(long, default_value = "40")]
        parents: usize,

        /// Students per course
        #[arg(long, default_value = "30")]
        students: usize,

        /// Password for every seeded account
        #[arg(long, default_value = "password123")]
        password: String,
    },
    /// Clear all seeded data (keeps admins)
    ClearSeed,
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();
    let pool = registrar_db::init_db_pool().await;
    if let Err(e) = registrar_db::run_migrations(&pool).await {
        eprintln!("❌ Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    match cli.command {
        Commands::CreateAdmin {
            first_name,
            last_name,
            email,
            password,
        } => handle_create_admin(&pool, first_name, last_name, email, password).await,
        Commands::Seed {
            courses,
            semesters,
            subjects,
            subjects_per_semester,
            teachers,
            parents,
            students,
            password,
        } => {
            let config = SeedConfig {
                semesters_per_course: semesters,
                num_subjects: subjects,
                subjects_per_semester,
                ..SeedConfig::new(courses)
            }
            .with_people(PeopleCounts {
                teachers,
                parents,
                students_per_course: students,
            })
            .with_password(password);
            handle_seed(&pool, config).await
        }
        Commands::ClearSeed => handle_clear_seed(&pool).await,
    }
}

fn prompt(label: &str) -> String {
    Input::new()
        .with_prompt(label)
        .interact_text()
        .unwrap_or_else(|e| {
            eprintln!("❌ Failed to read {}: {}", label.to_lowercase(), e);
            std::process::exit(1);
        })
}

async fn handle_create_admin(
    pool: &PgPool,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) {
    let first_name = first_name.unwrap_or_else(|| prompt("First name"));
    let last_name = last_name.unwrap_or_else(|| prompt("Last name"));
    let email = email.unwrap_or_else(|| prompt("Email address"));
    let password = password.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .unwrap_or_else(|e| {
                eprintln!("❌ Failed to read password: {}", e);
                std::process::exit(1);
            })
    });

    match admin::create_admin(pool, &first_name, &last_name, &email, &password).await {
        Ok(id) => {
            println!("\n✅ Admin created successfully!");
            println!("   ID: {}", id);
            println!("   Email: {}", email.trim().to_lowercase());
            println!("   Name: {} {}", first_name, last_name);
        }
        Err(e) => {
            eprintln!("\n❌ Error creating admin: {}", e);
            std::process::exit(1);
        }
    }
}

async fn handle_seed(pool: &PgPool, config: SeedConfig) {
    if let Err(e) = seeder::seed_all(pool, config).await {
        eprintln!("\n❌ Error seeding database: {}", e);
        std::process::exit(1);
    }
}

async fn handle_clear_seed(pool: &PgPool) {
    if let Err(e) = seeder::clear_all(pool).await {
        eprintln!("\n❌ Error clearing seeded data: {}", e);
        std::process::exit(1);
    }
}
