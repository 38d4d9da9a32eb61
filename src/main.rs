use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod aggregate;
mod completion;
mod db;
mod error;
mod export;
mod models;
mod reporting;
mod threshold;

use models::ResponseStatus;
use reporting::{QuestionnaireFilter, ResponseFilter, StatusFilter};

#[derive(Parser)]
#[command(name = "interview-tracker")]
#[command(about = "Questionnaire response tracker with completion thresholds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import questionnaires from a JSON file
    ImportQuestionnaires {
        #[arg(long)]
        json: PathBuf,
    },
    /// Import answers from a CSV file, recomputing completion per response
    ImportAnswers {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List responses with search, status, and questionnaire filters
    Responses {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        status: String,
        #[arg(long)]
        questionnaire: Option<String>,
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        page_size: usize,
    },
    /// Export filtered responses as CSV
    Export {
        #[arg(long, default_value = "responses.csv")]
        out: PathBuf,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        status: String,
        #[arg(long)]
        questionnaire: Option<String>,
    },
    /// Create a user account
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Change a user's username and/or role
    UpdateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Activate or deactivate a user account
    SetUserActive {
        #[arg(long)]
        email: String,
        #[arg(long, action = clap::ArgAction::Set)]
        active: bool,
    },
    /// Delete a user along with their assignments and responses
    DeleteUser {
        #[arg(long)]
        email: String,
    },
    /// Per-user aggregates and threshold categories
    Stats {
        #[arg(long)]
        email: Option<String>,
    },
    /// Admin dashboard counters across users, questionnaires, and responses
    Overview,
    /// Update the active threshold configuration
    SetThreshold {
        #[arg(long)]
        min_interviews: i64,
        #[arg(long)]
        warning_threshold: i64,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Delete a response and its answers
    DeleteResponse {
        #[arg(long)]
        id: Uuid,
    },
}

fn parse_status_filter(value: &str) -> anyhow::Result<StatusFilter> {
    if value == "all" {
        return Ok(StatusFilter::All);
    }
    let status = ResponseStatus::parse(value)
        .with_context(|| format!("unknown status filter `{value}`"))?;
    Ok(StatusFilter::Only(status))
}

async fn build_filter(
    pool: &sqlx::PgPool,
    search: String,
    status: &str,
    questionnaire: Option<&str>,
) -> anyhow::Result<ResponseFilter> {
    let questionnaire = match questionnaire {
        None => QuestionnaireFilter::All,
        Some(title) => {
            let form = db::fetch_questionnaire_by_title(pool, title).await?;
            QuestionnaireFilter::Only(form.id)
        }
    };

    Ok(ResponseFilter {
        search,
        status: parse_status_filter(status)?,
        questionnaire,
    })
}

fn print_stats_line(entry: &models::UserStats, config: Option<&models::ThresholdConfig>) {
    let category = match config {
        Some(config) => {
            let classification = threshold::classify(entry.total_interviews, config);
            if classification.below_threshold {
                format!("{}, below threshold", classification.category.label())
            } else {
                classification.category.label().to_string()
            }
        }
        None => "Unclassified".to_string(),
    };
    let last_activity = entry
        .last_activity
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string());
    println!(
        "- {}: {} interviews ({} completed, {} incomplete), {:.1}% completion, last active {} [{}]",
        entry.username,
        entry.total_interviews,
        entry.completed_interviews,
        entry.incomplete_interviews,
        entry.completion_rate,
        last_activity,
        category
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportQuestionnaires { json } => {
            let contents = std::fs::read_to_string(&json)
                .with_context(|| format!("failed to read {}", json.display()))?;
            let imported = db::import_questionnaires(&pool, &contents).await?;
            println!("Imported {imported} questionnaires from {}.", json.display());
        }
        Commands::ImportAnswers { csv } => {
            let saved = db::import_answers(&pool, &csv).await?;
            println!("Saved {saved} responses from {}.", csv.display());
        }
        Commands::Responses {
            search,
            status,
            questionnaire,
            page,
            page_size,
        } => {
            let filter = build_filter(&pool, search, &status, questionnaire.as_deref()).await?;
            let rows = db::fetch_response_rows(&pool).await?;
            let filtered = reporting::filter_responses(&rows, &filter);
            let mut pager = reporting::Pager::new(page_size);
            pager.set_page(page);
            let visible = pager.slice(&filtered);

            if filtered.is_empty() {
                println!("No responses match the filters.");
                return Ok(());
            }

            println!(
                "{} responses (page {} of {}):",
                filtered.len(),
                page + 1,
                filtered.len().div_ceil(page_size.max(1))
            );
            for row in visible {
                let submitted = row
                    .submitted_at
                    .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "not submitted".to_string());
                println!(
                    "- {} ({}) \"{}\": {} at {}%, {}",
                    row.username,
                    row.email,
                    row.questionnaire_title,
                    row.status.as_str(),
                    row.completion_percentage,
                    submitted
                );
            }
        }
        Commands::Export {
            out,
            search,
            status,
            questionnaire,
        } => {
            let filter = build_filter(&pool, search, &status, questionnaire.as_deref()).await?;
            let rows = db::fetch_response_rows(&pool).await?;
            let filtered = reporting::filter_responses(&rows, &filter);
            export::export_to_path(&filtered, &out)?;
            println!("Exported {} responses to {}.", filtered.len(), out.display());
        }
        Commands::AddUser {
            username,
            email,
            role,
        } => {
            let role = models::Role::parse(&role)
                .with_context(|| format!("unknown role `{role}`"))?;
            let user = db::create_user(&pool, &username, &email, role).await?;
            println!(
                "User {} <{}> created ({}).",
                user.username,
                user.email,
                user.role.as_str()
            );
        }
        Commands::UpdateUser {
            email,
            username,
            role,
        } => {
            let role = role
                .map(|value| {
                    models::Role::parse(&value)
                        .with_context(|| format!("unknown role `{value}`"))
                })
                .transpose()?;
            db::update_user(&pool, &email, username.as_deref(), role).await?;
            println!("User {email} updated.");
        }
        Commands::SetUserActive { email, active } => {
            db::set_user_active(&pool, &email, active).await?;
            println!(
                "User {email} {}.",
                if active { "activated" } else { "deactivated" }
            );
        }
        Commands::DeleteUser { email } => {
            db::delete_user(&pool, &email).await?;
            println!("User {email} deleted.");
        }
        Commands::Stats { email } => {
            let rows = db::fetch_response_rows(&pool).await?;
            let users = match &email {
                Some(email) => vec![db::fetch_user_by_email(&pool, email).await?],
                None => db::fetch_users(&pool).await?,
            };
            let config = db::fetch_active_threshold(&pool).await?;

            let mut stats = aggregate::build_all_user_stats(&users, &rows);
            if let Some(config) = &config {
                threshold::apply(&mut stats, config);
            }

            if email.is_some() {
                if let Some(user) = users.first() {
                    println!(
                        "{} <{}> ({}), member since {}",
                        user.username,
                        user.email,
                        user.role.as_str(),
                        user.created_at.format("%Y-%m-%d")
                    );
                    if let Some(entry) = stats.iter().find(|s| s.user_id == user.id) {
                        print_stats_line(entry, config.as_ref());
                    }
                }
            } else {
                for entry in &stats {
                    print_stats_line(entry, config.as_ref());
                }
            }
            if config.is_none() {
                println!("No active threshold configuration; run set-threshold to classify users.");
            }
        }
        Commands::Overview => {
            let users = db::fetch_users(&pool).await?;
            let questionnaires = db::fetch_questionnaires(&pool).await?;
            let rows = db::fetch_response_rows(&pool).await?;
            let config = db::fetch_active_threshold(&pool).await?;

            let mut stats = aggregate::build_all_user_stats(&users, &rows);
            if let Some(config) = &config {
                threshold::apply(&mut stats, config);
            }
            let overview = aggregate::dashboard(&users, &questionnaires, &rows, &stats);

            println!("Users: {} ({} active)", overview.total_users, overview.active_users);
            println!(
                "Questionnaires: {} ({} active)",
                overview.total_questionnaires, overview.active_questionnaires
            );
            println!(
                "Interviews: {} ({} completed)",
                overview.total_interviews, overview.completed_interviews
            );
            println!("Users below threshold: {}", overview.users_below_threshold);
            println!(
                "Average completion rate: {:.1}%",
                overview.average_completion_rate
            );
            for questionnaire in &questionnaires {
                println!(
                    "- \"{}\" ({} questions, {} assigned, created {}): {}",
                    questionnaire.title,
                    questionnaire.questions.len(),
                    questionnaire.assigned_to.len(),
                    questionnaire.created_at.format("%Y-%m-%d"),
                    questionnaire.description
                );
            }
        }
        Commands::SetThreshold {
            min_interviews,
            warning_threshold,
        } => {
            db::set_threshold(&pool, min_interviews, warning_threshold).await?;
            let config = db::fetch_active_threshold(&pool)
                .await?
                .context("threshold configuration missing after update")?;
            println!(
                "Threshold config {} active: minimum {} interviews, warning at {}.",
                config.id, config.min_interviews, config.warning_threshold
            );
        }
        Commands::Report { out } => {
            let config = db::fetch_active_threshold(&pool)
                .await?
                .context("no active threshold configuration; run set-threshold first")?;
            let users = db::fetch_users(&pool).await?;
            let rows = db::fetch_response_rows(&pool).await?;

            let mut stats = aggregate::build_all_user_stats(&users, &rows);
            threshold::apply(&mut stats, &config);

            let report = reporting::build_report(Utc::now(), &config, &stats, &rows);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::DeleteResponse { id } => {
            db::delete_response(&pool, id).await?;
            println!("Response {id} deleted.");
        }
    }

    Ok(())
}
