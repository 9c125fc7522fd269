mod board;
mod config;
mod models;
mod slots;
mod stats;
mod store;
mod tui;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::Config;
use models::{Job, JobDraft, JobPatch, Priority, Stage, Status};
use slots::{MemorySlots, SlotStore, SqliteSlots};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use store::Store;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Personal job application board - track leads through your pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a job lead
    Add {
        /// Company name
        company: String,

        /// Job title
        title: String,

        #[command(flatten)]
        fields: JobFields,
    },

    /// Edit fields of a job
    Edit {
        /// Job ID (or a unique prefix)
        id: String,

        /// New company name
        #[arg(long)]
        company: Option<String>,

        /// New job title
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        fields: JobFields,
    },

    /// List jobs
    List {
        /// Filter by status (todo, applied, interview, done)
        #[arg(short, long)]
        status: Option<String>,

        /// Only jobs whose company, title or source contains this text
        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Show job details
    Show {
        /// Job ID (or a unique prefix)
        id: String,
    },

    /// Move a job to another status
    Move {
        /// Job ID (or a unique prefix)
        id: String,

        /// Target status (todo, applied, interview, done)
        status: String,
    },

    /// Delete a job
    Delete {
        /// Job ID (or a unique prefix)
        id: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a backup of all data
    Export {
        /// Directory to write jobboard_backup_<date>.json into
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Print to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,
    },

    /// Replace all data with a backup file
    Import {
        /// Path to the backup file
        file: PathBuf,

        /// Validate the file without touching stored data
        #[arg(long)]
        dry_run: bool,
    },

    /// Open the kanban board
    Board {
        /// Only show cards matching this text
        #[arg(short = 'q', long)]
        search: Option<String>,
    },
}

#[derive(Args, Default)]
struct JobFields {
    /// Location
    #[arg(long)]
    location: Option<String>,

    /// Employment type (Full-time, Contract, ...)
    #[arg(long = "type")]
    job_type: Option<String>,

    /// Salary or range
    #[arg(long)]
    salary: Option<String>,

    /// Posting URL
    #[arg(long)]
    url: Option<String>,

    /// Free-form notes
    #[arg(long)]
    notes: Option<String>,

    /// Where the lead came from (LinkedIn, Referral, ...)
    #[arg(long)]
    source: Option<String>,

    /// Resume variant used
    #[arg(long)]
    resume: Option<String>,

    /// Priority (low, medium, high)
    #[arg(short, long)]
    priority: Option<Priority>,

    /// Status (todo, applied, interview, done)
    #[arg(short, long)]
    status: Option<String>,
}

impl JobFields {
    fn into_patch(self) -> Result<JobPatch> {
        let status = self.status.as_deref().map(admit_status).transpose()?;
        Ok(JobPatch {
            location: self.location,
            job_type: self.job_type,
            salary: self.salary,
            url: self.url,
            notes: self.notes,
            source: self.source,
            resume_used: self.resume,
            priority: self.priority,
            status,
            ..JobPatch::default()
        })
    }

    fn into_draft(self, company: String, title: String) -> Result<JobDraft> {
        let patch = self.into_patch()?;
        let mut draft = JobDraft::new(company, title);
        draft.location = patch.location.or(draft.location);
        draft.job_type = patch.job_type.or(draft.job_type);
        draft.salary = patch.salary.or(draft.salary);
        draft.url = patch.url.or(draft.url);
        draft.notes = patch.notes.or(draft.notes);
        draft.source = patch.source.or(draft.source);
        draft.resume_used = patch.resume_used.or(draft.resume_used);
        draft.priority = patch.priority.unwrap_or(draft.priority);
        draft.status = patch.status.unwrap_or(draft.status);
        Ok(draft)
    }
}

fn admit_status(raw: &str) -> Result<Status> {
    Status::admit(raw).map_err(|e| anyhow!(e))
}

fn init_logging(log_dir: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    // Log to a daily file so the board's terminal stays clean
    let file = tracing_appender::rolling::daily(log_dir, "jobboard.log");
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    let _guard = init_logging(&config.log_dir)?;

    let slots = SqliteSlots::open(&config.db_path())?;
    tracing::debug!(path = ?slots.path(), "Opened database");
    let mut store = Store::open(slots, config.slot_key.as_str())?;

    match cli.command {
        Commands::Add {
            company,
            title,
            mut fields,
        } => {
            let default_resume = &store.settings().default_resume;
            if fields.resume.is_none() && !default_resume.is_empty() {
                fields.resume = Some(default_resume.clone());
            }
            let job = store.create(fields.into_draft(company, title)?)?;
            println!("Added job {} ({} - {})", short_id(&job.id), job.company, job.title);
        }

        Commands::Edit {
            id,
            company,
            title,
            fields,
        } => {
            let Some(id) = resolve_id(&store, &id)? else {
                println!("Job '{}' not found.", id);
                return Ok(());
            };
            let patch = JobPatch {
                company,
                title,
                ..fields.into_patch()?
            };
            if patch.is_empty() {
                bail!("Nothing to change. Pass at least one field, e.g. --salary or --notes");
            }
            store.update(&id, patch)?;
            println!("Updated job {}.", short_id(&id));
        }

        Commands::List { status, search } => {
            let status = status.as_deref().map(admit_status).transpose()?;
            let query = search.unwrap_or_default();
            let jobs: Vec<&Job> = store
                .jobs()
                .iter()
                .filter(|j| status.as_ref().is_none_or(|s| &j.status == s))
                .filter(|j| j.matches_query(&query))
                .collect();

            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!(
                    "{:<10} {:<10} {:<6} {:<24} {:<28} {:<12}",
                    "ID", "STATUS", "PRIO", "COMPANY", "TITLE", "SOURCE"
                );
                println!("{}", "-".repeat(95));
                for job in jobs {
                    println!(
                        "{:<10} {:<10} {:<6} {:<24} {:<28} {:<12}",
                        short_id(&job.id),
                        job.status,
                        job.priority.map(|p| p.as_str()).unwrap_or("-"),
                        truncate(&job.company, 22),
                        truncate(&job.title, 26),
                        truncate(job.source.as_deref().unwrap_or("-"), 12),
                    );
                }
            }
        }

        Commands::Show { id } => match resolve_id(&store, &id)?.and_then(|id| store.get(&id)) {
            Some(job) => print_job(job),
            None => println!("Job '{}' not found.", id),
        },

        Commands::Move { id, status } => {
            let status = admit_status(&status)?;
            let Some(id) = resolve_id(&store, &id)? else {
                println!("Job '{}' not found.", id);
                return Ok(());
            };
            if store.move_job(&id, status.clone())? {
                println!("Moved job {} to {}.", short_id(&id), status);
            } else {
                println!("Job {} is already {}.", short_id(&id), status);
            }
        }

        Commands::Delete { id, yes } => {
            let Some(job) = resolve_id(&store, &id)?.and_then(|id| store.get(&id)) else {
                println!("Job '{}' not found.", id);
                return Ok(());
            };
            let (id, label) = (job.id.clone(), format!("{} - {}", job.company, job.title));
            if !yes && !confirm(&format!("Delete '{}'?", label))? {
                println!("Cancelled.");
                return Ok(());
            }
            store.delete(&id)?;
            println!("Deleted '{}'.", label);
        }

        Commands::Stats { json } => {
            let stats = store.stats(chrono::Local::now().date_naive());
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats);
            }
        }

        Commands::Export { dir, stdout } => {
            if stdout {
                println!("{}", store.export_json()?);
            } else {
                let path = store.export_to(&dir)?;
                println!("Exported {} job(s) to {}", store.jobs().len(), path.display());
            }
        }

        Commands::Import { file, dry_run } => {
            if dry_run {
                let mut scratch = Store::open(MemorySlots::new(), config.slot_key.as_str())?;
                let count = scratch
                    .import_file(&file)
                    .with_context(|| format!("Failed to import {}", file.display()))?;
                println!("{} is valid: {} job(s). Nothing was changed.", file.display(), count);
            } else {
                let count = store
                    .import_file(&file)
                    .with_context(|| format!("Failed to import {}", file.display()))?;
                println!("Imported {} job(s) from {}", count, file.display());
            }
        }

        Commands::Board { search } => {
            tui::run_board(&mut store, search.as_deref().unwrap_or(""))?;
        }
    }

    Ok(())
}

/// An exact id, or a prefix shared by exactly one job.
fn resolve_id<S: SlotStore>(store: &Store<S>, id: &str) -> Result<Option<String>> {
    if store.get(id).is_some() {
        return Ok(Some(id.to_string()));
    }
    let matches: Vec<&Job> = store.jobs().iter().filter(|j| j.id.starts_with(id)).collect();
    match matches.as_slice() {
        [] => Ok(None),
        [job] => Ok(Some(job.id.clone())),
        _ => Err(anyhow!("'{}' matches {} jobs, use a longer prefix", id, matches.len())),
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_job(job: &Job) {
    println!("Job {}", job.id);
    println!("Company: {}", job.company);
    println!("Title: {}", job.title);
    println!("Status: {}", job.status);
    if let Some(priority) = job.priority {
        println!("Priority: {}", priority);
    }
    let optional = [
        ("Location", &job.location),
        ("Type", &job.job_type),
        ("Salary", &job.salary),
        ("URL", &job.url),
        ("Source", &job.source),
        ("Resume", &job.resume_used),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }
    if let Some(created) = &job.created_at {
        println!("Created: {}", created);
    }
    if let Some(updated) = &job.updated_at {
        println!("Updated: {}", updated);
    }
    if let Some(notes) = &job.notes {
        println!("\n--- Notes ---\n{}", notes);
    }
}

fn print_stats(stats: &stats::Stats) {
    let counts = &stats.counts;
    println!("Total jobs: {}", counts.total);
    for stage in Stage::ALL {
        println!("  {:<10} {}", stage.title(), counts.get(stage));
    }
    println!();
    println!("Applied -> interview: {}%", stats.interview_rate);
    println!("Completed overall:    {}%", stats.completion_rate);

    if !stats.top_sources.is_empty() {
        println!("\nTop sources:");
        for (source, count) in &stats.top_sources {
            println!("  {:<20} {}", truncate(source, 20), count);
        }
    }
    if !stats.top_resumes.is_empty() {
        println!("\nResumes used:");
        for (resume, count) in &stats.top_resumes {
            println!("  {:<24} {}", truncate(resume, 24), count);
        }
    }

    println!("\nThis week:");
    for day in &stats.this_week {
        println!("  {} {}  {:<3} {}", day.day, day.date, day.count, "#".repeat(day.count));
    }

    if !stats.recent.is_empty() {
        println!("\nRecently added:");
        for job in &stats.recent {
            println!("  {:<10} {} - {} ({})", short_id(&job.id), job.company, job.title, job.status);
        }
    }
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
