mod runner;

use std::fmt;
use std::path::PathBuf;

use exam_core::QuestionFilter;
use exam_core::model::{Difficulty, ExamProfileId, QuestionId, WrongStatus};
use services::{AppServices, Clock, SessionScope};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    MissingProfile,
    MissingQuestionId,
    InvalidId { flag: &'static str, raw: String },
    InvalidDifficulty { raw: String },
    InvalidStatus { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::MissingProfile => write!(f, "exam requires --profile <id>"),
            ArgsError::MissingQuestionId => write!(f, "a question id is required"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => write!(f, "invalid --difficulty value: {raw}"),
            ArgsError::InvalidStatus { raw } => write!(f, "invalid --status value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  exam-trainer profiles");
    eprintln!("  exam-trainer exam --profile <id>");
    eprintln!("  exam-trainer practice [--subject <name>] [--difficulty <level>] [--search <text>]");
    eprintln!("  exam-trainer review   [--subject <name>] [--difficulty <level>] [--status <status>]");
    eprintln!("  exam-trainer wrong");
    eprintln!("  exam-trainer explain <question-id>");
    eprintln!("  exam-trainer master  <question-id>");
    eprintln!();
    eprintln!("Every command also accepts:");
    eprintln!("  --db <sqlite_url>   (default sqlite:exam.sqlite3)");
    eprintln!("  --bank <path>       (default: bundled sample bank)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_BANK_PATH, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Profiles,
    Exam(ExamProfileId),
    Practice(QuestionFilter),
    Review(QuestionFilter),
    Wrong,
    Explain(QuestionId),
    Master(QuestionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandName {
    Profiles,
    Exam,
    Practice,
    Review,
    Wrong,
    Explain,
    Master,
}

impl CommandName {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "profiles" => Some(Self::Profiles),
            "exam" => Some(Self::Exam),
            "practice" => Some(Self::Practice),
            "review" => Some(Self::Review),
            "wrong" => Some(Self::Wrong),
            "explain" => Some(Self::Explain),
            "master" => Some(Self::Master),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    bank_path: PathBuf,
    command: Command,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:exam.sqlite3".into()), normalize_sqlite_url);
        let mut bank_path = std::env::var("EXAM_BANK_PATH")
            .ok()
            .map_or_else(default_bank_path, PathBuf::from);

        let mut args = argv.into_iter();
        let name = match args.next() {
            None => CommandName::Profiles,
            Some(first) => CommandName::from_arg(&first).ok_or(ArgsError::UnknownCommand(first))?,
        };

        let mut filter = QuestionFilter::all();
        let mut profile = None;
        let mut question = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--bank" => bank_path = PathBuf::from(require_value(&mut args, "--bank")?),
                "--profile" if name == CommandName::Exam => {
                    let value = require_value(&mut args, "--profile")?;
                    profile = Some(value.parse::<ExamProfileId>().map_err(|_| {
                        ArgsError::InvalidId {
                            flag: "--profile",
                            raw: value.clone(),
                        }
                    })?);
                }
                "--subject" if matches!(name, CommandName::Practice | CommandName::Review) => {
                    filter = filter.with_subject(require_value(&mut args, "--subject")?);
                }
                "--difficulty" if matches!(name, CommandName::Practice | CommandName::Review) => {
                    let value = require_value(&mut args, "--difficulty")?;
                    let level = value
                        .parse::<Difficulty>()
                        .map_err(|_| ArgsError::InvalidDifficulty { raw: value.clone() })?;
                    filter = filter.with_difficulty(level);
                }
                "--status" if matches!(name, CommandName::Practice | CommandName::Review) => {
                    let value = require_value(&mut args, "--status")?;
                    let status = value
                        .parse::<WrongStatus>()
                        .map_err(|_| ArgsError::InvalidStatus { raw: value.clone() })?;
                    filter = filter.with_status(status);
                }
                "--search" if matches!(name, CommandName::Practice | CommandName::Review) => {
                    filter = filter.with_search(require_value(&mut args, "--search")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                raw if matches!(name, CommandName::Explain | CommandName::Master)
                    && question.is_none()
                    && !raw.starts_with("--") =>
                {
                    question = Some(raw.parse::<QuestionId>().map_err(|_| ArgsError::InvalidId {
                        flag: "question id",
                        raw: arg.clone(),
                    })?);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match name {
            CommandName::Profiles => Command::Profiles,
            CommandName::Exam => Command::Exam(profile.ok_or(ArgsError::MissingProfile)?),
            CommandName::Practice => Command::Practice(filter),
            CommandName::Review => Command::Review(filter),
            CommandName::Wrong => Command::Wrong,
            CommandName::Explain => Command::Explain(question.ok_or(ArgsError::MissingQuestionId)?),
            CommandName::Master => Command::Master(question.ok_or(ArgsError::MissingQuestionId)?),
        };

        Ok(Self {
            db_url,
            bank_path,
            command,
        })
    }
}

fn default_bank_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/sample_bank.json")
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if matches!(argv.first().map(String::as_str), Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }

    let parsed = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let mut services =
        AppServices::new_sqlite(&parsed.db_url, &parsed.bank_path, Clock::default()).await?;

    match parsed.command {
        Command::Profiles => {
            runner::print_profiles(&services.bank());
            Ok(())
        }
        Command::Exam(id) => {
            runner::run_session(services.controller_mut(), SessionScope::Exam(id)).await
        }
        Command::Practice(filter) => {
            runner::run_session(services.controller_mut(), SessionScope::Practice(filter)).await
        }
        Command::Review(filter) => {
            runner::run_session(services.controller_mut(), SessionScope::Review(filter)).await
        }
        Command::Wrong => {
            runner::print_wrong_questions(services.controller().tracker());
            Ok(())
        }
        Command::Explain(id) => {
            let view = services.controller_mut().open_explanation(id).await?;
            runner::print_explanation(&view);
            Ok(())
        }
        Command::Master(id) => {
            let record = services.controller_mut().mark_mastered(id).await?;
            println!(
                "question {} is now {} (missed {} time(s))",
                record.question_id(),
                record.status(),
                record.wrong_count()
            );
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
