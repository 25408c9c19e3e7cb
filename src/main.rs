use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;

use examace::app::App;
use examace::bank::KNOWN_SUBJECTS;
use examace::config::Config;
use examace::event::{AppEvent, EventHandler, QuizCommand, parse_command};
use examace::quiz::Difficulty;
use examace::remote::ApiClient;
use examace::session::quiz::{QuizSession, SessionError, Submission};
use examace::session::start::QuizRequest;
use examace::store::json_store::JsonStore;
use examace::store::schema::ExportData;
use examace::{logging, ui};

#[derive(Parser)]
#[command(name = "examace", version, about = "Exam practice quizzes in the terminal")]
struct Cli {
    /// Repeat for more log output (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Ignore the configured backend and build quizzes locally.
    #[arg(long, global = true)]
    offline: bool,

    /// Do not read or write local history.
    #[arg(long, global = true)]
    no_save: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Take a quiz (the default command).
    Take {
        #[arg(short, long)]
        subject: Option<String>,
        #[arg(short, long)]
        difficulty: Option<Difficulty>,
        #[arg(short = 'n', long, help = "Number of questions (3-30)")]
        count: Option<usize>,
        #[arg(short, long, help = "Time limit in minutes (1-120)")]
        time_limit: Option<u32>,
        #[arg(long)]
        auto_submit: bool,
    },
    /// List subjects and how many bank questions each tier has.
    Subjects,
    /// Show past attempts.
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Fetch history from the backend instead.
        #[arg(long)]
        remote: bool,
    },
    /// Show performance analytics.
    Stats {
        #[arg(long)]
        remote: bool,
    },
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
    /// Show the backend account the API token belongs to.
    Whoami,
    /// Write config and history to a JSON file.
    Export { path: PathBuf },
    /// Replace local history from an export file.
    Import {
        path: PathBuf,
        /// Also adopt the export's settings.
        #[arg(long)]
        with_config: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    Set { key: String, value: String },
    Path,
    /// Pull settings from the backend into the local config.
    Pull,
    /// Push the local quiz settings to the backend.
    Push,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("could not initialise logging: {e}");
    }

    let mut config = Config::load()?;

    match cli.command.unwrap_or(Command::Take {
        subject: None,
        difficulty: None,
        count: None,
        time_limit: None,
        auto_submit: false,
    }) {
        Command::Take {
            subject,
            difficulty,
            count,
            time_limit,
            auto_submit,
        } => {
            if let Some(subject) = subject {
                config.subject = subject;
            }
            if let Some(difficulty) = difficulty {
                config.difficulty = difficulty;
            }
            if let Some(count) = count {
                config.question_count = count;
            }
            if time_limit.is_some() {
                config.time_limit = time_limit;
            }
            config.auto_submit |= auto_submit;
            if cli.offline {
                config.api_base.clear();
            }
            config.validate();
            let store = open_store(cli.no_save)?;
            let mut app = App::new(config, store)?;
            take_quiz(&mut app)
        }
        Command::Subjects => {
            let app = App::new(config, None)?;
            list_subjects(&app);
            Ok(())
        }
        Command::History { limit, remote } => {
            if remote {
                let client = backend_client(&config)?;
                for item in client.history()? {
                    println!(
                        "{:<26} {:<24} {:<13} {}",
                        item.created_at.as_deref().unwrap_or("-"),
                        item.subject,
                        item.difficulty,
                        item.score.map_or_else(|| "-".to_string(), |s| format!("{s:.0}%"))
                    );
                }
            } else {
                let app = App::new(config, open_store(cli.no_save)?)?;
                print!("{}", ui::dashboard(&app.dashboard()));
                print!("{}", ui::history(&app.history.attempts, limit));
            }
            Ok(())
        }
        Command::Stats { remote } => {
            let perf = if remote {
                backend_client(&config)?.performance()?
            } else {
                App::new(config, open_store(cli.no_save)?)?.performance()
            };
            print!("{}", ui::performance(&perf));
            Ok(())
        }
        Command::Whoami => {
            let client = backend_client(&config)?;
            let profile = client.me()?;
            println!(
                "{} <{}>",
                profile.display_name.as_deref().unwrap_or(&profile.email).bold(),
                profile.email
            );
            println!("id       {}", profile.id);
            if let Some(created) = profile.created_at.as_deref() {
                println!("joined   {created}");
            }
            println!("backend  {}", client.base());
            Ok(())
        }
        Command::Config { action } => run_config(config, action.unwrap_or(ConfigAction::Show)),
        Command::Export { path } => {
            let store = JsonStore::new()?;
            let export = store.export_all(&config);
            fs::write(&path, serde_json::to_string_pretty(&export)?)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "Exported {} attempts to {}",
                export.history.attempts.len(),
                path.display()
            );
            Ok(())
        }
        Command::Import { path, with_config } => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let data: ExportData = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            let store = JsonStore::new()?;
            store.import_all(&data)?;
            if with_config {
                let mut imported = data.config.clone();
                imported.validate();
                imported.save()?;
            }
            println!("Imported {} attempts", data.history.attempts.len());
            Ok(())
        }
    }
}

fn open_store(no_save: bool) -> Result<Option<JsonStore>> {
    if no_save {
        Ok(None)
    } else {
        Ok(Some(JsonStore::new()?))
    }
}

fn backend_client(config: &Config) -> Result<ApiClient> {
    if !config.backend_configured() {
        bail!("No backend configured (set api_base with `examace config set api_base <url>`)");
    }
    let client = ApiClient::new(&config.api_base, Config::api_token());
    if !client.has_token() {
        bail!("Not signed in to {} (set EXAMACE_API_TOKEN)", client.base());
    }
    Ok(client)
}

fn list_subjects(app: &App) {
    println!(
        "{}",
        format!(
            "{:<24} {:>9} {:>13} {:>9}",
            "Subject", "beginner", "intermediate", "advanced"
        )
        .bold()
    );
    for subject in app.bank.subjects() {
        let counts: Vec<usize> = Difficulty::ALL
            .iter()
            .map(|&d| app.bank.question_count(subject, d))
            .collect();
        println!(
            "{subject:<24} {:>9} {:>13} {:>9}",
            counts[0], counts[1], counts[2]
        );
    }
    let others: Vec<&str> = KNOWN_SUBJECTS
        .iter()
        .copied()
        .filter(|s| app.bank.question_count(s, Difficulty::Beginner) == 0)
        .collect();
    if !others.is_empty() {
        println!(
            "\n{} {}",
            "Generated or drawn from General Knowledge offline:".dim(),
            others.join(", ")
        );
    }
}

fn run_config(mut config: Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => print!("{}", toml::to_string_pretty(&config.redacted())?),
        ConfigAction::Path => println!("{}", Config::config_path().display()),
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("{key} updated");
        }
        ConfigAction::Pull => {
            let remote = backend_client(&config)?.settings()?;
            config.subject = remote.subject;
            config.difficulty = remote.difficulty;
            config.question_count = remote.question_count;
            config.time_limit = remote.time_limit;
            config.auto_submit = remote.auto_submit;
            config.show_explanations = remote.show_explanations;
            config.validate();
            config.save()?;
            println!("Settings pulled from backend");
        }
        ConfigAction::Push => {
            let client = backend_client(&config)?;
            let settings = examace::remote::UserSettings {
                subject: config.subject.clone(),
                difficulty: config.difficulty,
                question_count: config.question_count,
                time_limit: config.time_limit,
                auto_submit: config.auto_submit,
                show_explanations: config.show_explanations,
            };
            client.update_settings(&settings)?;
            println!("Settings pushed to backend");
        }
    }
    Ok(())
}

fn take_quiz(app: &mut App) -> Result<()> {
    if !app.history.attempts.is_empty() {
        print!("{}", ui::dashboard(&app.dashboard()));
    }

    let request: QuizRequest = app.default_request();
    println!(
        "Preparing {} {} questions on {}...",
        request.count, request.difficulty, request.subject
    );
    let quiz = app.start_quiz(&request)?;
    let mut session = app.begin(quiz);
    println!("{}\n", ui::help().dim());

    let events = EventHandler::new(Duration::from_millis(250));
    let Some(submission) = run_session(&mut session, &events, app.config.auto_submit)? else {
        println!("Quiz abandoned.");
        return Ok(());
    };

    let record = app.finish(&session, submission)?;
    println!();
    print!("{}", ui::results(&record, app.config.show_explanations));
    Ok(())
}

/// Drive one session from stdin until it is submitted (`Some`) or abandoned.
fn run_session(
    session: &mut QuizSession,
    events: &EventHandler,
    auto_submit: bool,
) -> Result<Option<Submission>> {
    let mut redraw = true;
    let mut expiry_announced = false;
    loop {
        let now = Instant::now();
        if session.is_expired(now) && !expiry_announced {
            expiry_announced = true;
            if auto_submit {
                println!("\n{}", "Time's up! Submitting.".yellow().bold());
                match session.force_submit(now) {
                    Ok(submission) => return Ok(Some(submission)),
                    Err(SessionError::RemoteIncomplete { unanswered }) => {
                        println!(
                            "{}",
                            format!(
                                "The backend grades complete quizzes only; answer the remaining {unanswered} question(s) and submit."
                            )
                            .yellow()
                        );
                        redraw = true;
                    }
                    Err(e) => return Err(e.into()),
                }
            } else {
                println!("{}", "Time's up! Submit when ready.".yellow().bold());
            }
        }

        if redraw {
            print!("\n{}> ", ui::question(session, session.remaining(now)));
            io::stdout().flush()?;
            redraw = false;
        }

        let line = match events.next() {
            AppEvent::Tick => continue,
            AppEvent::Eof => return Ok(None),
            AppEvent::Line(line) => line,
        };
        redraw = true;

        match parse_command(&line) {
            Some(QuizCommand::Select(option)) => {
                session.select(option)?;
                if session.current + 1 < session.total() {
                    session.next();
                }
            }
            Some(QuizCommand::Next) => session.next(),
            Some(QuizCommand::Prev) => session.prev(),
            Some(QuizCommand::Jump(index)) => session.jump(index),
            Some(QuizCommand::Submit) => match session.submit(Instant::now()) {
                Ok(submission) => return Ok(Some(submission)),
                Err(SessionError::Incomplete { unanswered }) => {
                    println!(
                        "{}",
                        format!("{unanswered} question(s) still unanswered").yellow()
                    );
                }
                Err(e) => return Err(e.into()),
            },
            Some(QuizCommand::Help) => println!("{}", ui::help()),
            Some(QuizCommand::Quit) => return Ok(None),
            None => println!("{}", "Unrecognised input; type h for help.".red()),
        }
    }
}
