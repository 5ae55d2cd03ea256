//! Terminal front end for buzzbowl
//!
//! Loads the question bank, then plays rounds on stdin/stdout: Enter
//! buzzes in (or moves on once a round is over), the next line is the
//! answer, `c` lists or changes the categories, and `q` quits and prints
//! the score board.

use std::{
    cell::Cell,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use buzzbowl::{
    config::{Options, parse_reveal_interval},
    constants::{answer_window, buzz_window, judge, reveal, source},
    game::{BuzzOutcome, Game, State},
    judge::GeminiJudge,
    question::QuestionBank,
    scheduler::TokioScheduler,
    source::fetch_bank,
    surface::Surface,
    verifier::Verifier,
};
use clap::Parser;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use web_time::Duration;

/// Buzz-in science trivia in the terminal
#[derive(Debug, Parser)]
#[command(name = "buzzbowl", version, about)]
struct Cli {
    /// Where the question bank is published
    #[arg(long, env = "BUZZBOWL_BANK_URL", default_value = source::QUESTION_URL)]
    bank_url: String,

    /// Read the question bank from a local JSON file instead of the URL
    #[arg(long, value_name = "FILE")]
    bank: Option<PathBuf>,

    /// Key for the answer judgment service; without it free responses
    /// must match exactly
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Answer judgment endpoint
    #[arg(long, default_value = judge::ENDPOINT)]
    judge_endpoint: String,

    /// Reveal speed in milliseconds per character
    #[arg(long, default_value_t = reveal::DEFAULT_INTERVAL_MS.to_string())]
    speed: String,

    /// Seconds to buzz in after the question is shown
    #[arg(long, default_value_t = buzz_window::DEFAULT_SECONDS)]
    buzz_seconds: u64,

    /// Seconds to answer after buzzing in
    #[arg(long, default_value_t = answer_window::DEFAULT_SECONDS)]
    answer_seconds: u64,

    /// Only draw from this category (repeatable; default: all)
    #[arg(short, long = "category", value_name = "NAME")]
    categories: Vec<String>,

    /// Print the categories of the bank and exit
    #[arg(long)]
    list_categories: bool,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// What the cursor currently follows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Cursor {
    /// Start of an empty line
    #[default]
    LineStart,
    /// Unterminated question text
    Question,
    /// A countdown value, overwritten by the next one
    Timer,
}

/// Surface writing to stdout
#[derive(Debug, Default)]
struct TerminalSurface {
    cursor: Cell<Cursor>,
}

impl TerminalSurface {
    fn end_line(&self) {
        if self.cursor.replace(Cursor::LineStart) != Cursor::LineStart {
            println!();
        }
    }

    fn line(&self, text: &str) {
        self.end_line();
        println!("{text}");
    }

    fn partial(&self, text: &str, cursor: Cursor) {
        print!("{text}");
        self.cursor.set(cursor);
        if let Err(error) = io::stdout().flush() {
            debug!(%error, "stdout flush failed");
        }
    }
}

impl Surface for TerminalSurface {
    fn set_question_text(&self, text: &str) {
        self.line("");
        if !text.is_empty() {
            self.line(text);
        }
    }

    fn append_question_char(&self, character: char) {
        self.partial(&character.to_string(), Cursor::Question);
    }

    fn set_timer_text(&self, text: &str) {
        match self.cursor.get() {
            Cursor::Timer => self.partial(&format!("\r{text}   "), Cursor::Timer),
            Cursor::Question => {
                self.end_line();
                self.partial(text, Cursor::Timer);
            }
            Cursor::LineStart => self.partial(text, Cursor::Timer),
        }
    }

    fn set_result_text(&self, text: &str) {
        if !text.is_empty() {
            self.line(&format!("\n{text}"));
        }
    }

    fn set_scoreboard_text(&self, text: &str) {
        self.line(&format!("\n{text}\n"));
    }

    fn set_answer_input_enabled(&self, enabled: bool) {
        if enabled {
            self.line("\nBuzzed! Type your answer and press Enter:");
        }
    }

    fn focus_answer_input(&self) {}

    fn show_warning(&self, message: &str) {
        self.end_line();
        eprintln!("warning: {message}");
    }
}

/// A line typed outside the answer window
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Buzz in, or start the next question
    Next,
    /// List the categories and the current selection
    ListCategories,
    /// Draw from every category
    SelectAll,
    /// Draw only from these categories
    Select(Vec<String>),
    /// End the session
    Quit,
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match word.to_ascii_lowercase().as_str() {
            "q" | "quit" => Self::Quit,
            "c" | "categories" if rest.is_empty() => Self::ListCategories,
            "c" | "categories" if rest.eq_ignore_ascii_case("all") => Self::SelectAll,
            "c" | "categories" => Self::Select(
                rest.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(ToOwned::to_owned)
                    .collect(),
            ),
            _ => Self::Next,
        }
    }
}

/// Maps typed names onto the bank's spelling, ignoring case
fn match_categories(known: &[String], names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|name| {
            known
                .iter()
                .find(|category| category.eq_ignore_ascii_case(&name))
                .cloned()
                .unwrap_or(name)
        })
        .collect()
}

fn show_categories(surface: &TerminalSurface, game: &Game) {
    let selection = game.selection();
    surface.line("Categories ([x] selected):");
    for category in game.categories() {
        let mark = if selection.contains(&category) { 'x' } else { ' ' };
        surface.line(&format!("  [{mark}] {category}"));
    }
}

async fn load_bank(cli: &Cli, client: &reqwest::Client) -> Result<QuestionBank> {
    match &cli.bank {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(QuestionBank::from_json(&json)?)
        }
        None => Ok(fetch_bank(client, &cli.bank_url).await?),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let options = Options {
        reveal_interval: parse_reveal_interval(&cli.speed),
        buzz_window: Duration::from_secs(cli.buzz_seconds),
        answer_window: Duration::from_secs(cli.answer_seconds),
        bank_url: cli.bank_url.clone(),
        judge_endpoint: cli.judge_endpoint.clone(),
    }
    .validated()?;

    let client = reqwest::Client::new();
    let bank = load_bank(&cli, &client)
        .await
        .context("Failed to load questions")?;

    if cli.list_categories {
        for category in bank.categories() {
            println!("{category}");
        }
        return Ok(());
    }

    let verifier = match cli.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Verifier::with_judge(GeminiJudge::with_endpoint(
            client.clone(),
            options.judge_endpoint.clone(),
            key,
        )),
        _ => Verifier::new(),
    };
    info!(
        questions = bank.len(),
        delegated = verifier.has_judge(),
        "starting session"
    );

    let mut game = Game::new(bank, options, verifier);
    if !cli.categories.is_empty() {
        let categories = match_categories(&game.categories(), cli.categories.clone());
        game.select_categories(categories);
    }

    let (sender, mut alarms) = mpsc::unbounded_channel();
    let mut scheduler = TokioScheduler::new(sender);
    let surface = TerminalSurface::default();

    show_categories(&surface, &game);
    surface.line(
        "Enter buzzes in or moves on; `c a, b` picks categories, `c all` all of them, `c` lists them; q quits.",
    );
    if game.start(&mut scheduler, &surface).is_err() {
        surface.line("Pick other categories with `c`, then press Enter.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(alarm) = alarms.recv() => {
                game.receive_alarm(alarm, &mut scheduler, &surface).await;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };

                if game.state() == State::AwaitingAnswer {
                    game.submit(line.trim(), &mut scheduler, &surface).await;
                    continue;
                }

                match Command::parse(&line) {
                    Command::Quit => break,
                    Command::ListCategories => show_categories(&surface, &game),
                    Command::SelectAll => {
                        let categories = game.categories();
                        game.select_categories(categories);
                        show_categories(&surface, &game);
                    }
                    Command::Select(names) => {
                        let categories = match_categories(&game.categories(), names);
                        game.select_categories(categories);
                        show_categories(&surface, &game);
                    }
                    Command::Next => {
                        let outcome = if game.state() == State::Idle {
                            game.start(&mut scheduler, &surface).map(|()| BuzzOutcome::Advanced)
                        } else {
                            game.buzz(&mut scheduler, &surface)
                        };
                        if let Err(error) = outcome {
                            info!(%error, "waiting for a new selection");
                            surface.line("Pick other categories with `c`, then press Enter.");
                        }
                    }
                }
            }
        }
    }

    surface.line(&format!("\n{}", game.scores()));

    Ok(())
}
