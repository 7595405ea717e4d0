//! Terminal front-end for Shape Hunter.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use shape_hunter::backend::{HttpBackend, Scoreboard, Services};
use shape_hunter::config::{self, GameConfig};
use shape_hunter::intake::SelectedFile;
use shape_hunter::logging;
use shape_hunter::orchestrator::{
    MatchEvent, MatchOrchestrator, MatchPhase, PendingStage, PlayMode, ShapeChoice,
};
use shape_hunter::session::{SessionIdentity, StaticSession, StoredSession};
use shape_hunter::shapes::{self, ShapeCatalog};
use time::{Date, OffsetDateTime, macros::format_description};

const POLL_STEP: Duration = Duration::from_millis(50);
const ROUND_TIMEOUT: Duration = Duration::from_secs(300);
const LEADERBOARD_GRACE: Duration = Duration::from_secs(5);
const DEFAULT_WAIT_SECS: u64 = 120;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    let config = match &options.config_path {
        Some(path) => config::load_from_path(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let catalog = ShapeCatalog::default();

    match &options.command {
        Command::Shapes => {
            for shape in catalog.all() {
                println!("{:<10} {}", shape.display_name, shape.classifier_label);
            }
            Ok(())
        }
        Command::Today { date } => {
            let shape = match date {
                Some(day) => shapes::shape_for_day(&catalog, *day),
                None => shapes::shape_for_date(&catalog, OffsetDateTime::now_utc()),
            }
            .map_err(|err| err.to_string())?;
            println!("{shape} ({})", shape.classifier_label);
            Ok(())
        }
        Command::Leaderboard => {
            let backend = HttpBackend::new(&config).map_err(|err| err.to_string())?;
            let entries = backend.leaderboard().map_err(|err| err.to_string())?;
            print_leaderboard(&entries);
            Ok(())
        }
        Command::Play { image, shape } => {
            let mut game = build_orchestrator(PlayMode::FreePlay, &options, &config, catalog)?;
            stage(&mut game, image)?;
            let target = game
                .catalog()
                .lookup(shape)
                .cloned()
                .ok_or_else(|| format!("Unknown shape '{shape}'. Try `shape-hunter shapes`."))?;
            require_chosen(game.choose_shape(&target).map_err(|err| err.to_string())?)?;
            play_round(&mut game, ROUND_TIMEOUT)
        }
        Command::Daily { image } => {
            let mut game = build_orchestrator(PlayMode::Daily, &options, &config, catalog)?;
            stage(&mut game, image)?;
            require_chosen(game.confirm_daily_shape().map_err(|err| err.to_string())?)?;
            if let Some(shape) = game.chosen_shape() {
                println!("Today's shape: {shape}");
            }
            play_round(&mut game, ROUND_TIMEOUT)
        }
        Command::Compete {
            image,
            shape,
            wait_secs,
        } => {
            let mut game = build_orchestrator(PlayMode::Compete, &options, &config, catalog)?;
            stage(&mut game, image)?;
            let target = game
                .catalog()
                .lookup(shape)
                .cloned()
                .ok_or_else(|| format!("Unknown shape '{shape}'. Try `shape-hunter shapes`."))?;
            require_chosen(game.choose_shape(&target).map_err(|err| err.to_string())?)?;
            play_round(&mut game, Duration::from_secs(*wait_secs))
        }
    }
}

fn build_orchestrator(
    mode: PlayMode,
    options: &Options,
    config: &GameConfig,
    catalog: ShapeCatalog,
) -> Result<MatchOrchestrator, String> {
    let backend = HttpBackend::new(config).map_err(|err| err.to_string())?;
    let session: Arc<dyn SessionIdentity> = match &options.user {
        Some(user) => Arc::new(StaticSession::logged_in(user.clone())),
        None => Arc::new(StoredSession::from_app_dir().map_err(|err| err.to_string())?),
    };
    Ok(MatchOrchestrator::new(
        mode,
        catalog,
        Services::http(backend),
        session,
        config.matching.clone(),
    ))
}

fn stage(game: &mut MatchOrchestrator, image: &Path) -> Result<(), String> {
    let file = SelectedFile::from_path(image).map_err(|err| err.to_string())?;
    game.stage_image(file).map_err(|err| err.to_string())?;
    Ok(())
}

fn require_chosen(choice: ShapeChoice) -> Result<(), String> {
    match choice {
        ShapeChoice::Chosen => Ok(()),
        ShapeChoice::RedirectToLogin => {
            Err("Not logged in. Log in first, or pass --user <ID>.".to_string())
        }
    }
}

/// Run the round to its end, printing progress as it arrives.
fn play_round(game: &mut MatchOrchestrator, timeout: Duration) -> Result<(), String> {
    game.execute().map_err(|err| err.to_string())?;
    let deadline = Instant::now() + timeout;
    loop {
        for event in game.poll_background_jobs() {
            report_event(game, &event);
        }
        match game.phase() {
            MatchPhase::Done | MatchPhase::MatchResolved => break,
            MatchPhase::ShapeChosen => {
                let message = game
                    .last_error()
                    .map(|err| err.to_string())
                    .unwrap_or_else(|| "Round stopped".to_string());
                return Err(message);
            }
            _ => {}
        }
        if Instant::now() >= deadline {
            let waiting_on = match game.phase() {
                MatchPhase::MatchPending(PendingStage::AwaitingOpponent) => "an opponent",
                MatchPhase::MatchPending(PendingStage::AwaitingOpponentScore) => {
                    "the opponent's score"
                }
                _ => "the backend",
            };
            game.reset();
            return Err(format!(
                "Gave up waiting for {waiting_on} after {}s",
                timeout.as_secs()
            ));
        }
        std::thread::sleep(POLL_STEP);
    }

    let grace = Instant::now() + LEADERBOARD_GRACE;
    while game.leaderboard().is_none() && Instant::now() < grace {
        for event in game.poll_background_jobs() {
            report_event(game, &event);
        }
        std::thread::sleep(POLL_STEP);
    }
    if let Some(entries) = game.leaderboard() {
        print_leaderboard(entries);
    }
    Ok(())
}

fn report_event(game: &MatchOrchestrator, event: &MatchEvent) {
    match event {
        MatchEvent::Classified {
            target_confidence,
            verdict,
        } => {
            if let Some(aggregated) = game.aggregated() {
                for prediction in &aggregated.top_n {
                    println!(
                        "  {:<10} {:>5.1}%",
                        prediction.label,
                        prediction.confidence * 100.0
                    );
                }
                if aggregated.residual > 0.0 {
                    println!("  {:<10} {:>5.1}%", "other", aggregated.residual * 100.0);
                }
            }
            let target = game
                .chosen_shape()
                .map(|shape| shape.display_name.as_str())
                .unwrap_or("target");
            println!("{target}: {:.1}%", target_confidence * 100.0);
            if let Some(verdict) = verdict {
                println!("{}", verdict.message());
            }
        }
        MatchEvent::Paired {
            match_id,
            opponent_id,
        } => println!("Matched against {opponent_id} (match {match_id})"),
        MatchEvent::WaitingForOpponent => println!("Waiting for an opponent..."),
        MatchEvent::OpponentScored { confidence } => {
            println!("Opponent scored {:.1}%", confidence * 100.0)
        }
        MatchEvent::MatchResolved(result) => {
            println!("Result: {} ({})", result.outcome, result.tier)
        }
        MatchEvent::ScoreSubmissionFailed(err) => println!("Score not saved: {err}"),
        MatchEvent::OpponentPollFailed(err) => println!("Stopped checking opponent: {err}"),
        MatchEvent::ClassificationFailed(_)
        | MatchEvent::MatchmakingFailed(_)
        | MatchEvent::ScoreSubmitted
        | MatchEvent::LeaderboardUpdated { .. }
        | MatchEvent::LeaderboardFailed(_) => {}
    }
}

fn print_leaderboard(entries: &[shape_hunter::backend::LeaderboardEntry]) {
    if entries.is_empty() {
        println!("Leaderboard is empty.");
        return;
    }
    println!("Leaderboard:");
    for entry in entries {
        println!(
            "  #{:<3} {:<20} {:>5.1}%{}",
            entry.rank,
            entry.user_id,
            entry.score * 100.0,
            entry
                .date
                .as_deref()
                .map(|date| format!("  {date}"))
                .unwrap_or_default()
        );
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Shapes,
    Today { date: Option<Date> },
    Play { image: PathBuf, shape: String },
    Daily { image: PathBuf },
    Compete {
        image: PathBuf,
        shape: String,
        wait_secs: u64,
    },
    Leaderboard,
}

#[derive(Debug)]
struct Options {
    config_path: Option<PathBuf>,
    user: Option<String>,
    command: Command,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut config_path = None;
    let mut user = None;
    let mut command_name = None;
    let mut image = None;
    let mut shape = None;
    let mut date = None;
    let mut wait_secs = DEFAULT_WAIT_SECS;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--config" => config_path = Some(PathBuf::from(next_value(&args, &mut idx, "--config")?)),
            "--user" => user = Some(next_value(&args, &mut idx, "--user")?),
            "--image" => image = Some(PathBuf::from(next_value(&args, &mut idx, "--image")?)),
            "--shape" => shape = Some(next_value(&args, &mut idx, "--shape")?),
            "--date" => {
                let value = next_value(&args, &mut idx, "--date")?;
                date = Some(parse_date(&value)?);
            }
            "--wait-secs" => {
                let value = next_value(&args, &mut idx, "--wait-secs")?;
                wait_secs = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --wait-secs value: {value}"))?;
            }
            value if !value.starts_with('-') && command_name.is_none() => {
                command_name = Some(value.to_string());
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    let Some(command_name) = command_name else {
        return Err(format!("Missing command\n\n{}", help_text()));
    };
    let command = match command_name.as_str() {
        "shapes" => Command::Shapes,
        "today" => Command::Today { date },
        "leaderboard" => Command::Leaderboard,
        "play" => Command::Play {
            image: required(image, "play", "--image")?,
            shape: required(shape, "play", "--shape")?,
        },
        "daily" => Command::Daily {
            image: required(image, "daily", "--image")?,
        },
        "compete" => Command::Compete {
            image: required(image, "compete", "--image")?,
            shape: required(shape, "compete", "--shape")?,
            wait_secs,
        },
        other => return Err(format!("Unknown command: {other}\n\n{}", help_text())),
    };
    Ok(Some(Options {
        config_path,
        user,
        command,
    }))
}

fn required<T>(value: Option<T>, command: &str, flag: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("{command} requires {flag}"))
}

fn next_value(args: &[String], idx: &mut usize, flag: &str) -> Result<String, String> {
    *idx += 1;
    args.get(*idx)
        .cloned()
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|err| format!("Invalid --date '{value}': {err}"))
}

fn help_text() -> String {
    [
        "shape-hunter",
        "Photograph a shape, let the classifier score it, and climb the leaderboard.",
        "",
        "Usage:",
        "  shape-hunter [--config PATH] [--user ID] <command> [options]",
        "",
        "Commands:",
        "  shapes                                   List the target shapes",
        "  today [--date YYYY-MM-DD]                Show the shape of the day",
        "  play --image PATH --shape NAME           Free play against a chosen shape",
        "  daily --image PATH                       Play today's shape",
        "  compete --image PATH --shape NAME        Play a paired opponent",
        "          [--wait-secs N]                  Give up after N seconds (default 120)",
        "  leaderboard                              Show the top scores",
        "",
        "Options:",
        "  --config PATH   Use this config file instead of the app directory one",
        "  --user ID       Play as ID instead of the stored login",
        "  -h, --help      Show this help",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn parses_compete_with_globals() {
        let options = parse_args(args(&[
            "--user",
            "kim",
            "compete",
            "--image",
            "ball.png",
            "--shape",
            "circle",
            "--wait-secs",
            "30",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(options.user.as_deref(), Some("kim"));
        assert_eq!(
            options.command,
            Command::Compete {
                image: PathBuf::from("ball.png"),
                shape: "circle".to_string(),
                wait_secs: 30,
            }
        );
    }

    #[test]
    fn parses_today_with_date() {
        let options = parse_args(args(&["today", "--date", "2025-11-22"]))
            .unwrap()
            .unwrap();
        assert_eq!(
            options.command,
            Command::Today {
                date: Some(date!(2025 - 11 - 22))
            }
        );
    }

    #[test]
    fn play_requires_image_and_shape() {
        let err = parse_args(args(&["play", "--shape", "cone"])).unwrap_err();
        assert!(err.contains("--image"));
        let err = parse_args(args(&["play", "--image", "a.png"])).unwrap_err();
        assert!(err.contains("--shape"));
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(parse_args(args(&["dance"])).unwrap_err().contains("Unknown command"));
        assert!(parse_args(args(&["shapes", "--loud"])).is_err());
        assert!(parse_args(args(&[])).unwrap_err().contains("Missing command"));
        assert!(parse_args(args(&["today", "--date", "22/11/2025"])).is_err());
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse_args(args(&["--help"])).unwrap().is_none());
    }
}
