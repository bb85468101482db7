//! Annotation workspace command
//!
//! One line of input per action. A lone key runs its shortcut; a command
//! with an argument is field input, and the shortcut dispatcher is told a
//! text field has focus so letters inside it never trigger navigation.

use clap::Parser;
use tracing::debug;

use crate::annotate::keyboard::{Focus, Key, KeyboardHandler, Shortcut};
use crate::annotate::model::{EmotionType, PatientStatus};
use crate::annotate::player::{ExternalPlayer, PlaybackEvent};
use crate::annotate::{EmotionLabelingApp, Mode};
use crate::cli::{open_session, print_banner, read_line, select};
use crate::core::context::AppContext;
use crate::core::error::{Error, Result};
use crate::core::prompt::TerminalPrompter;
use crate::output::human;
use crate::session::Page;

/// Arguments for the annotate command
#[derive(Parser, Debug)]
#[command(after_help = "KEYS:
    space      Play / pause
    w          Save the current mode
    e / r      Previous / next clip
    q          Continue to discrete / back to VA

FIELDS (VA mode):
    v <num>                       Valence
    a <num>                       Arousal

FIELDS (discrete mode):
    p patient|non-patient         Patient status
    t neutral|non-neutral         Emotion type
    d [emotion]                   Discrete emotion (non-neutral only)

OTHER:
    g <n>   Go to clip n     l   List clips     s   Switch speaker
    h       Help             x   Quit")]
pub struct AnnotateArgs {
    /// Start with this speaker instead of picking one
    #[arg(short, long)]
    pub speaker: Option<String>,
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Shortcut(Shortcut),
    SetV(f64),
    SetA(f64),
    Patient(PatientStatus),
    EmotionType(EmotionType),
    /// `None` opens the picker
    Discrete(Option<String>),
    /// 0-based clip index
    Goto(usize),
    List,
    Speaker,
    Help,
    Quit,
    Empty,
}

fn number(arg: &str) -> Result<f64> {
    arg.parse::<f64>()
        .map_err(|_| Error::validation(format!("'{}' is not a number", arg)))
}

fn usage(what: &str) -> Error {
    Error::validation(format!("Usage: {}", what))
}

/// Parse one line of workspace input
pub fn parse_line(line: &str, keyboard: &KeyboardHandler) -> Result<Command> {
    if line.trim().is_empty() {
        return Ok(Command::Empty);
    }
    let trimmed = line.trim();
    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (trimmed, ""),
    };
    let focus = if rest.is_empty() {
        Focus::None
    } else {
        Focus::TextInput
    };
    if let Some(shortcut) = Key::parse(trimmed).and_then(|key| keyboard.dispatch(key, focus)) {
        return Ok(Command::Shortcut(shortcut));
    }

    let command = match (word.to_lowercase().as_str(), rest) {
        ("v", "") => return Err(usage("v <number>")),
        ("a", "") => return Err(usage("a <number>")),
        ("p", "") => return Err(usage("p patient|non-patient")),
        ("t", "") => return Err(usage("t neutral|non-neutral")),
        ("g", "") => return Err(usage("g <clip number>")),
        ("v", arg) => Command::SetV(number(arg)?),
        ("a", arg) => Command::SetA(number(arg)?),
        ("p", arg) => Command::Patient(arg.parse()?),
        ("t", arg) => Command::EmotionType(arg.parse()?),
        ("d", "") => Command::Discrete(None),
        ("d", arg) => Command::Discrete(Some(arg.to_string())),
        ("g", arg) => match arg.parse::<usize>() {
            Ok(n) if n >= 1 => Command::Goto(n - 1),
            _ => return Err(Error::validation(format!("'{}' is not a clip number", arg))),
        },
        ("l" | "list", _) => Command::List,
        ("s" | "speaker", _) => Command::Speaker,
        ("h" | "help" | "?", _) => Command::Help,
        ("x" | "quit" | "exit", _) => Command::Quit,
        (other, _) => {
            return Err(Error::validation(format!(
                "Unknown command '{}' (h for help)",
                other
            )))
        }
    };
    Ok(command)
}

type App = EmotionLabelingApp<ExternalPlayer, TerminalPrompter>;

pub async fn run(args: AnnotateArgs) -> Result<()> {
    let (config, mut manager) = open_session()?;
    let username = manager.init_auth().await?;
    manager.remember_session()?;

    match manager.landing_page(&username).await {
        Page::Main => {}
        page => {
            return Err(Error::validation(format!(
                "Finish the {} first (run 'emolabel {}')",
                page,
                page.command()
            )))
        }
    }

    let backend = ExternalPlayer::new(config.annotate.player_command.clone());
    let ctx = AppContext::new(manager.api().clone(), config, username.as_str());
    let mut app: App = EmotionLabelingApp::new(ctx, backend, TerminalPrompter);

    if app.init().await.is_err() {
        print_banner(app.banners_mut());
        return Err(Error::validation("Could not load speakers"));
    }
    let speakers = app.list().speakers().to_vec();
    if speakers.is_empty() {
        println!("No speakers are assigned to {}.", username);
        return Ok(());
    }
    let speaker = match args.speaker {
        Some(s) if speakers.contains(&s) => s,
        Some(s) => return Err(Error::validation(format!("Unknown speaker '{}'", s))),
        None => speakers[select("Speaker", &speakers, 0)?].clone(),
    };
    if !app.select_speaker(&speaker).await? {
        print_banner(app.banners_mut());
        return Ok(());
    }
    if !app.list().is_empty() {
        app.select_audio(0).await?;
    }

    println!("{}", help_text());
    let keyboard = KeyboardHandler::new();
    loop {
        for event in app.poll_player() {
            if event == PlaybackEvent::Ended {
                println!("♪ finished (played {}x)", app.player().play_count());
            }
        }
        print_banner(app.banners_mut());
        print!("{}", render(&app));

        let line = read_line(prompt(&app)).await?;
        let command = match parse_line(&line, &keyboard) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("! {}", e);
                continue;
            }
        };
        debug!(?command, "workspace input");
        if command == Command::Quit {
            break;
        }
        if let Err(e) = apply(&mut app, command).await {
            eprintln!("! {}", e);
        }
    }

    app.player_mut().stop();
    Ok(())
}

async fn apply(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Shortcut(shortcut) => app.handle_shortcut(shortcut).await?,
        Command::SetV(v) => {
            app.annotator_mut().set_v(v)?;
        }
        Command::SetA(a) => {
            app.annotator_mut().set_a(a)?;
        }
        Command::Patient(status) => app.annotator_mut().set_patient_status(status)?,
        Command::EmotionType(t) => app.annotator_mut().set_emotion_type(t)?,
        Command::Discrete(Some(emotion)) => app.annotator_mut().set_discrete_emotion(&emotion)?,
        Command::Discrete(None) => {
            app.annotator().ensure_mode(Mode::Discrete)?;
            if !app.annotator().discrete_picker_visible() {
                return Err(Error::validation(
                    "Choose 'non-neutral' before picking a discrete emotion",
                ));
            }
            let emotions = app.annotator().emotions().to_vec();
            let picked = select("Discrete emotion", &emotions, 0)?;
            app.annotator_mut().set_discrete_emotion(&emotions[picked])?;
        }
        Command::Goto(index) => {
            if !app.select_audio(index).await? && index >= app.list().len() {
                return Err(Error::validation(format!(
                    "There are only {} clips",
                    app.list().len()
                )));
            }
        }
        Command::List => print!("{}", human::format_audio_list(&app.list().render())),
        Command::Speaker => {
            let speakers = app.list().speakers().to_vec();
            let current = app
                .list()
                .current_speaker()
                .and_then(|s| speakers.iter().position(|x| x == s))
                .unwrap_or(0);
            let picked = select("Speaker", &speakers, current)?;
            if app.select_speaker(&speakers[picked]).await? && !app.list().is_empty() {
                app.select_audio(0).await?;
            }
        }
        Command::Help => println!("{}", help_text()),
        Command::Quit | Command::Empty => {}
    }
    Ok(())
}

fn prompt(app: &App) -> String {
    match app.annotator().mode() {
        Mode::Va => "VA".to_string(),
        Mode::Discrete => "discrete".to_string(),
    }
}

fn render(app: &App) -> String {
    let mut output = String::new();
    let list = app.list();
    let Some(entry) = list.current_entry() else {
        output.push_str("No clip selected (l to list, g <n> to pick)\n");
        return output;
    };
    let index = list.current_index().unwrap_or(0);
    output.push_str(&format!(
        "\n[{}] {}/{} {}  {}  plays: {}\n",
        list.current_speaker().unwrap_or("-"),
        index + 1,
        list.len(),
        entry.file_name,
        if app.player().is_playing() { "▶" } else { "■" },
        app.player().play_count()
    ));

    let annotator = app.annotator();
    match annotator.mode() {
        Mode::Va => output.push_str(&format!(
            "  V {}  A {}\n",
            annotator.v().display(),
            annotator.a().display()
        )),
        Mode::Discrete => {
            output.push_str(&format!(
                "  type: {}  patient: {}",
                annotator.emotion_type().map_or("--", |t| t.as_str()),
                annotator.patient_status().map_or("--", |s| s.as_str())
            ));
            if annotator.discrete_picker_visible() {
                output.push_str(&format!(
                    "  emotion: {}",
                    annotator.discrete_emotion().unwrap_or("--")
                ));
            }
            output.push('\n');
        }
    }

    let button = app.save_button(annotator.mode());
    let nav = app.nav_buttons();
    output.push_str(&format!(
        "  [{}]{}  {}prev  {}next{}\n",
        button.label,
        if button.disabled { " (disabled)" } else { "" },
        if nav.previous_enabled { "" } else { "no " },
        if nav.next_enabled { "" } else { "no " },
        if annotator.is_modified() { "  *unsaved*" } else { "" }
    ));
    output
}

fn help_text() -> String {
    let mut output = String::from("Keys:");
    for (key, shortcut) in KeyboardHandler::help() {
        output.push_str(&format!("  {}={}", key, shortcut));
    }
    output.push_str("\nVA fields: v <num>, a <num>   Discrete fields: p patient|non-patient, t neutral|non-neutral, d [emotion]");
    output.push_str("\nOther: g <n>, l (list), s (speaker), h (help), x (quit)");
    output
}
