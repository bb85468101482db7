//! Consistency test command

use clap::Parser;
use tracing::warn;

use crate::annotate::keyboard::{KeyboardHandler, Shortcut};
use crate::annotate::player::{ExternalPlayer, MediaBackend};
use crate::api::ApiClient;
use crate::cli::annotate::{parse_line, Command};
use crate::cli::{open_session, read_line, resolve_user, select};
use crate::core::error::{Error, Result};
use crate::quiz::consistency::{self, Start};
use crate::quiz::{ConsistencyOutcome, ConsistencyTest};

/// Arguments for the consistency command
#[derive(Parser, Debug)]
#[command(after_help = "Annotate every clip once; answers are compared against the
reference annotations later. Sliders start at V=0, A=3.

KEYS:  space play   e previous   r next
FIELDS: v <num>, a <num>, p patient|non-patient, t neutral|non-neutral, d [emotion]
OTHER: g <n> go to question, submit, x quit")]
pub struct ConsistencyArgs {
    /// Annotator (default: the logged-in or last user)
    #[arg(short, long)]
    pub username: Option<String>,
}

pub async fn run(args: ConsistencyArgs) -> Result<()> {
    let (config, mut manager) = open_session()?;
    let username = resolve_user(&mut manager, args.username).await?;
    let api = manager.api().clone();

    let mut test = match consistency::start(&api, &username, &config.annotate).await? {
        Start::Ready(test) => test,
        Start::Done(outcome) => {
            report(&outcome);
            return Ok(());
        }
    };

    let mut player = ExternalPlayer::new(config.annotate.player_command.clone());
    let keyboard = KeyboardHandler::new();
    let mut shown = None;
    loop {
        if shown != Some(test.current_index()) {
            shown = Some(test.current_index());
            play(&mut player, &test, &api);
        }
        print!("{}", render(&test));

        let line = read_line(format!("{}/{}", test.current_index() + 1, test.len())).await?;
        if line.trim().eq_ignore_ascii_case("submit") {
            match test.submit(&api, &username).await {
                Ok(outcome) => {
                    player.stop();
                    report(&outcome);
                    return Ok(());
                }
                Err(e) => {
                    eprintln!("! {}", e);
                    continue;
                }
            }
        }

        let command = match parse_line(&line, &keyboard) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("! {}", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = apply(&mut test, &mut player, command) {
            eprintln!("! {}", e);
        }
    }
    player.stop();
    Ok(())
}

fn apply(test: &mut ConsistencyTest, player: &mut ExternalPlayer, command: Command) -> Result<()> {
    match command {
        Command::Shortcut(Shortcut::TogglePlayPause) => {
            if player.is_playing() {
                player.pause()?;
            } else {
                player.play()?;
            }
        }
        Command::Shortcut(Shortcut::Next) => {
            if !test.next()? {
                println!("Last question. Type 'submit' when every question is done.");
            }
        }
        Command::Shortcut(Shortcut::Previous) => {
            test.previous();
        }
        Command::Shortcut(_) => {}
        Command::SetV(v) => test.set_v(v)?,
        Command::SetA(a) => test.set_a(a)?,
        Command::Patient(status) => test.set_patient_status(status),
        Command::EmotionType(t) => test.set_emotion_type(t),
        Command::Discrete(Some(emotion)) => test.set_discrete_emotion(&emotion)?,
        Command::Discrete(None) => {
            let emotions = test.emotions().to_vec();
            let picked = select("Discrete emotion", &emotions, 0)?;
            test.set_discrete_emotion(&emotions[picked])?;
        }
        Command::Goto(index) => {
            if !test.go_to(index) {
                return Err(Error::validation(format!("There are only {} questions", test.len())));
            }
        }
        Command::List => {
            let incomplete = test.incomplete();
            if incomplete.is_empty() {
                println!("All questions answered.");
            } else {
                let list: Vec<String> = incomplete.iter().map(|n| n.to_string()).collect();
                println!("Not finished: {}", list.join(", "));
            }
        }
        Command::Speaker | Command::Help | Command::Quit | Command::Empty => {}
    }
    Ok(())
}

fn play(player: &mut ExternalPlayer, test: &ConsistencyTest, api: &ApiClient) {
    let played = match test.audio_url(api) {
        Ok(Some(url)) => player.load(&url).and_then(|()| player.play()),
        Ok(None) => return,
        Err(e) => Err(e),
    };
    if let Err(e) = played {
        warn!(index = test.current_index(), error = %e, "could not play consistency clip");
        eprintln!("! Playback failed: {}", e);
    }
}

fn render(test: &ConsistencyTest) -> String {
    let draft = test.draft();
    let show = |v: Option<f64>| v.map_or("--".to_string(), |v| format!("{:.2}", v));
    format!(
        "\nQuestion {}/{}: {}\n  V {}  A {}  type: {}  emotion: {}  patient: {}\n",
        test.current_index() + 1,
        test.len(),
        draft.filename,
        show(draft.v_value),
        show(draft.a_value),
        draft.emotion_type.map_or("--", |t| t.as_str()),
        draft.discrete_emotion.as_deref().unwrap_or("--"),
        draft.patient_status.map_or("--", |s| s.as_str()),
    )
}

fn report(outcome: &ConsistencyOutcome) {
    match outcome {
        ConsistencyOutcome::AlreadyCompleted => {
            println!("You have already completed the consistency test. Run 'emolabel annotate'.")
        }
        ConsistencyOutcome::NoQuestions => println!("No consistency questions are available."),
        ConsistencyOutcome::Submitted { message } => {
            println!(
                "✓ {}",
                message.as_deref().unwrap_or("Consistency test submitted")
            );
            println!("Next: annotation workspace (run 'emolabel annotate')");
        }
    }
}
