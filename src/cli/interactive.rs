use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use crate::quiz::{Phase, QuizSession, QuizSummary, Reveal, Tick, TickOutcome, Ticker};
use crate::runtime::Result;

enum Input {
    Tick(Tick),
    Line(String),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Answer(usize),
    Next,
    Previous,
    Restart,
    Quit,
    Unknown,
}

impl Command {
    /// Options are typed 1-based.
    fn parse(line: &str) -> Self {
        match line.trim() {
            "" | "n" | "next" => Self::Next,
            "p" | "prev" | "previous" => Self::Previous,
            "r" | "restart" => Self::Restart,
            "q" | "quit" => Self::Quit,
            other => match other.parse::<usize>() {
                Ok(option) if option > 0 => Self::Answer(option - 1),
                _ => Self::Unknown,
            },
        }
    }
}

fn spawn_stdin(sender: Sender<Input>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if sender.send(Input::Line(line)).is_err() {
                return;
            }
        }
        let _ = sender.send(Input::Closed);
    });
}

/// Runs the quiz on the terminal. Prompts go to stderr so stdout carries only the summary.
pub(super) fn run(mut session: QuizSession, tick_period: Duration) -> Result<QuizSummary> {
    let (sender, receiver) = mpsc::channel();
    spawn_stdin(sender.clone());

    let mut ticker: Option<Ticker> = None;
    let mut shown = None;
    while session.phase() != Phase::Completed {
        if shown != Some(session.generation()) {
            shown = Some(session.generation());
            show_question(&session);
            ticker = Some(Ticker::spawn(
                session.generation(),
                tick_period,
                sender.clone(),
                Input::Tick,
            ));
        }

        let Ok(input) = receiver.recv() else {
            break;
        };
        match input {
            Input::Tick(tick) if tick.generation != session.generation() => {}
            Input::Tick(_) => match session.tick() {
                TickOutcome::Running { remaining } if remaining % 10 == 0 || remaining <= 5 => {
                    prompt(&format!("{} left", session.countdown().label()));
                }
                TickOutcome::Expired(reveal) => {
                    eprintln!("\ntime is up");
                    show_reveal(&session, &reveal);
                }
                TickOutcome::Running { .. } | TickOutcome::Idle => {}
            },
            Input::Line(line) => {
                if !apply(&mut session, Command::parse(&line)) {
                    break;
                }
            }
            Input::Closed => break,
        }
    }
    drop(ticker);
    Ok(session.summary())
}

/// Returns false when the learner quits.
fn apply(session: &mut QuizSession, command: Command) -> bool {
    let result = match command {
        Command::Answer(option) => session
            .select_option(option)
            .and_then(|()| session.submit())
            .map(|reveal| show_reveal(session, &reveal)),
        Command::Next if session.phase() == Phase::Answering => {
            eprintln!("type an option number to answer");
            Ok(())
        }
        Command::Next => session.next().map(|_| ()),
        Command::Previous => session.previous().map(|_| ()),
        Command::Restart => {
            session.restart();
            Ok(())
        }
        Command::Quit => return false,
        Command::Unknown => {
            eprintln!("commands: <option number>, n(ext), p(revious), r(estart), q(uit)");
            Ok(())
        }
    };
    if let Err(error) = result {
        eprintln!("{error}");
    }
    true
}

fn show_question(session: &QuizSession) {
    let Some(question) = session.current() else {
        return;
    };
    eprintln!(
        "\nQuestion {}/{} [{:?}, {}] {}",
        session.index() + 1,
        session.total(),
        question.difficulty,
        session.countdown().label(),
        question.prompt
    );
    let info = &question.image_info;
    if !info.modality.is_empty() || !info.body_part.is_empty() {
        eprintln!("  {} {} ({} image(s))", info.modality, info.body_part, info.images.len());
    }
    for (index, option) in question.options.iter().enumerate() {
        eprintln!("  {}. {option}", index + 1);
    }
    if let Some(reveal) = session.reveal() {
        show_reveal(session, &reveal);
    } else {
        prompt("answer");
    }
}

fn show_reveal(session: &QuizSession, reveal: &Reveal) {
    let verdict = match (reveal.correct, reveal.selected) {
        (true, _) => "correct",
        (false, None) => "unanswered",
        (false, Some(_)) => "incorrect",
    };
    eprintln!(
        "{verdict}: the answer is {}. {}",
        reveal.correct_option + 1,
        reveal.explanation
    );
    eprintln!("score {}/{}", session.score(), session.total());
    prompt("enter for next");
}

fn prompt(text: &str) {
    eprint!("{text}> ");
    let _ = io::stderr().flush();
}

#[cfg(test)]
mod tests {
    use super::Command;

    #[test]
    fn commands_parse_one_based_options() {
        assert_eq!(Command::parse("2"), Command::Answer(1));
        assert_eq!(Command::parse(""), Command::Next);
        assert_eq!(Command::parse(" p "), Command::Previous);
        assert_eq!(Command::parse("0"), Command::Unknown);
        assert_eq!(Command::parse("q"), Command::Quit);
    }
}
