//! # Interactive Rating Loop
//!
//! Terminal stand-in for the web player: shows a numbered round of
//! recommendations, reads star ratings and feeds them back into the
//! listener's session so the next round reflects what was learned.
//!
//! Input is line based:
//!
//! | Input        | Effect                                                  |
//! |--------------|---------------------------------------------------------|
//! | `<n> <0-5>`  | rate item `n` of the current round                      |
//! | `more`       | fresh round from the same seed, skipping rated tracks   |
//! | `top`        | round seeded from the best-rated track so far           |
//! | `playlists`  | list rated tracks by star bucket                        |
//! | `reset`      | forget learned statistics                               |
//! | `help`       | show this list                                          |
//! | `quit`       | leave (end of input works too)                          |

use crate::recommender::{Candidate, RecommendMode};
use crate::session::{SessionRegistry, MAX_RATING};
use anyhow::{Context, Result};
use std::io::{BufRead, Write};

/// Listener id used by the single-user terminal front end.
pub const LOCAL_USER: &str = "local";

/// Number of tracks shown by `top`.
const PERSONAL_TOP_K: usize = 5;

/// Seed parameters for every `more` round.
#[derive(Debug, Clone)]
pub struct RoundSeed {
    pub mode: RecommendMode,
    pub track: String,
    pub artist: String,
    pub tag: Option<String>,
    pub limit: usize,
}

#[derive(Debug, PartialEq)]
enum Input {
    Rate { index: usize, stars: f64 },
    More,
    Top,
    Playlists,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Option<Input> {
    let mut words = line.split_whitespace();
    let first = words.next()?;

    let input = match first.to_lowercase().as_str() {
        "more" | "m" => Input::More,
        "top" | "t" => Input::Top,
        "playlists" | "p" => Input::Playlists,
        "reset" => Input::Reset,
        "help" | "h" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        _ => match (first.parse::<usize>(), words.next().map(str::parse::<f64>)) {
            (Ok(index), Some(Ok(stars))) if words.next().is_none() => Input::Rate { index, stars },
            _ => Input::Unknown(line.trim().to_string()),
        },
    };
    Some(input)
}

/// Run the loop until `quit` or end of input.
///
/// # Errors
///
/// Returns an error only if reading input or writing output fails.
pub fn run(
    sessions: &mut SessionRegistry,
    seed: &RoundSeed,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let mut rated: Vec<String> = Vec::new();
    let mut round = next_round(sessions, seed, &rated);
    print_round(out, &round)?;
    print_help(out)?;

    for line in input.lines() {
        let line = line.context("Failed to read input")?;
        let Some(command) = parse_input(&line) else {
            continue;
        };

        match command {
            Input::Rate { index, stars } => {
                let Some(candidate) = index.checked_sub(1).and_then(|i| round.get(i)) else {
                    writeln!(out, "No track #{index} in this round")?;
                    continue;
                };
                if !(0.0..=MAX_RATING).contains(&stars) {
                    writeln!(out, "Ratings go from 0 to {MAX_RATING}")?;
                    continue;
                }
                let reward = sessions.rate(LOCAL_USER, &candidate.id, stars);
                writeln!(out, "Rated {} {stars} stars (reward {reward:.2})", candidate.id)?;
                if !rated.contains(&candidate.id) {
                    rated.push(candidate.id.clone());
                }
            }
            Input::More => {
                round = next_round(sessions, seed, &rated);
                print_round(out, &round)?;
            }
            Input::Top => {
                let top = sessions
                    .get_or_create(LOCAL_USER)
                    .recommender
                    .recommend_personal_top(PERSONAL_TOP_K);
                if top.is_empty() {
                    writeln!(out, "Rate something above 0 stars first")?;
                } else {
                    round = top;
                    print_round(out, &round)?;
                }
            }
            Input::Playlists => print_playlists(sessions, out)?,
            Input::Reset => {
                sessions.reset(LOCAL_USER);
                rated.clear();
                writeln!(out, "Bandit scores have been reset")?;
            }
            Input::Help => print_help(out)?,
            Input::Quit => break,
            Input::Unknown(text) => writeln!(out, "Unrecognised input {text:?}, type `help`")?,
        }
    }

    Ok(())
}

fn next_round(
    sessions: &mut SessionRegistry,
    seed: &RoundSeed,
    rated: &[String],
) -> Vec<Candidate> {
    sessions.get_or_create(LOCAL_USER).recommender.recommend_bulk(
        seed.mode,
        &seed.track,
        &seed.artist,
        seed.tag.as_deref(),
        seed.limit,
        rated,
    )
}

/// Print a numbered round, or a hint when it is empty.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn print_round(out: &mut impl Write, round: &[Candidate]) -> Result<()> {
    if round.is_empty() {
        writeln!(out, "No recommendations available. Try a different track or artist.")?;
        return Ok(());
    }
    for (i, candidate) in round.iter().enumerate() {
        writeln!(
            out,
            "  {:>2}. {} - {} (score: {:.2})",
            i + 1,
            candidate.name,
            candidate.artist,
            candidate.score
        )?;
    }
    Ok(())
}

fn print_playlists(sessions: &SessionRegistry, out: &mut impl Write) -> Result<()> {
    let Some(session) = sessions.get(LOCAL_USER).filter(|s| !s.playlists.is_empty()) else {
        writeln!(out, "No rated tracks yet")?;
        return Ok(());
    };
    for (stars, tracks) in session.playlists.iter().rev() {
        for track in tracks {
            writeln!(out, "  [{stars}] {} - {}", track.name, track.artist)?;
        }
    }
    Ok(())
}

fn print_help(out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "Rate with `<n> <0-5>`; `more`, `top`, `playlists`, `reset`, `help`, `quit`"
    )?;
    Ok(())
}
