//! Operator-facing output for engine commands.
//!
//! Every printer writes either human-readable text or, with `--json`, one
//! pretty-printed JSON document on stdout. Logs go through `tracing`.

use std::fmt::Display;

use chrono::NaiveDate;
use pinfall_core::availability::ClubRosters;
use pinfall_core::fixtures::DueFixtures;
use pinfall_core::matchday::DaySummary;
use pinfall_core::orchestrator::{CalendarOutcome, OrchestratorError, PrepareOutcome, SeasonRun};
use pinfall_core::season::SeasonSnapshot;
use pinfall_core::standings::TableRow;
use pinfall_types::{Fixture, SeasonId};
use serde::Serialize;
use serde_json::json;

use crate::error::EngineError;

const RULE_WIDTH: usize = 56;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), EngineError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn section(title: &str) {
    println!();
    println!("{title}");
    println!("{}", "─".repeat(RULE_WIDTH));
}

fn key_value(label: &str, value: impl Display) {
    println!("{label:<16} {value}");
}

/// Result of `prepare`.
pub fn prepared(
    season_id: SeasonId,
    outcome: &PrepareOutcome,
    json: bool,
) -> Result<(), EngineError> {
    if json {
        return print_json(&json!({ "season_id": season_id, "prepared": outcome }));
    }
    section("Season prepared");
    key_value("Season", season_id);
    key_value("Fixtures", outcome.fixtures);
    key_value("Cups drawn", outcome.cups_drawn);
    Ok(())
}

/// Result of `build-calendar`.
pub fn calendar(
    season_id: SeasonId,
    outcome: &CalendarOutcome,
    json: bool,
) -> Result<(), EngineError> {
    if json {
        return print_json(&json!({ "season_id": season_id, "calendar": outcome }));
    }
    section("Calendar");
    key_value("Season", season_id);
    match outcome {
        CalendarOutcome::AlreadyExists => println!("Calendar already exists; nothing written."),
        CalendarOutcome::Built {
            league_days,
            cup_days,
            free_days,
            first,
            last,
        } => {
            key_value("League days", league_days);
            key_value("Cup days", cup_days);
            key_value("Free days", free_days);
            if let (Some(first), Some(last)) = (first, last) {
                key_value("Range", format!("{first} .. {last}"));
            }
        }
    }
    Ok(())
}

/// One day advanced, or the season already complete.
pub fn advanced(
    season_id: SeasonId,
    summary: Option<&DaySummary>,
    json: bool,
) -> Result<(), EngineError> {
    if json {
        return print_json(&json!({ "season_id": season_id, "day": summary }));
    }
    match summary {
        Some(summary) => day_summary(summary),
        None => println!("Season {season_id} is complete; nothing to advance."),
    }
    Ok(())
}

/// A season that failed to advance.
pub fn failure(season_id: SeasonId, err: &OrchestratorError) {
    tracing::error!(%season_id, error = %err, "season failed to advance");
    eprintln!("✗ season {season_id}: {err}");
}

fn day_summary(summary: &DaySummary) {
    section(&format!("{} {}", summary.date, summary.match_day));
    key_value("Simulated", summary.matches_simulated);
    if summary.byes_resolved > 0 {
        key_value("Byes", summary.byes_resolved);
    }
    if !summary.walkovers.is_empty() {
        key_value("Walkovers", summary.walkovers.len());
    }
    if summary.stand_ins > 0 {
        key_value("Stand-ins", summary.stand_ins);
    }
    if summary.stale_corrections > 0 {
        key_value("Flags fixed", summary.stale_corrections);
    }
    for cup in &summary.cups_advanced {
        key_value("Cup advanced", cup);
    }
    for cup in &summary.cups_finished {
        key_value("Cup finished", cup);
    }
    for skipped in &summary.skipped {
        println!("⚠ skipped {}: {:?}", skipped.fixture_id, skipped.reason);
    }
}

/// Result of `run`.
pub fn season_run(season_id: SeasonId, run: &SeasonRun, json: bool) -> Result<(), EngineError> {
    if json {
        return print_json(&json!({ "season_id": season_id, "run": run }));
    }
    for day in &run.days {
        day_summary(day);
    }
    section("Run finished");
    key_value("Season", season_id);
    key_value("Days", run.days.len());
    key_value("Phase", format!("{:?}", run.phase));
    Ok(())
}

/// Result of `status`.
pub fn status(snapshot: &SeasonSnapshot, json: bool) -> Result<(), EngineError> {
    let simulated = snapshot.calendar.iter().filter(|d| d.is_simulated).count();
    let played = snapshot.fixtures.iter().filter(|f| f.is_played).count();
    let next = snapshot.next_day();
    if json {
        return print_json(&json!({
            "season": snapshot.season,
            "phase": snapshot.phase(),
            "days": snapshot.calendar.len(),
            "days_simulated": simulated,
            "fixtures": snapshot.fixtures.len(),
            "fixtures_played": played,
            "next_day": next,
            "cups": snapshot.cups,
        }));
    }
    section(&format!("{} ({})", snapshot.season.name, snapshot.season.id));
    key_value("Phase", format!("{:?}", snapshot.phase()));
    key_value("Days", format!("{simulated} / {}", snapshot.calendar.len()));
    key_value("Fixtures", format!("{played} / {}", snapshot.fixtures.len()));
    if let Some(day) = next {
        key_value("Next day", format!("{} {}", day.date, day.match_day));
    }
    for cup in &snapshot.cups {
        let state = match (cup.is_active, cup.winner) {
            (_, Some(winner)) => format!("won by {winner}"),
            (true, None) => format!("round {} of {}", cup.current_round_number, cup.total_rounds),
            (false, None) => "not drawn".to_owned(),
        };
        key_value(&cup.name, state);
    }
    Ok(())
}

fn fixture_line(fixture: &Fixture) -> String {
    let away = fixture
        .away_team_id
        .map_or_else(|| "bye".to_owned(), |id| id.to_string());
    format!(
        "[{}] {} vs {} (round {})",
        fixture.bracket_slot, fixture.home_team_id, away, fixture.round
    )
}

/// Result of `fixtures`.
pub fn due_fixtures(date: NaiveDate, due: &DueFixtures, json: bool) -> Result<(), EngineError> {
    if json {
        return print_json(&json!({
            "date": date,
            "match_day": due.match_day,
            "league": due.league,
            "cup": due.cup,
        }));
    }
    section(&format!("{date} {}", due.match_day));
    if due.is_empty() {
        println!("No fixtures due.");
    }
    for fixture in due.league.iter().chain(&due.cup) {
        println!("{}", fixture_line(fixture));
    }
    Ok(())
}

/// Result of `availability`.
pub fn rosters(date: NaiveDate, rosters: &ClubRosters, json: bool) -> Result<(), EngineError> {
    if json {
        let teams: Vec<_> = rosters
            .rosters
            .iter()
            .map(|r| {
                let slots: Vec<_> = r
                    .slots
                    .iter()
                    .map(|s| {
                        json!({
                            "slot": s.slot,
                            "player_id": s.player_id,
                            "is_stand_in": s.is_stand_in,
                            "from_override": s.from_override,
                        })
                    })
                    .collect();
                json!({
                    "team_id": r.team_id,
                    "fixture_id": r.fixture_id,
                    "slots": slots,
                    "shortfall": r.shortfall,
                })
            })
            .collect();
        return print_json(&json!({
            "date": date,
            "club_id": rosters.club_id,
            "match_day": rosters.match_day,
            "rosters": teams,
            "unused": rosters.unused,
            "stale_corrections": rosters.corrections.len(),
            "rejected_overrides": rosters.rejected.len(),
        }));
    }
    section(&format!("Club {} on {date} {}", rosters.club_id, rosters.match_day));
    if rosters.rosters.is_empty() {
        println!("The club has no fixture on this date.");
    }
    for roster in &rosters.rosters {
        println!("Team {} (fixture {})", roster.team_id, roster.fixture_id);
        for slot in &roster.slots {
            let mark = if slot.is_stand_in { " (stand-in)" } else { "" };
            println!("  {:>2}. {}{mark}", slot.slot, slot.player_id);
        }
        if roster.shortfall > 0 {
            println!("  ⚠ {} slot(s) unfilled", roster.shortfall);
        }
    }
    key_value("Unused", rosters.unused.len());
    for rejected in &rosters.rejected {
        println!("⚠ override dropped: {rejected:?}");
    }
    Ok(())
}

/// Result of `table`.
pub fn table(rows: &[TableRow], json: bool) -> Result<(), EngineError> {
    if json {
        return print_json(rows);
    }
    section("Table");
    println!(
        "{:>3}  {:<36}  {:>2} {:>2} {:>2} {:>2}  {:>6}  {:>5}  zone",
        "#", "team", "P", "W", "D", "L", "diff", "pts"
    );
    for row in rows {
        println!(
            "{:>3}  {:<36}  {:>2} {:>2} {:>2} {:>2}  {:>6}  {:>5}  {:?}",
            row.position,
            row.team_id.to_string(),
            row.played,
            row.won,
            row.drawn,
            row.lost,
            row.pin_difference(),
            row.points,
            row.zone
        );
    }
    Ok(())
}
