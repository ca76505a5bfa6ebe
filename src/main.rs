use crate::leg::{FlightLeg, LegStatus, MismatchSeverity};
use crate::time::format_tat;
use crate::trip::trip::{ScheduleStatus, Trip};
use chrono::NaiveDate;
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tabled::Tabled;
use tabled::settings::Style;

mod leg;
mod logpage;
mod time;
mod trip;

#[derive(Parser)]
struct Args {
    /// Path to the JSON logbook file
    #[arg(short, long, value_name = "FILE", default_value = "data/default.json")]
    logbook: PathBuf,
}

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // only the command word completes; arguments are leg numbers, times
        // and TAT strings with nothing useful to offer
        if line[..pos].contains(' ') {
            return Ok((pos, Vec::new()));
        }

        let word = &line[..pos];
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(word))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: format!("{} ", cmd),
            })
            .collect();

        Ok((0, candidates))
    }
}

fn paginate(content: String) {
    let spawned = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        // Fallback to 'more' if 'less' isn't available
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn());

    let Ok(mut pager) = spawned else {
        // no pager on this box, dump straight to the terminal
        println!("{}", content);
        return;
    };

    if let Some(mut stdin) = pager.stdin.take() {
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            // Broken pipe is common if the user quits the pager early
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                eprintln!("Error writing to pager: {}", e);
            }
        }
    }

    // Wait for the user to close the pager before returning to the ">> " prompt
    let _ = pager.wait();
}

#[derive(Tabled)]
struct TripRow {
    #[tabled(rename = "#")]
    index: usize,
    trip: String,
    date: String,
    aircraft: String,
    legs: usize,
    pages: usize,
    status: String,
}

#[derive(Tabled)]
struct LegRow {
    #[tabled(rename = "#")]
    index: usize,
    status: String,
    from: String,
    to: String,
    out: String,
    off: String,
    on: String,
    #[tabled(rename = "in")]
    in_: String,
    block: String,
}

#[derive(Tabled)]
struct PageRow {
    page: u32,
    #[tabled(rename = "tat start")]
    tat_start: String,
    legs: usize,
    #[tabled(rename = "flight")]
    flight: String,
    #[tabled(rename = "tat final")]
    tat_final: String,
    note: String,
}

fn status_cell(status: LegStatus) -> String {
    match status {
        LegStatus::Standby => "standby".dimmed().to_string(),
        LegStatus::Active => "active".yellow().to_string(),
        LegStatus::Completed => "completed".green().to_string(),
        LegStatus::Skipped => "skipped".red().to_string(),
    }
}

fn time_cell(raw: &str) -> String {
    if raw.trim().is_empty() {
        "-".to_string()
    } else {
        raw.trim().to_string()
    }
}

fn leg_rows(trip: &Trip) -> Vec<LegRow> {
    trip.legs()
        .enumerate()
        .map(|(index, leg)| LegRow {
            index,
            status: status_cell(leg.status),
            from: leg.departure.clone(),
            to: leg.arrival.clone(),
            out: time_cell(&leg.out_time),
            off: time_cell(&leg.off_time),
            on: time_cell(&leg.on_time),
            in_: time_cell(&leg.in_time),
            block: leg
                .block_minutes()
                .map(format_tat)
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = tabled::Table::new(&rows);
    table.with(Style::rounded());
    table.with(tabled::settings::Alignment::left());
    if rows.len() > 20 {
        paginate(table.to_string());
    } else {
        println!("{}", table);
    }
}

fn print_duty(trip: &Trip) {
    match trip.effective_duty_start() {
        Some(start) => println!("Duty start: {}", start),
        None => println!("Duty start: {}", "pending".dimmed()),
    }
    match trip.effective_duty_end() {
        Some(end) => println!("Duty end:   {}", end),
        None => println!("Duty end:   {}", "pending".dimmed()),
    }
    if trip.is_overnight() {
        println!("Overnight trip; duty end recomputed from leg times.");
    }
    println!("Duty time:  {:.2}h", trip.total_duty_hours());
}

fn print_sched(trip: &Trip) {
    println!("Block flown:     {}", format_tat(trip.total_block_minutes()));
    println!("Flight flown:    {}", format_tat(trip.total_flight_minutes()));
    match trip.total_scheduled_block_minutes() {
        Some(scheduled) => println!("Block scheduled: {}", format_tat(scheduled)),
        None => println!("Block scheduled: {}", "no roster data".dimmed()),
    }
    if let Some(variance) = trip.total_block_time_variance_minutes() {
        println!("Block variance:  {:+}m", variance);
    }
    match trip.schedule_status_info() {
        Some((status, text)) => {
            let colored_text = match status {
                ScheduleStatus::OnSchedule => text.green(),
                ScheduleStatus::Ahead => text.cyan(),
                ScheduleStatus::Behind => text.red(),
            };
            println!("Schedule:        {}", colored_text);
        }
        None => println!("Schedule:        {}", "no completed legs with roster times".dimmed()),
    }
    if trip.has_block_time_mismatch() {
        let severity = match trip.worst_mismatch_severity() {
            MismatchSeverity::None => "none".normal(),
            MismatchSeverity::Minor => "minor".yellow(),
            MismatchSeverity::Moderate => "moderate".yellow(),
            MismatchSeverity::Significant => "significant".red(),
        };
        println!("Worst mismatch:  {}", severity);
    }
}

fn set_leg_time(trip: &mut Trip, index: usize, field: &str, value: &str) {
    let Some(leg) = trip.leg_mut(index) else {
        println!("No leg at index {}.", index);
        return;
    };
    match field {
        "out" => leg.out_time = value.to_string(),
        "off" => leg.off_time = value.to_string(),
        "on" => leg.on_time = value.to_string(),
        "in" => leg.in_time = value.to_string(),
        _ => unreachable!(),
    }
    trip.check_and_advance_leg(index);
    match (trip.active_leg_index(), trip.active_leg()) {
        (Some(active), Some(leg)) => println!(
            "Recorded. Active leg is now #{} ({} -> {}).",
            active, leg.departure, leg.arrival
        ),
        _ if trip.has_upcoming_legs() => println!("Recorded. No active leg."),
        _ => println!("Recorded. No legs remain; trip may be ready to close."),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let path = args.logbook.to_str().unwrap_or("data/default.json");
    let mut trips = Trip::load_all(path)?;
    println!("Logbook open. Loaded {} trips from {}", trips.len(), args.logbook.display());

    let mut current: usize = 0;

    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: vec![
            "trips".to_string(),
            "open".to_string(),
            "ls".to_string(),
            "pages".to_string(),
            "add".to_string(),
            "out".to_string(),
            "off".to_string(),
            "on".to_string(),
            "in".to_string(),
            "skip".to_string(),
            "status".to_string(),
            "newtrip".to_string(),
            "break".to_string(),
            "init".to_string(),
            "duty".to_string(),
            "sched".to_string(),
            "save".to_string(),
            "help".to_string(),
            "exit".to_string(),
        ],
    };

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(trimmed)?;

                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                match parts[0] {
                    "trips" => {
                        let rows: Vec<TripRow> = trips
                            .iter()
                            .enumerate()
                            .map(|(index, t)| TripRow {
                                index,
                                trip: t.trip_number.clone(),
                                date: t.date.to_string(),
                                aircraft: t.aircraft.clone(),
                                legs: t.leg_count(),
                                pages: t.logpages().len(),
                                status: format!("{:?}", t.status).to_lowercase(),
                            })
                            .collect();
                        print_table(rows);
                    }
                    "open" => {
                        match parts.get(1).and_then(|s| s.parse::<usize>().ok()) {
                            Some(idx) if idx < trips.len() => {
                                current = idx;
                                println!("Opened trip {} ({}).", idx, trips[idx].trip_number);
                            }
                            _ => println!("Usage: open <trip_index>"),
                        }
                    }
                    "ls" => match trips.get(current) {
                        Some(trip) if trip.leg_count() > 0 => {
                            print_table(leg_rows(trip));
                            println!(
                                "{} completed, {} skipped, {} remaining ({:.0}%)",
                                trip.completed_leg_count(),
                                trip.skipped_leg_count(),
                                trip.remaining_leg_count(),
                                trip.leg_progress() * 100.0
                            );
                        }
                        Some(_) => println!("No legs on this trip yet."),
                        None => println!("No trip open."),
                    },
                    "pages" => match trips.get(current) {
                        Some(trip) => {
                            let rows: Vec<PageRow> = trip
                                .logpages()
                                .iter()
                                .map(|p| PageRow {
                                    page: p.page_number,
                                    tat_start: p.tat_start.clone(),
                                    legs: p.legs.len(),
                                    flight: format_tat(p.flight_minutes()),
                                    tat_final: p
                                        .tat_final()
                                        .unwrap_or_else(|| "-".to_string()),
                                    note: p.mechanical_note.clone().unwrap_or_default(),
                                })
                                .collect();
                            print_table(rows);
                        }
                        None => println!("No trip open."),
                    },
                    "add" => {
                        if let (Some(trip), Some(from), Some(to)) =
                            (trips.get_mut(current), parts.get(1), parts.get(2))
                        {
                            trip.append_leg(FlightLeg::new(from, to));
                            println!("Leg {} -> {} appended to page {}.", from, to,
                                trip.active_logpage().map(|p| p.page_number).unwrap_or(1));
                        } else {
                            println!("Usage: add <from> <to>");
                        }
                    }
                    "out" | "off" | "on" | "in" => {
                        if let (Some(trip), Some(idx), Some(value)) = (
                            trips.get_mut(current),
                            parts.get(1).and_then(|s| s.parse::<usize>().ok()),
                            parts.get(2),
                        ) {
                            set_leg_time(trip, idx, parts[0], value);
                        } else {
                            println!("Usage: {} <leg_index> <HHmm>", parts[0]);
                        }
                    }
                    "skip" => {
                        if let (Some(trip), Some(idx)) = (
                            trips.get_mut(current),
                            parts.get(1).and_then(|s| s.parse::<usize>().ok()),
                        ) {
                            trip.skip_leg(idx);
                            match trip.next_standby_leg() {
                                Some(leg) => println!(
                                    "Leg {} skipped. Next standby: {} -> {}.",
                                    idx, leg.departure, leg.arrival
                                ),
                                None => println!("Leg {} skipped. No standby legs remain.", idx),
                            }
                        } else {
                            println!("Usage: skip <leg_index>");
                        }
                    }
                    "status" => {
                        let parsed = (
                            trips.get_mut(current),
                            parts.get(1).and_then(|s| s.parse::<usize>().ok()),
                            parts.get(2).and_then(|s| match *s {
                                "standby" => Some(LegStatus::Standby),
                                "active" => Some(LegStatus::Active),
                                "completed" => Some(LegStatus::Completed),
                                "skipped" => Some(LegStatus::Skipped),
                                _ => None,
                            }),
                        );
                        if let (Some(trip), Some(idx), Some(status)) = parsed {
                            trip.update_leg_status(idx, status);
                            println!("Leg {} forced to {}.", idx, status);
                        } else {
                            println!("Usage: status <leg_index> <standby|active|completed|skipped>");
                        }
                    }
                    "newtrip" => {
                        let date = parts.get(3).and_then(|s| s.parse::<NaiveDate>().ok());
                        if let (Some(number), Some(aircraft), Some(date), Some(tat)) =
                            (parts.get(1), parts.get(2), date, parts.get(4))
                        {
                            let id = format!("TRIP-{}-{}", date.format("%Y%m%d"), number);
                            trips.push(Trip::new(&id, number, aircraft, date, tat));
                            current = trips.len() - 1;
                            println!("Trip {} created and opened.", number);
                        } else {
                            println!("Usage: newtrip <number> <aircraft> <YYYY-MM-DD> <H+MM>");
                        }
                    }
                    "break" => {
                        if let (Some(trip), Some(tat)) = (trips.get_mut(current), parts.get(1)) {
                            let note = if parts.len() > 2 {
                                Some(parts[2..].join(" "))
                            } else {
                                None
                            };
                            trip.break_logpage(tat, note.as_deref());
                            println!(
                                "Logpage {} opened with TAT {}.",
                                trip.logpages().len(),
                                tat
                            );
                        } else {
                            println!("Usage: break <H+MM> [mechanical note]");
                        }
                    }
                    "init" => match trips.get_mut(current) {
                        Some(trip) => {
                            trip.initialize_leg_statuses();
                            println!("Leg statuses initialized.");
                        }
                        None => println!("No trip open."),
                    },
                    "duty" => match trips.get(current) {
                        Some(trip) => print_duty(trip),
                        None => println!("No trip open."),
                    },
                    "sched" => match trips.get(current) {
                        Some(trip) => print_sched(trip),
                        None => println!("No trip open."),
                    },
                    "save" => {
                        let target = parts.get(1).copied().unwrap_or(path);
                        match Trip::save_all(target, &trips) {
                            Ok(()) => println!("Saved {} trips to {}", trips.len(), target),
                            Err(e) => println!("Save failed: {}", e),
                        }
                    }
                    "help" | "?" => {
                        println!("\nAvailable Commands:");
                        println!("  trips               - List trips in the logbook");
                        println!("  open <n>            - Select trip <n> for the commands below");
                        println!("  ls                  - List the open trip's legs in flat order");
                        println!("  pages               - List logpages with TAT start/final");
                        println!("  add <from> <to>     - Append a leg to the current logpage");
                        println!("  out|off|on|in <n> <HHmm> - Record a time on leg <n> and advance if complete");
                        println!("  skip <n>            - Mark leg <n> skipped (schedule change)");
                        println!("  status <n> <s>      - Force leg <n> to a status (escape hatch)");
                        println!("  newtrip <no> <ac> <date> <H+MM> - Create a trip with one empty logpage");
                        println!("  break <H+MM> [note] - Close the logpage and open a new one at the given TAT");
                        println!("  init                - Set first leg active, the rest standby");
                        println!("  duty                - Show duty start/end and total duty hours");
                        println!("  sched               - Show block totals and schedule variance");
                        println!("  save [file]         - Write the logbook back to disk");
                        println!("  help / ?            - Show this help menu");
                        println!("  exit / quit         - Exit\n");
                    }
                    "exit" | "quit" => break,
                    _ => println!("Unknown command: {}", parts[0]),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}
