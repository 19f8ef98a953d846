//! Command-line host for the sticky-note core.
//!
//! # Responsibility
//! - Drive one `SessionController` command per invocation against a
//!   SQLite-backed store.
//! - Print panel and note state in a stable, line-oriented format.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use stickynote_core::db::open_db;
use stickynote_core::{
    default_log_level, init_logging, NoteColor, NoteConfig, NoteDraft, NoteId, Point, ResizeEdge,
    SessionController, SqliteKeyValueStore, SystemClock,
};
use std::path::PathBuf;

type Session<'conn> = SessionController<SqliteKeyValueStore<'conn>, SystemClock>;

/// Floating sticky notes kept in a local SQLite file
#[derive(Parser, Debug)]
#[command(name = "stickynote")]
#[command(version, about, long_about = None)]
struct Args {
    /// Note store database
    #[arg(long, value_name = "FILE", default_value = "stickynotes.db")]
    db: PathBuf,

    /// JSON config overriding the built-in defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// `NOTE` accepts a full note id or a 1-based row from `list`.
#[derive(Subcommand, Debug)]
enum Command {
    /// List notes in panel order
    List,
    /// Create a note
    New {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Delete a note
    Delete { note: String },
    /// Replace a note's title
    Title { note: String, text: String },
    /// Replace a note's body
    Body { note: String, text: String },
    /// Toggle collapse
    Collapse { note: String },
    /// Palette index or `#rrggbb`
    Color { note: String, color: String },
    /// Set opacity; clamped into the configured range
    Opacity { note: String, value: f64 },
    /// Drag a note to a new top-left position
    Move { note: String, x: f64, y: f64 },
    /// Drag one edge (left|right|bottom) by a pointer delta
    Resize {
        note: String,
        edge: ResizeEdge,
        #[arg(allow_hyphen_values = true)]
        dx: f64,
        #[arg(allow_hyphen_values = true)]
        dy: f64,
    },
    /// Move a note before (or after) another in the panel
    Reorder {
        dragged: String,
        target: String,
        #[arg(long)]
        after: bool,
    },
    /// Print the clipboard text of a note
    Copy { note: String },
    /// Hide every note
    CloseAll,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(log_dir) = &args.log_dir {
        let level = args.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(|err| anyhow!("{err}"))?;
    }

    let config = match &args.config {
        Some(path) => NoteConfig::load(path)
            .with_context(|| format!("loading config `{}`", path.display()))?,
        None => NoteConfig::default(),
    };

    let conn = open_db(&args.db).with_context(|| format!("opening `{}`", args.db.display()))?;
    let mut session = SessionController::new(
        SqliteKeyValueStore::new(&conn),
        config,
        SystemClock::new(),
    );
    session.load()?;
    session.start()?;

    let outcome = run(&mut session, args.command);
    let flushed = session.shutdown()?;
    outcome?;
    if !flushed {
        bail!(
            "failed to save notes: {}",
            session.last_persist_error().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn run(session: &mut Session<'_>, command: Command) -> Result<()> {
    match command {
        Command::List => print_list(session),
        Command::New { title, body } => {
            let id = session.new_note_with(NoteDraft {
                title,
                body,
                ..NoteDraft::default()
            })?;
            println!("{id}");
        }
        Command::Delete { note } => {
            let id = resolve(session, &note)?;
            if !session.delete_note(&id)? {
                bail!("no note `{note}`");
            }
        }
        Command::Title { note, text } => {
            let id = resolve(session, &note)?;
            session.set_title(&id, text)?;
        }
        Command::Body { note, text } => {
            let id = resolve(session, &note)?;
            session.set_body(&id, text)?;
        }
        Command::Collapse { note } => {
            let id = resolve(session, &note)?;
            let collapsed = session.toggle_collapse(&id)?;
            println!("collapsed={collapsed}");
        }
        Command::Color { note, color } => {
            let id = resolve(session, &note)?;
            let stored = session.set_color(&id, parse_color(&color)?)?;
            println!("{}", stored.resolve(session.config()));
        }
        Command::Opacity { note, value } => {
            let id = resolve(session, &note)?;
            println!("{}", session.set_opacity(&id, value)?);
        }
        Command::Move { note, x, y } => {
            let id = resolve(session, &note)?;
            let start = current_position(session, &id)?;
            session.begin_gesture(&id, None, start)?;
            session.update_gesture(Point::new(x, y))?;
            session.end_gesture()?;
        }
        Command::Resize { note, edge, dx, dy } => {
            let id = resolve(session, &note)?;
            let origin = Point::new(0.0, 0.0);
            session.begin_gesture(&id, Some(edge), origin)?;
            session.update_gesture(Point::new(dx, dy))?;
            session.end_gesture()?;
            if let Some(note) = session.note(&id) {
                println!("{}x{}", note.size.width, note.size.height);
            }
        }
        Command::Reorder {
            dragged,
            target,
            after,
        } => {
            let dragged = resolve(session, &dragged)?;
            let target = resolve(session, &target)?;
            session.reorder_panel(&dragged, &target, after)?;
            print_list(session);
        }
        Command::Copy { note } => {
            let id = resolve(session, &note)?;
            println!("{}", session.clipboard_text(&id)?);
        }
        Command::CloseAll => {
            let hidden = session.close_all()?;
            println!("hidden={hidden}");
        }
    }
    Ok(())
}

fn print_list(session: &Session<'_>) {
    let config = session.config();
    for (row, item) in session.panel_view().iter().enumerate() {
        let Some(note) = session.note(&item.id) else {
            continue;
        };
        let size = note.effective_size(config);
        println!(
            "{:>2} {} {:>7.1},{:<7.1} {:>5.0}x{:<5.0} {} {:.2}{} {}",
            row + 1,
            note.id,
            note.position.x,
            note.position.y,
            size.width,
            size.height,
            note.color.resolve(config),
            note.opacity,
            if note.collapsed { " collapsed" } else { "" },
            item.label
        );
    }
}

fn resolve(session: &Session<'_>, selector: &str) -> Result<NoteId> {
    if let Ok(row) = selector.parse::<usize>() {
        return row
            .checked_sub(1)
            .and_then(|index| session.panel_view().into_iter().nth(index))
            .map(|item| item.id)
            .ok_or_else(|| anyhow!("no note at row {row}"));
    }
    let id = NoteId::parse(selector).ok_or_else(|| anyhow!("empty note id"))?;
    if session.note(&id).is_none() {
        bail!("no note `{selector}`");
    }
    Ok(id)
}

fn current_position(session: &Session<'_>, id: &NoteId) -> Result<Point> {
    session
        .note(id)
        .map(|note| note.position)
        .ok_or_else(|| anyhow!("no note `{id}`"))
}

fn parse_color(raw: &str) -> Result<NoteColor> {
    let raw = raw.trim();
    if raw.starts_with('#') {
        return Ok(NoteColor::Custom(raw.to_string()));
    }
    raw.parse::<usize>()
        .map(NoteColor::Palette)
        .with_context(|| format!("`{raw}` is neither a palette index nor #rrggbb"))
}
