use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tabview::{Alignment, MultiViewHost, TableError, ViewConfig, ViewController, ViewId, logging};
use thiserror::Error;
use tracing::{info, warn};

const NAME: usize = 0;
const MARK: usize = 3;

/// Browse a directory as a table.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory to list, `~` and `$VARS` are expanded
    #[arg(default_value = ".")]
    dir: String,

    /// Write trace output to this file (level from RUST_LOG, default info)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Milliseconds to wait for a key before redrawing
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Widest a column gets before it is cut
    #[arg(long, default_value_t = 32)]
    max_width: usize,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("cannot expand path: {0}")]
    Expand(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Table(#[from] TableError),
}

struct Entry {
    name: String,
    kind: &'static str,
    size: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(()) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), AppError> {
    if let Some(path) = &args.log_file {
        logging::init(path)?;
    }

    let dir = shellexpand::full(&args.dir).map_err(|e| AppError::Expand(e.to_string()))?;
    let dir = PathBuf::from(dir.as_ref());
    let entries = list_dir(&dir)?;
    info!("Listing {} entries of {}", entries.len(), dir.display());

    let config = ViewConfig::default()
        .event_poll_time(args.poll_ms)
        .max_column_width(args.max_width);
    let mut host = MultiViewHost::new(config);
    let files = host.add_view(files_view(&entries)?);
    let summary = host.add_view(summary_view(&entries)?);

    let view = host.view_mut(files).ok_or(TableError::UnknownView(files.0))?;
    add_file_commands(view, dir, summary)?;
    let view = host
        .view_mut(summary)
        .ok_or(TableError::UnknownView(summary.0))?;
    view.register_command('v', "files", move |_, ctx| ctx.switch_to(files))?;

    host.set_active(files)?;
    host.run()?;
    Ok(())
}

fn list_dir(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        let kind = if meta.is_dir() {
            "dir"
        } else if meta.is_symlink() {
            "link"
        } else {
            "file"
        };
        entries.push(Entry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
            size: meta.len(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn files_view(entries: &[Entry]) -> Result<ViewController, TableError> {
    let mut view = ViewController::new();
    view.set_columns_and_rows(
        vec!["Name".into(), "Kind".into(), "Size".into(), "Mark".into()],
        entries
            .iter()
            .map(|e| {
                vec![
                    e.name.clone(),
                    e.kind.to_string(),
                    e.size.to_string(),
                    String::new(),
                ]
            })
            .collect(),
    );
    view.set_column_expansion(NAME, 1)?;
    view.set_column_alignment(2, Alignment::Right)?;
    view.set_column_alignment(MARK, Alignment::Center)?;
    Ok(view)
}

fn add_file_commands(
    view: &mut ViewController,
    dir: PathBuf,
    summary: ViewId,
) -> Result<(), TableError> {
    view.register_command('m', "mark", |row, ctx| {
        let mark = if ctx.cell(row, MARK).is_empty() { "*" } else { "" };
        if let Err(e) = ctx.set_cell(row, MARK, mark) {
            ctx.set_status(e.to_string());
        }
    })?;

    view.register_command('i', "info", move |row, ctx| {
        let path = dir.join(ctx.cell(row, NAME));
        match ctx.suspend(|| show_info(&path)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => ctx.set_status(format!("{}: {e}", path.display())),
            Err(e) => {
                warn!("Suspend failed: {e}");
                ctx.set_status(e.to_string());
            }
        }
    })?;

    view.register_command('v', "by extension", move |_, ctx| ctx.switch_to(summary))?;

    view.set_selection_callback(|row, ctx| {
        let status = format!("Selected {}", ctx.cell(row, NAME));
        ctx.set_status(status);
    });
    Ok(())
}

fn show_info(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    let mut out = io::stdout().lock();
    writeln!(out, "{}", path.display())?;
    writeln!(out, "  size:      {} bytes", meta.len())?;
    writeln!(out, "  read-only: {}", meta.permissions().readonly())?;
    if let Ok(modified) = meta.modified() {
        writeln!(out, "  modified:  {modified:?}")?;
    }
    write!(out, "\nPress Enter to return")?;
    out.flush()?;
    drop(out);
    io::stdin().read_line(&mut String::new())?;
    Ok(())
}

fn summary_view(entries: &[Entry]) -> Result<ViewController, TableError> {
    let mut by_ext: BTreeMap<String, (usize, u64)> = BTreeMap::new();
    for e in entries.iter().filter(|e| e.kind == "file") {
        let ext = Path::new(&e.name)
            .extension()
            .map(|x| x.to_string_lossy().into_owned())
            .unwrap_or_default();
        let slot = by_ext.entry(ext).or_default();
        slot.0 += 1;
        slot.1 += e.size;
    }

    let mut view = ViewController::new();
    view.set_columns_and_rows(
        vec!["Extension".into(), "Files".into(), "Bytes".into()],
        by_ext
            .into_iter()
            .map(|(ext, (count, bytes))| vec![ext, count.to_string(), bytes.to_string()])
            .collect(),
    );
    view.set_column_alignment(1, Alignment::Right)?;
    view.set_column_alignment(2, Alignment::Right)?;
    Ok(view)
}
