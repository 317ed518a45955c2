//! `stillcount`: enumerate Game of Life still lifes by cell count.
//!
//! Grounded on the teacher's `tui/src/args.rs` — a `clap::Parser` with a
//! `Subcommand` enum and a `parse_and_validate` wrapper that turns
//! `Config::check()` failures into a `clap` usage error — adapted to this
//! crate's two CLI entry points (`stillcount.c`'s `main`/`main_do` and
//! `postprocess.c`'s `main`) instead of the teacher's New/Load pair.

mod perf_timer;
mod postprocess;
mod visualization;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use perf_timer::PerfTimer;
use std::fs::File;
use std::io::{BufWriter, Write};
use stillcount_lib::{Classification, Command as SearchCommand, GoLGrid, Rect, SearchConfig, SearchError, SearchState, SolutionSink};
use visualization::GridVisualization;

/// A backtracking still-life enumerator for Conway's Game of Life.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Search for still lifes within a cell-count range.
    Search(SearchArgs),
    /// Merge and re-chunk a run of still-life output files.
    Postprocess(postprocess::PostprocessArgs),
}

/// Search for still lifes within a cell-count range.
#[derive(Debug, clap::Args)]
struct SearchArgs {
    /// `w` to write one LifeHistory file per bit count, `c` to count only.
    mode: SearchCommand,
    /// Smallest cell count to report.
    min_on_cells: i32,
    /// Largest cell count to report.
    max_on_cells: i32,
    /// Restrict the search to one shard of the precomputed 100-way split
    /// (requires `min_on_cells >= 19`).
    subset: Option<u32>,
    /// Open the diagnostic visualization window while searching. A no-op
    /// stub in this build (see `visualization`).
    #[arg(long)]
    visualize: bool,
}

/// Writes each found still life to `<on_cnt>_bits_<strict|pseudo>.txt` in
/// LifeHistory format, mirroring `stillcount.c`'s `open_files`/
/// `write_result` naming.
struct FileSink {
    strict: Vec<Option<BufWriter<File>>>,
    pseudo: Vec<Option<BufWriter<File>>>,
}

impl FileSink {
    fn create(max_on_cells: i32) -> std::io::Result<Self> {
        let mut strict = Vec::new();
        let mut pseudo = Vec::new();
        for n in 0..=max_on_cells {
            strict.push(Some(BufWriter::new(File::create(format!("{n:02}_bits_strict.txt"))?)));
            pseudo.push(Some(BufWriter::new(File::create(format!("{n:02}_bits_pseudo.txt"))?)));
        }
        Ok(Self { strict, pseudo })
    }
}

impl SolutionSink for FileSink {
    fn record(&mut self, on_cells: &GoLGrid, on_cnt: i32, classification: Classification) {
        let bb = on_cells.get_bounding_box();
        let Some(body) = stillcount_lib::format_life_history_body(bb, |x, y| on_cells.get_cell(x, y), 1024) else {
            log::warn!("still life at {on_cnt} cells exceeded the output line cap, skipping");
            return;
        };

        let writer = match classification {
            Classification::Strict => &mut self.strict[on_cnt as usize],
            Classification::Pseudo => &mut self.pseudo[on_cnt as usize],
        };
        if let Some(w) = writer {
            if let Err(e) = writeln!(w, "x = {}, y = {}, rule = LifeHistory\n{body}", bb.width, bb.height) {
                log::error!("failed writing still life: {e}");
            }
        }
    }
}

/// Confirm the build's word-size assumptions, mirroring `stillcount.c`'s
/// `main` calling `verify_cpu_type` before `main_do`. This crate has no
/// hand-written SIMD dispatch, so the check degenerates to confirming
/// `usize`/`u64` are both 64 bits wide.
fn verify_cpu_type() -> Result<(), String> {
    if std::mem::size_of::<usize>() == 8 && std::mem::size_of::<u64>() == 8 {
        Ok(())
    } else {
        Err(SearchError::CpuFeatureMismatch.to_string())
    }
}

fn run_search(args: SearchArgs) -> Result<(), String> {
    verify_cpu_type()?;
    let mut config = SearchConfig::new(args.mode, args.min_on_cells, args.max_on_cells);
    if let Some(subset) = args.subset {
        config = config.with_selected_subset(subset);
    }
    let config = config.check().map_err(|e| e.to_string())?;

    let mut vis = GridVisualization::default();
    if args.visualize {
        vis.create("stillcount", &Rect::make(0, 0, 64, 64), 4);
    }

    let mut timer = PerfTimer::new();
    timer.set_name(0, "search");
    timer.start(0);

    let mut state = SearchState::new(&config);
    match config.command {
        SearchCommand::Count => state.run(&mut ()),
        SearchCommand::Write => {
            let mut sink = FileSink::create(config.max_on_cells).map_err(|e| e.to_string())?;
            state.run(&mut sink);
        }
    }

    timer.stop(0);
    timer.report();
    if args.visualize {
        vis.update();
        vis.close();
    }

    for n in config.min_on_cells..=config.max_on_cells {
        log::info!(
            "{n} bits: {} strict, {} pseudo",
            state.strict_count(n),
            state.pseudo_count(n)
        );
    }
    log::info!(
        "rejected: {} not stable, {} not canonical, {} not connected ({} ops)",
        state.not_stable_count(),
        state.not_canonical_count(),
        state.not_connected_count(),
        state.op_count()
    );

    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Cmd::Search(args) => run_search(args),
        Cmd::Postprocess(args) => postprocess::run(args),
    };

    if let Err(e) = result {
        Cli::command().error(ErrorKind::ValueValidation, e).exit();
    }
}
