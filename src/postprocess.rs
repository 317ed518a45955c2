//! `pp`: merge a numbered run of still-life output files and re-chunk them
//! into a fresh set of output files with a fixed number of lines each.
//!
//! Grounded on `postprocess.c`'s `main`: concatenate `<in_template>` for
//! every index in `[first, last]` (skipping files that don't exist — a
//! search run may not have produced every bit count) and re-split the
//! combined lines across `<out_template>` files of at most
//! `lines_per_out_file` lines, numbering both templates the same way the
//! search's own `%02d`/`%04d`-style file names are built.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

const DEFAULT_LINES_PER_OUT_FILE: usize = 100_000;

/// Merge and re-chunk a run of still-life output files.
#[derive(Debug, clap::Args)]
pub struct PostprocessArgs {
    /// Input path template containing exactly one `{}`, replaced with each
    /// index from `first` to `last`.
    in_template: String,
    /// First input index (inclusive).
    first: i64,
    /// Last input index (inclusive).
    last: i64,
    /// Output path template containing exactly one `{}`, replaced with the
    /// output chunk number starting at 0.
    out_template: String,
    /// Maximum lines written to a single output file before rolling over to
    /// the next chunk.
    lines_per_out_file: Option<usize>,
}

fn substitute(template: &str, value: impl std::fmt::Display) -> PathBuf {
    PathBuf::from(template.replacen("{}", &value.to_string(), 1))
}

pub fn run(args: PostprocessArgs) -> Result<(), String> {
    if !args.in_template.contains("{}") {
        return Err("in_template must contain a '{}' placeholder".to_string());
    }
    if !args.out_template.contains("{}") {
        return Err("out_template must contain a '{}' placeholder".to_string());
    }
    if args.first > args.last {
        return Err("first must be <= last".to_string());
    }
    let lines_per_out_file = args.lines_per_out_file.unwrap_or(DEFAULT_LINES_PER_OUT_FILE);
    if lines_per_out_file == 0 {
        return Err("lines_per_out_file must be > 0".to_string());
    }

    let mut out_ix = 0u32;
    let mut out = open_output(&args.out_template, out_ix).map_err(|e| e.to_string())?;
    let mut lines_in_current_file = 0usize;
    let mut total_lines_written = 0u64;
    let mut files_merged = 0u64;

    for ix in args.first..=args.last {
        let in_path = substitute(&args.in_template, ix);
        let file = match File::open(&in_path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("skipping missing input file {}", in_path.display());
                continue;
            }
            Err(e) => return Err(format!("reading {}: {e}", in_path.display())),
        };
        files_merged += 1;

        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| format!("reading {}: {e}", in_path.display()))?;

            if lines_in_current_file >= lines_per_out_file {
                out.flush().map_err(|e| e.to_string())?;
                out_ix += 1;
                out = open_output(&args.out_template, out_ix).map_err(|e| e.to_string())?;
                lines_in_current_file = 0;
            }

            writeln!(out, "{line}").map_err(|e| e.to_string())?;
            lines_in_current_file += 1;
            total_lines_written += 1;
        }
    }

    out.flush().map_err(|e| e.to_string())?;
    log::info!("merged {files_merged} input files into {} output file(s), {total_lines_written} lines total", out_ix + 1);

    Ok(())
}

fn open_output(template: &str, ix: u32) -> std::io::Result<BufWriter<File>> {
    let path = substitute(template, ix);
    Ok(BufWriter::new(File::create(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitute_replaces_the_single_placeholder() {
        assert_eq!(substitute("out_{}.txt", 3), PathBuf::from("out_3.txt"));
    }

    #[test]
    fn rejects_templates_without_a_placeholder() {
        let args = PostprocessArgs {
            in_template: "fixed.txt".to_string(),
            first: 0,
            last: 1,
            out_template: "out_{}.txt".to_string(),
            lines_per_out_file: None,
        };
        assert!(run(args).is_err());
    }

    #[test]
    fn rejects_first_after_last() {
        let args = PostprocessArgs {
            in_template: "in_{}.txt".to_string(),
            first: 5,
            last: 1,
            out_template: "out_{}.txt".to_string(),
            lines_per_out_file: None,
        };
        assert!(run(args).is_err());
    }
}
