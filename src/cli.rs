// ============================================================================
// GridPaint CLI - headless editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   gridpaint --new 32 --script sprite.rhai --output sprite.gpx
//   gridpaint --new --preview                          (default_grid_size)
//   gridpaint --history-limit 200 --save-settings
//   gridpaint -i sprite.gpx --preview                  (ASCII view of frame 0)
//   gridpaint -i "art/*.gpx" --script outline.rhai --output-dir out/
//   gridpaint -i walk.gpx --frame 2 --preview --verbose
//
// Everything runs synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::{Color, Document};
use crate::compositor::{checker_shade_sized, composite_frame};
use crate::ops::scripting::execute_script;
use crate::project::Project;
use crate::settings::EngineSettings;

/// Extension of GridPaint project files.
pub const PROJECT_EXTENSION: &str = "gpx";

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// GridPaint headless pixel-art editor.
///
/// Create or open .gpx projects, run Rhai scripts against them and save the
/// result, without a GUI.
#[derive(Parser, Debug)]
#[command(
    name = "gridpaint",
    about = "GridPaint headless pixel-art editor",
    long_about = "Run Rhai scripts on GridPaint projects and preview them in the\n\
                  terminal without opening an editor.\n\n\
                  Example:\n  \
                  gridpaint --new 32 --script sprite.rhai --output sprite.gpx\n  \
                  gridpaint -i \"art/*.gpx\" --script outline.rhai --output-dir out/"
)]
pub struct CliArgs {
    /// Input project file(s). Glob patterns accepted (e.g. "*.gpx").
    #[arg(
        short,
        long,
        num_args = 1..,
        required_unless_present_any = ["new", "save_settings"],
        conflicts_with = "new"
    )]
    pub input: Vec<String>,

    /// Start from a new square document instead of an input. Without a
    /// size the `default_grid_size` setting is used.
    #[arg(long, value_name = "SIZE", num_args = 0..=1)]
    pub new: Option<Option<usize>>,

    /// Fill color for --new, as hex ("#rrggbb"). Transparent when omitted.
    #[arg(long, value_name = "HEX", requires = "new")]
    pub fill: Option<String>,

    /// Rhai script file to execute on each project.
    #[arg(short, long, value_name = "SCRIPT.rhai")]
    pub script: Option<PathBuf>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Frame to make active before the script runs and to preview.
    #[arg(long, value_name = "INDEX")]
    pub frame: Option<usize>,

    /// Print the composited frame as text after processing.
    #[arg(long)]
    pub preview: bool,

    /// Override the number of undo steps kept.
    #[arg(long, value_name = "STEPS")]
    pub history_limit: Option<usize>,

    /// Store the effective settings (including --history-limit) as the
    /// new defaults.
    #[arg(long)]
    pub save_settings: bool,

    /// Print script console output and per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the log to a file. Without a path the session log in the
    /// platform data directory is used.
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub log_file: Option<Option<PathBuf>>,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let mut settings = EngineSettings::load();
    if let Some(limit) = args.history_limit {
        settings.max_undo_steps = limit.max(1);
    }

    if args.save_settings {
        match settings.save() {
            Ok(path) => println!("Settings saved to {}", path.display()),
            Err(e) => {
                eprintln!("error: could not save settings: {}", e);
                return ExitCode::FAILURE;
            }
        }
        if args.new.is_none() && args.input.is_empty() {
            return ExitCode::SUCCESS;
        }
    }

    // Load script source if provided
    let script_source: Option<String> = match &args.script {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(src) => Some(src),
            Err(e) => {
                eprintln!("error: could not read script '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    // Create output directory if specified
    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let opts = RunOptions {
        script: script_source.as_deref(),
        frame: args.frame,
        preview: args.preview,
        verbose: args.verbose,
        settings: &settings,
    };

    // -- New document ----------------------------------------------------
    if let Some(size) = args.new {
        let size = size.unwrap_or(settings.default_grid_size);
        let fill = match args.fill.as_deref().map(Color::from_hex).transpose() {
            Ok(fill) => fill.unwrap_or(settings.default_fill),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        let output = args
            .output
            .clone()
            .or_else(|| args.output_dir.as_ref().map(|d| d.join(format!("untitled.{}", PROJECT_EXTENSION))));
        let started = Instant::now();
        let result = Project::new_untitled(1, size, fill, &settings)
            .map_err(|e| format!("could not create document: {}", e))
            .and_then(|project| process(project, output.as_deref(), &opts));
        return report(result, output.as_deref(), started, args.verbose);
    }

    // -- Existing projects ----------------------------------------------
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();
        // Only write when something could have changed
        let output_path = if script_source.is_some() || args.output.is_some() || args.output_dir.is_some() {
            match build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref()) {
                Some(p) => Some(p),
                None => {
                    eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
                    any_failure = true;
                    continue;
                }
            }
        } else {
            None
        };

        let result = Project::open(input_path, &settings)
            .map_err(|e| format!("load failed: {}", e))
            .and_then(|project| process(project, output_path.as_deref(), &opts));
        if report(result, output_path.as_deref(), file_start, args.verbose || multi) == ExitCode::FAILURE {
            any_failure = true;
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn report(result: Result<(), String>, output: Option<&Path>, started: Instant, verbose: bool) -> ExitCode {
    match result {
        Ok(()) => {
            if verbose && let Some(out) = output {
                println!(
                    "  → {} ({:.0}ms)",
                    out.display(),
                    started.elapsed().as_secs_f64() * 1000.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("  error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Per-project processing pipeline
// ============================================================================

struct RunOptions<'a> {
    script: Option<&'a str>,
    frame: Option<usize>,
    preview: bool,
    verbose: bool,
    settings: &'a EngineSettings,
}

fn process(mut project: Project, output: Option<&Path>, opts: &RunOptions<'_>) -> Result<(), String> {
    // -- Step 1: Select frame --------------------------------------------
    if let Some(frame) = opts.frame {
        project
            .document
            .select_frame(frame)
            .map_err(|e| format!("--frame: {}", e))?;
    }

    // -- Step 2: Apply script (optional) ---------------------------------
    if let Some(src) = opts.script {
        let outcome = execute_script(src, &mut project, opts.settings.script_max_operations);
        if opts.verbose {
            for line in &outcome.console_output {
                println!("  [script] {}", line);
            }
            println!("  script ran in {}ms", outcome.elapsed_ms);
        }
        outcome.result.map_err(|e| format!("script error: {}", e))?;
    }

    // -- Step 3: Preview -------------------------------------------------
    if opts.preview {
        let frame = project.document.current_frame_index();
        print!("{}", render_preview(&project.document, frame, opts.settings.checker_size));
    }

    // -- Step 4: Save ----------------------------------------------------
    if let Some(out) = output {
        project
            .save_as(out)
            .map_err(|e| format!("save failed: {}", e))?;
    }

    Ok(())
}

/// Text rendering of one composited frame: `##` for painted cells, the
/// checkerboard (`::` / `  `) where nothing is painted.
pub fn render_preview(doc: &Document, frame: usize, checker_size: usize) -> String {
    let Ok(frame_ref) = doc.frame(frame) else {
        return String::new();
    };
    let size = doc.grid_size();
    let cells = composite_frame(frame_ref);
    let mut out = String::with_capacity(size * (size * 2 + 1));
    for (y, row) in cells.chunks(size).enumerate() {
        for (x, color) in row.iter().enumerate() {
            let glyph = match color {
                Color::Rgb(_) => "##",
                Color::Transparent if checker_shade_sized(x, y, checker_size) => "::",
                Color::Transparent => "  ",
            };
            out.push_str(glyph);
        }
        out.push('\n');
    }
    out
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand every pattern in order, dropping paths already seen.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();
    for path in patterns.iter().flat_map(|p| expand_pattern(p)) {
        if !result.contains(&path) {
            result.push(path);
        }
    }
    result
}

/// An existing path is taken as given. Anything else is a glob, of which
/// only `.gpx` files are kept.
fn expand_pattern(pattern: &str) -> Vec<PathBuf> {
    let literal = PathBuf::from(pattern);
    if literal.exists() {
        return vec![literal];
    }
    let entries = match glob::glob(pattern) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("warning: invalid glob '{}': {}", pattern, e);
            return Vec::new();
        }
    };
    let mut matches: Vec<PathBuf> = entries.flatten().filter(|p| is_project_file(p)).collect();
    matches.sort();
    if matches.is_empty() {
        eprintln!("warning: pattern '{}' matched no .{} files.", pattern, PROJECT_EXTENSION);
    }
    matches
}

fn is_project_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(PROJECT_EXTENSION))
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: next to the input with `_out` appended to the stem
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    // Explicit output path
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, PROJECT_EXTENSION)));
    }

    // Never overwrite the input silently
    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}_out.{}", stem, PROJECT_EXTENSION)))
}
