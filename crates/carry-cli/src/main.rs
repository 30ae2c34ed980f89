use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use carry_config::{discover_config_path, init_tracing, CarryConfig};
use carry_core::{apply_workspace_edit, FileId, LineIndex};
use carry_refactor::{
    analyze_method, generate_preview, move_method_with, Conflict, FieldVisibility,
    MoveMethodParams, MoveReport, StayReason,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

mod workspace;

use workspace::JavaWorkspace;

#[derive(Parser)]
#[command(name = "carry", version, about = "Move methods between Java types")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Move a method, with the helpers only it uses, to another type
    MoveMethod(MoveMethodArgs),
    /// Show which methods would move along with a method and which would stay
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
struct MoveMethodArgs {
    /// Project directory (every `.java` file below it is loaded)
    path: PathBuf,
    /// Type declaring the method (simple or qualified name)
    #[arg(long)]
    from: String,
    /// Method name, or `name(Type, ...)` to pick an overload
    #[arg(long)]
    method: String,
    /// Type receiving the method
    #[arg(long)]
    to: String,
    /// Modifiers of injected fields: private-final, private, public-final or public
    #[arg(long)]
    field_visibility: Option<FieldVisibility>,
    /// Print unified diffs instead of writing files
    #[arg(long)]
    dry_run: bool,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
    /// Exit with status 1, without writing, when the move reports conflicts
    #[arg(long)]
    deny_conflicts: bool,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Project directory (every `.java` file below it is loaded)
    path: PathBuf,
    /// Type declaring the method (simple or qualified name)
    #[arg(long)]
    from: String,
    /// Method name, or `name(Type, ...)` to pick an overload
    #[arg(long)]
    method: String,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::MoveMethod(args) => move_method_command(args),
        Command::Analyze(args) => analyze_command(args),
    }
}

fn load_config(root: &Path) -> Result<CarryConfig> {
    let Some(path) = discover_config_path(root) else {
        let config = CarryConfig::default();
        init_tracing(&config.logging);
        return Ok(config);
    };
    let (config, unknown_keys) = CarryConfig::load_from_path_with_unknown_keys(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    init_tracing(&config.logging);
    for key in unknown_keys {
        tracing::warn!(
            target: "carry.cli",
            path = %path.display(),
            key = %key,
            "unknown config key"
        );
    }
    Ok(config)
}

#[derive(Serialize)]
struct MoveOutput<'a> {
    report: &'a MoveReport,
    changed_files: Vec<&'a FileId>,
    written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<String>,
}

fn move_method_command(args: MoveMethodArgs) -> Result<i32> {
    let ws = JavaWorkspace::load(&args.path)?;
    let config = load_config(&ws.root)?;

    let params = MoveMethodParams {
        source_type: args.from,
        method: args.method,
        target_type: args.to,
        field_visibility: args
            .field_visibility
            .unwrap_or(config.refactor.field_visibility),
    };
    let outcome = move_method_with(&ws.files, params, &config.refactor.move_options())
        .context("move-method failed")?;
    let updated = apply_workspace_edit(&ws.files, &outcome.edit)?;
    let changed: BTreeMap<FileId, String> = outcome
        .edit
        .files()
        .into_iter()
        .filter_map(|file| Some((file.clone(), updated.get(file)?.clone())))
        .collect();

    let denied = args.deny_conflicts && outcome.report.has_conflicts();
    let write = !args.dry_run && !denied;
    let diff = if args.dry_run {
        Some(generate_preview(&ws.files, &outcome.edit)?.unified_diff())
    } else {
        None
    };
    if write {
        ws.write(&changed)?;
    }

    if args.json {
        let output = MoveOutput {
            report: &outcome.report,
            changed_files: changed.keys().collect(),
            written: write,
            diff,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", outcome.report);
        for conflict in &outcome.report.conflicts {
            if let Some(location) = conflict_location(&ws.files, conflict) {
                eprintln!("conflict at {location}");
            }
        }
        if let Some(diff) = diff {
            print!("{diff}");
        } else if denied {
            eprintln!("not writing changes: the move reported conflicts");
        }
    }

    tracing::info!(
        target: "carry.cli",
        files = changed.len(),
        written = write,
        conflicts = outcome.report.conflicts.len(),
        "move-method finished"
    );
    Ok(if denied { 1 } else { 0 })
}

/// `path:line:col` of a conflict, 1-based, against the pre-move text.
fn conflict_location(files: &BTreeMap<FileId, String>, conflict: &Conflict) -> Option<String> {
    let text = files.get(conflict.file())?;
    let pos = LineIndex::new(text).line_col(conflict.range().start);
    Some(format!("{}:{}:{}", conflict.file(), pos.line + 1, pos.col + 1))
}

#[derive(Serialize)]
struct AnalyzedMethod {
    method: String,
    movable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<StayReason>,
}

fn analyze_command(args: AnalyzeArgs) -> Result<i32> {
    let ws = JavaWorkspace::load(&args.path)?;
    load_config(&ws.root)?;

    let map = analyze_method(&ws.files, &args.from, &args.method).context("analyze failed")?;
    let methods: Vec<AnalyzedMethod> = map
        .iter()
        .map(|(method, movable)| AnalyzedMethod {
            method: method.to_string(),
            movable,
            reason: map.reason(method).cloned(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&methods)?);
    } else {
        for entry in &methods {
            match &entry.reason {
                Some(reason) => println!("stay  {}: {reason}", entry.method),
                None => println!("move  {}", entry.method),
            }
        }
    }
    Ok(0)
}
