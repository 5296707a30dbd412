use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use trellis_apply::{ApplyConfig, ApplyEngine, ApplyReport, MemoryOutline};
use trellis_diff::{reconcile, Edit, EditScript};
use trellis_snapshot::Snapshot;

use crate::cli::*;
use crate::outline_text::{self, Entry};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ApplyConfig::load(path)?,
        None => ApplyConfig::default(),
    };
    let format = cli.format;

    match cli.command {
        Command::Diff(args) => cmd_diff(args, format),
        Command::Apply(args) => cmd_apply(args, format, config),
        Command::Export(args) => cmd_export(args, format),
        Command::Stats(args) => cmd_stats(args, format),
        Command::Sample => {
            print!("{}", outline_text::SAMPLE);
            Ok(())
        }
    }
}

fn read_outline(path: &Path) -> anyhow::Result<Snapshot<Entry>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot = outline_text::parse(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let old = read_outline(&args.old)?;
    let new = read_outline(&args.new)?;
    print!("{}", render_diff(&reconcile(&old, &new), format)?);
    Ok(())
}

fn render_diff(script: &EditScript<Entry>, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(script)? + "\n");
    }
    if script.is_empty() {
        return Ok("No changes.\n".to_string());
    }

    let mut out = String::new();
    for edit in script {
        let line = match edit {
            Edit::Insert {
                item,
                parent,
                index,
            } => format!(
                "{} {} at {}",
                "+ insert".green(),
                item.title.as_str().bold(),
                place(parent.as_ref(), *index)
            ),
            Edit::Delete {
                item,
                parent,
                index,
            } => format!(
                "{} {} from {}",
                "- delete".red(),
                item.title.as_str().bold(),
                place(parent.as_ref(), *index)
            ),
            Edit::Move {
                item,
                from_parent,
                from_index,
                to_parent,
                to_index,
                ..
            } => format!(
                "{} {} {} -> {}",
                format!("~ {}", edit.kind_name()).yellow(),
                item.title.as_str().bold(),
                place(from_parent.as_ref(), *from_index),
                place(to_parent.as_ref(), *to_index)
            ),
            Edit::Reload {
                item,
                parent,
                index,
            } => format!(
                "{} {} at {}",
                "* reload".cyan(),
                item.title.as_str().bold(),
                place(parent.as_ref(), *index)
            ),
        };
        writeln!(out, "{line}")?;
    }

    let summary = script.summary();
    writeln!(
        out,
        "{} inserted, {} deleted, {} moved, {} reparented, {} reloaded",
        summary.inserts, summary.deletes, summary.moves, summary.reparents, summary.reloads
    )?;
    Ok(out)
}

fn place(parent: Option<&Entry>, index: usize) -> String {
    match parent {
        Some(parent) => format!("{}[{index}]", parent.title),
        None => format!("root[{index}]"),
    }
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ApplyOutput<'a> {
    report: &'a ApplyReport,
    rows: Vec<String>,
}

fn cmd_apply(args: ApplyArgs, format: OutputFormat, config: ApplyConfig) -> anyhow::Result<()> {
    let old = read_outline(&args.old)?;
    let new = read_outline(&args.new)?;
    let animate = args.animate || config.animate_by_default;
    print!("{}", run_apply(old, new, animate, config, format)?);
    Ok(())
}

fn run_apply(
    old: Snapshot<Entry>,
    new: Snapshot<Entry>,
    animate: bool,
    config: ApplyConfig,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let widget = MemoryOutline::from_config(&config);
    let mut engine = ApplyEngine::with_config(widget, config);

    let report = runtime.block_on(async {
        engine.apply_snapshot(old, false).await?;
        engine.apply_snapshot(new, animate).await
    })?;

    engine.adapter_mut().expand_all();
    let rows: Vec<(usize, String)> = engine
        .adapter()
        .visible_rows()
        .into_iter()
        .map(|(depth, item)| (depth, item.title.clone()))
        .collect();

    if format == OutputFormat::Json {
        let output = ApplyOutput {
            report: &report,
            rows: rows.into_iter().map(|(_, title)| title).collect(),
        };
        return Ok(serde_json::to_string_pretty(&output)? + "\n");
    }

    let mut out = String::new();
    for (depth, title) in &rows {
        writeln!(out, "{}{}", "  ".repeat(*depth), title)?;
    }
    writeln!(
        out,
        "{} {} edits in {} widget calls{}",
        "✓".green().bold(),
        report.summary.structural() + report.summary.reloads,
        report.adapter_calls,
        if report.animated { " (animated)" } else { "" }
    )?;
    if report.row_mismatches > 0 {
        writeln!(out, "{} {} parents out of sync", "!".red().bold(), report.row_mismatches)?;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

fn cmd_export(args: ExportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = read_outline(&args.file)?;
    let text = match format {
        OutputFormat::Text => outline_text::render(&snapshot),
        OutputFormat::Json => serde_json::to_string_pretty(&snapshot)? + "\n",
    };
    match args.output {
        Some(path) => {
            std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("{} Exported {} items to {}", "✓".green().bold(), snapshot.len(), path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// stats
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Serialize)]
struct Stats {
    items: usize,
    roots: usize,
    expandable: usize,
    max_depth: usize,
}

fn stats(snapshot: &Snapshot<Entry>) -> Stats {
    let mut stats = Stats {
        items: snapshot.number_of_items(None),
        roots: snapshot.child_count(None),
        expandable: 0,
        max_depth: 0,
    };
    for (id, depth) in snapshot.linearized_ids() {
        stats.max_depth = stats.max_depth.max(depth);
        if snapshot.is_expandable(id) {
            stats.expandable += 1;
        }
    }
    stats
}

fn cmd_stats(args: StatsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = read_outline(&args.file)?;
    let stats = stats(&snapshot);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("Items:      {}", stats.items.to_string().bold());
            println!("Roots:      {}", stats.roots);
            println!("Expandable: {}", stats.expandable);
            println!("Max depth:  {}", stats.max_depth);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(text: &str) -> Snapshot<Entry> {
        outline_text::parse(text).unwrap()
    }

    #[test]
    fn read_outline_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outline.txt");
        std::fs::write(&path, outline_text::SAMPLE).unwrap();
        let snapshot = read_outline(&path).unwrap();
        assert_eq!(snapshot.len(), 12);

        let err = read_outline(&dir.path().join("missing.txt")).unwrap_err();
        assert!(err.to_string().contains("missing.txt"));
    }

    #[test]
    fn diff_text_lists_edits() {
        let old = outline("A / A1\nB\n");
        let new = outline("B / A1\nA\nC\n");
        let text = render_diff(&reconcile(&old, &new), OutputFormat::Text).unwrap();
        assert!(text.contains("insert"));
        assert!(text.contains("reparent"));
        assert!(text.contains("1 inserted"));
    }

    #[test]
    fn diff_of_equal_outlines() {
        let old = outline(outline_text::SAMPLE);
        let text = render_diff(&reconcile(&old, &old), OutputFormat::Text).unwrap();
        assert_eq!(text, "No changes.\n");
    }

    #[test]
    fn diff_json_is_an_array() {
        let old = outline("A\n");
        let new = outline("B\n");
        let json = render_diff(&reconcile(&old, &new), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn apply_shows_expanded_rows() {
        let old = outline(outline_text::SAMPLE);
        let new = outline("Parent 2 / Child 11\nParent 1\n");
        let out = run_apply(old, new, false, ApplyConfig::default(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["rows"], serde_json::json!(["Parent 2", "Child 11", "Parent 1"]));
        assert_eq!(value["report"]["row_mismatches"], 0);
    }

    #[test]
    fn animated_apply_with_delay() {
        let config = ApplyConfig {
            animation_delay_ms: 5,
            ..ApplyConfig::default()
        };
        let out = run_apply(outline("A\n"), outline("A / B\n"), true, config, OutputFormat::Text).unwrap();
        assert!(out.starts_with("A\n  B\n"));
        assert!(out.contains("(animated)"));
    }

    #[test]
    fn stats_of_sample() {
        let s = stats(&outline(outline_text::SAMPLE));
        assert_eq!(
            s,
            Stats {
                items: 12,
                roots: 3,
                expandable: 4,
                max_depth: 2,
            }
        );
    }
}
