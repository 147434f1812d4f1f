use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use dreid_md::{ElementPolicy, HtmlViewer, SummaryViewer, Topology, Universe, Viewer};

use crate::cli::{ViewArgs, ViewMode};
use crate::display::{Context as DisplayContext, Progress};
use crate::util::convert::element_policy;

pub fn run_view(args: ViewArgs, ctx: DisplayContext) -> Result<()> {
    let mut progress = Progress::new(ctx.interactive, 2);

    progress.step("Loading trajectory");
    let policy = element_policy(args.no_infer_elements);
    let universe = load_universe(&args.topology, &args.trajectory, policy)?;
    progress.complete_step(
        "Loading trajectory",
        &[
            format!("Topology: {} atoms", universe.atom_count()),
            format!("Trajectory: {} frames", universe.frame_count()),
        ],
    );

    progress.step("Rendering");
    progress.suspend();
    let html = args
        .html
        .unwrap_or_else(|| default_html_path(&args.trajectory));
    let written = show(&universe, args.mode, &html)?;
    progress.complete_step(
        "Rendering",
        &written
            .iter()
            .map(|p| format!("Wrote {}", p.display()))
            .collect::<Vec<_>>(),
    );

    progress.finish("View complete");
    Ok(())
}

pub fn load_universe(
    topology: &Path,
    trajectory: &Path,
    policy: ElementPolicy,
) -> Result<Universe> {
    let topology = Topology::from_pdb(topology)
        .with_context(|| format!("Failed to read topology: {}", topology.display()))?;
    Universe::load(topology, trajectory, policy)
        .with_context(|| format!("Failed to read trajectory: {}", trajectory.display()))
}

/// Presents `universe`; returns the files written.
pub fn show(universe: &Universe, mode: ViewMode, html: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    if matches!(mode, ViewMode::Summary | ViewMode::Both) {
        SummaryViewer::stdout()
            .show(universe)
            .context("Failed to print trajectory summary")?;
    }

    if matches!(mode, ViewMode::Html | ViewMode::Both) {
        HtmlViewer::new(html)
            .show(universe)
            .with_context(|| format!("Failed to write viewer page: {}", html.display()))?;
        written.push(html.to_path_buf());
    }

    Ok(written)
}

pub fn default_html_path(trajectory: &Path) -> PathBuf {
    trajectory.with_extension("html")
}
