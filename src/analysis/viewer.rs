//! Renderers for a [`Universe`].

use super::Universe;
use crate::trajectory::pdb::{PdbAtom, PdbTrajectoryWriter};
use crate::trajectory::TrajectorySink;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("failed to write view: {0}")]
    Io(#[from] io::Error),
}

/// Anything that can present a trajectory to a user.
pub trait Viewer {
    fn show(&mut self, universe: &Universe) -> Result<(), ViewError>;
}

/// Prints one line per frame: step, time, energy, temperature and the
/// solute's radius of gyration and RMSD from the first frame.
pub struct SummaryViewer<W: Write> {
    out: W,
}

impl SummaryViewer<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> SummaryViewer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

impl<W: Write> Viewer for SummaryViewer<W> {
    fn show(&mut self, universe: &Universe) -> Result<(), ViewError> {
        let rg = universe.radius_of_gyration();
        let rmsd = universe.rmsd();
        writeln!(
            self.out,
            "{} atoms, {} frames",
            universe.atom_count(),
            universe.frame_count()
        )?;
        writeln!(
            self.out,
            "{:>6} {:>10} {:>10} {:>16} {:>9} {:>8} {:>8}",
            "Frame", "Step", "Time (ps)", "Epot (kcal/mol)", "Temp (K)", "Rg (Å)", "RMSD (Å)"
        )?;
        for ((frame, rg), rmsd) in universe.frames().iter().zip(&rg).zip(&rmsd) {
            writeln!(
                self.out,
                "{:>6} {:>10} {:>10.3} {:>16} {:>9} {:>8.3} {:>8.3}",
                frame.index,
                frame.step,
                frame.time,
                optional(frame.potential_energy, 3),
                optional(frame.temperature, 2),
                rg,
                rmsd
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Writes a self-contained HTML page that plays the trajectory with the
/// NGL web viewer.
pub struct HtmlViewer {
    path: PathBuf,
    title: String,
}

impl HtmlViewer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("trajectory")
            .to_string();
        Self { path, title }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The page for `universe` as a string.
    pub fn render(&self, universe: &Universe) -> Result<String, ViewError> {
        let labels: Vec<PdbAtom> = universe
            .topology()
            .atoms()
            .iter()
            .map(|a| PdbAtom {
                name: a.name.clone(),
                residue_name: a.residue_name.clone(),
                chain_id: a.chain_id,
                residue_id: a.residue_id,
                insertion_code: ' ',
                element: a.element,
                hetero: a.solvent,
            })
            .collect();
        let box_vectors = universe.frames().first().and_then(|f| f.box_vectors);
        let mut writer = PdbTrajectoryWriter::new(Vec::new(), labels, box_vectors)?;
        for frame in universe.frames() {
            writer.write_frame(frame)?;
        }
        writer.finish()?;
        let models = String::from_utf8_lossy(&writer.into_inner()).into_owned();

        Ok(PAGE
            .replace("{title}", &escape_html(&self.title))
            .replace("{frames}", &universe.frame_count().to_string())
            .replace("{atoms}", &universe.atom_count().to_string())
            .replace("{pdb}", &escape_html(&models)))
    }
}

impl Viewer for HtmlViewer {
    fn show(&mut self, universe: &Universe) -> Result<(), ViewError> {
        let page = self.render(universe)?;
        fs::write(&self.path, page)?;
        log::info!("wrote trajectory viewer to {}", self.path.display());
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  html, body { margin: 0; height: 100%; font-family: sans-serif; }
  #viewport { width: 100%; height: calc(100% - 2.5em); }
  #controls { height: 2.5em; display: flex; align-items: center; gap: 1em; padding: 0 1em; }
</style>
<script src="https://unpkg.com/ngl@2.3.1/dist/ngl.js"></script>
</head>
<body>
<div id="controls">
  <strong>{title}</strong>
  <span>{atoms} atoms, {frames} frames</span>
  <button id="play">Play / Pause</button>
</div>
<div id="viewport"></div>
<pre id="trajectory" hidden>{pdb}</pre>
<script>
  const stage = new NGL.Stage("viewport", { backgroundColor: "white" });
  window.addEventListener("resize", () => stage.handleResize());
  const text = document.getElementById("trajectory").textContent;
  const blob = new Blob([text], { type: "text/plain" });
  stage.loadFile(blob, { ext: "pdb", asTrajectory: true }).then((component) => {
    component.addRepresentation("cartoon", { sele: "protein or nucleic" });
    component.addRepresentation("licorice", { sele: "hetero and not water" });
    component.addRepresentation("line", { sele: "water", opacity: 0.3 });
    component.autoView();
    const trajectory = component.addTrajectory();
    const player = trajectory.trajectory.player;
    document.getElementById("play").onclick = () => player.toggle();
  });
</script>
</body>
</html>
"#;
