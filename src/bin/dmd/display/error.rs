use std::io::{self, Write};

use anyhow::Error;

use dreid_md::{
    Error as PipelineError, ForceFieldMismatchError, SimulationDivergedError, SimulationPhase,
    StructureLoadError, TrajectoryReadError,
};

use crate::util::text::wrap;

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    for line in wrap(&err.to_string(), 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    for cause in err.chain().skip(1) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 57) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
    }

    let hints = collect_hints(err);
    if !hints.is_empty() {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

/// Finds the first pipeline error in the chain and suggests fixes for it.
fn collect_hints(err: &Error) -> Vec<String> {
    let mut hints = Vec::new();

    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<PipelineError>() {
            pipeline_hints(e, &mut hints);
        } else if let Some(e) = cause.downcast_ref::<StructureLoadError>() {
            load_hints(e, &mut hints);
        } else if let Some(e) = cause.downcast_ref::<ForceFieldMismatchError>() {
            mismatch_hints(e, &mut hints);
        } else if let Some(e) = cause.downcast_ref::<SimulationDivergedError>() {
            diverged_hints(e, &mut hints);
        } else if let Some(e) = cause.downcast_ref::<TrajectoryReadError>() {
            trajectory_hints(e, &mut hints);
        } else if let Some(e) = cause.downcast_ref::<io::Error>() {
            std_io_hints(e, &mut hints);
        }
        if !hints.is_empty() {
            break;
        }
    }

    hints
}

fn pipeline_hints(err: &PipelineError, hints: &mut Vec<String>) {
    match err {
        PipelineError::StructureLoad(e) => load_hints(e, hints),
        PipelineError::ForceFieldMismatch(e) => mismatch_hints(e, hints),
        PipelineError::SimulationDiverged(e) => diverged_hints(e, hints),
        PipelineError::TrajectoryRead(e) => trajectory_hints(e, hints),
        PipelineError::Preparation(msg) => preparation_hints(msg, hints),
        PipelineError::InvalidParameters(msg) => {
            hints.push("Check the Dynamics and Force Field options".into());
            if msg.contains("box") || msg.contains("cutoff") {
                hints.push("Use --nonbonded no-cutoff for vacuum systems".into());
                hints.push("Or increase --padding so the box exceeds twice the cutoff".into());
            }
        }
        PipelineError::TrajectoryWrite(source) => {
            hints.push("Writing results to the output directory failed".into());
            std_io_hints(source, hints);
        }
        PipelineError::Config(_) => {
            hints.push("Check the config file's keys against the documented sections".into());
            hints.push("Keys use kebab-case, e.g. record-interval".into());
        }
    }
}

fn load_hints(err: &StructureLoadError, hints: &mut Vec<String>) {
    match err {
        StructureLoadError::Open { source, .. } => std_io_hints(source, hints),
        StructureLoadError::Malformed { .. } => {
            hints.push("The structure file could not be parsed".into());
            hints.push("PDB: check ATOM/HETATM column alignment (1-80)".into());
            hints.push("mmCIF: verify the _atom_site loop is complete".into());
        }
        StructureLoadError::Empty { .. } => {
            hints.push("The file has no ATOM/HETATM records".into());
        }
        StructureLoadError::UnsupportedFormat { .. } => {
            hints.push("Supported inputs: .pdb, .ent, .cif, .mmcif".into());
        }
    }
}

fn mismatch_hints(err: &ForceFieldMismatchError, hints: &mut Vec<String>) {
    match err {
        ForceFieldMismatchError::UnknownResidue { residue_name, .. } => {
            hints.push(format!(
                "Residue '{residue_name}' has no charge template in this force field"
            ));
            hints.push("Remove it with --remove or drop all ligands with --no-hetero".into());
        }
        ForceFieldMismatchError::UnknownAtom { atom_name, .. } => {
            hints.push(format!("Atom '{atom_name}' does not match the residue template"));
            hints.push("Check for nonstandard atom names in the input".into());
        }
        ForceFieldMismatchError::AtomTyping(_) => {
            hints.push("DREIDING atom typing failed for part of the system".into());
            hints.push("Provide custom typing rules with --rules".into());
        }
        ForceFieldMismatchError::MissingParameter { atom_type, .. } => {
            hints.push(format!("No DREIDING parameters for atom type '{atom_type}'"));
            hints.push("Provide a parameter table with --params".into());
        }
        ForceFieldMismatchError::ParameterParse(_) => {
            hints.push("The custom parameter table is not valid TOML".into());
        }
    }
}

fn diverged_hints(err: &SimulationDivergedError, hints: &mut Vec<String>) {
    match err.phase {
        SimulationPhase::Minimization => {
            hints.push("The starting structure has severe clashes".into());
            hints.push("Inspect the prepared topology for overlapping atoms".into());
        }
        SimulationPhase::Dynamics => {
            hints.push("Frames written before the failure are kept on disk".into());
            hints.push("Try a smaller --timestep (e.g. 0.001)".into());
            hints.push("Keep --constraints h-bonds when using 2 fs steps".into());
        }
    }
}

fn trajectory_hints(err: &TrajectoryReadError, hints: &mut Vec<String>) {
    match err {
        TrajectoryReadError::Truncated { .. } => {
            hints.push("The trajectory ends inside a frame".into());
            hints.push("A run that diverged or was killed leaves a partial last frame".into());
        }
        TrajectoryReadError::AtomCountMismatch { .. } => {
            hints.push("The topology does not belong to this trajectory".into());
            hints.push("Use the *_topology.pdb written by the same run".into());
        }
        TrajectoryReadError::Open { source, .. } => std_io_hints(source, hints),
        TrajectoryReadError::UnsupportedFormat { .. } => {
            hints.push("Supported trajectories: .pdb, .dcd".into());
        }
        _ => hints.push("The trajectory file appears corrupt".into()),
    }
}

fn preparation_hints(msg: &str, hints: &mut Vec<String>) {
    let msg = msg.to_lowercase();
    if msg.contains("solv") || msg.contains("water") {
        hints.push("Solvation failed; adjust --padding or --water-spacing".into());
    } else if msg.contains("proton") || msg.contains("hydrogen") {
        hints.push("Protonation failed; try another --his strategy".into());
    } else if msg.contains("bond") || msg.contains("topology") {
        hints.push("Bond perception failed; check --ss-cutoff".into());
    } else {
        hints.push("Check residue names and chain breaks in the input".into());
    }
}

fn std_io_hints(source: &io::Error, hints: &mut Vec<String>) {
    use std::io::ErrorKind;

    match source.kind() {
        ErrorKind::NotFound => {
            hints.push("File or directory not found".into());
            hints.push("Check the path spelling and ensure the file exists".into());
        }
        ErrorKind::PermissionDenied => {
            hints.push("Permission denied accessing the file".into());
            hints.push("Check file permissions with `ls -la`".into());
        }
        ErrorKind::StorageFull | ErrorKind::WriteZero => {
            hints.push("Check available disk space".into());
        }
        _ => hints.push("Check file path, permissions, and disk space".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use std::path::PathBuf;

    #[test]
    fn hints_follow_the_chain() {
        let err: Result<(), PipelineError> = Err(SimulationDivergedError::new(
            SimulationPhase::Dynamics,
            1200,
            "non-finite energy",
        )
        .into());
        let err = err.context("Simulation failed").unwrap_err();
        let hints = collect_hints(&err);
        assert!(hints.iter().any(|h| h.contains("kept on disk")));
    }

    #[test]
    fn unknown_residue_suggests_removal() {
        let err = Error::new(PipelineError::from(ForceFieldMismatchError::UnknownResidue {
            force_field: "charmm/tip3p".into(),
            residue_name: "HEM".into(),
            residue_id: 200,
            chain_id: 'A',
        }));
        let hints = collect_hints(&err);
        assert!(hints[0].contains("HEM"));
    }

    #[test]
    fn missing_file_gets_io_hint() {
        let err = Error::new(StructureLoadError::Open {
            path: PathBuf::from("x.pdb"),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        assert_eq!(collect_hints(&err)[0], "File or directory not found");
    }
}
