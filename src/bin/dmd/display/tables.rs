use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, Write};

use dreid_md::{RunParameters, RunSummary, SimulationSystem, Structure};

use crate::util::text::{human_duration, truncate};

const INDENT: &str = "      ";

const BOX_INNER_WIDTH: usize = 62;
const SAFE_TABLE_WIDTH: usize = BOX_INNER_WIDTH - INDENT.len();

pub fn print_structure_info(title: &str, structure: &Structure) {
    let mut out = io::stderr().lock();
    let _ = write_kv_table(&mut out, title, &structure_rows(structure));
}

fn structure_rows(structure: &Structure) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Atoms", structure.atom_count().to_string()),
        ("Residues", structure.residue_count().to_string()),
        ("Hydrogens", structure.hydrogen_count().to_string()),
        ("Waters", structure.water_count().to_string()),
        ("Ions", structure.ion_count().to_string()),
    ];
    if structure.bond_count() > 0 {
        rows.insert(1, ("Bonds", structure.bond_count().to_string()));
    }
    if let Some([a, b, c]) = structure.orthorhombic_box() {
        rows.push(("Box (Å)", format!("{a:.1} × {b:.1} × {c:.1}")));
    }
    rows
}

pub fn print_chain_breakdown(structure: &Structure) {
    let mut residues: BTreeMap<char, HashSet<(i32, char)>> = BTreeMap::new();
    let mut atoms: HashMap<char, usize> = HashMap::new();
    for info in &structure.metadata.atom_info {
        if info.is_solvent() {
            continue;
        }
        residues
            .entry(info.chain_id)
            .or_default()
            .insert((info.residue_id, info.insertion_code));
        *atoms.entry(info.chain_id).or_insert(0) += 1;
    }
    if residues.is_empty() {
        return;
    }

    let rows: Vec<(String, String, String)> = residues
        .iter()
        .map(|(chain, res)| {
            (
                chain.to_string(),
                res.len().to_string(),
                atoms.get(chain).copied().unwrap_or(0).to_string(),
            )
        })
        .collect();

    let mut out = io::stderr().lock();
    let _ = write_three_column_table(
        &mut out,
        "Chain Breakdown",
        ("Chain", "Residues", "Atoms"),
        &rows,
    );
}

pub fn print_parameters(system: &SimulationSystem, names: (&str, &str, &str)) {
    let (bond_type, angle_type, vdw_type) = names;
    let p = &system.potentials;
    let rows = vec![
        (
            "Atom Types".to_string(),
            system.atom_types.len().to_string(),
            "unique".to_string(),
        ),
        (
            format!("Bonds ({bond_type})"),
            p.bonds.len().to_string(),
            "terms".to_string(),
        ),
        (
            format!("Angles ({angle_type})"),
            p.angles.len().to_string(),
            "terms".to_string(),
        ),
        (
            "Dihedrals".to_string(),
            p.dihedrals.len().to_string(),
            "terms".to_string(),
        ),
        (
            "Impropers".to_string(),
            p.impropers.len().to_string(),
            "terms".to_string(),
        ),
        (
            format!("VdW ({vdw_type})"),
            p.vdw_pairs.len().to_string(),
            "pairs".to_string(),
        ),
        (
            "Constraints".to_string(),
            system.constraints.len().to_string(),
            "rigid".to_string(),
        ),
        (
            "Net Charge".to_string(),
            format!("{:+.3}", system.total_charge()),
            "e".to_string(),
        ),
    ];

    let mut out = io::stderr().lock();
    let _ = write_three_column_table(
        &mut out,
        "Force Field Parameters",
        ("Category", "Count", "Unit"),
        &rows,
    );
}

pub fn print_run_plan(params: &RunParameters) {
    let rows = vec![
        ("Temperature", format!("{} K", params.temperature)),
        ("Friction", format!("{} /ps", params.friction)),
        ("Timestep", format!("{} fs", params.timestep * 1000.0)),
        ("Steps", params.total_steps.to_string()),
        ("Duration", format!("{} ps", params.duration())),
        ("Frames", params.frame_count().to_string()),
        ("Seed", params.seed.to_string()),
    ];
    let mut out = io::stderr().lock();
    let _ = write_kv_table(&mut out, "Dynamics", &rows);
}

pub fn print_run_summary(summary: &RunSummary) {
    let rows = vec![
        ("Steps", summary.total_steps.to_string()),
        ("Frames", summary.frames_written.to_string()),
        ("Initial Epot", format!("{:.2} kcal/mol", summary.initial_energy)),
        ("Minimized Epot", format!("{:.2} kcal/mol", summary.minimized_energy)),
        (
            "Final Epot",
            format!("{:.2} kcal/mol", summary.final_potential_energy),
        ),
        ("Final T", format!("{:.1} K", summary.final_temperature)),
        ("Wall Time", human_duration(summary.elapsed)),
    ];
    let mut out = io::stderr().lock();
    let _ = write_kv_table(&mut out, "Run Summary", &rows);
}

fn write_three_column_table(
    out: &mut impl Write,
    title: &str,
    headers: (&str, &str, &str),
    rows: &[(String, String, String)],
) -> io::Result<()> {
    let a_w = 20usize;
    let b_w = 10usize;
    let sep_overhead = 8;
    let c_w = SAFE_TABLE_WIDTH.saturating_sub(a_w + b_w + sep_overhead);
    let rule = |l: &str, m: &str, r: &str| {
        format!(
            "{INDENT}{l}{}{m}{}{m}{}{r}",
            "─".repeat(a_w + 2),
            "─".repeat(b_w + 2),
            "─".repeat(c_w + 2)
        )
    };

    writeln!(out, "{INDENT}┌─ {} ─┐", truncate(title, SAFE_TABLE_WIDTH - 6))?;
    writeln!(out, "{}", rule("┌", "┬", "┐"))?;
    writeln!(
        out,
        "{INDENT}│ {:<a_w$} │ {:>b_w$} │ {:<c_w$} │",
        headers.0, headers.1, headers.2
    )?;
    writeln!(out, "{}", rule("├", "┼", "┤"))?;
    for (a, b, c) in rows {
        writeln!(
            out,
            "{INDENT}│ {:<a_w$} │ {:>b_w$} │ {:<c_w$} │",
            truncate(a, a_w),
            truncate(b, b_w),
            truncate(c, c_w)
        )?;
    }
    writeln!(out, "{}", rule("└", "┴", "┘"))
}

fn write_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) -> io::Result<()> {
    let key_w = 16usize;
    let sep_overhead = 6;
    let val_w = SAFE_TABLE_WIDTH.saturating_sub(key_w + sep_overhead);
    let rule = |l: &str, m: &str, r: &str| {
        format!(
            "{INDENT}{l}{}{m}{}{r}",
            "─".repeat(key_w + 2),
            "─".repeat(val_w + 2)
        )
    };

    writeln!(out, "{INDENT}┌─ {} ─┐", truncate(title, SAFE_TABLE_WIDTH - 6))?;
    writeln!(out, "{}", rule("┌", "┬", "┐"))?;
    writeln!(out, "{INDENT}│ {:<key_w$} │ {:>val_w$} │", "Metric", "Value")?;
    writeln!(out, "{}", rule("├", "┼", "┤"))?;
    for (key, val) in rows {
        writeln!(
            out,
            "{INDENT}│ {:<key_w$} │ {:>val_w$} │",
            truncate(key, key_w),
            truncate(val, val_w)
        )?;
    }
    writeln!(out, "{}", rule("└", "┴", "┘"))
}
