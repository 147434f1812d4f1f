use anyhow::{Context, Result};

use dreid_md::io::load_structure;
use dreid_md::pipeline::{self, OutputSpec};
use dreid_md::{BuildConfig, ConsoleReporter, ReferenceEngine, RunParameters, build_system};

use crate::cli::RunArgs;
use crate::commands::view;
use crate::config::{ResolvedRun, resolve_run};
use crate::display::{
    Context as DisplayContext, Progress, print_chain_breakdown, print_parameters, print_run_plan,
    print_run_summary, print_structure_info,
};
use crate::util::convert::{element_policy, his_display_name, potential_display_names};

const TOTAL_STEPS: u8 = 3;

pub fn run_simulation(args: RunArgs, ctx: DisplayContext) -> Result<()> {
    let ResolvedRun {
        config,
        input,
        params,
    } = resolve_run(&args)?;

    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS + u8::from(args.output.view.is_some()));

    progress.step("Loading structure");
    let structure = load_structure(&input)
        .with_context(|| format!("Failed to load structure: {}", input.display()))?;
    progress.complete_step(
        "Loading structure",
        &[format!("Read {}", input.display())],
    );
    if ctx.interactive {
        print_structure_info("Input Structure", &structure);
        print_chain_breakdown(&structure);
    }

    progress.step("Building system");
    let forcefield = config.forcefield_config()?;
    let system = build_system(&structure, &forcefield, &config.build)
        .context("System preparation failed")?;
    progress.complete_step(
        "Building system",
        &build_substeps(&config.build, &forcefield.preset.to_string()),
    );
    if ctx.interactive {
        print_structure_info("Prepared System", &system.structure);
        print_parameters(&system, potential_display_names(&forcefield));
        print_run_plan(&params);
    }

    progress.step("Running dynamics");
    progress.suspend();
    let directory = config.output_directory();
    let outcome = pipeline::simulate::<ReferenceEngine>(
        &system,
        &params,
        OutputSpec {
            directory: &directory,
            input: &input,
            format: config.output.format,
            write_topology: config.output.write_topology,
        },
        &mut ConsoleReporter::stdout(),
    )
    .context("Simulation failed")?;
    progress.complete_step("Running dynamics", &run_substeps(&params));
    if ctx.interactive {
        print_run_summary(&outcome.summary);
    }

    if let Some(mode) = args.output.view {
        progress.step("Rendering trajectory");
        progress.suspend();
        let universe = pipeline::analyze(
            &system.structure,
            &outcome.trajectory,
            element_policy(false),
        )
        .with_context(|| {
            format!(
                "Failed to read back trajectory: {}",
                outcome.trajectory.display()
            )
        })?;
        let html = view::default_html_path(&outcome.trajectory);
        let written = view::show(&universe, mode, &html)?;
        progress.complete_step(
            "Rendering trajectory",
            &written
                .iter()
                .map(|p| format!("Wrote {}", p.display()))
                .collect::<Vec<_>>(),
        );
    }

    progress.finish("Simulation complete");

    println!("{}", outcome.trajectory.display());
    if let Some(topology) = &outcome.topology {
        log::info!("topology: {}", topology.display());
    }

    Ok(())
}

fn build_substeps(build: &BuildConfig, preset: &str) -> Vec<String> {
    let mut steps = vec!["Remove crystallographic solvent".to_string()];
    if build.remove_ions || build.remove_hetero || !build.remove_residues.is_empty() {
        let mut removed = Vec::new();
        if build.remove_ions {
            removed.push("ions".to_string());
        }
        if build.remove_hetero {
            removed.push("hetero".to_string());
        }
        removed.extend(build.remove_residues.iter().cloned());
        steps.push(format!("Remove {}", removed.join(", ")));
    }
    steps.push(format!(
        "Add hydrogens (pH {:.1}, HIS: {})",
        build.ph,
        his_display_name(build.his_strategy)
    ));
    if build.solvation.enabled {
        steps.push(format!(
            "Solvate (padding: {:.1} Å, spacing: {:.1} Å)",
            build.solvation.padding, build.solvation.water_spacing
        ));
    } else {
        steps.push("Vacuum (no solvent box)".to_string());
    }
    steps.push(format!(
        "Detect disulfide bonds (cutoff: {:.1} Å)",
        build.disulfide_cutoff
    ));
    steps.push(format!("Parameterize with DREIDING ({preset} charges)"));
    steps
}

fn run_substeps(params: &RunParameters) -> Vec<String> {
    vec![
        format!(
            "Minimize (tolerance: {} kcal/mol/Å)",
            params.minimization.tolerance
        ),
        format!(
            "Langevin {} K, {} fs × {} steps",
            params.temperature,
            params.timestep * 1000.0,
            params.total_steps
        ),
        format!(
            "Record {} frames (every {} steps)",
            params.frame_count(),
            params.record_interval
        ),
    ]
}
