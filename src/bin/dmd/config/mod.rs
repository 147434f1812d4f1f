use std::path::PathBuf;

use anyhow::{Context, Result};

use dreid_md::{PipelineConfig, RunParameters};

use crate::cli::{DynamicsOptions, ForceFieldOptions, OutputOptions, PreparationOptions, RunArgs};

/// A run with every flag applied on top of the config file.
pub struct ResolvedRun {
    pub config: PipelineConfig,
    pub input: PathBuf,
    pub params: RunParameters,
}

pub fn resolve_run(args: &RunArgs) -> Result<ResolvedRun> {
    let mut config = match &args.input.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    apply_forcefield(&mut config, &args.forcefield);
    apply_preparation(&mut config, &args.preparation);
    apply_dynamics(&mut config, &args.dynamics);
    apply_output(&mut config, &args.output);

    let input = config
        .input_path(args.input.input.as_deref(), args.input.structure.as_deref())
        .context("No input structure; pass --input FILE or --structure NAME with --config")?;

    let params = config
        .run
        .to_parameters()
        .context("Invalid dynamics settings")?;

    Ok(ResolvedRun {
        config,
        input,
        params,
    })
}

fn apply_forcefield(config: &mut PipelineConfig, opts: &ForceFieldOptions) {
    let ff = &mut config.forcefield;
    if let Some(preset) = opts.preset {
        ff.preset = preset.into();
    }
    if let Some(bond) = opts.bond_potential {
        ff.bond_potential = bond.into();
    }
    if let Some(angle) = opts.angle_potential {
        ff.angle_potential = angle.into();
    }
    if let Some(vdw) = opts.vdw_potential {
        ff.vdw_potential = vdw.into();
    }
    if let Some(method) = opts.nonbonded_method {
        ff.nonbonded_method = method.into();
    }
    if let Some(cutoff) = opts.cutoff {
        ff.nonbonded_cutoff = cutoff;
    }
    if let Some(constraints) = opts.constraints {
        ff.constraints = constraints.into();
    }
    if opts.flexible_water {
        ff.rigid_water = false;
    }
    // CLI files are relative to the working directory, not the config file.
    if let Some(rules) = &opts.rules {
        config.rules_file = Some(absolute(rules));
    }
    if let Some(params) = &opts.params {
        config.params_file = Some(absolute(params));
    }
}

fn apply_preparation(config: &mut PipelineConfig, opts: &PreparationOptions) {
    let build = &mut config.build;
    if let Some(ph) = opts.ph {
        build.ph = ph;
    }
    if let Some(his) = opts.his {
        build.his_strategy = his.into();
    }
    build.remove_ions |= opts.no_ions;
    build.remove_hetero |= opts.no_hetero;
    build.remove_residues.extend(opts.remove.iter().cloned());
    if let Some(cutoff) = opts.ss_cutoff {
        build.disulfide_cutoff = cutoff;
    }

    let solvation = &mut build.solvation;
    if opts.no_solvate {
        solvation.enabled = false;
    }
    if let Some(padding) = opts.padding {
        solvation.padding = padding;
    }
    if let Some(spacing) = opts.water_spacing {
        solvation.water_spacing = spacing;
    }
    if let Some(cutoff) = opts.vdw_cutoff {
        solvation.vdw_cutoff = cutoff;
    }
    if let Some(cation) = opts.cation {
        solvation.cations = vec![cation.into()];
    }
    if let Some(anion) = opts.anion {
        solvation.anions = vec![anion.into()];
    }
    if let Some(charge) = opts.target_charge {
        solvation.target_charge = charge;
    }
    if let Some(seed) = opts.solvation_seed {
        solvation.seed = Some(seed);
    }
}

fn apply_dynamics(config: &mut PipelineConfig, opts: &DynamicsOptions) {
    let run = &mut config.run;
    if let Some(t) = opts.temperature {
        run.temperature = t;
    }
    if let Some(friction) = opts.friction {
        run.friction = friction;
    }
    if let Some(dt) = opts.timestep {
        run.timestep = dt;
    }
    if let Some(duration) = opts.duration {
        run.duration = duration;
        run.steps = None;
    }
    if let Some(steps) = opts.steps {
        run.steps = Some(steps);
    }
    if let Some(interval) = opts.record_interval {
        run.record_interval = interval;
    }
    if let Some(seed) = opts.seed {
        run.seed = Some(seed);
    }
    if let Some(tol) = opts.minimize_tolerance {
        run.minimize_tolerance = tol;
    }
    if let Some(max_iter) = opts.minimize_max_iterations {
        run.minimize_max_iterations = max_iter;
    }
}

fn apply_output(config: &mut PipelineConfig, opts: &OutputOptions) {
    if let Some(dir) = &opts.output {
        config.output.directory = absolute(dir);
    }
    if let Some(format) = opts.format {
        config.output.format = format.into();
    }
    if opts.no_topology {
        config.output.write_topology = false;
    }
}

fn absolute(path: &std::path::Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
