mod run;
mod view;

use run::run_simulation;
use view::run_view;

use anyhow::Result;

use crate::cli::Command;
use crate::display::Context;

pub fn dispatch(command: Command, ctx: Context) -> Result<()> {
    match command {
        Command::Run(args) => run_simulation(args, ctx),
        Command::View(args) => run_view(args, ctx),
    }
}
