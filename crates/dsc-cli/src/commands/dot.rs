//! `dscctl dot`

use std::path::PathBuf;

use clap::Args;
use dsc_petrinet::to_dot;

use crate::error::CliResult;
use crate::files;

#[derive(Args)]
pub struct DotArgs {
    /// Petri-net definition file
    #[arg(short, long, conflicts_with = "route", required_unless_present = "route")]
    pub net: Option<PathBuf>,

    /// Application route file, turned into a net
    #[arg(long)]
    pub route: Option<PathBuf>,
}

pub fn run(args: &DotArgs) -> CliResult<String> {
    let net = files::load_net(args.net.as_deref(), args.route.as_deref())?;
    Ok(to_dot(&net))
}
