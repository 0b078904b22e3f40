//! `dscctl compile`

use std::path::PathBuf;

use clap::Args;
use dsc_policy::{compile, ClassifiedRule};

use crate::error::CliResult;
use crate::files;

#[derive(Args)]
pub struct CompileArgs {
    /// Classified rule file (YAML or JSON)
    #[arg(short, long)]
    pub rule: PathBuf,
}

/// The formula text, or a note that the pattern imposes no constraint.
pub fn run(args: &CompileArgs) -> CliResult<String> {
    let rule: ClassifiedRule = files::load(&args.rule)?;
    Ok(match compile(rule.pattern, &rule.rule, &rule.target)? {
        Some(formula) => formula.to_string(),
        None => format!("pattern {} has no formula", rule.pattern),
    })
}
