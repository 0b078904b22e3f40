//! `dscctl verify`

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use dsc_gate::GateConfig;
use dsc_policy::ClassifiedRule;
use dsc_verifier::{EvalEnv, VerificationResult, Verifier, VerifyOptions};
use tracing::debug;

use crate::error::CliResult;
use crate::files;

#[derive(Args)]
pub struct VerifyArgs {
    /// Classified rule file (YAML or JSON)
    #[arg(short, long)]
    pub rule: PathBuf,

    /// Petri-net definition file
    #[arg(short, long, conflicts_with = "route", required_unless_present = "route")]
    pub net: Option<PathBuf>,

    /// Application route file, turned into a net
    #[arg(long)]
    pub route: Option<PathBuf>,

    /// Evaluation instant (RFC 3339), defaults to now
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,

    /// Start of usage (RFC 3339), for duration rules
    #[arg(long)]
    pub usage_start: Option<DateTime<Utc>>,
}

pub fn run(args: &VerifyArgs, config: &GateConfig) -> CliResult<VerificationResult> {
    let rule: ClassifiedRule = files::load(&args.rule)?;
    let net = files::load_net(args.net.as_deref(), args.route.as_deref())?;

    let mut env = args.now.map(EvalEnv::at).unwrap_or_else(EvalEnv::now);
    if let Some(start) = args.usage_start {
        env = env.with_usage_start(start);
    }

    debug!(
        net = %net.id(),
        pattern = %rule.pattern,
        target = %rule.target,
        "Verifying rule"
    );
    let verifier = Verifier::new(VerifyOptions {
        max_states: config.max_states,
    });
    Ok(verifier.verify_rule(rule.pattern, &rule.rule, &rule.target, &net, &env)?)
}
