//! Log output of the `apideploy` command.
//!
//! Logs go to stderr. Stdout is reserved for the JSON that `deploy` and `plan` print.

mod headless;

use anyhow::Result;

/// Derived from the global `--verbose` and `--color` options.
pub(crate) struct Options {
    pub verbose: bool,
    pub color: bool,
}

pub(crate) trait Frontend {
    fn set_up(&self, options: &Options) -> Result<()>;
}

/// Install the global `tracing` subscriber. Call once, before any command runs.
pub(crate) fn set_up(options: Options) -> Result<Box<dyn Frontend>> {
    let logger = headless::HeadlessLogger {};
    logger.set_up(&options)?;
    Ok(Box::new(logger))
}
