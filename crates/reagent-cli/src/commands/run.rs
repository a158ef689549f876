use anyhow::Result;
use cliclack::spinner;
use reagent::agent::{Agent, RunOutcome};

use crate::render::{render_outcome, render_transcript};

/// Run one query behind a spinner and print the outcome
pub async fn ask(agent: &Agent, query: &str, verbose: bool) -> Result<RunOutcome> {
    let spin = spinner();
    spin.start("awaiting reply");
    let result = agent.run(query).await;
    spin.stop("");

    let outcome = result?;
    if verbose {
        render_transcript(&outcome.messages);
    }
    render_outcome(&outcome);
    Ok(outcome)
}

pub async fn execute(agent: &Agent, query: &str, verbose: bool) -> Result<()> {
    ask(agent, query, verbose).await?;
    Ok(())
}
