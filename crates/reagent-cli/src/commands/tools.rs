use anyhow::Result;
use reagent::registry::ToolRegistry;

use crate::render::render_tools;

pub fn execute(registry: &ToolRegistry) -> Result<()> {
    render_tools(registry.tools());
    Ok(())
}
