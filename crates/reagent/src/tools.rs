//! Ready made tools that can be registered with a [`crate::registry::ToolRegistry`].
pub mod stocks;
