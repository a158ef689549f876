use bat::WrappingMode;
use console::style;
use reagent::agent::{RunOutcome, RunStatus};
use reagent::models::message::{Message, MessageContent};
use reagent::models::role::Role;
use reagent::models::tool::Tool;

const THEME: &str = "zenburn";

fn print_markdown(content: &str) {
    let printed = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(THEME)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print();
    if printed.is_err() {
        println!("{}", content);
    }
}

fn print_json(content: &str, title: String) {
    let printed = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()).name(title))
        .theme(THEME)
        .language("JSON")
        .grid(true)
        .header(true)
        .wrapping_mode(WrappingMode::Character)
        .print();
    if printed.is_err() {
        println!("{}", content);
    }
}

/// Print the tool traffic of a run, skipping the seeded system and user messages
pub fn render_transcript(messages: &[Message]) {
    for message in messages.iter().filter(|m| m.role != Role::System && m.role != Role::User) {
        for content in &message.content {
            match content {
                MessageContent::Text(text) if message.role == Role::Assistant && message.has_tool_requests() => {
                    println!("{}", style(text).dim());
                }
                MessageContent::Text(_) => {}
                MessageContent::ToolRequest(request) => {
                    let arguments = serde_json::to_string_pretty(&request.tool_call.arguments)
                        .unwrap_or_else(|_| request.tool_call.arguments_string());
                    print_json(
                        &arguments,
                        format!("Tool Request: {} ({})", request.tool_call.name, request.id),
                    );
                }
                MessageContent::ToolResponse(response) => {
                    print_json(
                        &response.as_model_text(),
                        format!("Tool Response: {}", response.id),
                    );
                }
            }
        }
    }
}

pub fn render_outcome(outcome: &RunOutcome) {
    print_markdown(&outcome.final_text);
    println!();

    if outcome.status == RunStatus::IterationLimit {
        println!(
            "{}",
            style("The agent stopped before reaching a final answer.").yellow()
        );
    }
    println!(
        "{}",
        style(format!(
            "rounds: {}  tokens: {}",
            outcome.rounds_used,
            outcome
                .usage
                .total_tokens
                .map(|t| t.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        ))
        .dim()
    );
}

pub fn render_tools(tools: &[Tool]) {
    for tool in tools {
        println!("{} {}", style(&tool.name).cyan().bold(), style(&tool.description).dim());
        let schema = serde_json::to_string_pretty(&tool.input_schema).unwrap_or_default();
        print_json(&schema, format!("{} input schema", tool.name));
        println!();
    }
}
