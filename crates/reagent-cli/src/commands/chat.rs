use anyhow::Result;
use cliclack::input;
use console::style;
use reagent::agent::Agent;
use std::io::ErrorKind;

use super::run::ask;

const EXAMPLE_QUERIES: [&str; 3] = [
    "What is the current stock price for MSFT?",
    "What are the current prices and dividend dates for both MSFT and AAPL? Please provide a summary.",
    "Compare the stock prices of GOOGL and META. Which one is more expensive?",
];

enum Input {
    Query(String),
    Help,
    Exit,
    Empty,
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "quit" | "exit" | "q" => Input::Exit,
        "help" | "h" => Input::Help,
        "" => Input::Empty,
        _ => Input::Query(trimmed.to_string()),
    }
}

fn print_help() {
    println!("Ask anything about stock prices or dividend dates, for example:");
    for query in EXAMPLE_QUERIES {
        println!("  {}", style(query).cyan());
    }
    println!("{}", style("Type \"quit\" to leave.").dim());
}

/// Interactive loop; every query is answered by a fresh run
pub async fn execute(agent: &Agent, verbose: bool) -> Result<()> {
    cliclack::intro(style(" reagent ").on_cyan().black())?;
    println!(
        "{}",
        style("type \"help\" for example queries, \"quit\" to end the session").dim()
    );

    loop {
        let line: String = match input("Query:").placeholder("").interact() {
            Ok(line) => line,
            Err(e) if e.kind() == ErrorKind::Interrupted => break,
            Err(e) => return Err(e.into()),
        };

        match parse_input(&line) {
            Input::Exit => break,
            Input::Help => print_help(),
            Input::Empty => continue,
            Input::Query(query) => {
                // A failed run ends that query only
                if let Err(e) = ask(agent, &query, verbose).await {
                    println!("{}", style(format!("Error: {}", e)).red());
                }
            }
        }
        println!();
    }

    cliclack::outro("Goodbye!")?;
    Ok(())
}
