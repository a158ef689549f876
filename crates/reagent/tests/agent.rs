use anyhow::Result;
use async_trait::async_trait;
use reagent::agent::{Agent, AgentConfig, RunStatus};
use reagent::errors::{AgentError, AgentResult};
use reagent::models::content::Content;
use reagent::models::message::{Message, MessageContent};
use reagent::models::role::Role;
use reagent::models::tool::{Tool, ToolCall};
use reagent::providers::mock::MockProvider;
use reagent::registry::{Concurrency, FnHandler, ToolHandler, ToolRegistry};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn ticker_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ticker": {"type": "string", "description": "The ticker symbol, e.g. GOOG"}
        },
        "required": ["ticker"]
    })
}

/// Stock tools backed by fixed data, counting how often each one runs
struct StockTools {
    price_calls: Arc<AtomicUsize>,
    dividend_calls: Arc<AtomicUsize>,
}

impl StockTools {
    fn new() -> Self {
        Self {
            price_calls: Arc::new(AtomicUsize::new(0)),
            dividend_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn registry(&self) -> ToolRegistry {
        let price_calls = self.price_calls.clone();
        let dividend_calls = self.dividend_calls.clone();
        ToolRegistry::new()
            .with_tool(
                Tool::new(
                    "get_stock_price",
                    "Use this function to get the current price of a stock.",
                    ticker_schema(),
                ),
                FnHandler::new(move |args: Value| {
                    price_calls.fetch_add(1, Ordering::SeqCst);
                    let ticker = args["ticker"].as_str().unwrap_or_default();
                    if ticker == "FAIL" {
                        return Err(AgentError::ExecutionError(format!(
                            "No quote found for {}",
                            ticker
                        )));
                    }
                    Ok(Content::json(json!({"ticker": ticker, "current_price": 421.5})))
                }),
            )
            .and_then(|registry| {
                registry.with_tool(
                    Tool::new(
                        "get_dividend_date",
                        "Use this function to get the next dividend payment date of a stock.",
                        ticker_schema(),
                    ),
                    FnHandler::new(move |args: Value| {
                        dividend_calls.fetch_add(1, Ordering::SeqCst);
                        let ticker = args["ticker"].as_str().unwrap_or_default();
                        Ok(Content::json(json!({"ticker": ticker, "dividend_date": "2025-06-12"})))
                    }),
                )
            })
            .unwrap()
    }
}

fn price_request(ticker: &str) -> ToolCall {
    ToolCall::new("get_stock_price", json!({ "ticker": ticker }))
}

/// Role and content of every message, leaving out timestamps
fn transcript(messages: &[Message]) -> Vec<(Role, Vec<MessageContent>)> {
    messages
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect()
}

#[tokio::test]
async fn test_single_tool_call_then_answer() -> Result<()> {
    let tools = StockTools::new();
    let provider = MockProvider::new(vec![
        Message::assistant().with_tool_request("call_1", price_request("MSFT")),
        Message::assistant().with_text("MSFT is trading at $421.50."),
    ]);
    let agent = Agent::new(Box::new(provider), tools.registry(), AgentConfig::new(10));

    let outcome = agent.run("What is the price of MSFT?").await?;

    assert_eq!(outcome.final_text, "MSFT is trading at $421.50.");
    assert_eq!(outcome.rounds_used, 2);
    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(tools.price_calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_two_calls_in_one_turn() -> Result<()> {
    let tools = StockTools::new();
    let provider = MockProvider::new(vec![
        Message::assistant()
            .with_tool_request("call_1", price_request("AAPL"))
            .with_tool_request(
                "call_2",
                ToolCall::new("get_dividend_date", json!({"ticker": "AAPL"})),
            ),
        Message::assistant().with_text("AAPL trades at $421.50 and pays on 2025-06-12."),
    ]);
    let agent = Agent::new(
        Box::new(provider.clone()),
        tools.registry(),
        AgentConfig::new(10),
    );

    let outcome = agent.run("Price and dividend date of AAPL?").await?;

    assert_eq!(tools.price_calls.load(Ordering::SeqCst), 1);
    assert_eq!(tools.dividend_calls.load(Ordering::SeqCst), 1);
    assert!(outcome.final_text.contains("421.50"));
    assert!(outcome.final_text.contains("2025-06-12"));

    // The second model call saw both results, one message each, in request order
    let requests = provider.requests();
    let second = &requests[1];
    assert_eq!(second.len(), 5);
    let ids: Vec<&str> = second[3..]
        .iter()
        .flat_map(|m| m.tool_responses())
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, vec!["call_1", "call_2"]);
    assert_eq!(
        second[4].tool_responses()[0].tool_result,
        Ok(Content::json(json!({"ticker": "AAPL", "dividend_date": "2025-06-12"})))
    );
    Ok(())
}

#[tokio::test]
async fn test_iteration_limit_of_one() -> Result<()> {
    let tools = StockTools::new();
    let provider = MockProvider::new(vec![
        Message::assistant().with_tool_request("call_1", price_request("MSFT")),
        Message::assistant().with_tool_request("call_2", price_request("MSFT")),
    ]);
    let agent = Agent::new(
        Box::new(provider.clone()),
        tools.registry(),
        AgentConfig::new(1),
    );

    let outcome = agent.run("What is the price of MSFT?").await?;

    assert_eq!(provider.call_count(), 1);
    assert_eq!(outcome.rounds_used, 1);
    assert_eq!(outcome.status, RunStatus::IterationLimit);
    assert_eq!(
        outcome.final_text,
        "Incomplete answer: reached the maximum of 1 iterations without a final answer."
    );
    // The requested call still ran and its result was recorded
    assert_eq!(tools.price_calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.messages.last().map(|m| m.role), Some(Role::Tool));
    Ok(())
}

#[tokio::test]
async fn test_never_exceeds_max_iterations() -> Result<()> {
    for k in 1..=4 {
        let responses = (0..10)
            .map(|i| {
                let id = format!("call_{}", i);
                Message::assistant().with_tool_request(id, price_request("MSFT"))
            })
            .collect();
        let provider = MockProvider::new(responses);
        let agent = Agent::new(
            Box::new(provider.clone()),
            StockTools::new().registry(),
            AgentConfig::new(k),
        );

        let outcome = agent.run("loop forever").await?;

        assert_eq!(provider.call_count(), k);
        assert_eq!(outcome.rounds_used, k);
        assert!(!outcome.is_complete());
    }
    Ok(())
}

#[tokio::test]
async fn test_unknown_tool_is_reported_to_model() -> Result<()> {
    let provider = MockProvider::new(vec![
        Message::assistant().with_tool_request(
            "call_1",
            ToolCall::new("get_weather", json!({"location": "Paris"})),
        ),
        Message::assistant().with_text("I cannot check the weather."),
    ]);
    let agent = Agent::new(
        Box::new(provider.clone()),
        StockTools::new().registry(),
        AgentConfig::new(5),
    );

    let outcome = agent.run("Weather in Paris?").await?;

    assert_eq!(outcome.rounds_used, 2);
    let response = outcome.messages[3].tool_responses()[0].clone();
    assert_eq!(response.id, "call_1");
    assert_eq!(
        response.tool_result,
        Err(AgentError::ToolNotFound("get_weather".to_string()))
    );
    assert!(response.as_model_text().contains("Tool not found: get_weather"));
    Ok(())
}

#[tokio::test]
async fn test_first_round_answer_runs_no_tools() -> Result<()> {
    let tools = StockTools::new();
    let provider = MockProvider::new(vec![Message::assistant().with_text("Hello!")]);
    let agent = Agent::new(Box::new(provider), tools.registry(), AgentConfig::new(10));

    let outcome = agent.run("Hi").await?;

    assert_eq!(outcome.rounds_used, 1);
    assert_eq!(outcome.messages.len(), 3);
    assert_eq!(tools.price_calls.load(Ordering::SeqCst), 0);
    assert_eq!(tools.dividend_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_empty_final_text() -> Result<()> {
    let provider = MockProvider::new(vec![]);
    let agent = Agent::new(
        Box::new(provider),
        StockTools::new().registry(),
        AgentConfig::new(3),
    );

    let outcome = agent.run("Hi").await?;

    assert_eq!(outcome.final_text, "");
    assert_eq!(outcome.status, RunStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_failed_call_does_not_stop_others() -> Result<()> {
    for parallel in [false, true] {
        let tools = StockTools::new();
        let provider = MockProvider::new(vec![
            Message::assistant()
                .with_tool_request("call_1", price_request("FAIL"))
                .with_tool_request("call_2", price_request("MSFT"))
                .with_tool_request(
                    "call_3",
                    ToolCall::new("get_dividend_date", json!("not an object")),
                ),
            Message::assistant().with_text("Partial answer."),
        ]);
        let agent = Agent::new(
            Box::new(provider),
            tools.registry(),
            AgentConfig::new(5).with_parallel_tool_calls(parallel),
        );

        let outcome = agent.run("prices").await?;

        assert_eq!(outcome.final_text, "Partial answer.");
        assert_eq!(tools.price_calls.load(Ordering::SeqCst), 2);
        assert_eq!(tools.dividend_calls.load(Ordering::SeqCst), 0);

        let responses: Vec<_> = outcome.messages[3..6]
            .iter()
            .map(|m| m.tool_responses()[0].clone())
            .collect();
        assert_eq!(responses[0].id, "call_1");
        assert!(matches!(
            responses[0].tool_result,
            Err(AgentError::ExecutionError(_))
        ));
        assert_eq!(responses[1].id, "call_2");
        assert!(responses[1].tool_result.is_ok());
        assert_eq!(responses[2].id, "call_3");
        assert!(matches!(
            responses[2].tool_result,
            Err(AgentError::InvalidParameters(_))
        ));
    }
    Ok(())
}

/// Async handler that panics on every call
struct PanickingTool;

#[async_trait]
impl ToolHandler for PanickingTool {
    async fn call(&self, _arguments: Value) -> AgentResult<Content> {
        panic!("handler exploded")
    }
}

#[tokio::test]
async fn test_panicking_tool_does_not_stop_others() -> Result<()> {
    for parallel in [false, true] {
        let tools = StockTools::new();
        let registry = tools
            .registry()
            .with_tool(
                Tool::new("explode", "Panics", json!({"type": "object"})),
                PanickingTool,
            )?
            .with_tool(
                Tool::new("explode_sync", "Panics on the blocking pool", json!({"type": "object"})),
                FnHandler::new(|_args: Value| -> AgentResult<Content> { panic!("sync handler exploded") }),
            )?;
        let provider = MockProvider::new(vec![
            Message::assistant()
                .with_tool_request("call_1", ToolCall::new("explode", json!({})))
                .with_tool_request("call_2", price_request("MSFT"))
                .with_tool_request("call_3", ToolCall::new("explode_sync", json!({}))),
            Message::assistant().with_text("Recovered."),
        ]);
        let agent = Agent::new(
            Box::new(provider),
            registry,
            AgentConfig::new(3).with_parallel_tool_calls(parallel),
        );

        let outcome = agent.run("go").await?;

        assert_eq!(outcome.final_text, "Recovered.");
        assert_eq!(tools.price_calls.load(Ordering::SeqCst), 1);
        let results: Vec<_> = outcome
            .messages
            .iter()
            .flat_map(|m| m.tool_responses())
            .map(|r| (r.id.clone(), r.tool_result.clone()))
            .collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "call_1");
        assert!(matches!(&results[0].1, Err(AgentError::ExecutionError(msg)) if msg.contains("handler exploded")));
        assert_eq!(results[1].0, "call_2");
        assert!(results[1].1.is_ok());
        assert_eq!(results[2].0, "call_3");
        assert!(matches!(&results[2].1, Err(AgentError::ExecutionError(msg)) if msg.contains("sync handler exploded")));
    }
    Ok(())
}

#[tokio::test]
async fn test_repeated_runs_produce_same_transcript() -> Result<()> {
    let script = || {
        vec![
            Message::assistant()
                .with_text("Looking that up.")
                .with_tool_request("call_1", price_request("MSFT"))
                .with_tool_request("call_2", price_request("AAPL")),
            Message::assistant()
                .with_tool_request("call_3", ToolCall::new("get_dividend_date", json!({"ticker": "MSFT"}))),
            Message::assistant().with_text("Done."),
        ]
    };

    let mut transcripts = Vec::new();
    for _ in 0..3 {
        let agent = Agent::new(
            Box::new(MockProvider::new(script())),
            StockTools::new().registry(),
            AgentConfig::new(10).with_parallel_tool_calls(true),
        );
        let outcome = agent.run("MSFT and AAPL").await?;
        transcripts.push(transcript(&outcome.messages));
    }

    assert_eq!(transcripts[0].len(), 8);
    assert_eq!(transcripts[0], transcripts[1]);
    assert_eq!(transcripts[1], transcripts[2]);
    Ok(())
}

/// Sleeps on every call and remembers the highest number of calls in flight at once
struct SlowTool {
    concurrency: Concurrency,
    in_flight: AtomicUsize,
    peak: Arc<AtomicUsize>,
}

impl SlowTool {
    fn new(concurrency: Concurrency) -> (Self, Arc<AtomicUsize>) {
        let peak = Arc::new(AtomicUsize::new(0));
        let tool = Self {
            concurrency,
            in_flight: AtomicUsize::new(0),
            peak: peak.clone(),
        };
        (tool, peak)
    }
}

#[async_trait]
impl ToolHandler for SlowTool {
    async fn call(&self, arguments: Value) -> AgentResult<Content> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Content::json(arguments))
    }

    fn concurrency(&self) -> Concurrency {
        self.concurrency
    }
}

#[tokio::test]
async fn test_parallel_execution_respects_concurrency() -> Result<()> {
    let (exclusive, exclusive_peak) = SlowTool::new(Concurrency::Exclusive);
    let (shared, shared_peak) = SlowTool::new(Concurrency::Shared);
    let schema = json!({"type": "object", "properties": {"n": {"type": "integer"}}});
    let registry = ToolRegistry::new()
        .with_tool(Tool::new("exclusive", "one at a time", schema.clone()), exclusive)?
        .with_tool(Tool::new("shared", "many at once", schema), shared)?;

    let mut turn = Message::assistant();
    for i in 0..3 {
        turn = turn
            .with_tool_request(format!("ex_{}", i), ToolCall::new("exclusive", json!({"n": i})))
            .with_tool_request(format!("sh_{}", i), ToolCall::new("shared", json!({"n": i})));
    }
    let provider = MockProvider::new(vec![turn, Message::assistant().with_text("ok")]);
    let agent = Agent::new(
        Box::new(provider),
        registry,
        AgentConfig::new(3).with_parallel_tool_calls(true),
    );

    let outcome = agent.run("go").await?;

    assert_eq!(exclusive_peak.load(Ordering::SeqCst), 1);
    assert_eq!(shared_peak.load(Ordering::SeqCst), 3);

    // Results keep request order regardless of completion order
    let ids: Vec<String> = outcome
        .messages
        .iter()
        .flat_map(|m| m.tool_responses())
        .map(|r| r.id.clone())
        .collect();
    assert_eq!(ids, vec!["ex_0", "sh_0", "ex_1", "sh_1", "ex_2", "sh_2"]);
    Ok(())
}

#[tokio::test]
async fn test_tool_timeout_becomes_result() -> Result<()> {
    let (slow, _) = SlowTool::new(Concurrency::Exclusive);
    let registry = ToolRegistry::new().with_tool(
        Tool::new("slow", "takes a while", json!({"type": "object"})),
        slow,
    )?;
    let provider = MockProvider::new(vec![
        Message::assistant().with_tool_request("call_1", ToolCall::new("slow", json!({}))),
        Message::assistant().with_text("gave up"),
    ]);
    let timeout = Duration::from_millis(5);
    let agent = Agent::new(
        Box::new(provider),
        registry,
        AgentConfig::new(3).with_tool_timeout(timeout),
    );

    let outcome = agent.run("go").await?;

    assert_eq!(outcome.final_text, "gave up");
    assert_eq!(
        outcome.messages[3].tool_responses()[0].tool_result,
        Err(AgentError::Timeout(timeout))
    );
    Ok(())
}

#[tokio::test]
async fn test_agent_serves_concurrent_runs() -> Result<()> {
    let provider = MockProvider::new(vec![
        Message::assistant().with_text("first"),
        Message::assistant().with_text("second"),
    ]);
    let agent = Arc::new(Agent::new(
        Box::new(provider),
        StockTools::new().registry(),
        AgentConfig::new(2),
    ));

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let agent = agent.clone();
            tokio::spawn(async move { agent.run(&format!("query {}", i)).await })
        })
        .collect();

    let mut answers = Vec::new();
    for handle in handles {
        let outcome = handle.await??;
        assert_eq!(outcome.messages.len(), 3);
        answers.push(outcome.final_text);
    }
    answers.sort();
    assert_eq!(answers, vec!["first", "second"]);
    Ok(())
}

#[tokio::test]
async fn test_tool_timeout_applies_to_blocking_handlers() -> Result<()> {
    let registry = ToolRegistry::new().with_tool(
        Tool::new("sleepy", "blocks its thread", json!({"type": "object"})),
        FnHandler::new(|_args: Value| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(Content::text("finished"))
        }),
    )?;
    let provider = MockProvider::new(vec![
        Message::assistant().with_tool_request("call_1", ToolCall::new("sleepy", json!({}))),
        Message::assistant().with_text("moved on"),
    ]);
    let timeout = Duration::from_millis(20);
    let agent = Agent::new(
        Box::new(provider),
        registry,
        AgentConfig::new(3).with_tool_timeout(timeout),
    );

    let outcome = agent.run("go").await?;

    assert_eq!(outcome.final_text, "moved on");
    assert_eq!(
        outcome.messages[3].tool_responses()[0].tool_result,
        Err(AgentError::Timeout(timeout))
    );
    Ok(())
}
