//! Interactive retail demo: a triage agent that answers directly or routes
//! the customer to sales or to issues and repairs.
//!
//! Usage: `retail_swarm [config.toml]`. Without a file, settings come from
//! the environment (`SWARM_MODEL`, `SWARM_MAX_ITERATIONS`, `OPENAI_API_BASE`,
//! `SWARM_LOG`). `OPENAI_API_KEY` must be set. End input (Ctrl-D) to quit.

use std::io::{self, Write};

use agent_swarm::{
    config, transfer_tool, Agent, AgentRef, FunctionTool, Message, OpenAIBackend, Swarm,
    SwarmConfig, ToolError, ToolOutcome, TurnObserver,
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const BANNER: &str = r"
  _______   _                                             _
 |__   __| (_)                      /\                   | |
    | |_ __ _  __ _  __ _  ___     /  \   __ _  ___ _ __ | |_
    | | '__| |/ _` |/ _` |/ _ \   / /\ \ / _` |/ _ \ '_ \| __|
    | | |  | | (_| | (_| |  __/  / ____ \ (_| |  __/ | | | |_
    |_|_|  |_|\__,_|\__, |\___| /_/    \_\__, |\___|_| |_|\__|
                     __/ |                __/ |
                    |___/                |___/

Swarm containing a triage agent that responds directly to user
requests or triages the request to a sales or refunds agent.
";

/// Only call this if explicitly asked to.
#[derive(Debug, Deserialize, JsonSchema)]
struct EscalateToHuman {
    summary: String,
}

/// Price should be in USD.
#[derive(Debug, Deserialize, JsonSchema)]
struct ExecuteOrder {
    product: String,
    price: i64,
}

/// Use to find item ID. Search query can be a description or keywords.
#[derive(Debug, Deserialize, JsonSchema)]
struct LookUpItem {
    search_query: String,
}

/// Request a refund on behalf of the customer.
#[derive(Debug, Deserialize, JsonSchema)]
struct ExecuteRefund {
    item_id: String,
    #[serde(default = "not_provided")]
    reason: String,
}

fn not_provided() -> String {
    "not provided".to_string()
}

/// Prints agent replies as `<agent>: <text>`.
struct ConsoleObserver;

impl TurnObserver for ConsoleObserver {
    fn on_text(&self, agent: &Agent, text: &str) {
        println!("{}: {}", agent.name(), text);
    }
}

/// Reads one line from stdin; `None` at end of input.
fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

async fn prompt_async(label: &'static str) -> io::Result<Option<String>> {
    tokio::task::spawn_blocking(move || prompt(label))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

fn escalate_to_human() -> agent_swarm::Result<FunctionTool> {
    FunctionTool::new("escalate_to_human", |args: EscalateToHuman| {
        println!("Escalating to human agent...");
        println!("\n=== Escalation Report ===");
        println!("Summary: {}", args.summary);
        println!("=========================\n");
        Err(ToolError::abort(args.summary))
    })
}

async fn confirm_order(args: ExecuteOrder) -> Result<ToolOutcome, ToolError> {
    println!("\n\n=== Order Summary ===");
    println!("Product: {}", args.product);
    println!("Price: ${}", args.price);
    println!("=================\n");

    let answer = prompt_async("Confirm order? y/n: ")
        .await
        .map_err(ToolError::failed)?
        .unwrap_or_default();
    if answer.trim().eq_ignore_ascii_case("y") {
        println!("Order execution successful!");
        Ok(ToolOutcome::json(json!({"message": "Success"})))
    } else {
        println!("Order cancelled!");
        Ok(ToolOutcome::json(json!({"message": "User cancelled order."})))
    }
}

fn execute_order() -> agent_swarm::Result<FunctionTool> {
    FunctionTool::new_async("execute_order", confirm_order)
}

fn look_up_item() -> agent_swarm::Result<FunctionTool> {
    FunctionTool::new("look_up_item", |args: LookUpItem| {
        let item_id = "item_132612938";
        debug!(query = %args.search_query, "Looking up item");
        println!("Found item: {}", item_id);
        Ok(ToolOutcome::json(json!({"item": item_id})))
    })
}

fn execute_refund() -> agent_swarm::Result<FunctionTool> {
    FunctionTool::new("execute_refund", |args: ExecuteRefund| {
        println!("\n\n=== Refund Summary ===");
        println!("Item ID: {}", args.item_id);
        println!("Reason: {}", args.reason);
        println!("=================\n");
        println!("Refund execution successful!");
        Ok(ToolOutcome::json(json!({"message": "success"})))
    })
}

/// Builds the three personas and returns the triage agent.
fn build_agents(model: &str) -> agent_swarm::Result<Agent> {
    let triage_ref = AgentRef::new();
    let sales_ref = AgentRef::new();
    let repairs_ref = AgentRef::new();

    let back_to_triage = transfer_tool(
        "transfer_back_to_triage",
        "Call this if the user brings up a topic outside of your purview, including escalating to human.",
        &triage_ref,
    )?;

    let triage = Agent::simple(
        "Triage Agent",
        "You are a customer service bot for ACME Inc. \
         Introduce yourself. Always be very brief. \
         Gather information to direct the customer to the right department. \
         But make your questions subtle and natural.",
    )
    .with_model(model)
    .with_temperature(0.0)
    .with_tool(transfer_tool(
        "transfer_to_sales_agent",
        "User for anything sales or buying related.",
        &sales_ref,
    )?)
    .with_tool(transfer_tool(
        "transfer_to_issues_and_repairs",
        "User for issues, repairs, or refunds.",
        &repairs_ref,
    )?)
    .with_tool(escalate_to_human()?);

    let sales = Agent::simple(
        "Sales Agent",
        "You are a sales agent for ACME Inc. \
         Always answer in a sentence or less. \
         Follow the following routine with the user:\n\
         1. Ask them about any problems in their life related to catching roadrunners.\n\
         2. Casually mention one of ACME's crazy made-up products can help.\n \
         - Don't mention price.\n\
         3. Once the user is bought in, drop a ridiculous price.\n\
         4. Only after everything, and if the user says yes, \
         tell them a crazy caveat and execute their order.\n",
    )
    .with_model(model)
    .with_temperature(0.0)
    .with_tool(execute_order()?)
    .with_tool(back_to_triage.clone());

    let repairs = Agent::simple(
        "Issues and Repairs Agent",
        "You are a customer support agent for ACME Inc. \
         Always answer in a sentence or less. \
         Follow the following routine with the user:\n\
         1. First, ask probing questions and understand the user's problem deeper.\n \
         - unless the user has already provided a reason.\n\
         2. Propose a fix (make one up).\n\
         3. ONLY if not satisfied, offer a refund.\n\
         4. If accepted, search for the ID and then execute refund.",
    )
    .with_model(model)
    .with_temperature(0.0)
    .with_tool(execute_refund()?)
    .with_tool(look_up_item()?)
    .with_tool(back_to_triage);

    triage_ref.bind(triage.clone())?;
    sales_ref.bind(sales)?;
    repairs_ref.bind(repairs)?;
    Ok(triage)
}

fn load_config() -> agent_swarm::Result<SwarmConfig> {
    match std::env::args().nth(1) {
        Some(path) => config::from_file(path),
        None => Ok(config::from_env()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    println!("{}", BANNER);

    let mut agent = build_agents(&config.default_model)?;
    let swarm = Swarm::from_config(OpenAIBackend::from_config(&config), &config)
        .with_observer(ConsoleObserver);
    let mut messages: Vec<Message> = Vec::new();

    while let Some(input) = prompt_async("\nUser: ").await? {
        messages.push(Message::user(input));

        match swarm.run_turn(&agent, &messages).await {
            Ok(result) => {
                agent = result.agent;
                messages.extend(result.messages);
            }
            Err(err) if err.is_session_abort() => {
                info!(error = %err, "Session ended by escalation");
                return Ok(());
            }
            Err(err) => {
                // The failed turn leaves no trace; the user can rephrase.
                error!(error = %err, agent = %agent.name(), "Turn failed");
                messages.pop();
            }
        }
    }

    println!("\n\nThat's all folks!");
    Ok(())
}
