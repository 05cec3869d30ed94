//! Run one supervisor request from the command line and print the result.
//!
//! Usage: run_task [--thread <id>] <task text...>

use dotenv::dotenv;

use foreman_backend::agents::SupervisorRequest;
use foreman_backend::config::Config;
use foreman_backend::AppState;

fn parse_args(args: Vec<String>) -> Result<SupervisorRequest, String> {
    let mut thread_id = None;
    let mut words = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--thread" {
            thread_id = Some(iter.next().ok_or("--thread needs a value")?);
        } else {
            words.push(arg);
        }
    }
    let input = words.join(" ");
    if input.trim().is_empty() {
        return Err("Usage: run_task [--thread <id>] <task text...>".to_string());
    }
    Ok(SupervisorRequest {
        input,
        thread_id: Some(thread_id.unwrap_or_else(|| "cli-run".to_string())),
        context: None,
    })
}

#[tokio::main]
async fn main() -> Result<(), String> {
    dotenv().ok();
    env_logger::init();

    let request = parse_args(std::env::args().skip(1).collect())?;
    let state = AppState::from_config(Config::from_env()?)?;

    log::info!("Starting run on thread {:?}", request.thread_id);
    let outcome = state.supervisor.run(request).await?;

    println!("\n{}", "=".repeat(60));
    println!("FINAL OUTPUT ({} iteration(s)):", outcome.iterations);
    println!("{}", "=".repeat(60));
    println!("{}", outcome.output);

    if outcome.todos.is_empty() {
        println!("\n✅ All todos completed!");
    } else {
        println!("\nRemaining todos: {}", outcome.todos.len());
        for (i, todo) in outcome.todos.iter().enumerate() {
            println!("  {}. [{}] {}", i + 1, todo.id, todo.text);
        }
    }
    Ok(())
}
