use std::time::Duration;

use agenthub_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use serde_json::json;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::tool::from_fn;
use crate::{AgentBuilder, AgentState, RetryPolicy, TerminationReason};

fn builder(provider: &TestModelProvider) -> AgentBuilder {
    AgentBuilder::with_model_provider(provider.clone())
        .with_retry_policy(RetryPolicy::none())
        .with_tool(from_fn(
            "finish",
            "Finishes the task.",
            json!({ "type": "object" }),
            |_| Ok("done".to_owned()),
        ))
        .with_terminal_command("finish")
}

#[tokio::test]
async fn test_simple_task() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([
        PresetEvent::MessageDelta("Hi, ".to_owned()),
        PresetEvent::MessageDelta("what can I do for you?".to_owned()),
    ]));

    let (idle_tx, mut idle_rx) = watch::channel::<bool>(false);

    let agent = builder(&provider)
        .on_idle(move || {
            idle_tx.send(true).unwrap();
        })
        .build();
    let result_rx = agent.enqueue_task("Hello");

    timeout(Duration::from_millis(500), idle_rx.wait_for(|v| *v))
        .await
        .unwrap()
        .unwrap();

    let result = result_rx.await.unwrap();
    assert_eq!(result.reason, TerminationReason::NoCommands);
    assert_eq!(result.summary(), "Thinking complete - no action needed");
}

#[tokio::test]
async fn test_tasks_run_on_fresh_loops() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([
        PresetEvent::tool_call("a", "finish", json!({})),
    ]));
    provider.add_response(PresetResponse::with_events([
        PresetEvent::tool_call("b", "finish", json!({})),
    ]));

    let agent = builder(&provider).build();
    let first = agent.enqueue_task("First");
    let second = agent.enqueue_task("Second");

    let first = timeout(Duration::from_millis(500), first)
        .await
        .unwrap()
        .unwrap();
    let second = timeout(Duration::from_millis(500), second)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.state, AgentState::Finished);
    assert_eq!(second.state, AgentState::Finished);
    // The second task does not see the first task's conversation.
    assert_eq!(second.log.messages()[0].content(), Some("Second"));
    assert_eq!(second.log.len(), 3);

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages.len(), 1);

    assert!(!agent.is_running().await.unwrap());
    assert_eq!(agent.pending_tasks().await.unwrap(), 0);
}

#[tokio::test]
async fn test_stop_running_task() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_millis(50));
    for id in ["a", "b", "c"] {
        provider.add_response(PresetResponse::with_events([
            PresetEvent::tool_call(id, "noop", json!({})),
        ]));
    }

    let agent = builder(&provider)
        .with_tool(from_fn("noop", "Does nothing.", json!({}), |_| {
            Ok(String::new())
        }))
        .build();
    let result_rx = agent.enqueue_task("Keep busy");

    // Let the first round start before stopping.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(agent.is_running().await.unwrap());
    agent.stop();

    let result = timeout(Duration::from_millis(1000), result_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.reason, TerminationReason::Stopped);
    assert_eq!(result.steps, 1);
}

#[tokio::test]
async fn test_shutdown_drops_pending_results() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_millis(200));
    provider.add_response(PresetResponse::text("slow"));

    let agent = builder(&provider).build();
    let result_rx = agent.enqueue_task("Slow task");
    tokio::time::sleep(Duration::from_millis(10)).await;
    agent.shutdown();

    let result = timeout(Duration::from_millis(500), result_rx).await.unwrap();
    assert!(result.is_err());
    assert!(agent.run("Too late").await.is_err());
}

#[tokio::test]
async fn test_dropping_handles_stops_host() {
    let mut provider = TestModelProvider::default();
    provider.set_delay(Duration::from_millis(200));
    provider.add_response(PresetResponse::text("slow"));

    let agent = builder(&provider).build();
    let clone = agent.clone();
    let result_rx = agent.enqueue_task("Slow task");
    drop(agent);
    // A remaining clone keeps the host alive.
    assert!(clone.is_running().await.unwrap());

    drop(clone);
    let result = timeout(Duration::from_millis(500), result_rx).await.unwrap();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_panicking_task_frees_the_host() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Hello again."));

    let agent = builder(&provider)
        .on_transcript(|text, _| {
            if text == "Explode" {
                panic!("transcript observer exploded");
            }
        })
        .build();
    let crashed = agent.enqueue_task("Explode");
    let result = timeout(Duration::from_millis(500), crashed).await.unwrap();
    assert!(result.is_err());

    // The queue keeps going after the crash.
    let result = timeout(Duration::from_millis(500), agent.run("Hello"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.reason, TerminationReason::NoCommands);
    assert!(!agent.is_running().await.unwrap());
}
