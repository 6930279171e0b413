mod common;

use common::{
    BrokenTool, FailingLlm, ScriptedLlm, StubTool, LENGTH_ACTION, LENGTH_FINISH, LENGTH_QUESTION,
};
use ponder_agent::{AgentError, AgentEvent, AgentExecutor, LoopPhase, OUTPUT_KEY};
use ponder_core::PonderError;

fn length_agent(llm: ScriptedLlm, tool: StubTool) -> AgentExecutor {
    AgentExecutor::builder()
        .llm(llm)
        .tool(tool)
        .build()
        .unwrap()
}

#[tokio::test]
async fn answers_after_one_tool_call() {
    let llm = ScriptedLlm::new([LENGTH_ACTION, LENGTH_FINISH]);
    let tool = StubTool::new("get_text_length", "10");
    let agent = length_agent(llm.clone(), tool.clone());

    let output = agent.run(LENGTH_QUESTION).await.unwrap();

    assert_eq!(output.return_values.len(), 1);
    assert_eq!(output.return_values.get(OUTPUT_KEY).map(String::as_str), Some("10"));
    assert!(output.intermediate_steps.is_empty());
    assert_eq!(tool.seen(), vec!["Hello, Leo!".to_string()]);
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn second_prompt_carries_the_observation() {
    let llm = ScriptedLlm::new([LENGTH_ACTION, LENGTH_FINISH]);
    let agent = length_agent(llm.clone(), StubTool::new("get_text_length", "10"));
    agent.run(LENGTH_QUESTION).await.unwrap();

    let prompts = llm.prompts();
    assert!(prompts[0].ends_with(&format!("Question: {LENGTH_QUESTION}\nThought:")));
    assert!(prompts[0].contains("get_text_length: stub tool for tests"));
    assert!(prompts[0].contains("[get_text_length]"));
    assert!(prompts[1].ends_with(
        "Thought: I should measure the text\nAction: get_text_length\nAction Input: Hello, Leo!\nObservation: 10\nThought:"
    ));

    for request in llm.requests() {
        assert_eq!(request.stop, vec!["\nObservation".to_string()]);
        assert_eq!(request.temperature, Some(0.0));
    }
}

#[tokio::test]
async fn intermediate_steps_are_returned_on_request() {
    let llm = ScriptedLlm::new([LENGTH_ACTION, LENGTH_FINISH]);
    let agent = AgentExecutor::builder()
        .llm(llm)
        .tool(StubTool::new("get_text_length", "10"))
        .return_intermediate_steps(true)
        .build()
        .unwrap();

    let output = agent.run(LENGTH_QUESTION).await.unwrap();
    assert_eq!(output.intermediate_steps.len(), 1);
    assert_eq!(output.intermediate_steps[0].action.tool, "get_text_length");
    assert_eq!(output.intermediate_steps[0].observation, "10");
}

#[tokio::test]
async fn unknown_tool_aborts_with_scratchpad_unchanged() {
    let llm = ScriptedLlm::new(["Action: weather\nAction Input: Paris"]);
    let agent = length_agent(llm, StubTool::new("get_text_length", "10"));

    let mut run = agent.start(LENGTH_QUESTION);
    let mut error = None;
    while let Some(event) = run.next_event().await {
        if let Err(err) = event {
            error = Some(err);
        }
    }

    match error {
        Some(AgentError::ToolNotFound { tool, available }) => {
            assert_eq!(tool, "weather");
            assert_eq!(available, vec!["get_text_length".to_string()]);
        }
        other => panic!("expected ToolNotFound, got {other:?}"),
    }
    assert!(run.session().scratchpad().is_empty());
    assert_eq!(run.session().step_count(), 0);
    assert_eq!(run.phase(), LoopPhase::Failed);
}

#[tokio::test]
async fn step_limit_stops_a_looping_model() {
    let llm = ScriptedLlm::new([LENGTH_ACTION]);
    let tool = StubTool::new("get_text_length", "10");
    let agent = AgentExecutor::builder()
        .llm(llm.clone())
        .tool(tool.clone())
        .max_iterations(Some(5))
        .build()
        .unwrap();

    let err = agent.run(LENGTH_QUESTION).await.unwrap_err();

    assert!(matches!(err, AgentError::StepLimitExceeded { max_iterations: 5 }));
    assert_eq!(llm.calls(), 5);
    assert_eq!(tool.seen().len(), 5);
}

#[tokio::test]
async fn malformed_completion_aborts_with_scratchpad_unchanged() {
    let llm = ScriptedLlm::new(["I think the answer is 10"]);
    let agent = length_agent(llm.clone(), StubTool::new("get_text_length", "10"));

    let mut run = agent.start(LENGTH_QUESTION);
    let mut last = None;
    while let Some(event) = run.next_event().await {
        last = Some(event);
    }

    match last {
        Some(Err(AgentError::Parse { output, .. })) => {
            assert_eq!(output, "I think the answer is 10")
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    assert!(run.session().scratchpad().is_empty());
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn tool_failure_is_fed_back_and_the_loop_continues() {
    let llm = ScriptedLlm::new([
        "Thought: try it\nAction: broken\nAction Input: x",
        "Thought: the tool failed\nFinal Answer: could not compute",
    ]);
    let agent = AgentExecutor::builder()
        .llm(llm.clone())
        .tool(BrokenTool)
        .return_intermediate_steps(true)
        .build()
        .unwrap();

    let output = agent.run("do it").await.unwrap();

    assert_eq!(output.output(), Some("could not compute"));
    assert_eq!(
        output.intermediate_steps[0].observation,
        "Tool 'broken' failed: execution failed: disk on fire"
    );
    assert!(llm.prompts()[1].contains("Observation: Tool 'broken' failed"));
}

#[tokio::test]
async fn model_errors_are_surfaced() {
    let agent = AgentExecutor::builder()
        .llm(FailingLlm)
        .tool(StubTool::new("search", "ok"))
        .build()
        .unwrap();

    let err = agent.run("anything").await.unwrap_err();
    assert!(matches!(err, AgentError::Model(PonderError::LlmProvider(_))));
}

#[tokio::test]
async fn unbounded_runs_until_the_model_finishes() {
    let mut script = vec![LENGTH_ACTION; 30];
    script.push(LENGTH_FINISH);
    let llm = ScriptedLlm::new(script);
    let agent = AgentExecutor::builder()
        .llm(llm.clone())
        .tool(StubTool::new("get_text_length", "10"))
        .max_iterations(None)
        .build()
        .unwrap();

    let output = agent.run(LENGTH_QUESTION).await.unwrap();
    assert_eq!(output.output(), Some("10"));
    assert_eq!(llm.calls(), 31);
}

#[tokio::test]
async fn finished_run_yields_nothing_more() {
    let agent = length_agent(
        ScriptedLlm::new([LENGTH_FINISH]),
        StubTool::new("get_text_length", "10"),
    );
    let mut run = agent.start(LENGTH_QUESTION);
    assert_eq!(run.phase(), LoopPhase::Rendering);

    let mut finished = false;
    while let Some(event) = run.next_event().await {
        finished |= matches!(event, Ok(AgentEvent::Finished(_)));
    }
    assert!(finished);
    assert_eq!(run.phase(), LoopPhase::Finished);
    assert!(run.next_event().await.is_none());
}

#[tokio::test]
async fn sessions_are_independent() {
    let llm = ScriptedLlm::new([
        "Final Answer: first",
        "Final Answer: second",
        "Final Answer: third",
    ]);
    let agent = length_agent(llm.clone(), StubTool::new("get_text_length", "10"));

    let (a, b, c) = tokio::join!(agent.run("one"), agent.run("two"), agent.run("three"));
    let mut answers: Vec<String> = [a, b, c]
        .into_iter()
        .map(|output| output.unwrap().output().unwrap_or_default().to_string())
        .collect();
    answers.sort();
    assert_eq!(answers, vec!["first", "second", "third"]);
    assert_eq!(llm.calls(), 3);
}
