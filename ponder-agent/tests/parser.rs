use ponder_agent::{AgentError, AgentStep, ReActOutputParser};
use ponder_core::{Runnable, StreamEvent};

use futures::StreamExt;

fn parse(text: &str) -> Result<AgentStep, AgentError> {
    ReActOutputParser::new().parse(text)
}

#[test]
fn final_answer_becomes_output() {
    for (completion, expected) in [
        ("Final Answer: 10", "10"),
        ("Thought: I now know the final answer\nFinal Answer:   42 apples  \n", "42 apples"),
        ("Final Answer:", ""),
        ("Final Answer: line one\nline two", "line one\nline two"),
    ] {
        match parse(completion).unwrap() {
            AgentStep::Finish(finish) => assert_eq!(finish.output(), Some(expected)),
            other => panic!("expected finish for {completion:?}, got {other:?}"),
        }
    }
}

#[test]
fn final_answer_wins_over_action() {
    let completion = "Action: search\nAction Input: rust\nFinal Answer: done";
    let step = parse(completion).unwrap();
    assert!(matches!(step, AgentStep::Finish(ref finish) if finish.output() == Some("done")));

    let echoed = "Final Answer: the final answer to the original input question\nAction: search\nAction Input: rust";
    assert!(matches!(parse(echoed).unwrap(), AgentStep::Finish(_)));
}

#[test]
fn answer_is_taken_after_the_last_marker() {
    let completion = "Final Answer: draft\nThought: wait\nFinal Answer: 7";
    match parse(completion).unwrap() {
        AgentStep::Finish(finish) => assert_eq!(finish.output(), Some("7")),
        other => panic!("expected finish, got {other:?}"),
    }
}

#[test]
fn action_input_quotes_are_stripped() {
    let step = parse("Action: get_text_length\nAction Input: \"Hello, Leo!\"").unwrap();
    match step {
        AgentStep::Action(action) => {
            assert_eq!(action.tool, "get_text_length");
            assert_eq!(action.tool_input, "Hello, Leo!");
        }
        other => panic!("expected action, got {other:?}"),
    }
}

#[test]
fn action_keeps_thought_in_log() {
    let completion = "Thought: I should measure it\nAction: get_text_length\nAction Input: abc";
    let AgentStep::Action(action) = parse(completion).unwrap() else {
        panic!("expected action");
    };
    assert_eq!(action.log, completion);
    assert_eq!(action.thought(), "I should measure it");
}

#[test]
fn action_input_stops_at_a_stop_marker() {
    let completion = "Action: search\nAction Input: rust\nObservation: made up result";
    let AgentStep::Action(action) = parse(completion).unwrap() else {
        panic!("expected action");
    };
    assert_eq!(action.tool_input, "rust");

    let custom = ReActOutputParser::with_stop_markers(vec!["<END>".to_string()]);
    let AgentStep::Action(action) = custom.parse("Action: search\nAction Input: a<END>b").unwrap()
    else {
        panic!("expected action");
    };
    assert_eq!(action.tool_input, "a");
}

#[test]
fn malformed_completions_are_parse_errors() {
    for completion in [
        "I think the answer is 10",
        "Action: search",
        "Action:\nAction Input: rust",
        "",
        "final answer: 10",
    ] {
        let err = parse(completion).unwrap_err();
        match err {
            AgentError::Parse { output, .. } => assert_eq!(output, completion),
            other => panic!("expected parse error for {completion:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn parser_is_a_runnable() {
    let parser = ReActOutputParser::new();
    let step = parser.invoke("Final Answer: ok".to_string()).await.unwrap();
    assert!(matches!(step, AgentStep::Finish(_)));

    let events: Vec<_> = parser
        .stream("Action: search\nAction Input: 'rust'".to_string())
        .collect()
        .await;
    assert_eq!(
        events.into_iter().map(Result::unwrap).collect::<Vec<_>>(),
        vec![StreamEvent::Action {
            tool: "search".to_string(),
            input: "rust".to_string(),
        }]
    );

    let err = parser.invoke("nothing useful".to_string()).await.unwrap_err();
    assert!(matches!(err, ponder_core::PonderError::ParseFailed { .. }));
}
