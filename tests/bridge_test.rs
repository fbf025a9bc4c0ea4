//! Conversation-level behaviour of the completion bridge against a scripted API.

mod test_utils;

#[cfg(test)]
mod tests {
    use healthcare_assistant::bridge::{ CompletionBridge, HistoryWindow };
    use healthcare_assistant::llm::chat::{ drain_stream, ChatError };
    use healthcare_assistant::llm::CompletionParams;
    use healthcare_assistant::models::chat::{ Role, Turn };
    use healthcare_assistant::session::Session;
    use std::sync::Arc;

    use crate::test_utils::{ Script, ScriptedClient, GREETING, SYSTEM_PROMPT };

    fn bridge(client: Arc<ScriptedClient>, window: HistoryWindow) -> CompletionBridge {
        CompletionBridge::new(client, SYSTEM_PROMPT.to_string(), CompletionParams::default(), window)
    }

    #[tokio::test]
    async fn it_answers_the_headache_scenario() {
        let client = Arc::new(ScriptedClient::new(vec![Script::Reply(vec!["Try resting ", "and hydrating."])]));
        let bridge = bridge(client.clone(), HistoryWindow::Unbounded);
        let mut session = Session::new(GREETING);
        assert_eq!(session.transcript().all(), &[Turn::assistant(GREETING)]);

        let reply = bridge.respond(&mut session, "I have a headache").await.unwrap();
        assert_eq!(reply, "Try resting and hydrating.");

        let sent = &client.requests()[0];
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].role, "system");
        assert_eq!(sent[0].content, SYSTEM_PROMPT);
        assert_eq!(sent[1].role, "assistant");
        assert_eq!(sent[1].content, GREETING);
        assert_eq!(sent[2].role, "user");
        assert_eq!(sent[2].content, "I have a headache");

        assert_eq!(
            session.transcript().all(),
            &[
                Turn::assistant(GREETING),
                Turn::user("I have a headache"),
                Turn::assistant("Try resting and hydrating."),
            ]
        );
    }

    #[tokio::test]
    async fn it_grows_by_two_turns_per_submission() {
        let scripts = (0..4).map(|_| Script::Reply(vec!["ok"])).collect();
        let client = Arc::new(ScriptedClient::new(scripts));
        let bridge = bridge(client.clone(), HistoryWindow::Unbounded);
        let mut session = Session::new(GREETING);

        for i in 0..4 {
            bridge.respond(&mut session, &format!("question {}", i)).await.unwrap();
            assert_eq!(session.transcript().len(), 1 + 2 * (i + 1));
        }

        let users: Vec<&str> = session
            .transcript()
            .iter()
            .filter(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(users, vec!["question 0", "question 1", "question 2", "question 3"]);

        for (i, request) in client.requests().iter().enumerate() {
            assert_eq!(request.len(), 2 + 2 * i + 1);
        }
    }

    #[tokio::test]
    async fn it_concatenates_fragments_exactly() {
        let client = Arc::new(ScriptedClient::new(vec![Script::Reply(vec!["Hel", "lo", "", " world"])]));
        let bridge = bridge(client, HistoryWindow::Unbounded);
        let session = Session::new(GREETING);

        let reply = bridge.complete(&bridge.outbound(session.transcript())).await.unwrap();
        assert_eq!(reply, "Hello world");
    }

    #[tokio::test]
    async fn it_records_no_reply_when_the_request_is_rejected() {
        let client = Arc::new(ScriptedClient::new(vec![Script::RejectRequest]));
        let bridge = bridge(client, HistoryWindow::Unbounded);
        let mut session = Session::new(GREETING);

        let err = bridge.respond(&mut session, "hello?").await.unwrap_err();
        assert!(matches!(err, ChatError::Api { status: 401, .. }));

        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript().last(), Some(&Turn::user("hello?")));
    }

    #[tokio::test]
    async fn it_drops_partial_output_when_the_stream_breaks() {
        let client = Arc::new(ScriptedClient::new(vec![Script::BreakAfter(vec!["Half an ans"])]));
        let bridge = bridge(client, HistoryWindow::Unbounded);
        let mut session = Session::new(GREETING);

        assert!(bridge.respond(&mut session, "tell me").await.is_err());
        assert!(session.transcript().iter().all(|t| !t.content.contains("Half")));
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn it_sends_legacy_turns_as_assistant_but_keeps_them_stored() {
        let client = Arc::new(ScriptedClient::new(vec![Script::Reply(vec!["sure"])]));
        let bridge = bridge(client.clone(), HistoryWindow::Unbounded);
        let mut session = Session::new(GREETING);
        session.append(Turn::new(Role::Ai, "imported reply"));

        bridge.respond(&mut session, "and now?").await.unwrap();

        assert_eq!(client.requests()[0][2].role, "assistant");
        assert_eq!(session.transcript().all()[1].role, Role::Ai);
    }

    #[tokio::test]
    async fn it_limits_context_to_the_configured_window() {
        let scripts = (0..3).map(|_| Script::Reply(vec!["ok"])).collect();
        let client = Arc::new(ScriptedClient::new(scripts));
        let bridge = bridge(client.clone(), HistoryWindow::LastTurns(2));
        let mut session = Session::new(GREETING);

        for i in 0..3 {
            bridge.respond(&mut session, &format!("q{}", i)).await.unwrap();
        }

        let last = client.requests().pop().unwrap();
        assert_eq!(last.len(), 3);
        assert_eq!(last[0].role, "system");
        assert_eq!(last[1].content, "ok");
        assert_eq!(last[2].content, "q2");
        assert_eq!(session.transcript().len(), 7);
    }

    #[tokio::test]
    async fn it_exposes_the_fragments_lazily() {
        let client = Arc::new(ScriptedClient::new(vec![Script::Reply(vec!["a", "b"])]));
        let bridge = bridge(client, HistoryWindow::Unbounded);
        let mut session = Session::new(GREETING);

        let stream = bridge.open_turn(&mut session, "letters").await.unwrap();
        assert_eq!(session.transcript().len(), 2);

        let reply = drain_stream(stream).await.unwrap();
        bridge.record_reply(&mut session, &reply);
        assert_eq!(session.transcript().last(), Some(&Turn::assistant("ab")));
    }
}
