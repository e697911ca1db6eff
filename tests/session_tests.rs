//! End-to-end tests of a chat session against a scripted in-memory transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, StreamExt};

use griseo::chat::ChatSession;
use griseo::{
    ChunkStream, Error, ErrorKind, Model, Renderer, Result, RetryPolicy, Role, StreamChunk,
    Transport, Turn,
};

/// What the transport does on one call.
enum Step {
    Fail(Error),
    Stream(Vec<Result<StreamChunk>>),
    /// Yields the chunks, then never finishes.
    Stall(Vec<StreamChunk>),
}

#[derive(Default)]
struct Scripted {
    steps: Mutex<VecDeque<Step>>,
    repeat_rate_limit: bool,
    seen: Mutex<Vec<Vec<Turn>>>,
}

impl Scripted {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            ..Self::default()
        })
    }

    fn always_rate_limited() -> Arc<Self> {
        Arc::new(Self {
            repeat_rate_limit: true,
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn history(&self, call: usize) -> Vec<Turn> {
        self.seen.lock().unwrap()[call].clone()
    }
}

#[async_trait::async_trait]
impl Transport for Scripted {
    async fn send_chat(&self, history: &[Turn], _: &Model) -> Result<ChunkStream> {
        self.seen.lock().unwrap().push(history.to_vec());
        if self.repeat_rate_limit {
            return Err(Error::rate_limit("slow down", None));
        }
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Stream(items)) => Ok(Box::pin(stream::iter(items))),
            Some(Step::Stall(chunks)) => Ok(Box::pin(
                stream::iter(chunks.into_iter().map(Ok)).chain(stream::pending()),
            )),
            None => panic!("transport called more often than scripted"),
        }
    }
}

#[derive(Debug, Default)]
struct Recorder {
    events: Vec<String>,
}

impl Renderer for Recorder {
    fn print_role(&mut self, role: Role) {
        self.events.push(format!("role:{role}"));
    }

    fn print_text(&mut self, text: &str) {
        self.events.push(format!("text:{text}"));
    }

    fn print_error(&mut self, error: &str) {
        self.events.push(format!("error:{error}"));
    }

    fn print_info(&mut self, info: &str) {
        self.events.push(format!("info:{info}"));
    }

    fn finish_response(&mut self) {
        self.events.push("newline".to_string());
    }

    fn print_interrupted(&mut self) {
        self.events.push("interrupted".to_string());
    }
}

fn hi_there() -> Step {
    Step::Stream(vec![
        Ok(StreamChunk::role(Role::Assistant)),
        Ok(StreamChunk::content("Hi")),
        Ok(StreamChunk::content(" there")),
    ])
}

fn session(transport: &Arc<Scripted>) -> ChatSession<Arc<Scripted>> {
    ChatSession::new(Arc::clone(transport), Model::default(), RetryPolicy::default())
}

#[tokio::test]
async fn successful_exchange_is_recorded() {
    let transport = Scripted::new(vec![hi_there()]);
    let mut session = session(&transport);
    let mut recorder = Recorder::default();

    let turn = session.submit("hello", &mut recorder).await.unwrap();

    assert_eq!(turn, Turn::assistant("Hi there"));
    assert_eq!(
        session.context().snapshot(),
        vec![Turn::user("hello"), Turn::assistant("Hi there")]
    );
    assert_eq!(transport.history(0), vec![Turn::user("hello")]);
    assert_eq!(
        recorder.events,
        vec!["role:assistant", "text:Hi", "text: there", "newline"]
    );
}

#[tokio::test(start_paused = true)]
async fn rate_limits_are_retried_until_success() {
    let transport = Scripted::new(vec![
        Step::Fail(Error::rate_limit("slow down", None)),
        Step::Fail(Error::rate_limit("slow down", Some(1))),
        Step::Stream(vec![
            Ok(StreamChunk::role(Role::Assistant)),
            Ok(StreamChunk::content("ok")),
        ]),
    ]);
    let mut session = session(&transport);

    let turn = session.submit("x", &mut Recorder::default()).await.unwrap();

    assert_eq!(turn, Turn::assistant("ok"));
    assert_eq!(transport.calls(), 3);
    assert_eq!(session.stats().last_attempts, Some(3));
    // Every attempt sends the same committed history.
    for call in 0..3 {
        assert_eq!(transport.history(call), vec![Turn::user("x")]);
    }
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_the_rate_limit() {
    let transport = Scripted::always_rate_limited();
    let mut session = session(&transport);

    let err = session.submit("x", &mut Recorder::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert_eq!(transport.calls(), 3);
    assert_eq!(session.context().snapshot(), vec![Turn::user("x")]);
}

#[tokio::test]
async fn invalid_request_keeps_the_user_turn() {
    let transport = Scripted::new(vec![Step::Fail(Error::bad_request(
        "context too long",
        Some("messages".to_string()),
    ))]);
    let mut session = session(&transport);

    let err = session.submit("x", &mut Recorder::default()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(transport.calls(), 1);
    assert_eq!(session.context().snapshot(), vec![Turn::user("x")]);
    assert_eq!(session.stats().last_attempts, Some(1));
}

#[tokio::test]
async fn session_is_usable_after_a_failure() {
    let transport = Scripted::new(vec![
        Step::Fail(Error::connection("refused", None)),
        hi_there(),
    ]);
    let mut session = session(&transport);
    let mut recorder = Recorder::default();

    let err = session.submit("first", &mut recorder).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);

    session.submit("second", &mut recorder).await.unwrap();
    assert_eq!(
        transport.history(1),
        vec![Turn::user("first"), Turn::user("second")]
    );
    assert_eq!(session.context().len(), 3);
}

#[tokio::test]
async fn mid_stream_failure_discards_partial_content() {
    let transport = Scripted::new(vec![Step::Stream(vec![
        Ok(StreamChunk::role(Role::Assistant)),
        Ok(StreamChunk::content("par")),
        Err(Error::streaming("connection reset", None)),
    ])]);
    let mut session = session(&transport);

    let err = session.submit("x", &mut Recorder::default()).await.unwrap_err();

    assert!(matches!(err, Error::Streaming { .. }));
    assert_eq!(transport.calls(), 1);
    assert_eq!(session.context().snapshot(), vec![Turn::user("x")]);
}

#[tokio::test]
async fn empty_stream_appends_an_empty_assistant_turn() {
    let transport = Scripted::new(vec![Step::Stream(Vec::new())]);
    let mut session = session(&transport);
    let mut recorder = Recorder::default();

    let turn = session.submit("x", &mut recorder).await.unwrap();

    assert_eq!(turn, Turn::assistant(""));
    assert_eq!(session.context().len(), 2);
    assert_eq!(recorder.events, vec!["newline"]);
}

#[tokio::test(start_paused = true)]
async fn interrupt_while_streaming_restores_history() {
    let transport = Scripted::new(vec![
        hi_there(),
        Step::Stall(vec![
            StreamChunk::role(Role::Assistant),
            StreamChunk::content("partial"),
        ]),
    ]);
    let mut session = session(&transport);
    let mut recorder = Recorder::default();
    session.submit("hello", &mut recorder).await.unwrap();
    let before = session.context().snapshot();

    let interrupt = session.interrupt_handle();
    let (result, ()) = tokio::join!(session.submit("tell me more", &mut recorder), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(interrupt.trigger());
    });

    let err = result.unwrap_err();
    assert!(err.is_interrupted());
    assert_eq!(err.kind(), ErrorKind::Interrupted);
    assert_eq!(session.context().snapshot(), before);
    assert_eq!(recorder.events.last().map(String::as_str), Some("interrupted"));
}

#[tokio::test(start_paused = true)]
async fn interrupt_cancels_backoff() {
    let transport = Scripted::always_rate_limited();
    let mut session = session(&transport);
    let interrupt = session.interrupt_handle();
    let mut recorder = Recorder::default();

    let (result, ()) = tokio::join!(session.submit("x", &mut recorder), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        interrupt.trigger();
    });

    assert!(result.unwrap_err().is_interrupted());
    assert_eq!(transport.calls(), 1);
    assert!(session.context().is_empty());
    assert_eq!(recorder.events, vec!["interrupted"]);
}

#[tokio::test]
async fn stale_interrupt_does_not_cancel_the_next_call() {
    let transport = Scripted::new(vec![hi_there()]);
    let mut session = session(&transport);
    // Idle, so the handler would exit instead.
    assert!(!session.interrupt_handle().trigger());

    let turn = session.submit("hello", &mut Recorder::default()).await.unwrap();
    assert_eq!(turn.content, "Hi there");
}

#[tokio::test]
async fn seed_is_sent_and_restored() {
    let seed = vec![
        Turn::system("You are terse."),
        Turn::user("ping"),
        Turn::assistant("pong"),
    ];
    let transport = Scripted::new(vec![hi_there()]);
    let mut session = session(&transport).with_seed(seed.clone());

    session.submit("hello", &mut Recorder::default()).await.unwrap();
    let mut expected = seed.clone();
    expected.push(Turn::user("hello"));
    assert_eq!(transport.history(0), expected);

    session.restart();
    assert_eq!(session.context().snapshot(), seed);
    session.restart();
    assert_eq!(session.context().snapshot(), seed);

    session.reset(None);
    session.reset(None);
    assert!(session.context().snapshot().is_empty());
}

#[tokio::test]
async fn oneshot_style_submit_hides_the_role() {
    let transport = Scripted::new(vec![hi_there()]);
    let mut session = session(&transport).with_echo_role(false);
    let mut recorder = Recorder::default();

    session.submit("hello", &mut recorder).await.unwrap();
    assert_eq!(recorder.events, vec!["text:Hi", "text: there", "newline"]);
}
