use base64::{engine::general_purpose, Engine as _};
use tracing::debug;

use crate::models::{ChatRequest, ChatTurn, ResolvedLocation};
use crate::services::chat::{ChatBackend, ChatError};
use crate::services::locator::LocationResolver;
use crate::services::map_renderer::MapRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Where status text and transient notices go. The status line holds one
/// persistent line (location state); notices are fire-and-forget.
pub trait Notifier {
    fn status(&mut self, text: &str);
    fn notice(&mut self, level: NoticeLevel, message: &str);
}

/// The chat transcript widget.
pub trait TranscriptView {
    fn append(&mut self, turn: &ChatTurn);
    fn scroll_to_latest(&mut self);
}

/// One user-facing assistant session: location, map scene, transcript and
/// the pending image, driven through `start` and `submit`.
pub struct AssistantSession {
    resolver: LocationResolver,
    renderer: MapRenderer,
    backend: Box<dyn ChatBackend>,
    transcript_view: Box<dyn TranscriptView>,
    notifier: Box<dyn Notifier>,
    location: Option<ResolvedLocation>,
    pending_image: Option<Vec<u8>>,
    transcript: Vec<ChatTurn>,
}

impl AssistantSession {
    pub fn new(
        resolver: LocationResolver,
        renderer: MapRenderer,
        backend: Box<dyn ChatBackend>,
        transcript_view: Box<dyn TranscriptView>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            resolver,
            renderer,
            backend,
            transcript_view,
            notifier,
            location: None,
            pending_image: None,
            transcript: Vec::new(),
        }
    }

    /// Resolve the user's location and center the map on it. Always
    /// completes; the worst case is the configured fallback.
    pub async fn start(&mut self) {
        let resolved = self.resolver.resolve(self.notifier.as_mut()).await;
        self.renderer.show_user_location(&resolved);
        self.location = Some(resolved);
    }

    /// Send one message to the assistant.
    ///
    /// Needs either text or a pending image, and a resolved location.
    /// The pending image (if any) rides along and is consumed whatever the
    /// outcome. A map payload in the reply replaces the map scene; a reply
    /// without one leaves the map exactly as it was.
    pub async fn submit(&mut self, text: &str) {
        let text = text.trim();

        if text.is_empty() && self.pending_image.is_none() {
            self.notifier
                .notice(NoticeLevel::Warning, "Type a message or attach an image first.");
            return;
        }
        let Some(location) = self.location else {
            self.notifier.notice(NoticeLevel::Warning, "Location not ready yet.");
            return;
        };
        if self.backend.is_busy() {
            self.notifier
                .notice(NoticeLevel::Warning, "Still working on the previous message.");
            return;
        }

        let image = self.pending_image.take();
        self.push_turn(ChatTurn::user(text.to_string(), image.clone()));

        let request = ChatRequest {
            query: text.to_string(),
            location: Some(location.coordinate),
            image: image
                .as_deref()
                .map(|bytes| general_purpose::STANDARD.encode(bytes)),
        };

        match self.backend.send(&request).await {
            Ok(response) => {
                debug!(has_map = response.map_data.is_some(), "assistant replied");
                self.push_turn(ChatTurn::assistant(response.response_text.clone()));
                if let Some(payload) = &response.map_data {
                    self.renderer.render(payload, Some(location.coordinate));
                }
            }
            Err(ChatError::Busy) => {
                self.notifier
                    .notice(NoticeLevel::Warning, "Still working on the previous message.");
            }
            Err(ChatError::Backend { detail, .. }) => {
                self.notifier.notice(NoticeLevel::Error, &detail);
            }
            Err(error) => {
                self.notifier.notice(
                    NoticeLevel::Error,
                    &format!("Failed to connect to CompassGenie: {error}"),
                );
            }
        }

        self.transcript_view.scroll_to_latest();
    }

    /// Stage an image to go with the next message.
    pub fn attach_image(&mut self, bytes: Vec<u8>) {
        self.pending_image = Some(bytes);
        self.notifier
            .notice(NoticeLevel::Info, "Image attached. It will go with your next message.");
    }

    pub fn clear_image(&mut self) {
        self.pending_image = None;
    }

    pub fn has_pending_image(&self) -> bool {
        self.pending_image.is_some()
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn current_location(&self) -> Option<ResolvedLocation> {
        self.location
    }

    fn push_turn(&mut self, turn: ChatTurn) {
        self.transcript_view.append(&turn);
        self.transcript.push(turn);
    }
}

/// Notifier that remembers everything, for tests across the crate.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub statuses: Vec<String>,
    pub notices: Vec<(NoticeLevel, String)>,
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn status(&mut self, text: &str) {
        self.statuses.push(text.to_string());
    }

    fn notice(&mut self, level: NoticeLevel, message: &str) {
        self.notices.push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatResponse, Coordinate, LocationSource, MapPayload, MapPoint, Role};
    use crate::services::chat::ChatBackend;
    use crate::services::locator::FixedProvider;
    use crate::services::map_renderer::recording::{RecordingSurface, SharedSurface};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct ScriptedBackend {
        script: Mutex<Vec<Result<ChatResponse, ChatError>>>,
        requests: Mutex<Vec<ChatRequest>>,
        busy: AtomicBool,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<ChatResponse, ChatError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                requests: Mutex::new(Vec::new()),
                busy: AtomicBool::new(false),
            })
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
            self.requests.lock().unwrap().push(request.clone());
            self.script.lock().unwrap().remove(0)
        }

        fn is_busy(&self) -> bool {
            self.busy.load(Ordering::SeqCst)
        }
    }

    struct SharedBackend(Arc<ScriptedBackend>);

    #[async_trait]
    impl ChatBackend for SharedBackend {
        async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
            self.0.send(request).await
        }

        fn is_busy(&self) -> bool {
            self.0.is_busy()
        }
    }

    struct SharedNotifier(Arc<Mutex<RecordingNotifier>>);

    impl Notifier for SharedNotifier {
        fn status(&mut self, text: &str) {
            self.0.lock().unwrap().status(text);
        }

        fn notice(&mut self, level: NoticeLevel, message: &str) {
            self.0.lock().unwrap().notice(level, message);
        }
    }

    #[derive(Default)]
    struct RecordingTranscript {
        turns: Vec<ChatTurn>,
        scrolls: usize,
    }

    struct SharedTranscript(Arc<Mutex<RecordingTranscript>>);

    impl TranscriptView for SharedTranscript {
        fn append(&mut self, turn: &ChatTurn) {
            self.0.lock().unwrap().turns.push(turn.clone());
        }

        fn scroll_to_latest(&mut self) {
            self.0.lock().unwrap().scrolls += 1;
        }
    }

    fn fix() -> Coordinate {
        Coordinate::new(48.8566, 2.3522)
    }

    #[allow(clippy::type_complexity)]
    fn session_with(
        script: Vec<Result<ChatResponse, ChatError>>,
    ) -> (
        AssistantSession,
        Arc<Mutex<RecordingSurface>>,
        Arc<Mutex<RecordingNotifier>>,
        Arc<Mutex<RecordingTranscript>>,
        Arc<ScriptedBackend>,
    ) {
        let (surface, surface_handle) = SharedSurface::new();
        let notifier_handle = Arc::new(Mutex::new(RecordingNotifier::default()));
        let transcript_handle = Arc::new(Mutex::new(RecordingTranscript::default()));
        let backend = ScriptedBackend::new(script);

        let session = AssistantSession::new(
            LocationResolver::new(Some(Box::new(FixedProvider::new(fix())))),
            MapRenderer::new(Box::new(surface)),
            Box::new(SharedBackend(backend.clone())),
            Box::new(SharedTranscript(transcript_handle.clone())),
            Box::new(SharedNotifier(notifier_handle.clone())),
        );
        (session, surface_handle, notifier_handle, transcript_handle, backend)
    }

    fn text_reply(text: &str) -> Result<ChatResponse, ChatError> {
        Ok(ChatResponse {
            response_text: text.to_string(),
            map_data: None,
        })
    }

    fn map_reply(text: &str, points: Vec<(f64, f64, &str)>) -> Result<ChatResponse, ChatError> {
        Ok(ChatResponse {
            response_text: text.to_string(),
            map_data: Some(MapPayload {
                points: points
                    .into_iter()
                    .map(|(lat, lng, name)| MapPoint {
                        latitude: lat,
                        longitude: lng,
                        name: name.to_string(),
                        color: None,
                    })
                    .collect(),
                routes: Vec::new(),
            }),
        })
    }

    #[tokio::test]
    async fn test_start_resolves_and_centers_map() {
        let (mut session, surface, notifier, _, _) = session_with(vec![]);

        session.start().await;

        let location = session.current_location().unwrap();
        assert_eq!(location.coordinate, fix());
        assert_eq!(location.source, LocationSource::LiveFix);

        let s = surface.lock().unwrap();
        assert_eq!(s.center, Some(fix()));
        assert_eq!(s.marker_list()[0].label, "Current Location");

        let n = notifier.lock().unwrap();
        assert!(n.statuses.contains(&fix().to_string()));
    }

    #[tokio::test]
    async fn test_empty_submit_is_rejected() {
        let (mut session, _, notifier, transcript, backend) = session_with(vec![]);
        session.start().await;

        session.submit("   ").await;

        assert!(backend.requests().is_empty());
        assert!(transcript.lock().unwrap().turns.is_empty());
        let n = notifier.lock().unwrap();
        let (level, message) = n.notices.last().unwrap();
        assert_eq!(*level, NoticeLevel::Warning);
        assert!(message.contains("Type a message"));
    }

    #[tokio::test]
    async fn test_submit_requires_resolved_location() {
        let (mut session, _, notifier, _, backend) = session_with(vec![]);

        session.submit("hello").await;

        assert!(backend.requests().is_empty());
        let n = notifier.lock().unwrap();
        assert!(n.notices.last().unwrap().1.contains("Location not ready"));
    }

    #[tokio::test]
    async fn test_text_reply_leaves_map_untouched() {
        let (mut session, surface, _, transcript, backend) = session_with(vec![text_reply("Hi there!")]);
        session.start().await;

        session.submit("Hi").await;

        let request = &backend.requests()[0];
        assert_eq!(request.query, "Hi");
        assert_eq!(request.location, Some(fix()));

        let t = transcript.lock().unwrap();
        assert_eq!(t.turns.len(), 2);
        assert_eq!(t.turns[0].role, Role::User);
        assert_eq!(t.turns[1].role, Role::Assistant);
        assert_eq!(t.turns[1].text, "Hi there!");
        assert!(t.scrolls >= 1);

        // The startup marker is still the whole scene.
        let s = surface.lock().unwrap();
        assert_eq!(s.markers.len(), 1);
        assert_eq!(s.marker_list()[0].label, "Current Location");
    }

    #[tokio::test]
    async fn test_map_reply_replaces_scene() {
        let (mut session, surface, _, _, _) = session_with(vec![map_reply(
            "Found these:",
            vec![(48.86, 2.35, "Cafe A"), (48.87, 2.36, "Cafe B")],
        )]);
        session.start().await;

        session.submit("coffee near me").await;

        let s = surface.lock().unwrap();
        let labels: Vec<_> = s.marker_list().iter().map(|m| m.label.clone()).collect();
        // Startup marker swept; synthesized origin plus the two results.
        assert_eq!(labels, vec!["You", "Cafe A", "Cafe B"]);
    }

    #[tokio::test]
    async fn test_backend_detail_is_shown_verbatim() {
        let (mut session, surface, notifier, transcript, _) = session_with(vec![Err(
            ChatError::Backend { status: 422, detail: "Query or image is required.".to_string() },
        )]);
        session.start().await;

        session.submit("x").await;

        let t = transcript.lock().unwrap();
        assert_eq!(t.turns.len(), 1);
        assert_eq!(t.turns[0].role, Role::User);

        let n = notifier.lock().unwrap();
        let (level, message) = n.notices.last().unwrap();
        assert_eq!(*level, NoticeLevel::Error);
        assert_eq!(message, "Query or image is required.");

        assert_eq!(surface.lock().unwrap().markers.len(), 1);
    }

    #[tokio::test]
    async fn test_connection_failure_message() {
        let (mut session, _, notifier, _, _) = session_with(vec![Err(
            ChatError::MalformedResponse("missing field `response_text`".to_string()),
        )]);
        session.start().await;

        session.submit("hello").await;

        let n = notifier.lock().unwrap();
        let (level, message) = n.notices.last().unwrap();
        assert_eq!(*level, NoticeLevel::Error);
        assert!(message.starts_with("Failed to connect to CompassGenie:"));
    }

    #[tokio::test]
    async fn test_image_rides_along_and_is_consumed() {
        let (mut session, _, _, transcript, backend) = session_with(vec![text_reply("Nice photo")]);
        session.start().await;

        session.attach_image(b"png-bytes".to_vec());
        assert!(session.has_pending_image());

        session.submit("what is this?").await;

        let request = &backend.requests()[0];
        assert_eq!(request.image.as_deref(), Some("cG5nLWJ5dGVz"));
        assert!(!session.has_pending_image());

        let t = transcript.lock().unwrap();
        assert_eq!(t.turns[0].image.as_deref(), Some(b"png-bytes".as_ref()));
    }

    #[tokio::test]
    async fn test_image_consumed_even_when_backend_fails() {
        let (mut session, _, _, _, _) = session_with(vec![Err(ChatError::Backend {
            status: 500,
            detail: "boom".to_string(),
        })]);
        session.start().await;

        session.attach_image(vec![1, 2, 3]);
        session.submit("look").await;

        assert!(!session.has_pending_image());
    }

    #[tokio::test]
    async fn test_image_only_submit_is_allowed() {
        let (mut session, _, _, _, backend) = session_with(vec![text_reply("Got it")]);
        session.start().await;

        session.attach_image(vec![9, 9]);
        session.submit("").await;

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query, "");
        assert!(requests[0].image.is_some());
    }

    #[tokio::test]
    async fn test_busy_backend_defers_message() {
        let (mut session, _, notifier, transcript, backend) = session_with(vec![]);
        session.start().await;
        backend.busy.store(true, Ordering::SeqCst);

        session.submit("hello").await;

        assert!(backend.requests().is_empty());
        assert!(transcript.lock().unwrap().turns.is_empty());
        let n = notifier.lock().unwrap();
        assert!(n.notices.last().unwrap().1.contains("Still working"));
    }

    #[tokio::test]
    async fn test_clear_image() {
        let (mut session, _, _, _, _) = session_with(vec![]);
        session.attach_image(vec![1]);
        session.clear_image();
        assert!(!session.has_pending_image());
    }
}
