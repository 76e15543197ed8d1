//! The drawing surface component.

use crate::config::AppConfig;
use sketchroom_core::presence::NativeWebSocket;
use sketchroom_core::{
    AuthorIdentity, CanvasSession, PersistenceError, PersistenceGateway, PointerEvent,
    PresenceChannel, PresenceEvent, PresenceState, PresenceTransport, SaveRequest, StyleState,
    Viewport,
};
use sketchroom_render::{EncodedImage, ExportError, RasterExporter};
use thiserror::Error;

/// Save failures. The session is untouched, so the save can be retried.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

/// A mounted drawing surface: one canvas session, its exporter, the
/// persistence gateway and an optional presence channel.
pub struct DrawingSurface<G: PersistenceGateway, T: PresenceTransport = NativeWebSocket> {
    session: CanvasSession,
    exporter: RasterExporter,
    gateway: G,
    presence: Option<PresenceChannel<T>>,
    mounted: bool,
}

impl<G: PersistenceGateway, T: PresenceTransport> DrawingSurface<G, T> {
    pub fn new(config: &AppConfig, gateway: G) -> Self {
        let mut session = CanvasSession::with_config(config.style);
        session.style_mut().set_background_color(config.background_color);
        session.set_viewport(config.viewport);
        Self {
            session,
            exporter: RasterExporter::new(),
            gateway,
            presence: None,
            mounted: false,
        }
    }

    /// Attach a presence channel; it is mounted with the surface.
    pub fn with_presence(mut self, channel: PresenceChannel<T>) -> Self {
        self.presence = Some(channel);
        self
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn session(&self) -> &CanvasSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CanvasSession {
        &mut self.session
    }

    pub fn style_mut(&mut self) -> &mut StyleState {
        self.session.style_mut()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn presence(&self) -> Option<&PresenceChannel<T>> {
        self.presence.as_ref()
    }

    pub fn presence_state(&self) -> PresenceState {
        self.presence
            .as_ref()
            .map(|p| p.state().clone())
            .unwrap_or_default()
    }

    /// Size the surface and enter the presence room.
    ///
    /// Presence failures are logged; drawing works regardless.
    pub fn mount(&mut self, viewport: Viewport) {
        if self.mounted {
            log::warn!("drawing surface mounted twice");
            return;
        }
        self.session.set_viewport(viewport);
        self.mounted = true;
        log::info!("surface mounted at {}x{}", viewport.width, viewport.height);

        if let Some(presence) = self.presence.as_mut() {
            if let Err(e) = presence.mount() {
                log::error!("presence unavailable for room {}: {}", presence.room_id(), e);
            }
        }
    }

    /// Feed a pointer event. Ignored while unmounted.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) {
        if !self.mounted {
            log::debug!("pointer event on unmounted surface ignored");
            return;
        }
        self.session.handle_pointer_event(event);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.session.resize(width, height);
    }

    /// Drain presence notifications.
    pub fn poll_presence(&mut self) -> Vec<PresenceEvent> {
        match self.presence.as_mut() {
            Some(presence) => presence.poll(),
            None => Vec::new(),
        }
    }

    /// Rasterize the committed strokes.
    pub fn export(&self) -> Result<EncodedImage, ExportError> {
        self.exporter.export(&self.session)
    }

    /// Export the drawing and hand it to the persistence gateway.
    pub async fn save(&self, author: &AuthorIdentity) -> Result<(), SaveError> {
        let image = self.export().inspect_err(|e| log::error!("export failed: {}", e))?;
        let request = SaveRequest {
            art: image.to_data_url(),
            user: author.clone(),
        };

        match self.gateway.save(request).await {
            Ok(()) => {
                log::info!(
                    "saved {}x{} artwork with {} strokes for {}",
                    image.width,
                    image.height,
                    self.session.stroke_count(),
                    author.sub
                );
                Ok(())
            }
            Err(e) => {
                log::error!("save failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Leave the presence room and stop accepting input.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.session.gesture_cancel();
        if let Some(presence) = self.presence.as_mut() {
            presence.unmount();
        }
        self.mounted = false;
        log::info!("surface unmounted");
    }
}

impl<G: PersistenceGateway, T: PresenceTransport> Drop for DrawingSurface<G, T> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use sketchroom_core::presence::TransportEvent;
    use sketchroom_core::{Color, MemoryGateway, MouseButton, PresenceError};
    use sketchroom_render::DATA_URL_PREFIX;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct LogTransport {
        log: Rc<RefCell<Vec<String>>>,
        refuse: bool,
    }

    impl PresenceTransport for LogTransport {
        fn connect(&mut self, url: &str) -> Result<(), PresenceError> {
            if self.refuse {
                return Err(PresenceError::InvalidUrl(url.to_string()));
            }
            self.log.borrow_mut().push("connect".to_string());
            Ok(())
        }

        fn send(&self, msg: &str) -> Result<(), PresenceError> {
            self.log.borrow_mut().push(msg.to_string());
            Ok(())
        }

        fn poll_events(&mut self) -> Vec<TransportEvent> {
            Vec::new()
        }

        fn disconnect(&mut self) {
            self.log.borrow_mut().push("close".to_string());
        }
    }

    fn surface() -> DrawingSurface<MemoryGateway, LogTransport> {
        DrawingSurface::new(&AppConfig::default(), MemoryGateway::new())
    }

    fn drag(surface: &mut DrawingSurface<MemoryGateway, LogTransport>, from: (f64, f64), to: (f64, f64)) {
        surface.handle_pointer_event(&PointerEvent::Down {
            position: Point::new(from.0, from.1),
            button: MouseButton::Left,
        });
        surface.handle_pointer_event(&PointerEvent::Move {
            position: Point::new(to.0, to.1),
        });
        surface.handle_pointer_event(&PointerEvent::Up {
            position: Point::new(to.0, to.1),
            button: MouseButton::Left,
        });
    }

    #[test]
    fn test_input_ignored_until_mounted() {
        let mut s = surface();
        drag(&mut s, (0.0, 0.0), (10.0, 10.0));
        assert_eq!(s.session().stroke_count(), 0);

        s.mount(Viewport::new(64.0, 64.0));
        drag(&mut s, (0.0, 0.0), (10.0, 10.0));
        assert_eq!(s.session().stroke_count(), 1);

        s.unmount();
        drag(&mut s, (0.0, 0.0), (10.0, 10.0));
        assert_eq!(s.session().stroke_count(), 1);
    }

    #[tokio::test]
    async fn test_save_posts_data_url() {
        let mut s = surface();
        s.mount(Viewport::new(32.0, 24.0));
        s.style_mut().set_pen_color(Color::rgb(255, 0, 0));
        drag(&mut s, (2.0, 2.0), (30.0, 20.0));

        s.save(&AuthorIdentity::new("auth0|42")).await.unwrap();

        let saved = s.gateway().saved();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].art.starts_with(DATA_URL_PREFIX));
        assert_eq!(saved[0].art, s.export().unwrap().to_data_url());
        assert_eq!(saved[0].user.sub, "auth0|42");
    }

    #[tokio::test]
    async fn test_failed_save_keeps_session() {
        let mut s = surface();
        s.mount(Viewport::new(32.0, 24.0));
        drag(&mut s, (2.0, 2.0), (30.0, 20.0));
        s.gateway().set_reject(Some(503));

        let err = s.save(&AuthorIdentity::new("u")).await.unwrap_err();
        assert!(matches!(
            err,
            SaveError::Persistence(PersistenceError::Rejected { status: 503 })
        ));
        assert_eq!(s.session().stroke_count(), 1);

        s.gateway().set_reject(None);
        s.save(&AuthorIdentity::new("u")).await.unwrap();
        assert_eq!(s.gateway().saved().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_surface_is_not_saved() {
        let mut s = surface();
        s.mount(Viewport::new(0.0, 0.0));

        let err = s.save(&AuthorIdentity::new("u")).await.unwrap_err();
        assert!(matches!(err, SaveError::Export(ExportError::EmptySurface { .. })));
        assert!(s.gateway().saved().is_empty());
    }

    #[test]
    fn test_unmount_after_mount_sends_single_disconnect() {
        let transport = LogTransport::default();
        let channel = PresenceChannel::new(transport.clone(), "ws://relay/ws", "art-3", None);
        let mut s = surface().with_presence(channel);

        s.mount(Viewport::new(10.0, 10.0));
        s.unmount();
        drop(s);

        let log = transport.log.borrow().clone();
        assert_eq!(
            log,
            vec![
                "connect".to_string(),
                r#"{"type":"join","room":"art-3","user_id":null}"#.to_string(),
                r#"{"type":"disconnect_user","user_id":null}"#.to_string(),
                "close".to_string(),
            ]
        );
    }

    #[test]
    fn test_drop_unmounts_presence() {
        let transport = LogTransport::default();
        {
            let channel =
                PresenceChannel::new(transport.clone(), "ws://relay/ws", "art-3", Some("me".to_string()));
            let mut s = surface().with_presence(channel);
            s.mount(Viewport::new(10.0, 10.0));
        }
        let log = transport.log.borrow().clone();
        assert_eq!(log.last().map(String::as_str), Some("close"));
        assert_eq!(log.iter().filter(|m| m.contains("disconnect_user")).count(), 1);
    }

    #[test]
    fn test_presence_failure_does_not_block_drawing() {
        let transport = LogTransport {
            refuse: true,
            ..Default::default()
        };
        let channel = PresenceChannel::new(transport, "bogus", "art-3", None);
        let mut s = surface().with_presence(channel);

        s.mount(Viewport::new(10.0, 10.0));
        assert_eq!(s.presence_state(), PresenceState::Disconnected);
        drag(&mut s, (1.0, 1.0), (9.0, 9.0));
        assert_eq!(s.session().stroke_count(), 1);
        assert!(s.poll_presence().is_empty());
    }
}
