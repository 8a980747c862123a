use gloo_events::EventListener;
use shared::PushEvent;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{EventSource, MessageEvent};
use yew::Callback;

const EVENTS_URL: &str = "/api/events";

/// Live subscription to the server's push channel. Closing happens on drop.
pub struct PushChannel {
    source: EventSource,
    _on_message: EventListener,
    _on_error: EventListener,
}

impl PushChannel {
    pub fn open(on_event: Callback<PushEvent>, on_lost: Callback<()>) -> Result<Self, JsValue> {
        let source = EventSource::new(EVENTS_URL)?;

        let on_message = EventListener::new(&source, "message", move |event| {
            let Some(text) = event
                .dyn_ref::<MessageEvent>()
                .and_then(|message| message.data().as_string())
            else {
                return;
            };
            match serde_json::from_str::<PushEvent>(&text) {
                Ok(push) => on_event.emit(push),
                Err(e) => log::warn!("Ignoring malformed push frame: {}", e),
            }
        });

        // EventSource reconnects by itself while the server is reachable; a
        // closed state means the session no longer accepts the stream.
        let watched = source.clone();
        let on_error = EventListener::new(&source, "error", move |_| {
            if watched.ready_state() == EventSource::CLOSED {
                log::warn!("Push channel closed");
                on_lost.emit(());
            }
        });

        log::info!("Push channel opening");
        Ok(Self {
            source,
            _on_message: on_message,
            _on_error: on_error,
        })
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.source.close();
    }
}
