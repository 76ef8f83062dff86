//! Media-engine event-plane callbacks: `POST /index/hook/<method>`, routed
//! to the Play Session Manager without ever holding a Stream mutex across a
//! call back into the media engine.

pub mod recording;
pub mod routes;
pub mod state;

pub use recording::RecordingRegistry;
pub use routes::router;
pub use state::WebhookState;
