//! Language-model clients
//!
//! `ChatClient` is the seam the agent talks through; `HfHubChatClient` is the
//! production implementation and `MockChatClient` a scripted double.

mod hf_hub;
mod mock;
mod traits;

pub use hf_hub::HfHubChatClient;
pub use mock::MockChatClient;
pub use traits::*;
