//! Provider Adapters
//!
//! One adapter per provider family. Each implements the four pure
//! [`ProviderAdapter`](crate::adapter::ProviderAdapter) functions; the
//! generic client drives whichever one it is handed.

pub mod fal;
pub mod gemini;
pub mod siliconflow;
pub mod together;

pub use fal::FalQueueAdapter;
pub use gemini::GeminiVideoAdapter;
pub use siliconflow::SiliconFlowVideoAdapter;
pub use together::TogetherImageAdapter;
