//! Preview sampling: the first few successful images, in batch order.

use crate::pipeline::render::RenderedSymbol;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// One image selected for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewImage {
    pub payload: String,
    #[serde(skip)]
    pub png: Vec<u8>,
}

impl PreviewImage {
    /// `data:image/png;base64,…` URI for embedding in HTML or JSON.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Take at most `limit` successes, preserving their order.
pub fn sample<'a, I>(successes: I, limit: usize) -> Vec<PreviewImage>
where
    I: IntoIterator<Item = &'a RenderedSymbol>,
{
    successes
        .into_iter()
        .take(limit)
        .map(|s| PreviewImage {
            payload: s.payload.clone(),
            png: s.png.clone(),
        })
        .collect()
}
