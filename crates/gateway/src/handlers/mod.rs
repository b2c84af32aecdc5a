//! API handlers module

pub mod analysis;
pub mod content;
pub mod health;
pub mod question;

use contextflow_pipeline::SourceDescriptor;
use serde::{Deserialize, Serialize};

/// One open document as described by the host layer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceInput {
    pub title: String,
    pub url: String,
}

/// Convert host-layer source inputs into pipeline descriptors
pub(crate) fn to_descriptors(inputs: &[SourceInput]) -> Vec<SourceDescriptor> {
    inputs
        .iter()
        .map(|input| SourceDescriptor::new(input.title.clone(), input.url.clone()))
        .collect()
}
