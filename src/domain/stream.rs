use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use super::annotation::Annotation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMeta {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub fps: Option<f32>,
    pub warnings: usize,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsFrameMetaMessage {
    pub r#type: String,
    pub meta: FrameMeta,
}

/// "2 car, 1 truck" style summary; labels carry the distance so only the class is counted.
pub fn summarize_annotations(annotations: &[Annotation]) -> String {
    let mut counts = BTreeMap::new();
    for ann in annotations {
        let class = ann.label.split_whitespace().next().unwrap_or("?");
        *counts.entry(class).or_insert(0) += 1;
    }
    counts.iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}
