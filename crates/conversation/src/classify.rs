use crate::types::Fragment;
use serde_json::{Map, Value};

const AUDIO_TRANSCRIPTION: &str = "audio_transcription";
const REAL_TIME_AV_POINTER: &str = "real_time_user_audio_video_asset_pointer";
const ASSET_POINTERS: [&str; 3] = [
    "audio_asset_pointer",
    "image_asset_pointer",
    "video_container_asset_pointer",
];

/// Result of classifying one raw content part
#[derive(Debug, Clone, PartialEq)]
pub enum PartOutcome {
    /// One or more fragments, in order
    Fragments(Vec<Fragment>),
    /// Nothing to keep (empty string, absent pointers, unknown content type)
    Skip,
    /// The part does not have a shape we understand
    Malformed(String),
}

/// Classify a raw part. Precedence: non-empty string, empty string, transcription,
/// single asset pointer, real-time audio/video bundle.
#[must_use]
pub fn classify_part(part: &Value) -> PartOutcome {
    match part {
        Value::String(text) if text.is_empty() => PartOutcome::Skip,
        Value::String(text) => PartOutcome::Fragments(vec![Fragment::Text(text.clone())]),
        Value::Object(map) => classify_object(part, map),
        other => PartOutcome::Malformed(format!("unexpected part of type {}", json_kind(other))),
    }
}

fn classify_object(part: &Value, map: &Map<String, Value>) -> PartOutcome {
    let Some(content_type) = map.get("content_type").and_then(Value::as_str) else {
        return PartOutcome::Malformed("object part without content_type".to_string());
    };

    match content_type {
        AUDIO_TRANSCRIPTION => match map.get("text") {
            Some(Value::String(text)) if text.is_empty() => PartOutcome::Skip,
            Some(Value::String(text)) => {
                PartOutcome::Fragments(vec![Fragment::Transcript(text.clone())])
            }
            _ => PartOutcome::Malformed("audio transcription without text".to_string()),
        },
        kind if ASSET_POINTERS.contains(&kind) => {
            PartOutcome::Fragments(vec![Fragment::Asset(part.clone())])
        }
        REAL_TIME_AV_POINTER => {
            let mut assets = Vec::new();
            if let Some(audio) = present(map.get("audio_asset_pointer")) {
                assets.push(Fragment::Asset(audio.clone()));
            }
            if let Some(video) = present(map.get("video_container_asset_pointer")) {
                assets.push(Fragment::Asset(video.clone()));
            }
            match map.get("frames_asset_pointers") {
                None | Some(Value::Null) => {}
                Some(Value::Array(frames)) => {
                    assets.extend(
                        frames
                            .iter()
                            .filter_map(|frame| present(Some(frame)))
                            .map(|frame| Fragment::Asset(frame.clone())),
                    );
                }
                Some(other) => {
                    return PartOutcome::Malformed(format!(
                        "frames_asset_pointers is a {}",
                        json_kind(other)
                    ));
                }
            }
            if assets.is_empty() {
                PartOutcome::Skip
            } else {
                PartOutcome::Fragments(assets)
            }
        }
        _ => PartOutcome::Skip,
    }
}

/// Classify all parts of a node, logging malformed ones against `node_id`
#[must_use]
pub fn classify_parts(parts: &[Value], node_id: &str) -> Vec<Fragment> {
    let mut fragments = Vec::with_capacity(parts.len());
    for (idx, part) in parts.iter().enumerate() {
        match classify_part(part) {
            PartOutcome::Fragments(found) => fragments.extend(found),
            PartOutcome::Skip => {}
            PartOutcome::Malformed(reason) => {
                log::warn!("Dropping malformed part #{idx} of node {node_id}: {reason}");
            }
        }
    }
    fragments
}

// Absent, null, false and empty values all mean "no pointer".
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Object(m) => !m.is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
    })
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
