//! JSON messages exchanged with the detection service, one object per
//! WebSocket text frame.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::landmarks::Landmarks;
use crate::Result;

/// Data-URL prefix for JPEG payloads. The service accepts payloads with or
/// without it.
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// The only message the client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub image: String,
}

impl OutboundFrame {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Interpreted inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// The service reported a failure for one frame.
    Error(String),
    /// No face in the last frame.
    Absent,
    /// A face was found.
    Face(Landmarks),
    /// Anything that is not one of the three shapes above.
    Malformed(String),
}

/// Wire numbers are read as `f32`, rounded to the nearest representable
/// value; pixel coordinates need nothing wider.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInbound {
    error: Option<String>,
    face: Option<bool>,
    face_w: Option<f32>,
    face_h: Option<f32>,
    chin: Option<Point>,
    left_ear: Option<Point>,
    right_ear: Option<Point>,
    nose: Option<Point>,
    w: Option<f32>,
    h: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FaceWire {
    face: bool,
    face_w: f32,
    chin: Point,
    left_ear: Point,
    right_ear: Point,
    nose: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    face_h: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    w: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    h: Option<f32>,
}

impl InboundMessage {
    /// Parses one inbound text frame. Never fails: unusable payloads come
    /// back as [`InboundMessage::Malformed`].
    pub fn parse(text: &str) -> Self {
        let mut raw: RawInbound = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(err) => return Self::Malformed(err.to_string()),
        };

        // an empty error string counts as no error
        if let Some(error) = raw.error.take().filter(|e| !e.is_empty()) {
            return Self::Error(error);
        }

        match raw.face {
            Some(false) => Self::Absent,
            Some(true) => Self::face_from(raw),
            None => Self::Malformed("missing `face` flag".to_string()),
        }
    }

    fn face_from(raw: RawInbound) -> Self {
        let (Some(face_width), Some(chin), Some(left_ear), Some(right_ear), Some(nose)) =
            (raw.face_w, raw.chin, raw.left_ear, raw.right_ear, raw.nose)
        else {
            return Self::Malformed("face message is missing landmarks".to_string());
        };

        let landmarks = Landmarks {
            face_width,
            chin,
            left_ear,
            right_ear,
            nose,
            face_height: raw.face_h,
            frame_size: raw.w.zip(raw.h),
        };
        if landmarks.is_valid() {
            Self::Face(landmarks)
        } else {
            Self::Malformed("face message has non-positive width or non-finite points".to_string())
        }
    }

    /// Serializes the message in the service's wire format.
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Self::Error(message) => serde_json::to_string(&serde_json::json!({ "error": message }))?,
            Self::Absent => serde_json::to_string(&serde_json::json!({ "face": false }))?,
            // serialized directly so f32 values keep their shortest form
            Self::Face(landmarks) => serde_json::to_string(&FaceWire {
                face: true,
                face_w: landmarks.face_width,
                chin: landmarks.chin,
                left_ear: landmarks.left_ear,
                right_ear: landmarks.right_ear,
                nose: landmarks.nose,
                face_h: landmarks.face_height,
                w: landmarks.frame_size.map(|(w, _)| w),
                h: landmarks.frame_size.map(|(_, h)| h),
            })?,
            Self::Malformed(reason) => {
                return Err(crate::TryOnError::msg(format!(
                    "malformed message cannot be encoded: {reason}"
                )))
            }
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_message_round_trips() {
        let text = r#"{"face":true,"faceW":100,"chin":{"x":50,"y":80},"leftEar":{"x":10,"y":40},"rightEar":{"x":90,"y":40},"nose":{"x":50,"y":55}}"#;
        let parsed = InboundMessage::parse(text);
        let expected = Landmarks::new(
            100.0,
            Point::new(50.0, 80.0),
            Point::new(10.0, 40.0),
            Point::new(90.0, 40.0),
            Point::new(50.0, 55.0),
        );
        assert_eq!(parsed, InboundMessage::Face(expected.clone()));

        let encoded = parsed.to_json().unwrap();
        assert_eq!(InboundMessage::parse(&encoded), InboundMessage::Face(expected));
    }

    #[test]
    fn accepts_detector_extras() {
        let text = r#"{"face":true,"w":640,"h":480,"faceW":212.4,"faceH":260.1,
            "nose":{"x":320,"y":250},"chin":{"x":318,"y":370},
            "leftEar":{"x":210,"y":240},"rightEar":{"x":430,"y":240}}"#;
        let InboundMessage::Face(landmarks) = InboundMessage::parse(text) else {
            panic!("expected a face");
        };
        assert_eq!(landmarks.frame_size, Some((640.0, 480.0)));
        assert_eq!(landmarks.face_height, Some(260.1));
    }

    #[test]
    fn fractional_coordinates_keep_single_precision() {
        let text = r#"{"face":true,"faceW":212.4,"chin":{"x":318.25,"y":370.5},"leftEar":{"x":210.1,"y":240},"rightEar":{"x":430,"y":240.9},"nose":{"x":320.75,"y":250.333}}"#;
        let InboundMessage::Face(landmarks) = InboundMessage::parse(text) else {
            panic!("expected a face");
        };
        assert_eq!(landmarks.face_width, 212.4_f32);
        assert_eq!(landmarks.nose, Point::new(320.75, 250.333));

        let encoded = InboundMessage::Face(landmarks.clone()).to_json().unwrap();
        assert!(encoded.contains(r#""faceW":212.4"#), "{encoded}");
        assert!(encoded.contains(r#""y":250.333"#), "{encoded}");
        assert_eq!(InboundMessage::parse(&encoded), InboundMessage::Face(landmarks));

        // digits past f32 precision are rounded away
        let precise = text.replace("212.4", "212.400000001");
        let InboundMessage::Face(rounded) = InboundMessage::parse(&precise) else {
            panic!("expected a face");
        };
        assert_eq!(rounded.face_width, 212.4_f32);
    }

    #[test]
    fn empty_error_string_is_not_an_error() {
        assert_eq!(
            InboundMessage::parse(r#"{"error":"","face":false}"#),
            InboundMessage::Absent
        );
        assert!(matches!(
            InboundMessage::parse(r#"{"error":"","face":true,"faceW":100,"chin":{"x":50,"y":80},"leftEar":{"x":10,"y":40},"rightEar":{"x":90,"y":40},"nose":{"x":50,"y":55}}"#),
            InboundMessage::Face(_)
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"error":""}"#),
            InboundMessage::Malformed(_)
        ));
    }

    #[test]
    fn classifies_absence_errors_and_garbage() {
        assert_eq!(InboundMessage::parse(r#"{"face":false}"#), InboundMessage::Absent);
        assert_eq!(
            InboundMessage::parse(r#"{"error":"decode_failed"}"#),
            InboundMessage::Error("decode_failed".to_string())
        );
        assert!(matches!(
            InboundMessage::parse(r#"{"unexpected":1}"#),
            InboundMessage::Malformed(_)
        ));
        assert!(matches!(InboundMessage::parse("not json"), InboundMessage::Malformed(_)));
        assert!(matches!(
            InboundMessage::parse(r#"{"face":true,"faceW":100}"#),
            InboundMessage::Malformed(_)
        ));
        assert!(matches!(
            InboundMessage::parse(
                r#"{"face":true,"faceW":0,"chin":{"x":1,"y":1},"leftEar":{"x":1,"y":1},"rightEar":{"x":1,"y":1},"nose":{"x":1,"y":1}}"#
            ),
            InboundMessage::Malformed(_)
        ));
    }

    #[test]
    fn outbound_frame_has_single_image_field() {
        let json = OutboundFrame {
            image: format!("{JPEG_DATA_URL_PREFIX}AAAA"),
        }
        .to_json()
        .unwrap();
        assert_eq!(json, r#"{"image":"data:image/jpeg;base64,AAAA"}"#);
    }
}
