//! Seam to the external face-classification service and decoding of its
//! replies.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{db::PersonReading, error::InternalError};

/// Blocking call to the classifier with one still image. Returns the raw
/// response body.
pub trait FaceClassifier: Send + Sync {
    fn classify(&self, image: &[u8]) -> Result<String>;
}

/// Decoded classifier reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierReply {
    /// The service answered with its error object, e.g. no face detected.
    NoFaces(String),
    People(Vec<PersonReading>),
}

#[derive(Debug, Deserialize)]
struct PersonPayload {
    gender: String,
    age: f64,
    mood: f64,
    /// x, y, z, yaw, pitch, roll
    headpose: [f64; 6],
    /// x, y
    headgaze: [f64; 2],
    /// happy, surprised, angry, disgusted, afraid, sad
    emotions: [f64; 6],
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawReply {
    People(Vec<PersonPayload>),
    Failure(Map<String, Value>),
}

impl From<PersonPayload> for PersonReading {
    fn from(payload: PersonPayload) -> Self {
        let [head_x, head_y, head_z, head_yaw, head_pitch, head_roll] = payload.headpose;
        let [gaze_x, gaze_y] = payload.headgaze;
        let [happy, surprised, angry, disgusted, afraid, sad] = payload.emotions;

        Self {
            gender: gender_signal(&payload.gender),
            age: payload.age as i64,
            mood: payload.mood,
            head_yaw,
            head_pitch,
            head_roll,
            head_x,
            head_y,
            head_z,
            gaze_x,
            gaze_y,
            happy,
            surprised,
            angry,
            disgusted,
            afraid,
            sad,
        }
    }
}

fn gender_signal(label: &str) -> f64 {
    match label {
        "male" => -1.0,
        "female" => 1.0,
        _ => 0.0,
    }
}

/// An object is the service's error reply, an array holds one entry per
/// person. Anything else is a protocol error.
pub fn parse_reply(body: &str) -> Result<ClassifierReply, InternalError> {
    let raw: RawReply = serde_json::from_str(body)
        .map_err(|err| InternalError::ClassifierProtocol(err.to_string()))?;

    Ok(match raw {
        RawReply::People(people) => {
            ClassifierReply::People(people.into_iter().map(PersonReading::from).collect())
        }
        RawReply::Failure(object) => {
            let message = object
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("classifier reported no result")
                .to_string();
            ClassifierReply::NoFaces(message)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON: &str = r#"{
        "gender": "female",
        "age": 31.7,
        "mood": 0.4,
        "headpose": [1.0, 2.0, 3.0, 0.1, -0.2, 0.3],
        "headgaze": [12.0, -8.0],
        "emotions": [0.5, 0.1, 0.0, 0.0, 0.2, 0.2],
        "extra": "ignored"
    }"#;

    #[test]
    fn error_object_means_no_faces() {
        let reply = parse_reply(r#"{"error": "No faces found"}"#).unwrap();
        assert_eq!(reply, ClassifierReply::NoFaces("No faces found".into()));
    }

    #[test]
    fn array_maps_every_field() {
        let reply = parse_reply(&format!("[{PERSON}]")).unwrap();
        let ClassifierReply::People(people) = reply else {
            panic!("expected people");
        };
        assert_eq!(people.len(), 1);

        let person = &people[0];
        assert_eq!(person.gender, 1.0);
        assert_eq!(person.age, 31);
        assert_eq!((person.head_x, person.head_y, person.head_z), (1.0, 2.0, 3.0));
        assert_eq!(
            (person.head_yaw, person.head_pitch, person.head_roll),
            (0.1, -0.2, 0.3)
        );
        assert_eq!((person.gaze_x, person.gaze_y), (12.0, -8.0));
        assert_eq!(person.happy, 0.5);
        assert_eq!(person.sad, 0.2);
    }

    #[test]
    fn unknown_gender_labels_are_zero() {
        assert_eq!(gender_signal("male"), -1.0);
        assert_eq!(gender_signal("unknown"), 0.0);
        assert_eq!(gender_signal("Female"), 0.0);
    }

    #[test]
    fn other_shapes_are_protocol_errors() {
        for body in ["42", "\"text\"", "not json", r#"[{"gender": "male"}]"#] {
            assert!(
                matches!(parse_reply(body), Err(InternalError::ClassifierProtocol(_))),
                "accepted {body}"
            );
        }
    }
}
