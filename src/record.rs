use crate::comprehension::Quiz;
use crate::scoring::{round2, score};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Snapshot of one completed session. The field order is the persisted
/// column order; ranking reads rows back by these names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Local>,
    pub agent_id: String,
    pub wpm: f64,
    pub accuracy: f64,
    pub errors: usize,
    pub typing_secs: f64,
    pub reading_secs: Option<f64>,
    pub reading_wpm: Option<f64>,
    pub comprehension_correct: Option<usize>,
    pub comprehension_total: Option<usize>,
    pub submitted: String,
}

/// Build the record for a finished session, stamped with the current time.
pub fn build(
    agent_id: &str,
    reference: &str,
    submitted: &str,
    typing_secs: f64,
    reading_secs: Option<f64>,
    quiz: Option<&Quiz>,
    responses: &[Option<usize>],
) -> ResultRecord {
    build_at(
        agent_id,
        reference,
        submitted,
        typing_secs,
        reading_secs,
        quiz,
        responses,
        Local::now(),
    )
}

#[allow(clippy::too_many_arguments)]
pub fn build_at(
    agent_id: &str,
    reference: &str,
    submitted: &str,
    typing_secs: f64,
    reading_secs: Option<f64>,
    quiz: Option<&Quiz>,
    responses: &[Option<usize>],
    timestamp: DateTime<Local>,
) -> ResultRecord {
    let result = score(reference, submitted, typing_secs, reading_secs).rounded();

    ResultRecord {
        timestamp,
        agent_id: agent_id.trim().to_string(),
        wpm: result.wpm,
        accuracy: result.accuracy_percent,
        errors: result.error_count,
        typing_secs: round2(typing_secs),
        reading_secs: reading_secs.map(round2),
        reading_wpm: reading_secs.map(|_| result.reading_wpm),
        comprehension_correct: quiz.map(|q| q.grade(responses)),
        comprehension_total: quiz.map(Quiz::len),
        submitted: submitted.to_string(),
    }
}

/// `%Y-%m-%d %H:%M:%S` in local time, the format the results sheet uses
pub mod timestamp_format {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(d)?;
        let naive =
            NaiveDateTime::parse_from_str(raw.trim(), FORMAT).map_err(serde::de::Error::custom)?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid local time: {raw}")))
    }
}
