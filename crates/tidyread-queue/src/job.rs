// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job model: the typed call and its wire shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tidyread_core::types::{ChatId, MsgId, TopicId};
use tidyread_core::{TidyreadError, reaction_dedup_id, read_dedup_id};
use tidyread_storage::NewJob;

pub const FN_MARK_AS_READ: &str = "mark_as_read_job";
pub const FN_SEND_REACTION: &str = "send_reaction_job";

/// A backend call the queue knows how to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobCall {
    MarkAsRead {
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        max_id: Option<MsgId>,
    },
    SendReaction {
        chat_id: ChatId,
        msg_id: MsgId,
        emoji: String,
    },
}

impl JobCall {
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::MarkAsRead { .. } => FN_MARK_AS_READ,
            Self::SendReaction { .. } => FN_SEND_REACTION,
        }
    }

    pub fn dedup_id(&self) -> String {
        match self {
            Self::MarkAsRead {
                chat_id, topic_id, ..
            } => read_dedup_id(*chat_id, *topic_id),
            Self::SendReaction {
                chat_id,
                msg_id,
                emoji,
            } => reaction_dedup_id(*chat_id, *msg_id, emoji),
        }
    }

    /// Positional arguments, in the order the function declares them.
    pub fn args(&self) -> Vec<Value> {
        match self {
            Self::MarkAsRead {
                chat_id,
                topic_id,
                max_id,
            } => vec![Value::from(*chat_id), Value::from(*topic_id), Value::from(*max_id)],
            Self::SendReaction {
                chat_id,
                msg_id,
                emoji,
            } => vec![
                Value::from(*chat_id),
                Value::from(*msg_id),
                Value::from(emoji.as_str()),
            ],
        }
    }

    /// Decode a stored call. Unknown functions and malformed args are errors.
    pub fn decode(function_name: &str, args: &[Value]) -> Result<Self, TidyreadError> {
        let bad = || TidyreadError::Internal(format!("malformed args for {function_name}: {args:?}"));
        let int = |i: usize| args.get(i).and_then(Value::as_i64);
        let opt_int = |i: usize| match args.get(i) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v.as_i64().map(Some).ok_or_else(bad),
        };

        match function_name {
            FN_MARK_AS_READ => Ok(Self::MarkAsRead {
                chat_id: int(0).ok_or_else(bad)?,
                topic_id: opt_int(1)?,
                max_id: opt_int(2)?,
            }),
            FN_SEND_REACTION => Ok(Self::SendReaction {
                chat_id: int(0).ok_or_else(bad)?,
                msg_id: int(1).ok_or_else(bad)?,
                emoji: args
                    .get(2)
                    .and_then(Value::as_str)
                    .ok_or_else(bad)?
                    .to_string(),
            }),
            other => Err(TidyreadError::Internal(format!("unknown job function: {other}"))),
        }
    }

    /// Decode from the JSON text stored in the `jobs.args` column.
    pub fn from_stored(function_name: &str, args: &str) -> Result<Self, TidyreadError> {
        let args: Vec<Value> = serde_json::from_str(args)?;
        Self::decode(function_name, &args)
    }

    pub fn into_job(self, defer_seconds: f64) -> Job {
        Job {
            function_name: self.function_name().to_string(),
            args: self.args(),
            dedup_id: self.dedup_id(),
            defer_seconds,
        }
    }
}

/// Wire shape of a submitted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub function_name: String,
    pub args: Vec<Value>,
    pub dedup_id: String,
    #[serde(default)]
    pub defer_seconds: f64,
}

impl Job {
    /// Row to insert when submitted at `now`.
    pub fn to_new_job(&self, max_tries: u32, now: f64) -> Result<NewJob, TidyreadError> {
        Ok(NewJob {
            dedup_id: self.dedup_id.clone(),
            function_name: self.function_name.clone(),
            args: serde_json::to_string(&self.args)?,
            max_tries,
            run_at: now + self.defer_seconds.max(0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_read_job_wire_shape() {
        let job = JobCall::MarkAsRead {
            chat_id: 100,
            topic_id: None,
            max_id: Some(55),
        }
        .into_job(0.5);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["function_name"], "mark_as_read_job");
        assert_eq!(json["args"], serde_json::json!([100, null, 55]));
        assert_eq!(json["dedup_id"], "read_100_none");
        assert_eq!(json["defer_seconds"], 0.5);
    }

    #[test]
    fn stored_args_decode_back() {
        let call = JobCall::SendReaction {
            chat_id: 200,
            msg_id: 17,
            emoji: "👍".into(),
        };
        let new_job = call.clone().into_job(0.0).to_new_job(5, 10.0).unwrap();
        assert_eq!(new_job.run_at, 10.0);
        assert_eq!(new_job.dedup_id, "react_200_17_👍");
        assert_eq!(
            JobCall::from_stored(&new_job.function_name, &new_job.args).unwrap(),
            call
        );
    }

    #[test]
    fn short_mark_read_args_default_to_none() {
        let call = JobCall::decode(FN_MARK_AS_READ, &[Value::from(7)]).unwrap();
        assert_eq!(
            call,
            JobCall::MarkAsRead {
                chat_id: 7,
                topic_id: None,
                max_id: None
            }
        );
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        assert!(JobCall::decode("drop_tables", &[]).is_err());
        assert!(JobCall::decode(FN_SEND_REACTION, &[Value::from(1)]).is_err());
        assert!(JobCall::decode(FN_MARK_AS_READ, &[Value::from(1), Value::from("x")]).is_err());
        assert!(JobCall::from_stored(FN_MARK_AS_READ, "not json").is_err());
    }
}
