//! Wire types for the Twitter API v2 endpoints used by hashmood.

use hashmood_sentiment::RawEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RulesResponse {
    #[serde(default)]
    pub data: Vec<Rule>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Rule {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddRules<'a> {
    pub add: Vec<NewRule<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewRule<'a> {
    pub value: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteRules<'a> {
    pub delete: DeleteIds<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DeleteIds<'a> {
    pub ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PostTweet<'a> {
    pub text: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostTweetResponse {
    pub data: PostedTweet,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostedTweet {
    pub id: String,
}

/// One tweet line from the filtered stream.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamEnvelope {
    pub data: TweetData,
    #[serde(default)]
    pub includes: Includes,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TweetData {
    pub text: String,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub referenced_tweets: Vec<ReferencedTweet>,
    #[serde(default)]
    pub geo: Option<Geo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReferencedTweet {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geo {
    #[serde(default)]
    pub place_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Includes {
    #[serde(default)]
    pub places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Place {
    pub id: String,
    pub full_name: String,
}

impl StreamEnvelope {
    pub(crate) fn into_raw_event(self) -> RawEvent {
        let is_reshare = self
            .data
            .referenced_tweets
            .iter()
            .any(|r| r.kind == "retweeted");

        let location = self
            .data
            .geo
            .and_then(|g| g.place_id)
            .and_then(|id| self.includes.places.into_iter().find(|p| p.id == id))
            .map(|p| p.full_name);

        RawEvent {
            text: self.data.text,
            lang: self.data.lang.unwrap_or_default(),
            is_reshare,
            location,
            created_at: self.data.created_at.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retweet_is_flagged_as_reshare() {
        let json = r#"{
            "data": {
                "id": "1",
                "text": "RT @someone: #rust is nice",
                "lang": "en",
                "created_at": "2024-05-01T12:00:00.000Z",
                "referenced_tweets": [{ "type": "retweeted", "id": "0" }]
            },
            "matching_rules": [{ "id": "9", "tag": null }]
        }"#;
        let env: StreamEnvelope = serde_json::from_str(json).unwrap();
        let event = env.into_raw_event();
        assert!(event.is_reshare);
        assert_eq!(event.lang, "en");
        assert_eq!(event.location, None);
    }

    #[test]
    fn quote_and_reply_are_not_reshares() {
        let json = r#"{
            "data": {
                "id": "1",
                "text": "agreed",
                "lang": "en",
                "referenced_tweets": [
                    { "type": "quoted", "id": "2" },
                    { "type": "replied_to", "id": "3" }
                ]
            }
        }"#;
        let env: StreamEnvelope = serde_json::from_str(json).unwrap();
        assert!(!env.into_raw_event().is_reshare);
    }

    #[test]
    fn place_is_resolved_from_includes() {
        let json = r#"{
            "data": {
                "id": "1",
                "text": "sunny",
                "lang": "en",
                "created_at": "2024-05-01T12:00:00.000Z",
                "geo": { "place_id": "p1" }
            },
            "includes": {
                "places": [
                    { "id": "p0", "full_name": "Elsewhere" },
                    { "id": "p1", "full_name": "Austin, TX" }
                ]
            }
        }"#;
        let env: StreamEnvelope = serde_json::from_str(json).unwrap();
        let event = env.into_raw_event();
        assert_eq!(event.location.as_deref(), Some("Austin, TX"));
        assert_eq!(event.created_at, "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn error_payload_does_not_decode_as_tweet() {
        let json = r#"{
            "errors": [{
                "title": "operational-disconnect",
                "disconnect_type": "UpstreamOperationalDisconnect"
            }]
        }"#;
        assert!(serde_json::from_str::<StreamEnvelope>(json).is_err());
    }
}
