//! Closed set of topic categories carried by the relay.
//!
//! Every transport topic maps onto exactly one [`TopicKind`]. The set is
//! closed, so dispatch is an exhaustive `match` rather than a listener
//! hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the parallel position feeds an aircraft sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AircraftSource {
    #[serde(rename = "coredata")]
    CoreData,
    #[serde(rename = "coredata2")]
    CoreData2,
    #[serde(rename = "coredata3")]
    CoreData3,
    #[serde(rename = "coredata4")]
    CoreData4,
}

impl AircraftSource {
    pub const ALL: [AircraftSource; 4] = [
        AircraftSource::CoreData,
        AircraftSource::CoreData2,
        AircraftSource::CoreData3,
        AircraftSource::CoreData4,
    ];

    /// Subtype token used in record headers.
    pub fn subtype(&self) -> &'static str {
        match self {
            AircraftSource::CoreData => "coredata",
            AircraftSource::CoreData2 => "coredata2",
            AircraftSource::CoreData3 => "coredata3",
            AircraftSource::CoreData4 => "coredata4",
        }
    }

    /// Transport topic name the source is published on.
    pub fn topic_name(&self) -> &'static str {
        match self {
            AircraftSource::CoreData => "CoreDataTopic",
            AircraftSource::CoreData2 => "CoreData2Topic",
            AircraftSource::CoreData3 => "CoreData3Topic",
            AircraftSource::CoreData4 => "CoreData4Topic",
        }
    }

    /// Aircraft identifier shown to viewers (1-based).
    pub fn aircraft_id(&self) -> u8 {
        match self {
            AircraftSource::CoreData => 1,
            AircraftSource::CoreData2 => 2,
            AircraftSource::CoreData3 => 3,
            AircraftSource::CoreData4 => 4,
        }
    }

    pub fn from_subtype(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.subtype() == token)
    }
}

/// Semantic category of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Vehicle position.
    Aircraft,
    Intelligence,
    Messaging,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Aircraft, Category::Intelligence, Category::Messaging];

    /// Token used in record headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Aircraft => "aircraft",
            Category::Intelligence => "intelligence",
            Category::Messaging => "messaging",
        }
    }

    /// Viewer channel the category is delivered on.
    pub fn channel(&self) -> &'static str {
        match self {
            Category::Aircraft => "aircraftData",
            Category::Intelligence => "intelligence",
            Category::Messaging => "messaging",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == token)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category plus subtype: the identity of one bound topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopicKind {
    Aircraft(AircraftSource),
    Intelligence,
    Messaging,
}

impl TopicKind {
    /// Every topic a domain subscription binds, in binding order.
    pub const ALL: [TopicKind; 6] = [
        TopicKind::Aircraft(AircraftSource::CoreData),
        TopicKind::Aircraft(AircraftSource::CoreData2),
        TopicKind::Aircraft(AircraftSource::CoreData3),
        TopicKind::Aircraft(AircraftSource::CoreData4),
        TopicKind::Intelligence,
        TopicKind::Messaging,
    ];

    pub fn category(&self) -> Category {
        match self {
            TopicKind::Aircraft(_) => Category::Aircraft,
            TopicKind::Intelligence => Category::Intelligence,
            TopicKind::Messaging => Category::Messaging,
        }
    }

    pub fn subtype(&self) -> Option<&'static str> {
        match self {
            TopicKind::Aircraft(source) => Some(source.subtype()),
            TopicKind::Intelligence | TopicKind::Messaging => None,
        }
    }

    pub fn topic_name(&self) -> &'static str {
        match self {
            TopicKind::Aircraft(source) => source.topic_name(),
            TopicKind::Intelligence => "IntelligenceTopic",
            TopicKind::Messaging => "MessagingTopic",
        }
    }

    /// Resolves the topic that delivered a sample from its transport name.
    ///
    /// Any other `CoreData*` topic falls back to the primary position feed.
    pub fn from_topic_name(name: &str) -> Option<Self> {
        match name {
            "IntelligenceTopic" => Some(TopicKind::Intelligence),
            "MessagingTopic" => Some(TopicKind::Messaging),
            "CoreData2Topic" => Some(TopicKind::Aircraft(AircraftSource::CoreData2)),
            "CoreData3Topic" => Some(TopicKind::Aircraft(AircraftSource::CoreData3)),
            "CoreData4Topic" => Some(TopicKind::Aircraft(AircraftSource::CoreData4)),
            other if other.starts_with("CoreData") => {
                Some(TopicKind::Aircraft(AircraftSource::CoreData))
            }
            _ => None,
        }
    }

    /// Resolves header tokens. An aircraft header without a subtype means the
    /// primary feed; an unknown subtype is rejected.
    pub fn from_tokens(category: &str, subtype: Option<&str>) -> Option<Self> {
        match Category::from_token(category)? {
            Category::Aircraft => match subtype {
                None => Some(TopicKind::Aircraft(AircraftSource::CoreData)),
                Some(token) => AircraftSource::from_subtype(token).map(TopicKind::Aircraft),
            },
            Category::Intelligence => Some(TopicKind::Intelligence),
            Category::Messaging => Some(TopicKind::Messaging),
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subtype() {
            Some(subtype) => write!(f, "{} {}", self.category(), subtype),
            None => write!(f, "{}", self.category()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_resolve_back_to_kind() {
        for kind in TopicKind::ALL {
            assert_eq!(TopicKind::from_topic_name(kind.topic_name()), Some(kind));
        }
    }

    #[test]
    fn unknown_coredata_topic_falls_back_to_primary_feed() {
        assert_eq!(
            TopicKind::from_topic_name("CoreData9Topic"),
            Some(TopicKind::Aircraft(AircraftSource::CoreData))
        );
        assert_eq!(TopicKind::from_topic_name("WeatherTopic"), None);
    }

    #[test]
    fn header_tokens_resolve() {
        assert_eq!(
            TopicKind::from_tokens("aircraft", Some("coredata3")),
            Some(TopicKind::Aircraft(AircraftSource::CoreData3))
        );
        assert_eq!(
            TopicKind::from_tokens("aircraft", None),
            Some(TopicKind::Aircraft(AircraftSource::CoreData))
        );
        assert_eq!(TopicKind::from_tokens("aircraft", Some("coredata7")), None);
        assert_eq!(TopicKind::from_tokens("messaging", None), Some(TopicKind::Messaging));
        assert_eq!(TopicKind::from_tokens("weather", None), None);
    }

    #[test]
    fn display_matches_header_label() {
        assert_eq!(
            TopicKind::Aircraft(AircraftSource::CoreData2).to_string(),
            "aircraft coredata2"
        );
        assert_eq!(TopicKind::Intelligence.to_string(), "intelligence");
    }

    #[test]
    fn channels_per_category() {
        assert_eq!(Category::Aircraft.channel(), "aircraftData");
        assert_eq!(Category::Intelligence.channel(), "intelligence");
        assert_eq!(Category::Messaging.channel(), "messaging");
    }

    #[test]
    fn aircraft_ids_are_one_based() {
        let ids: Vec<u8> = AircraftSource::ALL.iter().map(|s| s.aircraft_id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
