//! Canned replies for when the model can't be reached.
//!
//! Keyword matching is deliberately simple and runs in a fixed order:
//! Italian, then dietary, then price. Anything else gets one of the
//! generic messages at random.

use rand::seq::IndexedRandom;

/// Prefix marking a reply produced while rate limited.
pub const DEGRADED_PREFIX: &str = "⚠️ Rate-limited mode:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackCategory {
    Italian,
    Dietary,
    Price,
    Generic,
}

const ITALIAN_KEYWORDS: &[&str] = &["italian", "pasta", "pizza"];
const DIETARY_KEYWORDS: &[&str] = &["vegan", "vegetarian", "plant"];
const PRICE_KEYWORDS: &[&str] = &["price", "expensive", "cheap", "cost", "budget"];

const ITALIAN_RESPONSE: &str = "I'm having trouble connecting to my knowledge base, but I can tell \
you're interested in Italian cuisine. Italian restaurants typically offer dishes like pasta, pizza, \
risotto, and many feature antipasti appetizers. Would you like me to try finding specific information \
once the connection is restored?";

const DIETARY_RESPONSE: &str = "While I'm experiencing connection issues, I notice you're interested \
in plant-based options. Many restaurants now offer dedicated vegan/vegetarian menus or can modify dishes \
to accommodate dietary preferences. Would you like to know about specific plant-based dishes once I'm \
back online?";

const PRICE_RESPONSE: &str = "I see you're asking about pricing. While I can't access specific \
restaurant prices right now due to connection issues, restaurants typically range from budget-friendly \
options to high-end dining experiences. I'd be happy to provide more specific information once the \
connection is restored.";

pub const GENERIC_RESPONSES: [&str; 4] = [
    "I'm having trouble connecting to my knowledge base right now. Could you try asking again in a moment?",
    "It seems like we're experiencing some technical difficulties. Let me try to help with what I know: \
     restaurants generally offer a variety of cuisines and price points. Could you provide more details \
     about what you're looking for?",
    "I apologize, but I'm having trouble accessing the restaurant database at the moment. Is there \
     something specific about dining options you'd like to know?",
    "We're experiencing a high volume of requests right now. Would you mind trying your question again \
     in a few moments?",
];

impl FallbackCategory {
    /// The fixed reply for a keyword category; `None` for [`Self::Generic`].
    pub fn response(&self) -> Option<&'static str> {
        match self {
            Self::Italian => Some(ITALIAN_RESPONSE),
            Self::Dietary => Some(DIETARY_RESPONSE),
            Self::Price => Some(PRICE_RESPONSE),
            Self::Generic => None,
        }
    }
}

/// Substring match on the lowercased query, first category wins.
pub fn categorize(query: &str) -> FallbackCategory {
    let query = query.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| query.contains(k));

    if mentions(ITALIAN_KEYWORDS) {
        FallbackCategory::Italian
    } else if mentions(DIETARY_KEYWORDS) {
        FallbackCategory::Dietary
    } else if mentions(PRICE_KEYWORDS) {
        FallbackCategory::Price
    } else {
        FallbackCategory::Generic
    }
}

/// A reply for `query` that needs no model call.
pub fn fallback_response(query: &str) -> &'static str {
    categorize(query).response().unwrap_or_else(|| {
        GENERIC_RESPONSES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(GENERIC_RESPONSES[0])
    })
}

/// [`fallback_response`] with the degraded-mode prefix.
pub fn degraded_reply(query: &str) -> String {
    format!("{DEGRADED_PREFIX} {}", fallback_response(query))
}
