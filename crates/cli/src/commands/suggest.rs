//! `nugget suggest`: Sample questions.

pub const SAMPLE_QUERIES: [&str; 4] = [
    "What Italian restaurants are nearby?",
    "Tell me about vegan options at local cafes",
    "What's the price range for sushi restaurants?",
    "Best brunch spots open on weekends?",
];

pub fn run() {
    println!("Try asking:");
    for query in SAMPLE_QUERIES {
        println!("  nugget chat -m \"{query}\"");
    }
}
