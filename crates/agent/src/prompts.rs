//! Prompt text for every model call in the pipeline.

use std::fmt::Write as _;
use std::sync::Arc;

use nugget_core::document::RetrievedPassage;
use nugget_core::tool::RouterTool;

/// Turns a follow-up question into one that stands on its own.
pub const CONTEXTUALIZE_PROMPT: &str = "Given a chat history and the latest user question, which may refer \
to something said earlier in the conversation, rewrite the question so it can be understood without the \
chat history. Replace pronouns and vague references with the restaurant, dish or detail they refer to. \
Do NOT answer the question. Only rewrite it if needed, otherwise return it exactly as it is. \
Reply with the question alone.";

const ASSISTANT_PERSONA: &str = "You are Nugget, a friendly conversational assistant that helps people \
with questions about local restaurants: menus, prices, locations, opening hours, contact details and \
special offers. Use the retrieved context and the conversation history to answer and to personalize your \
replies. If the user shares their name or preferences, remember them and use them naturally.";

const GROUNDING_RULES: &str = "Answer only from the retrieved context below. Do not invent restaurants, \
dishes, prices, addresses or hours. When the context does not contain the answer, say so plainly and offer \
to help with a related question. Keep answers concise.";

/// Context block used when retrieval came back empty.
pub const NO_CONTEXT: &str = "No relevant restaurant information was retrieved for this question. \
Tell the user you don't have that information instead of guessing.";

/// The composer's system prompt: persona, rules, then the context block.
pub fn answer_system_prompt(passages: &[RetrievedPassage]) -> String {
    let mut prompt = format!("{ASSISTANT_PERSONA}\n\n{GROUNDING_RULES}\n\nRetrieved context:\n");
    if passages.is_empty() {
        prompt.push_str(NO_CONTEXT);
        return prompt;
    }

    let blocks: Vec<String> = passages
        .iter()
        .map(|p| match p.source_name() {
            Some(name) => format!("[{name}]\n{}", p.text.trim()),
            None => p.text.trim().to_string(),
        })
        .collect();
    prompt.push_str(&blocks.join("\n\n"));
    prompt
}

/// Instructions for the reasoning loop, listing the available tools.
pub fn router_system_prompt(tools: &[Arc<dyn RouterTool>]) -> String {
    let mut prompt = String::from(
        "You are Nugget, a restaurant assistant. Answer the user's question as best you can. \
         You have access to the following tools:\n\n",
    );
    for tool in tools {
        let _ = writeln!(prompt, "{}: {}", tool.name(), tool.description());
    }

    let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
    let _ = write!(
        prompt,
        "\nAlways try the restaurant database first. Use the other tools only when it has nothing relevant.\n\n\
         Use exactly this format:\n\n\
         Thought: think about what to do next\n\
         Action: the tool to use, one of [{}]\n\
         Action Input: the input for the tool\n\
         Observation: the tool's result (written for you, never write it yourself)\n\
         ... (Thought/Action/Action Input/Observation can repeat)\n\
         Thought: I now know the final answer\n\
         Final Answer: the answer to the user's question\n\n\
         When a tool has already answered the question, repeat its answer as the Final Answer.",
        names.join(", ")
    );
    prompt
}

/// Appended as an observation when the model's output didn't follow the format.
pub fn format_reminder(problem: &str) -> String {
    format!(
        "Invalid format: {problem}. Reply with either \"Action:\" and \"Action Input:\" lines, \
         or a \"Final Answer:\" line."
    )
}

/// Fixed reply when the step budget runs out before any tool answered.
pub const BUDGET_EXHAUSTED_REPLY: &str = "I'm sorry, I couldn't work out an answer to that in time. \
Could you try rephrasing your question?";
