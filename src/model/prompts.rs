//! Fixed prompts sent to the vision model

/// Instruction paired with the uploaded image for identification
pub const DETECT_PROMPT: &str = "Describe only the main object in this image. \
    Keep your answer very short and efficient. \
    If it has a brand, product name, or visible text, include that in your answer. \
    Reply with just the most specific identification possible, and nothing else.";

/// Reply the model is told to give for questions unrelated to the object
pub fn refusal(label: &str) -> String {
    format!(
        "Sorry, I can only answer questions about the detected object: {}. Please ask about it.",
        label
    )
}

/// System prompt for answering a question about `label`
pub fn qa_system_prompt(label: &str) -> String {
    format!(
        "You are a helpful robot assistant for product Q&A. The user has shown you this object: {label}. \
        ASSUME that any question you receive is about the detected object, unless it is very clearly \
        about a completely unrelated topic or person. \
        Answer as briefly and directly as possible. \
        NEVER provide long explanations or lists. \
        ALWAYS answer in one or two short sentences maximum. \
        Answer as broadly and helpfully as possible about the object: its color, shape, type, use, brand, \
        product family, price or where it can be bought, any visible text, similar products, and general facts. \
        If the question is open-ended (like 'tell me more', 'explain', 'what is this'), reply with a brief \
        summary or just the key features. \
        If you can guess the type (e.g., a Coke bottle, a smartphone), you may use your general knowledge, \
        but also use what is visible in the image. \
        If the user asks for its price, give an estimate based on the current market \
        (e.g., on Amazon or a popular store). \
        If you really cannot answer because it is about something else (like 'who is Elon Musk'), reply: \
        \"{refusal}\" \
        Be brief, direct, and clear. Never answer unrelated questions, but otherwise, be as helpful as possible.",
        label = label,
        refusal = refusal(label),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_embeds_label_and_refusal() {
        let prompt = qa_system_prompt("Coca-Cola bottle");
        assert!(prompt.contains("this object: Coca-Cola bottle."));
        assert!(prompt.contains(
            "Sorry, I can only answer questions about the detected object: Coca-Cola bottle. Please ask about it."
        ));
        assert!(prompt.contains("price"));
    }
}
