/// Placeholder replaced with the diff file name.
pub const FILE_NAME_PLACEHOLDER: &str = "${FILE_NAME}";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "# AI Code Review Prompt
# Review the following code changes in ${FILE_NAME}.
# Please provide detailed feedback focusing on:

# 1. Correctness
#    - Identify potential bugs or logical errors.
#    - Verify that the code meets the intended behavior.

# 2. Performance
#    - Highlight inefficient algorithms or operations.
#    - Suggest improvements if applicable.

# 3. Readability & Maintainability
#    - Comment on code clarity, naming, and structure.
#    - Suggest refactoring opportunities.

# 4. Security
#    - Identify vulnerabilities or unsafe patterns.
#    - Suggest mitigations or safer alternatives.

# Instructions:
# - Provide actionable feedback and examples when possible.
# - Keep comments concise and precise.
# - Avoid generic statements; focus on the code in context.

";

/// Render the review prompt, falling back to the built-in template.
pub fn build_prompt(template: Option<&str>, file_name: &str) -> String {
    template
        .unwrap_or(DEFAULT_PROMPT_TEMPLATE)
        .replace(FILE_NAME_PLACEHOLDER, file_name)
}

/// Initial message handed to the chat reviewer after a diff is generated.
pub fn review_request(file_name: &str, prompt: &str) -> String {
    format!("@reviewer review {file_name}\n\n{prompt}")
}
