//! Prompt scaffolds for generation, refinement, fixing, and ideation.
//!
//! All prompt text lives here so the orchestrator and ops stay free of
//! string building. Contextual prompts embed the error-context block from
//! [`crate::error_context`] verbatim — it is advisory text for the backend.

use std::fmt::Write as _;

use crate::error_context::build_error_context;

/// System prompt for first-generation component requests.
///
/// Instructs the backend to return one self-contained, default-exported
/// React component and nothing else — the normalizer and validator assume
/// this shape.
#[must_use]
pub fn component_system_prompt() -> String {
    "\
You are an expert frontend React engineer and UI/UX designer. Follow these instructions carefully:

- Think carefully step by step.
- Create a React component for whatever the user asks for and make sure it can run by itself by using a default export.
- Make the component interactive and functional by creating state when needed, with no required props.
- If you use any React imports like useState or useEffect, import them directly.
- Use TypeScript as the language for the component.
- Use Tailwind classes for styling. Do not use arbitrary values (e.g. `h-[600px]`). Use a consistent color palette.
- Use Tailwind margin and padding classes to space components out nicely.
- Return ONLY the full React code starting with the imports, nothing else. Do not start with ``` or a language tag.
- Only if the user asks for a dashboard, graph or chart, the recharts library is available to be imported.
- For placeholder images, use a <div className=\"bg-gray-200 border-2 border-dashed rounded-xl w-16 h-16\" />.

NO OTHER LIBRARIES ARE INSTALLED OR ABLE TO BE IMPORTED.
MAKE SURE TO USE export default FOR THE MAIN COMPONENT."
        .to_owned()
}

/// Contextual refinement prompt: user request + current code + original
/// intent + (when present) structured error context.
#[must_use]
pub fn contextual_refinement_prompt(
    user_request: &str,
    code: &str,
    original_prompt: &str,
    last_error: Option<&str>,
) -> String {
    let mut out = String::from(
        "As a React and TypeScript expert, please help improve this code:\n\n",
    );

    if let Some(error) = last_error {
        out.push_str(&build_error_context(error));
        out.push('\n');
    }

    let _ = write!(
        out,
        "Original Requirements:\n{original_prompt}\n\n\
         Current Complete Code:\n{code}\n\n\
         User Request:\n{user_request}\n\n\
         Technical Requirements:\n\
         1. Return a complete, working React TypeScript component\n\
         2. Include ALL necessary imports at the top\n\
         3. Maintain proper component structure and exports\n\
         4. Use appropriate TypeScript types and interfaces\n\
         5. Follow React hooks rules and best practices\n\
         6. Implement proper error handling and null checks\n\
         7. Ensure all JSX is properly formatted and closed\n\
         8. Maintain existing functionality while fixing issues\n\n\
         Format Requirements:\n\
         - Start the response with imports\n\
         - Include the complete component code\n\
         - Do not include any explanations or markdown\n\
         - Provide only the working code, usable as-is"
    );

    out
}

/// Synthetic user request for an automatic validation retry.
#[must_use]
pub fn retry_fix_request(validation_error: &str) -> String {
    format!(
        "Please fix the following issue: {validation_error}. \
         Ensure the code is complete and properly formatted."
    )
}

/// One-shot fix prompt for a reported runtime error.
#[must_use]
pub fn fix_prompt(code: &str, error: &str, line: Option<u32>, column: Option<u32>) -> String {
    let mut out = String::from(
        "As an expert React developer, please fix the following code that has an error.\n\
         Error details:\n",
    );
    let _ = writeln!(out, "- Message: {error}");
    if let Some(line) = line {
        let _ = writeln!(out, "- Line: {line}");
    }
    if let Some(column) = column {
        let _ = writeln!(out, "- Column: {column}");
    }
    let _ = write!(
        out,
        "\nHere's the code:\n{code}\n\n\
         Please analyze the error carefully and provide ONLY the fixed code without any \
         explanations or markdown formatting. The response should start directly with the \
         imports and contain only the corrected code."
    );
    out
}

/// System prompt for app-idea generation.
pub const IDEA_SYSTEM_PROMPT: &str = "\
Generate a creative app idea in the following format EXACTLY:
\"Build me a [type] app that [brief description of main functionality]\"

For example:
\"Build me a fitness tracking app that uses gamification to motivate users\"
\"Build me a recipe management app that suggests meals based on available ingredients\"

The app idea should be:
- Practical and feasible to implement
- Solving a real problem or fulfilling a need
- Clear and straightforward
- Specific enough to generate code from

Return ONLY the formatted prompt, nothing else. Always start with \"Build me a\" and follow the format above.";

/// User message paired with [`IDEA_SYSTEM_PROMPT`].
pub const IDEA_USER_PROMPT: &str = "Generate a creative and unique app idea that is practical, \
                                    innovative, and solves a real problem.";

/// Prompt asking the backend to rewrite a rough user prompt into a sharper
/// one.
#[must_use]
pub fn refine_user_prompt(prompt: &str) -> String {
    format!(
        "Rewrite the following app request so it is specific enough to generate a single \
         React component from. Keep the user's intent, add concrete details about layout, \
         interactions, and state, and keep it under 80 words. Return ONLY the rewritten \
         request, nothing else.\n\nRequest:\n{prompt}"
    )
}

/// User-facing remediation message after retry exhaustion.
pub const EXHAUSTION_REMEDIATION: &str = "\
I'm having trouble generating valid code. Could you please try:
1. Describing the specific changes needed
2. Breaking down the request into smaller steps
3. Providing any error messages you're seeing";

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
