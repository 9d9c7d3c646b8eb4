//! Prompt assembly — the initial request prompt and the repair follow-ups.

use tc_core::prompt::{Prompt, PromptSection};

/// Sections appended per repair round (raw response + repair instruction).
/// Trimming between rounds removes exactly this many.
pub(crate) const REPAIR_SECTIONS: usize = 2;

/// Build the prompt for the first attempt: emission instructions with the
/// schema spliced in, any caller preamble, then the user request.
pub(crate) fn request_prompt(schema: &str, request: &str, preamble: &[PromptSection]) -> Prompt {
    let mut prompt = Prompt::new();
    prompt.push(PromptSection::system(instructions(schema)));
    for section in preamble {
        prompt.push(section.clone());
    }
    prompt.push(PromptSection::user(request_section(request)));
    prompt
}

fn instructions(schema: &str) -> String {
    format!(
        "You are a service that translates user requests into JSON values.\n\
         The JSON must conform to the following schema:\n\
         ```\n{schema}\n```\n\
         Respond with the JSON value only, no explanations."
    )
}

fn request_section(request: &str) -> String {
    format!("Translate the following request into JSON:\n{request}")
}

/// The follow-up appended after an invalid response, quoting the diagnostic
/// verbatim.
pub(crate) fn repair_section(diagnostic: &str) -> String {
    format!(
        "The JSON you produced is invalid for the following reason:\n\
         {diagnostic}\n\
         Respond with a corrected JSON value. Output JSON only."
    )
}
