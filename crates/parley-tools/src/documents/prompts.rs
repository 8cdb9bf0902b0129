use parley_types::ArtifactKind;

const TEXT_PROMPT: &str = "Write about the given topic. Markdown is supported. \
Use headings wherever appropriate.";

const CODE_PROMPT: &str = "You are a code generator that creates self-contained, \
executable code snippets. Each snippet should be complete and runnable on its own, \
print its output, include helpful comments, stay concise and use only the standard \
library. Handle potential errors gracefully and never read input interactively. \
Return only the code without markdown fences.";

const SHEET_PROMPT: &str = "You are a spreadsheet creation assistant. Create a \
spreadsheet in CSV format based on the given prompt. The spreadsheet should contain \
meaningful column headers and data. Return only the CSV without markdown fences.";

pub(super) const SUGGESTIONS_PROMPT: &str = "You are a writing assistant. Given a \
piece of writing, offer suggestions to improve it and describe each change. Edits \
must contain full sentences, not single words. Give at most 5 suggestions. Respond \
with a JSON object of the form {\"suggestions\": [{\"original_sentence\": string, \
\"suggested_sentence\": string, \"description\": string}]}.";

pub(super) fn create_prompt(kind: ArtifactKind) -> String {
    match kind {
        ArtifactKind::Text => TEXT_PROMPT,
        ArtifactKind::Code => CODE_PROMPT,
        ArtifactKind::Sheet => SHEET_PROMPT,
    }
    .to_string()
}

pub(super) fn update_prompt(kind: ArtifactKind, current: &str) -> String {
    let what = match kind {
        ArtifactKind::Text => "document",
        ArtifactKind::Code => "code snippet",
        ArtifactKind::Sheet => "spreadsheet",
    };
    format!(
        "Improve the following contents of the {} based on the given prompt. \
         Return the complete revised contents only.\n\n{}",
        what, current
    )
}
