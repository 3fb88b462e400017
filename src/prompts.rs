//! Prompt templates for flashcard generation.
//!
//! Every instruction sent to the model lives here so prompt changes never
//! touch retry or parsing logic, and unit tests can inspect the rendered text
//! without a model. Each template has a matching parser in
//! [`crate::pipeline::format`].

/// Render the JSON-mode instruction for one chunk.
///
/// The model is asked for a fenced JSON array of objects with
/// `question`, `answer`, `topic` and `difficulty` fields.
pub fn json_prompt(chunk: &str, subject: &str) -> String {
    format!(
        r#"You are an expert educator creating flashcards for {subject}. Given the following educational content, generate 10-15 concise question-answer flashcards. Each flashcard should have:
- A clear, concise question.
- A factually correct, self-contained answer.
- A difficulty level (Easy, Medium, Hard) based on complexity.
- Group flashcards by detected topics if possible. If no clear topics are detected, use '{subject}' as the topic.

Content: {chunk}

Return the output as a JSON list of objects with 'question', 'answer', 'topic', and 'difficulty' fields. Ensure valid JSON format, wrapped in ```json
...
```."#
    )
}

/// Render the line-mode instruction for one chunk.
///
/// The model is asked for exactly `count` blocks of three labelled lines
/// separated by blank lines, with no other prose.
pub fn line_prompt(chunk: &str, subject: &str, count: usize) -> String {
    format!(
        r#"You are an expert educator creating flashcards for {subject}.
Read the content below and write exactly {count} flashcards.

Use exactly this format for every flashcard, with one blank line between flashcards:
Question: <a clear, concise question>
Answer: <a factually correct, self-contained answer>
Difficulty: <Easy, Medium or Hard>

Do not number the flashcards. Do not write anything else.

Content: {chunk}"#
    )
}
