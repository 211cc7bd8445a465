//! Default prompts for the transcriber operations.

/// Default prompt sent alongside an audio file.
pub const DEFAULT_TRANSCRIPTION_PROMPT: &str = r#"Please transcribe this audio file accurately. If there are multiple speakers,
clearly identify and label each speaker as Speaker 1, Speaker 2, etc.
Format the transcript as:
Speaker X: [transcribed text]

Differentiate speakers based on voice characteristics, tone, pitch, and speech patterns.
If a speaker's name is mentioned or can be inferred, use their name instead of Speaker X."#;

/// Default prompt for summarizing a transcript.
pub const DEFAULT_SUMMARY_PROMPT: &str = r#"Please provide a concise summary of the following transcript.
Focus on the key points, main topics discussed, and any important conclusions.

Format your response in Markdown using the following layout:

## Summary
A brief summary of the overall conversation.

## Main Takeaways
- Key Point 1
- Key Point 2
- Key Point 3

## Action Items
- Action Item 1
- Action Item 2

Use bullet points for better readability. Make sure the output is valid Markdown.

Transcript:
{transcript}"#;

/// Default prompt for answering a question about a transcript.
pub const DEFAULT_QA_PROMPT: &str = r#"You are analyzing a transcript and answering questions about it.

Transcript:
{transcript}

Question: {question}

Please answer the question based on the information in the transcript only.
If the transcript doesn't contain the information needed, say so clearly."#;

/// Substitute `{name}` placeholders in one pass over `template`.
///
/// Substituted text is never rescanned, so a value containing `{question}`
/// stays literal. Unknown placeholders are left as written.
pub fn fill_prompt(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let filled = tail.find('}').and_then(|close| {
            let name = &tail[1..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match filled {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
